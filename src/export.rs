//! Lead export rendering for CSV and JSON downloads.

// self
use crate::{
	_prelude::*,
	account::FormId,
	graph::{Lead, LeadWindow},
};

/// Column header written as the first CSV row.
pub const CSV_HEADER: [&str; 5] = ["ID", "Created Time", "Full Name", "Email", "Phone Number"];
/// Lead fields exported after the id and creation time, in column order.
pub const EXPORTED_FIELDS: [&str; 3] = ["full_name", "email", "phone_number"];

/// Errors raised while rendering an export.
#[derive(Debug, ThisError)]
pub enum ExportError {
	/// The requested format is not supported.
	#[error("Unsupported export format `{format}`; expected `csv` or `json`.")]
	UnsupportedFormat {
		/// Format requested by the caller.
		format: String,
	},
	/// CSV writer failure.
	#[error("CSV export failed.")]
	Csv(#[from] csv::Error),
	/// JSON serializer failure.
	#[error("JSON export failed.")]
	Json(#[from] serde_json::Error),
}

/// Output format for downloaded leads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
	/// Comma-separated values with a fixed header.
	#[default]
	Csv,
	/// Pretty-printed JSON array of leads.
	Json,
}
impl ExportFormat {
	/// File extension without the dot.
	pub const fn extension(self) -> &'static str {
		match self {
			ExportFormat::Csv => "csv",
			ExportFormat::Json => "json",
		}
	}

	/// MIME type sent with downloads.
	pub const fn content_type(self) -> &'static str {
		match self {
			ExportFormat::Csv => "text/csv",
			ExportFormat::Json => "application/json",
		}
	}
}
impl FromStr for ExportFormat {
	type Err = ExportError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"csv" => Ok(Self::Csv),
			"json" => Ok(Self::Json),
			_ => Err(ExportError::UnsupportedFormat { format: s.to_owned() }),
		}
	}
}
impl Display for ExportFormat {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.extension())
	}
}

/// Rendered download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadExport {
	/// Suggested file name, for example `leads_123_yesterday.csv`.
	pub filename: String,
	/// MIME type of `body`.
	pub content_type: &'static str,
	/// Number of leads rendered.
	pub lead_count: usize,
	/// Encoded file contents.
	pub body: Vec<u8>,
}
impl LeadExport {
	/// Renders `leads` of `form_id` in `format`.
	pub fn render(
		form_id: &FormId,
		window: LeadWindow,
		format: ExportFormat,
		leads: &[Lead],
	) -> Result<Self, ExportError> {
		let body = match format {
			ExportFormat::Csv => render_csv(leads)?,
			ExportFormat::Json => serde_json::to_vec_pretty(leads)?,
		};

		Ok(Self {
			filename: format!("leads_{form_id}_{}.{}", window.label(), format.extension()),
			content_type: format.content_type(),
			lead_count: leads.len(),
			body,
		})
	}

	/// `Content-Disposition` header value for the download.
	pub fn content_disposition(&self) -> String {
		format!("attachment; filename={}", self.filename)
	}
}

fn render_csv(leads: &[Lead]) -> Result<Vec<u8>, ExportError> {
	let mut writer = csv::Writer::from_writer(Vec::new());

	writer.write_record(CSV_HEADER)?;

	for lead in leads {
		let mut row = vec![lead.id.as_str(), lead.created_time.as_str()];

		row.extend(EXPORTED_FIELDS.iter().map(|name| lead.field(name).unwrap_or_default()));
		writer.write_record(&row)?;
	}

	writer.into_inner().map_err(|e| ExportError::Csv(e.into_error().into()))
}
