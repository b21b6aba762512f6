//! Graph API payloads consumed and re-exported by the service layer.

// crates.io
use time::{UtcOffset, macros::format_description};
// self
use crate::{
	_prelude::*,
	account::{FormId, TokenSecret},
};

/// Result of the short-lived to long-lived token exchange.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LongLivedToken {
	/// Long-lived user token.
	pub access_token: TokenSecret,
	/// Token type reported by the Graph API.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Lifetime in seconds, when reported.
	#[serde(default)]
	pub expires_in: Option<u64>,
}

/// Basic page profile returned by a page read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageProfile {
	/// Page identifier.
	pub id: String,
	/// Page display name.
	#[serde(default)]
	pub name: String,
}

/// Lead-generation form attached to a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadForm {
	/// Form identifier.
	pub id: FormId,
	/// Form display name.
	#[serde(default)]
	pub name: String,
	/// Form status such as `ACTIVE` or `ARCHIVED`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	/// Creation timestamp as reported by the Graph API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_time: Option<String>,
}

/// One lead submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
	/// Lead identifier.
	pub id: String,
	/// Submission timestamp as reported by the Graph API.
	#[serde(default)]
	pub created_time: String,
	/// Answers keyed by question name.
	#[serde(default)]
	pub field_data: Vec<LeadField>,
}
impl Lead {
	/// Returns the first answer for `name`, if the lead carries one.
	pub fn field(&self, name: &str) -> Option<&str> {
		self.field_data
			.iter()
			.find(|field| field.name == name)
			.and_then(|field| field.values.first())
			.map(String::as_str)
	}
}

/// One answered question in a lead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadField {
	/// Question name, for example `email`.
	pub name: String,
	/// Answers; most questions carry exactly one.
	#[serde(default)]
	pub values: Vec<String>,
}

/// Which leads to download.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LeadWindow {
	/// Every lead on the form.
	#[default]
	All,
	/// Leads created during the UTC day before the request.
	Yesterday,
}
impl LeadWindow {
	/// Picks [`LeadWindow::Yesterday`] when `only_yesterday` is set.
	pub fn from_flag(only_yesterday: bool) -> Self {
		if only_yesterday { Self::Yesterday } else { Self::All }
	}

	/// Label used in export file names.
	pub const fn label(self) -> &'static str {
		match self {
			LeadWindow::All => "all",
			LeadWindow::Yesterday => "yesterday",
		}
	}

	/// Returns the `created_time` bounds for a request made at `now`.
	pub fn bounds_at(self, now: OffsetDateTime) -> Option<(String, String)> {
		match self {
			LeadWindow::All => None,
			LeadWindow::Yesterday => {
				let day = now.to_offset(UtcOffset::UTC).date().previous_day()?;
				let day = day.format(format_description!("[year]-[month]-[day]")).ok()?;

				Some((format!("{day}T00:00:00"), format!("{day}T23:59:59")))
			},
		}
	}
}
impl Display for LeadWindow {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.label())
	}
}

/// Graph list envelope `{data: [...], paging: {next}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct DataPage<T> {
	#[serde(default = "Vec::new")]
	pub(crate) data: Vec<T>,
	#[serde(default)]
	pub(crate) paging: Option<Paging>,
}
impl<T> DataPage<T> {
	pub(crate) fn next(&self) -> Option<&str> {
		self.paging.as_ref().and_then(|paging| paging.next.as_deref())
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging {
	#[serde(default)]
	pub(crate) next: Option<String>,
}

/// Graph error envelope `{error: {message, type, code, error_subcode, fbtrace_id}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
	pub(crate) error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphErrorBody {
	#[serde(default)]
	pub(crate) message: String,
	#[serde(default, rename = "type")]
	pub(crate) kind: Option<String>,
	#[serde(default)]
	pub(crate) code: Option<i64>,
	#[serde(default)]
	pub(crate) error_subcode: Option<i64>,
	#[serde(default)]
	pub(crate) fbtrace_id: Option<String>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn lead(fields: &[(&str, &[&str])]) -> Lead {
		Lead {
			id: "1".into(),
			created_time: "2024-03-01T10:00:00+0000".into(),
			field_data: fields
				.iter()
				.map(|(name, values)| LeadField {
					name: (*name).into(),
					values: values.iter().map(|value| (*value).into()).collect(),
				})
				.collect(),
		}
	}

	#[test]
	fn yesterday_bounds_use_the_previous_utc_day() {
		let now = datetime!(2024-03-01 00:30 +02:00);

		assert_eq!(
			LeadWindow::Yesterday.bounds_at(now),
			Some(("2024-02-28T00:00:00".into(), "2024-02-28T23:59:59".into()))
		);
		assert_eq!(LeadWindow::All.bounds_at(now), None);
	}

	#[test]
	fn yesterday_bounds_zero_pad_the_date() {
		assert_eq!(
			LeadWindow::Yesterday.bounds_at(datetime!(2025-01-01 09:00 UTC)),
			Some(("2024-12-31T00:00:00".into(), "2024-12-31T23:59:59".into()))
		);
		assert_eq!(
			LeadWindow::Yesterday.bounds_at(datetime!(2025-03-02 09:00 UTC)).map(|(since, _)| since),
			Some("2025-03-01T00:00:00".into())
		);
	}

	#[test]
	fn field_returns_first_value_only() {
		let lead = lead(&[("email", &["a@example.com", "b@example.com"]), ("full_name", &[])]);

		assert_eq!(lead.field("email"), Some("a@example.com"));
		assert_eq!(lead.field("full_name"), None);
		assert_eq!(lead.field("phone_number"), None);
	}

	#[test]
	fn lead_form_tolerates_missing_optional_fields() {
		let form: LeadForm =
			serde_json::from_str(r#"{"id":"824698349386177"}"#).expect("Form should parse.");

		assert_eq!(form.name, "");
		assert_eq!(form.status, None);
		assert_eq!(
			serde_json::to_string(&form).expect("Form should serialize."),
			r#"{"id":"824698349386177","name":""}"#
		);
	}
}
