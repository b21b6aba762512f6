//! Guided export pipeline: convert token, pick a page, list forms, download leads.

// self
use crate::{
	_prelude::*,
	account::FormId,
	config::pause,
	error::TokenKind,
	export::{ExportFormat, LeadExport},
	graph::{LeadForm, LeadWindow},
	http::GraphHttpClient,
	service::{LeadForms, LeadService, PageTokenRequest, SelectedPage},
};

/// Options for one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineRequest {
	/// Skip the short-lived token exchange and reuse the stored long-lived token.
	pub skip_convert: bool,
	/// Page to select by id.
	pub page_id: Option<String>,
	/// Page to select by index when no id is given.
	pub page_index: Option<usize>,
	/// Form to download; defaults to the first listed form.
	pub form_id: Option<FormId>,
	/// Leads to include.
	pub window: LeadWindow,
	/// Output format.
	pub format: ExportFormat,
}

/// Everything a pipeline run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineReport {
	/// Whether a new long-lived token was obtained during this run.
	pub converted: bool,
	/// Selected page.
	pub page: SelectedPage,
	/// Forms listed for the page.
	pub forms: LeadForms,
	/// Form the leads were downloaded from.
	pub form: LeadForm,
	/// Rendered download.
	pub export: LeadExport,
}

/// Runs the full export sequence with the configured pacing between steps.
#[derive(Debug)]
pub struct LeadPipeline<'a, C>
where
	C: GraphHttpClient,
{
	service: &'a LeadService<C>,
}
impl<'a, C> LeadPipeline<'a, C>
where
	C: GraphHttpClient,
{
	/// Creates a pipeline over `service`.
	pub fn new(service: &'a LeadService<C>) -> Self {
		Self { service }
	}

	/// Runs every step in order and stops at the first failure.
	pub async fn run(&self, request: PipelineRequest) -> Result<PipelineReport> {
		let pacing = self.service.pacing();

		pause(pacing.initial).await;

		let converted = if request.skip_convert {
			if self.service.resolver().resolve().await.long_lived_token.is_none() {
				return Err(Error::MissingToken { kind: TokenKind::LongLived });
			}

			false
		} else {
			self.service.convert_token().await?;

			true
		};

		tracing::info!(converted, "Pipeline step 1/4 complete: long-lived token ready.");
		pause(pacing.between_steps).await;

		let page = self
			.service
			.page_token(PageTokenRequest {
				long_lived_token: None,
				page_id: request.page_id.clone(),
				page_index: request.page_index,
			})
			.await?;

		tracing::info!(page_id = %page.page_id, "Pipeline step 2/4 complete: page selected.");
		pause(pacing.settle).await;

		let forms = self.service.lead_forms(Some(page.page_id.as_str()), None).await?;
		let form = pick_form(&forms, request.form_id.as_ref())?.clone();

		tracing::info!(
			form_id = %form.id,
			forms = forms.forms.len(),
			mock = forms.mock,
			"Pipeline step 3/4 complete: form selected."
		);

		let export = self.service.download_leads(&form.id, request.window, request.format).await?;

		tracing::info!(filename = %export.filename, "Pipeline step 4/4 complete: leads exported.");

		Ok(PipelineReport { converted, page, forms, form, export })
	}
}

fn pick_form<'a>(forms: &'a LeadForms, form_id: Option<&FormId>) -> Result<&'a LeadForm> {
	match form_id {
		Some(form_id) => forms
			.forms
			.iter()
			.find(|form| &form.id == form_id)
			.ok_or_else(|| Error::FormNotFound { form_id: form_id.to_string() }),
		None => forms
			.forms
			.first()
			.ok_or_else(|| Error::NoLeadForms { page_id: forms.page_id.to_string() }),
	}
}
