//! Graph API client for token exchange, page listing, lead forms, and leads.
//!
//! Every call runs inside a `leadgen_broker.graph` span and records attempt/success/failure
//! outcomes. Request URLs carry access tokens and are never logged.

pub mod endpoint;
pub mod model;

pub use endpoint::*;
pub use model::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	account::{FormId, Page, PageId, TokenSecret},
	error::TransientError,
	http::{GraphHttpClient, GraphResponse},
	obs::{self, CallOutcome, CallSpan, GraphCall},
};

/// Maximum number of lead pages followed for one download.
pub const MAX_LEAD_PAGES: usize = 100;

const BODY_PREVIEW_LIMIT: usize = 256;
const THROTTLING_CODES: [i64; 4] = [4, 17, 32, 613];

/// Typed Graph API client over a pluggable HTTP transport.
pub struct GraphClient<C>
where
	C: GraphHttpClient,
{
	http: Arc<C>,
	endpoints: GraphEndpoints,
}
impl<C> GraphClient<C>
where
	C: GraphHttpClient,
{
	/// Creates a client over `http` targeting `endpoints`.
	pub fn new(http: impl Into<Arc<C>>, endpoints: GraphEndpoints) -> Self {
		Self { http: http.into(), endpoints }
	}

	/// Returns the endpoints this client targets.
	pub fn endpoints(&self) -> &GraphEndpoints {
		&self.endpoints
	}

	/// Exchanges a short-lived user token for a long-lived one.
	pub async fn exchange_token(
		&self,
		app_id: &str,
		app_secret: &TokenSecret,
		short_lived: &TokenSecret,
	) -> Result<LongLivedToken> {
		let mut url = self.endpoints.url(["oauth", "access_token"]);

		url.query_pairs_mut()
			.append_pair("grant_type", "fb_exchange_token")
			.append_pair("client_id", app_id)
			.append_pair("client_secret", app_secret.expose())
			.append_pair("fb_exchange_token", short_lived.expose());

		self.fetch(GraphCall::ExchangeToken, url).await
	}

	/// Lists the pages managed by the long-lived token's user, with their page tokens.
	pub async fn list_pages(&self, long_lived: &TokenSecret) -> Result<Vec<Page>> {
		let url = self.with_token(
			self.endpoints.url([GraphEndpoints::PAGES_VERSION, "me", "accounts"]),
			long_lived,
		);
		let page: DataPage<Page> = self.fetch(GraphCall::ListPages, url).await?;

		Ok(page.data)
	}

	/// Reads the page's id and name, which validates that `page_token` works.
	pub async fn inspect_page(
		&self,
		page_id: &PageId,
		page_token: &TokenSecret,
	) -> Result<PageProfile> {
		let mut url = self.with_token(
			self.endpoints.url([GraphEndpoints::PAGES_VERSION, page_id.as_str()]),
			page_token,
		);

		url.query_pairs_mut().append_pair("fields", "id,name");

		self.fetch(GraphCall::InspectPage, url).await
	}

	/// Lists the page's lead-generation forms.
	pub async fn list_lead_forms(
		&self,
		page_id: &PageId,
		page_token: &TokenSecret,
	) -> Result<Vec<LeadForm>> {
		let url = self.with_token(
			self.endpoints.url([GraphEndpoints::FORMS_VERSION, page_id.as_str(), "leadgen_forms"]),
			page_token,
		);
		let page: DataPage<LeadForm> = self.fetch(GraphCall::ListLeadForms, url).await?;

		Ok(page.data)
	}

	/// Downloads every lead of `form_id` inside `window`, following pagination.
	pub async fn list_leads(
		&self,
		form_id: &FormId,
		page_token: &TokenSecret,
		window: LeadWindow,
	) -> Result<Vec<Lead>> {
		self.list_leads_at(form_id, page_token, window, OffsetDateTime::now_utc()).await
	}

	/// Same as [`GraphClient::list_leads`] with the window evaluated at `now`.
	pub async fn list_leads_at(
		&self,
		form_id: &FormId,
		page_token: &TokenSecret,
		window: LeadWindow,
		now: OffsetDateTime,
	) -> Result<Vec<Lead>> {
		let mut url = self.with_token(self.endpoints.url([form_id.as_str(), "leads"]), page_token);

		if let Some((min, max)) = window.bounds_at(now) {
			url.query_pairs_mut()
				.append_pair("filter[created_time_min]", &min)
				.append_pair("filter[created_time_max]", &max);
		}

		let mut leads = Vec::new();

		for _ in 0..MAX_LEAD_PAGES {
			let page: DataPage<Lead> = self.fetch(GraphCall::ListLeads, url).await?;
			let next = page.next().map(str::to_owned);

			leads.extend(page.data);

			let Some(next) = next else {
				return Ok(leads);
			};

			url = self.next_page_url(&next)?;
		}

		tracing::warn!(
			form_id = %form_id,
			pages = MAX_LEAD_PAGES,
			leads = leads.len(),
			"Lead pagination limit reached; returning the leads fetched so far."
		);

		Ok(leads)
	}

	fn with_token(&self, mut url: Url, token: &TokenSecret) -> Url {
		url.query_pairs_mut().append_pair("access_token", token.expose());

		url
	}

	fn next_page_url(&self, next: &str) -> Result<Url> {
		let url = Url::parse(next).map_err(|_| TransientError::Upstream {
			message: "pagination cursor is not a valid URL".into(),
			status: None,
		})?;

		if !self.endpoints.is_same_origin(&url) {
			return Err(TransientError::Upstream {
				message: "pagination cursor points outside the Graph API host".into(),
				status: None,
			}
			.into());
		}

		Ok(url)
	}

	async fn fetch<T>(&self, call: GraphCall, url: Url) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let span = CallSpan::new(call, "fetch");

		obs::record_call_outcome(call, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				let response =
					self.http.get(url).await.map_err(|e| self.http.map_transport_error(e))?;

				decode(call, &response)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(call, CallOutcome::Success),
			Err(e) => {
				obs::record_call_outcome(call, CallOutcome::Failure);

				tracing::warn!(call = call.as_str(), error = %e, "Graph call failed.");
			},
		}

		result
	}
}
impl<C> Clone for GraphClient<C>
where
	C: GraphHttpClient,
{
	fn clone(&self) -> Self {
		Self { http: Arc::clone(&self.http), endpoints: self.endpoints.clone() }
	}
}
impl<C> Debug for GraphClient<C>
where
	C: GraphHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GraphClient").field("base", &self.endpoints.base().as_str()).finish()
	}
}

fn decode<T>(call: GraphCall, response: &GraphResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	if !response.is_success() {
		return Err(classify_failure(call, response));
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::ResponseParse { source, status: Some(response.status) }.into()
	})
}

fn classify_failure(call: GraphCall, response: &GraphResponse) -> Error {
	let status = response.status;
	let envelope = serde_json::from_slice::<ErrorEnvelope>(&response.body).ok().map(|e| e.error);
	let code = envelope.as_ref().and_then(|body| body.code);

	if let Some(body) = &envelope {
		tracing::debug!(
			call = call.as_str(),
			status,
			code = ?body.code,
			kind = ?body.kind,
			subcode = ?body.error_subcode,
			fbtrace_id = ?body.fbtrace_id,
			"Graph API returned an error envelope."
		);
	}
	if status == 429 || code.is_some_and(|code| THROTTLING_CODES.contains(&code)) {
		return TransientError::RateLimited {
			status: Some(status),
			code,
			retry_after: response.retry_after,
		}
		.into();
	}

	match envelope {
		Some(body) => Error::Graph { status, code, message: body.message },
		None if status >= 500 => {
			TransientError::Upstream { message: body_preview(&response.body), status: Some(status) }
				.into()
		},
		None => Error::Graph { status, code: None, message: body_preview(&response.body) },
	}
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((cut, _)) => format!("{}...", &text[..cut]),
		None => text.to_owned(),
	}
}
