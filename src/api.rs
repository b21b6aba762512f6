//! JSON HTTP API over [`LeadService`].
//!
//! Failures render as `{"success": false, "error": message}` with a status derived from the
//! error kind; successful payloads carry `"success": true` next to their fields.

// crates.io
use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderValue, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post, put},
};
use serde_json::json;
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	account::{
		Account, AccountId, AccountSummary, FormId, LongLivedTokenUpdate, Page, TokenSecret,
	},
	error::{ConfigError, TransientError},
	export::{ExportError, ExportFormat},
	graph::LeadWindow,
	http::GraphHttpClient,
	service::{LeadService, PageTokenRequest},
	store::StoreError,
};

type SharedService<C> = Arc<LeadService<C>>;

/// Error wrapper rendering [`Error`] as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub Error);
impl ApiError {
	/// HTTP status used for the wrapped error.
	pub fn status(&self) -> StatusCode {
		status_for(&self.0)
	}
}
impl<E> From<E> for ApiError
where
	E: Into<Error>,
{
	fn from(e: E) -> Self {
		Self(e.into())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), error = %self.0, "Request failed.");
		} else {
			tracing::debug!(status = status.as_u16(), error = %self.0, "Request rejected.");
		}

		let retry_after = match &self.0 {
			Error::Transient(TransientError::RateLimited { retry_after: Some(delay), .. }) =>
				HeaderValue::from_str(&delay.whole_seconds().max(0).to_string()).ok(),
			_ => None,
		};
		let mut response =
			(status, Json(json!({ "success": false, "error": self.0.to_string() }))).into_response();

		if let Some(value) = retry_after {
			response.headers_mut().insert(header::RETRY_AFTER, value);
		}

		response
	}
}

/// Maps an error to the HTTP status reported to clients.
pub fn status_for(error: &Error) -> StatusCode {
	match error {
		Error::Storage(StoreError::UnknownAccount { .. }) => StatusCode::NOT_FOUND,
		Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
		Error::Config(ConfigError::HttpClientBuild { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
		Error::Config(_) => StatusCode::BAD_REQUEST,
		Error::Transient(TransientError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
		Error::Transient(TransientError::Upstream { status: Some(status), .. }) =>
			upstream_status(*status),
		Error::Transient(_) | Error::Transport(_) => StatusCode::BAD_GATEWAY,
		Error::Export(ExportError::UnsupportedFormat { .. }) => StatusCode::BAD_REQUEST,
		Error::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
		Error::Graph { status, .. } => upstream_status(*status),
		Error::InvalidIdentifier(_)
		| Error::MissingToken { .. }
		| Error::MissingParameter { .. }
		| Error::NoPageSelected
		| Error::NoCurrentAccount
		| Error::PageMismatch { .. } => StatusCode::BAD_REQUEST,
		Error::NoPages
		| Error::PageNotFound { .. }
		| Error::FormNotFound { .. }
		| Error::NoLeadForms { .. } => StatusCode::NOT_FOUND,
	}
}

fn upstream_status(status: u16) -> StatusCode {
	StatusCode::from_u16(status)
		.ok()
		.filter(|status| status.is_client_error() || status.is_server_error())
		.unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Success payload `{"success": true, ...fields}`.
#[derive(Debug, Serialize)]
struct Success<T> {
	success: bool,
	#[serde(flatten)]
	body: T,
}

fn success<T>(body: T) -> Json<Success<T>> {
	Json(Success { success: true, body })
}

/// Query of `GET /api/fetch-lead-forms` and `GET /api/direct-fetch-forms`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormsQuery {
	/// Page to list forms for.
	#[serde(default)]
	pub page_id: Option<String>,
	/// Token overriding the resolved page token.
	#[serde(default, rename = "access_token")]
	pub access_token: Option<TokenSecret>,
}

/// Body of `POST /api/download-leads`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
	/// Form to download.
	#[serde(default)]
	pub form_id: Option<String>,
	/// Restrict the download to the previous UTC day.
	#[serde(default)]
	pub only_yesterday: bool,
	/// Output format; CSV when omitted.
	#[serde(default)]
	pub format: Option<ExportFormat>,
}

/// Body of `PUT /api/accounts/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
	/// Human-readable label.
	pub name: String,
	/// Long-lived token; stamped with a fresh expiry when present.
	#[serde(default)]
	pub long_lived_token: Option<TokenSecret>,
	/// Pages managed through the account.
	#[serde(default)]
	pub pages: Vec<Page>,
}

/// Builds the API router over `service`.
pub fn router<C>(service: SharedService<C>) -> Router
where
	C: GraphHttpClient,
{
	Router::new()
		.route("/health", get(health))
		.route("/api/convert-token", get(convert_token::<C>))
		.route("/api/get-page-token", get(page_token::<C>))
		.route("/api/get-tokens", get(token_status::<C>))
		.route("/api/fetch-lead-forms", get(lead_forms::<C>))
		.route("/api/direct-fetch-forms", get(direct_lead_forms::<C>))
		.route("/api/download-leads", post(download_leads::<C>))
		.route("/api/accounts", get(list_accounts::<C>))
		.route("/api/accounts/{id}", put(save_account::<C>))
		.route("/api/accounts/{id}/select", post(select_account::<C>))
		.with_state(service)
}

/// Binds `address` and serves the API until the process exits.
pub async fn serve<C>(service: SharedService<C>, address: &str) -> std::io::Result<()>
where
	C: GraphHttpClient,
{
	let listener = TcpListener::bind(address).await?;

	tracing::info!(address = %listener.local_addr()?, "Listening.");

	axum::serve(listener, router(service)).await
}

async fn health() -> Json<serde_json::Value> {
	Json(json!({ "status": "ok" }))
}

async fn convert_token<C>(State(service): State<SharedService<C>>) -> Result<Response, ApiError>
where
	C: GraphHttpClient,
{
	Ok(success(service.convert_token().await?).into_response())
}

async fn page_token<C>(
	State(service): State<SharedService<C>>,
	Query(request): Query<PageTokenRequest>,
) -> Result<Response, ApiError>
where
	C: GraphHttpClient,
{
	Ok(success(service.page_token(request).await?).into_response())
}

async fn token_status<C>(State(service): State<SharedService<C>>) -> Response
where
	C: GraphHttpClient,
{
	Json(service.token_status().await).into_response()
}

async fn lead_forms<C>(
	State(service): State<SharedService<C>>,
	Query(query): Query<FormsQuery>,
) -> Result<Response, ApiError>
where
	C: GraphHttpClient,
{
	let forms = service.lead_forms(query.page_id.as_deref(), query.access_token).await?;

	Ok(success(forms).into_response())
}

async fn direct_lead_forms<C>(
	State(service): State<SharedService<C>>,
	Query(query): Query<FormsQuery>,
) -> Result<Response, ApiError>
where
	C: GraphHttpClient,
{
	let forms = service.direct_lead_forms(query.page_id.as_deref(), query.access_token).await?;

	Ok(Json(json!({
		"success": true,
		"forms": forms.forms,
		"pageId": forms.page_id,
		"directFetch": true,
	}))
	.into_response())
}

async fn download_leads<C>(
	State(service): State<SharedService<C>>,
	Json(request): Json<DownloadRequest>,
) -> Result<Response, ApiError>
where
	C: GraphHttpClient,
{
	let form_id = request
		.form_id
		.filter(|id| !id.is_empty())
		.ok_or(Error::MissingParameter { name: "formId" })?
		.parse::<FormId>()
		.map_err(Error::from)?;
	let export = service
		.download_leads(
			&form_id,
			LeadWindow::from_flag(request.only_yesterday),
			request.format.unwrap_or_default(),
		)
		.await?;
	let disposition = HeaderValue::from_str(&export.content_disposition()).ok();
	let mut response =
		([(header::CONTENT_TYPE, HeaderValue::from_static(export.content_type))], export.body)
			.into_response();

	if let Some(disposition) = disposition {
		response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
	}

	Ok(response)
}

async fn list_accounts<C>(
	State(service): State<SharedService<C>>,
) -> Result<Json<Vec<AccountSummary>>, ApiError>
where
	C: GraphHttpClient,
{
	let store = service.resolver().store();
	let current = store.current_account().await?.map(|account| account.id);
	let accounts = store.list_accounts().await?;

	Ok(Json(
		accounts
			.iter()
			.map(|account| account.summary(current.as_ref() == Some(&account.id)))
			.collect(),
	))
}

async fn save_account<C>(
	State(service): State<SharedService<C>>,
	Path(id): Path<String>,
	Json(input): Json<AccountInput>,
) -> Result<Json<AccountSummary>, ApiError>
where
	C: GraphHttpClient,
{
	let id = AccountId::new(id).map_err(Error::from)?;
	let mut account = Account::new(id, input.name);

	for page in input.pages {
		account = account.with_page(page);
	}
	if let Some(token) = input.long_lived_token.filter(|token| !token.is_empty()) {
		account.apply_tokens(LongLivedTokenUpdate::issued_at(token, OffsetDateTime::now_utc()));
	}

	let store = service.resolver().store();

	store.save_account(account.clone()).await?;

	let current = store.current_account().await?.is_some_and(|current| current.id == account.id);

	Ok(Json(account.summary(current)))
}

async fn select_account<C>(
	State(service): State<SharedService<C>>,
	Path(id): Path<String>,
) -> Result<Response, ApiError>
where
	C: GraphHttpClient,
{
	let id = AccountId::new(id).map_err(Error::from)?;

	service.resolver().store().set_current_account(&id).await?;

	tracing::info!(account = %id, "Selected account.");

	Ok(success(json!({ "currentAccountId": id })).into_response())
}
