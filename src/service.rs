//! Lead operations combining the token resolver with the Graph client.
//!
//! Each operation resolves the current tokens, performs its Graph calls, and records whatever
//! new tokens it obtained through [`TokenResolver::update`].

// self
use crate::{
	_prelude::*,
	account::{FormId, Page, PageId, TokenSecret},
	config::{AppCredentials, Pacing, pause},
	error::TokenKind,
	export::{ExportFormat, LeadExport},
	graph::{GraphClient, LeadForm, LeadWindow},
	http::GraphHttpClient,
	resolver::{TokenResolver, TokenUpdate},
};
#[cfg(feature = "reqwest")]
use crate::{
	config::Config,
	error::ConfigError,
	http::ReqwestHttpClient,
	resolver::TokenCache,
	store::{AccountStore, FileStore},
};

#[cfg(feature = "reqwest")]
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Input of [`LeadService::page_token`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTokenRequest {
	/// Long-lived token to use instead of the resolved one.
	#[serde(default)]
	pub long_lived_token: Option<TokenSecret>,
	/// Page to select by id.
	#[serde(default)]
	pub page_id: Option<String>,
	/// Page to select by position when no id is given.
	#[serde(default)]
	pub page_index: Option<usize>,
}

/// Long-lived token returned by [`LeadService::convert_token`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedToken {
	/// Newly issued long-lived token.
	pub long_lived_token: TokenSecret,
}

/// Page chosen by [`LeadService::page_token`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPage {
	/// Page token issued for the page.
	pub page_token: TokenSecret,
	/// Page identifier.
	pub page_id: PageId,
	/// Page display name.
	pub page_name: String,
	/// Index recorded in the token cache; `None` when the account does not register the page.
	#[serde(skip)]
	pub page_index: Option<usize>,
}

/// Token readiness without token values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
	/// Page the page token belongs to.
	pub page_id: Option<PageId>,
	/// Whether a page token is available.
	pub has_page_token: bool,
	/// Whether a long-lived token is available.
	pub has_long_lived_token: bool,
	/// Selected page index.
	pub page_index: Option<usize>,
}

/// Lead forms of one page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadForms {
	/// Page the forms belong to.
	pub page_id: PageId,
	/// Forms in Graph order.
	pub forms: Vec<LeadForm>,
	/// `true` when the forms are configured fallbacks, not live Graph data.
	#[serde(rename = "isMockData", skip_serializing_if = "std::ops::Not::not")]
	pub mock: bool,
}

/// Lead operations over one resolver and Graph client.
pub struct LeadService<C>
where
	C: GraphHttpClient,
{
	resolver: TokenResolver,
	graph: GraphClient<C>,
	credentials: AppCredentials,
	pacing: Pacing,
}
impl<C> LeadService<C>
where
	C: GraphHttpClient,
{
	/// Creates a service.
	pub fn new(
		resolver: TokenResolver,
		graph: GraphClient<C>,
		credentials: AppCredentials,
		pacing: Pacing,
	) -> Self {
		Self { resolver, graph, credentials, pacing }
	}

	/// Token resolver shared by every operation.
	pub fn resolver(&self) -> &TokenResolver {
		&self.resolver
	}

	/// Graph client used for outbound calls.
	pub fn graph(&self) -> &GraphClient<C> {
		&self.graph
	}

	/// Configured request pacing.
	pub fn pacing(&self) -> Pacing {
		self.pacing
	}

	/// Exchanges the configured short-lived token and records the long-lived result.
	pub async fn convert_token(&self) -> Result<ConvertedToken> {
		let (app_id, app_secret, short_lived) = self.credentials.require()?;
		let exchanged = self.graph.exchange_token(app_id, app_secret, short_lived).await?;

		if exchanged.access_token.is_empty() {
			return Err(Error::MissingToken { kind: TokenKind::LongLived });
		}

		let report = self
			.resolver
			.update(TokenUpdate::default().with_long_lived_token(exchanged.access_token.expose()))
			.await?;

		tracing::info!(
			account = ?report.account_id,
			expires_at = ?report.long_lived_expiry,
			"Stored long-lived token."
		);

		Ok(ConvertedToken { long_lived_token: exchanged.access_token })
	}

	/// Picks a managed page, records its token, and validates it with a page read.
	///
	/// Selection prefers `page_id`, then an in-range `page_index`, then the first page.
	pub async fn page_token(&self, request: PageTokenRequest) -> Result<SelectedPage> {
		let long_lived = match request.long_lived_token.filter(|token| !token.is_empty()) {
			Some(token) => token,
			None => self
				.resolver
				.resolve()
				.await
				.long_lived_token
				.ok_or(Error::MissingToken { kind: TokenKind::LongLived })?,
		};
		let account =
			self.resolver.store().current_account().await?.ok_or(Error::NoCurrentAccount)?;
		let pages = self.graph.list_pages(&long_lived).await?;
		let page = select_page(&pages, request.page_id.as_deref(), request.page_index)?;
		let page_token =
			page.token().cloned().ok_or(Error::MissingToken { kind: TokenKind::Page })?;
		let page_index = account.pages.iter().position(|registered| registered.id == page.id);
		let update = TokenUpdate::default()
			.with_page_token(page_token.expose())
			.with_page_id(page.id.clone())
			.with_long_lived_token(long_lived.expose());
		let update = match page_index {
			Some(index) => update.with_page_index(index),
			None => update.without_page_index(),
		};
		let report = self.resolver.update(update).await?;

		tracing::info!(
			account = %account.id,
			page_id = %page.id,
			page_persisted = report.page_persisted,
			"Stored page token."
		);

		match self.graph.inspect_page(&page.id, &page_token).await {
			Ok(profile) => tracing::debug!(page_id = %profile.id, "Page token validated."),
			Err(e) => tracing::warn!(page_id = %page.id, error = %e, "Page token validation failed."),
		}

		Ok(SelectedPage {
			page_token,
			page_id: page.id.clone(),
			page_name: page.name.clone(),
			page_index,
		})
	}

	/// Reports which tokens are available, never their values.
	pub async fn token_status(&self) -> TokenStatus {
		let tokens = self.resolver.resolve().await;

		TokenStatus {
			has_page_token: tokens.page_token.is_some(),
			has_long_lived_token: tokens.long_lived_token.is_some(),
			page_id: tokens.page_id,
			page_index: tokens.page_index,
		}
	}

	/// Lists the forms of the selected page.
	///
	/// A `requested_page_id` different from the selected page is rejected. When the Graph call
	/// fails for a pinned page with fallback forms, those are returned with `mock` set.
	pub async fn lead_forms(
		&self,
		requested_page_id: Option<&str>,
		access_token: Option<TokenSecret>,
	) -> Result<LeadForms> {
		let tokens = self.resolver.resolve().await;

		if let Some(requested) = requested_page_id
			&& tokens.page_id.as_deref() != Some(requested)
		{
			return Err(Error::PageMismatch {
				current: tokens.page_id.map(|id| id.to_string()),
				requested: requested.to_owned(),
			});
		}

		let page_id = tokens.page_id.ok_or(Error::NoPageSelected)?;
		let token = access_token
			.filter(|token| !token.is_empty())
			.or(tokens.page_token)
			.ok_or(Error::MissingToken { kind: TokenKind::Page })?;

		pause(self.pacing.request).await;

		match self.graph.list_lead_forms(&page_id, &token).await {
			Ok(forms) => Ok(LeadForms { page_id, forms, mock: false }),
			Err(e) => match self.resolver.pinned().fallback_forms(&page_id) {
				Some(forms) => {
					tracing::warn!(
						page_id = %page_id,
						error = %e,
						"Listing forms failed for a pinned page; serving fallback forms."
					);

					pause(self.pacing.fallback).await;

					Ok(LeadForms { page_id, forms: forms.to_vec(), mock: true })
				},
				None => Err(e),
			},
		}
	}

	/// Lists forms for an explicit page and token, bypassing the resolver.
	pub async fn direct_lead_forms(
		&self,
		page_id: Option<&str>,
		access_token: Option<TokenSecret>,
	) -> Result<LeadForms> {
		let page_id = page_id
			.filter(|id| !id.is_empty())
			.ok_or(Error::MissingParameter { name: "pageId" })?;
		let page_id = PageId::new(page_id)?;
		let token = access_token
			.filter(|token| !token.is_empty())
			.ok_or(Error::MissingParameter { name: "access_token" })?;

		pause(self.pacing.request).await;

		match self.graph.list_lead_forms(&page_id, &token).await {
			Ok(forms) => Ok(LeadForms { page_id, forms, mock: false }),
			Err(e) => {
				pause(self.pacing.fallback).await;

				Err(e)
			},
		}
	}

	/// Downloads the leads of `form_id` with the resolved page token and renders them.
	pub async fn download_leads(
		&self,
		form_id: &FormId,
		window: LeadWindow,
		format: ExportFormat,
	) -> Result<LeadExport> {
		let token = self
			.resolver
			.resolve()
			.await
			.page_token
			.ok_or(Error::MissingToken { kind: TokenKind::Page })?;
		let leads = self.graph.list_leads(form_id, &token, window).await?;
		let export = LeadExport::render(form_id, window, format, &leads)?;

		tracing::info!(
			form_id = %form_id,
			window = window.label(),
			leads = export.lead_count,
			"Rendered lead export."
		);

		Ok(export)
	}
}
#[cfg(feature = "reqwest")]
impl LeadService<ReqwestHttpClient> {
	/// Builds a service over the account file, a reqwest transport, and the settings in `config`.
	pub fn from_config(config: &Config) -> Result<Self> {
		let store: Arc<dyn AccountStore> =
			Arc::new(FileStore::open(config.accounts_path.clone())?);
		let resolver = TokenResolver::new(
			store,
			TokenCache::new(config.initial_cache()),
			config.pinned.clone(),
		);
		let client = ReqwestClient::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(ConfigError::from)?;
		let graph =
			GraphClient::new(ReqwestHttpClient::with_client(client), config.endpoints.clone());

		tracing::info!(
			accounts = %config.accounts_path.display(),
			pinned_pages = config.pinned.len(),
			"Lead service configured."
		);

		Ok(Self::new(resolver, graph, config.credentials.clone(), config.pacing))
	}
}
impl<C> Debug for LeadService<C>
where
	C: GraphHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LeadService")
			.field("resolver", &self.resolver)
			.field("graph", &self.graph)
			.field("pacing", &self.pacing)
			.finish()
	}
}

/// Picks a page by id, then by in-range index, then the first one.
pub fn select_page<'a>(
	pages: &'a [Page],
	page_id: Option<&str>,
	page_index: Option<usize>,
) -> Result<&'a Page> {
	let first = pages.first().ok_or(Error::NoPages)?;

	if let Some(page_id) = page_id.filter(|id| !id.is_empty()) {
		return pages
			.iter()
			.find(|page| page.id.as_str() == page_id)
			.ok_or_else(|| Error::PageNotFound { page_id: page_id.to_owned() });
	}

	Ok(page_index.and_then(|index| pages.get(index)).unwrap_or(first))
}
