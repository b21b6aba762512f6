//! Environment-driven configuration.

// std
use std::{path::PathBuf, time::Duration as StdDuration};
// self
use crate::{
	_prelude::*,
	account::{PageId, TokenSecret},
	error::ConfigError,
	graph::{GraphEndpoints, LeadForm},
	resolver::{PinnedCredentials, ResolvedTokenSet},
};

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default account file location.
pub const DEFAULT_ACCOUNTS_PATH: &str = "data/accounts.json";

/// App credentials used for the token exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppCredentials {
	/// `FACEBOOK_APP_ID`.
	pub app_id: Option<String>,
	/// `FACEBOOK_APP_SECRET`.
	pub app_secret: Option<TokenSecret>,
	/// `FACEBOOK_SHORT_LIVED_TOKEN`.
	pub short_lived_token: Option<TokenSecret>,
}
impl AppCredentials {
	/// Returns `(app_id, app_secret, short_lived_token)` or names the first missing variable.
	pub fn require(&self) -> Result<(&str, &TokenSecret, &TokenSecret), ConfigError> {
		let app_id = self
			.app_id
			.as_deref()
			.ok_or(ConfigError::MissingCredential { name: "FACEBOOK_APP_ID" })?;
		let app_secret = self
			.app_secret
			.as_ref()
			.ok_or(ConfigError::MissingCredential { name: "FACEBOOK_APP_SECRET" })?;
		let short_lived = self
			.short_lived_token
			.as_ref()
			.ok_or(ConfigError::MissingCredential { name: "FACEBOOK_SHORT_LIVED_TOKEN" })?;

		Ok((app_id, app_secret, short_lived))
	}
}

/// Delays inserted between Graph calls to stay under rate limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
	/// Wait before the first pipeline step.
	pub initial: StdDuration,
	/// Wait between token conversion and page selection (`FLOW_DELAY_MS`).
	pub between_steps: StdDuration,
	/// Wait between page selection and form listing.
	pub settle: StdDuration,
	/// Wait before each form listing request (`REQUEST_DELAY_MS`).
	pub request: StdDuration,
	/// Wait before serving fallback forms.
	pub fallback: StdDuration,
}
impl Pacing {
	/// Disables every delay; used by tests and batch exports.
	pub const fn immediate() -> Self {
		Self {
			initial: StdDuration::ZERO,
			between_steps: StdDuration::ZERO,
			settle: StdDuration::ZERO,
			request: StdDuration::ZERO,
			fallback: StdDuration::ZERO,
		}
	}
}
impl Default for Pacing {
	fn default() -> Self {
		Self {
			initial: StdDuration::from_millis(1_000),
			between_steps: StdDuration::from_millis(1_500),
			settle: StdDuration::from_millis(1_000),
			request: StdDuration::from_millis(2_000),
			fallback: StdDuration::from_millis(500),
		}
	}
}

/// Sleeps for `delay` unless it is zero.
pub async fn pause(delay: StdDuration) {
	if !delay.is_zero() {
		tokio::time::sleep(delay).await;
	}
}

/// Application configuration, loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
	/// `HOST`.
	pub host: String,
	/// `PORT`.
	pub port: u16,
	/// `ACCOUNTS_PATH`.
	pub accounts_path: PathBuf,
	/// `GRAPH_BASE_URL`, validated.
	pub endpoints: GraphEndpoints,
	/// Token exchange credentials.
	pub credentials: AppCredentials,
	/// `FACEBOOK_PAGE_ID` + `FACEBOOK_PAGE_TOKEN`, seeding the token cache.
	pub seed_page: Option<(PageId, TokenSecret)>,
	/// `PINNED_PAGE_TOKENS` plus `PINNED_FALLBACK_FORMS_PATH`.
	pub pinned: PinnedCredentials,
	/// `FLOW_DELAY_MS` and `REQUEST_DELAY_MS`.
	pub pacing: Pacing,
}
impl Config {
	/// Loads `.env` (if present) and reads the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		if let Err(e) = dotenvy::dotenv()
			&& !e.not_found()
		{
			tracing::warn!(error = %e, "Failed to load .env file.");
		}

		Self::from_vars(|name| std::env::var(name).ok())
	}

	/// Builds the configuration from `lookup`; blank values count as unset.
	pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| {
			lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
		};
		let port = match var("PORT") {
			Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
				name: "PORT",
				reason: format!("`{raw}` is not a port"),
			})?,
			None => DEFAULT_PORT,
		};
		let endpoints = GraphEndpoints::new(
			var("GRAPH_BASE_URL").as_deref().unwrap_or(GraphEndpoints::DEFAULT_BASE),
		)?;
		let seed_page = match (var("FACEBOOK_PAGE_ID"), var("FACEBOOK_PAGE_TOKEN")) {
			(Some(id), Some(token)) => Some((PageId::new(id)?, TokenSecret::new(token))),
			_ => None,
		};
		let mut pinned = PinnedCredentials::parse(&var("PINNED_PAGE_TOKENS").unwrap_or_default())?;

		if let Some(path) = var("PINNED_FALLBACK_FORMS_PATH") {
			for (page_id, forms) in load_fallback_forms(&path)? {
				pinned = pinned.with_fallback_forms(&page_id, forms);
			}
		}

		let mut pacing = Pacing::default();

		if let Some(ms) = delay_var(&var, "FLOW_DELAY_MS")? {
			pacing.between_steps = ms;
		}
		if let Some(ms) = delay_var(&var, "REQUEST_DELAY_MS")? {
			pacing.request = ms;
		}

		Ok(Self {
			host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
			port,
			accounts_path: var("ACCOUNTS_PATH")
				.unwrap_or_else(|| DEFAULT_ACCOUNTS_PATH.into())
				.into(),
			endpoints,
			credentials: AppCredentials {
				app_id: var("FACEBOOK_APP_ID"),
				app_secret: var("FACEBOOK_APP_SECRET").map(TokenSecret::new),
				short_lived_token: var("FACEBOOK_SHORT_LIVED_TOKEN").map(TokenSecret::new),
			},
			seed_page,
			pinned,
			pacing,
		})
	}

	/// Token cache contents at startup.
	pub fn initial_cache(&self) -> ResolvedTokenSet {
		match &self.seed_page {
			Some((page_id, token)) => ResolvedTokenSet {
				page_token: Some(token.clone()),
				page_id: Some(page_id.clone()),
				..Default::default()
			},
			None => ResolvedTokenSet::default(),
		}
	}

	/// `host:port` for the HTTP listener.
	pub fn bind_address(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

fn delay_var<F>(var: &F, name: &'static str) -> Result<Option<StdDuration>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	var(name)
		.map(|raw| {
			raw.parse::<u64>().map(StdDuration::from_millis).map_err(|_| ConfigError::InvalidVar {
				name,
				reason: format!("`{raw}` is not a number of milliseconds"),
			})
		})
		.transpose()
}

fn load_fallback_forms(path: &str) -> Result<BTreeMap<String, Vec<LeadForm>>, ConfigError> {
	let fallback_error = |message: String| ConfigError::FallbackForms { path: path.into(), message };
	let raw = std::fs::read(path).map_err(|e| fallback_error(e.to_string()))?;

	serde_json::from_slice(&raw).map_err(|e| fallback_error(e.to_string()))
}
