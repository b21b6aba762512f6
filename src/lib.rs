//! Exchange Graph API tokens, pick a managed page, and export its lead-generation submissions.
//!
//! The crate centers on [`resolver::TokenResolver`], which decides which long-lived and page
//! token apply to the next Graph call by combining the current account from an
//! [`store::AccountStore`], a shared [`resolver::TokenCache`], and pinned page credentials.
//! [`service::LeadService`] builds the token conversion, page selection, form listing, and lead
//! download operations on top of it; [`flow::LeadPipeline`] chains them, and the `server`
//! feature exposes them as a JSON API and CLI.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod account;
#[cfg(feature = "server")] pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod flow;
pub mod graph;
pub mod http;
pub mod obs;
pub mod resolver;
pub mod service;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		account::{Account, TokenSecret},
		config::{AppCredentials, Pacing},
		graph::{GraphClient, GraphEndpoints},
		http::ReqwestHttpClient,
		resolver::{PinnedCredentials, TokenCache, TokenResolver},
		service::LeadService,
		store::{AccountStore, MemoryStore},
	};

	/// Service type alias used by reqwest-backed tests.
	pub type ReqwestTestService = LeadService<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that trusts the self-signed certificates of `httpmock` servers.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.timeout(std::time::Duration::from_secs(5))
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// App credentials matching the query parameters expected by token exchange mocks.
	pub fn test_app_credentials() -> AppCredentials {
		AppCredentials {
			app_id: Some("app-id".into()),
			app_secret: Some(TokenSecret::new("app-secret")),
			short_lived_token: Some(TokenSecret::new("short-lived")),
		}
	}

	/// Constructs a [`LeadService`] over an in-memory store seeded with `accounts`, targeting
	/// `base_url` with no pacing delays.
	pub fn build_reqwest_test_service(
		base_url: &str,
		accounts: impl IntoIterator<Item = Account>,
		pinned: PinnedCredentials,
	) -> (ReqwestTestService, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::with_accounts(accounts));
		let store: Arc<dyn AccountStore> = store_backend.clone();
		let resolver = TokenResolver::new(store, TokenCache::default(), pinned);
		let endpoints =
			GraphEndpoints::new(base_url).expect("Mock server base URL should be accepted.");
		let graph = GraphClient::new(test_reqwest_http_client(), endpoints);
		let service =
			LeadService::new(resolver, graph, test_app_credentials(), Pacing::immediate());

		(service, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "server")] use {clap as _, color_eyre as _, tracing_subscriber as _};
#[cfg(all(test, not(feature = "reqwest")))] use httpmock as _;
