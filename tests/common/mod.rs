//! Shared fixtures for integration tests running against `httpmock` servers.

#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::MockServer;
// self
use leadgen_broker::{
	account::{Account, AccountId, FormId, Page, PageId, TokenSecret},
	config::{AppCredentials, Pacing},
	graph::{GraphClient, GraphEndpoints, LeadForm},
	http::ReqwestHttpClient,
	resolver::{PinnedCredentials, TokenCache, TokenResolver},
	service::LeadService,
	store::{AccountStore, MemoryStore},
};

pub type TestService = LeadService<ReqwestHttpClient>;

pub const APP_ID: &str = "app-id";
pub const APP_SECRET: &str = "app-secret";
pub const SHORT_LIVED: &str = "short-lived";

pub fn app_credentials() -> AppCredentials {
	AppCredentials {
		app_id: Some(APP_ID.into()),
		app_secret: Some(TokenSecret::new(APP_SECRET)),
		short_lived_token: Some(TokenSecret::new(SHORT_LIVED)),
	}
}

pub fn page_id(value: &str) -> PageId {
	PageId::new(value).expect("Page fixture should be valid.")
}

pub fn form_id(value: &str) -> FormId {
	FormId::new(value).expect("Form fixture should be valid.")
}

pub fn page(id: &str, token: &str) -> Page {
	Page::new(page_id(id), format!("Page {id}"), TokenSecret::new(token))
}

pub fn form(id: &str, name: &str) -> LeadForm {
	LeadForm { id: form_id(id), name: name.into(), status: None, created_time: None }
}

/// Account `acct-1` owning pages `101` and `202`.
pub fn account() -> Account {
	Account::new(AccountId::new("acct-1").expect("Account fixture should be valid."), "Main")
		.with_long_lived_token("stored-long")
		.with_page(page("101", "stored-101"))
		.with_page(page("202", "stored-202"))
}

pub fn endpoints(server: &MockServer) -> GraphEndpoints {
	GraphEndpoints::new(&server.base_url()).expect("Mock server base URL should be accepted.")
}

/// Reqwest transport that trusts the mock server's self-signed certificate.
pub fn http_client() -> ReqwestHttpClient {
	let client = reqwest::Client::builder()
		.timeout(Duration::from_secs(5))
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Insecure reqwest client should build for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn graph(server: &MockServer) -> GraphClient<ReqwestHttpClient> {
	GraphClient::new(http_client(), endpoints(server))
}

/// Builds a service over an in-memory store seeded with `accounts`, with no pacing delays.
pub fn service(
	server: &MockServer,
	accounts: impl IntoIterator<Item = Account>,
	pinned: PinnedCredentials,
) -> (TestService, Arc<MemoryStore>) {
	let backend = Arc::new(MemoryStore::with_accounts(accounts));
	let store: Arc<dyn AccountStore> = backend.clone();
	let resolver = TokenResolver::new(store, TokenCache::default(), pinned);
	let service = LeadService::new(resolver, graph(server), app_credentials(), Pacing::immediate());

	(service, backend)
}

pub fn pages_body(pages: &[(&str, &str)]) -> serde_json::Value {
	serde_json::json!({
		"data": pages
			.iter()
			.map(|(id, token)| serde_json::json!({
				"id": id,
				"name": format!("Page {id}"),
				"access_token": token,
			}))
			.collect::<Vec<_>>(),
	})
}
