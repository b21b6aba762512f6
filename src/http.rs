//! Transport primitives for Graph API reads.
//!
//! The module exposes [`GraphHttpClient`] alongside [`GraphResponse`] so callers can swap the
//! HTTP stack without touching the Graph client. Implementations return the raw status, body, and
//! any `Retry-After` hint; classification into crate errors happens in [`crate::graph`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransientError};

/// Boxed future returned by [`GraphHttpClient`] implementations.
pub type HttpFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of issuing Graph API `GET` requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back every service
/// instance, and the futures they return must be `Send` so request handlers can hop executors.
pub trait GraphHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Issues a `GET` request and buffers the full response.
	///
	/// Non-success statuses are returned as responses, not errors.
	fn get(&self, url: Url) -> HttpFuture<'_, GraphResponse, Self::TransportError>;

	/// Maps a transport failure into the crate error.
	fn map_transport_error(&self, err: Self::TransportError) -> Error {
		TransportError::network(err).into()
	}
}

/// Buffered HTTP response handed to the Graph client.
#[derive(Clone, Debug, Default)]
pub struct GraphResponse {
	/// HTTP status code.
	pub status: u16,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl GraphResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl GraphHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn get(&self, url: Url) -> HttpFuture<'_, GraphResponse, Self::TransportError> {
		Box::pin(async move {
			let response = self.0.get(url).send().await?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(GraphResponse { status, retry_after, body })
		})
	}

	fn map_transport_error(&self, err: Self::TransportError) -> Error {
		map_reqwest_error(err)
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Upstream {
			message: "Request timed out while calling the Graph API".into(),
			status: err.status().map(|code| code.as_u16()),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
