//! Graph API base URL validation and request URL construction.

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{_prelude::*, error::ConfigError};

/// Validated Graph API base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphEndpoints {
	base: Url,
}
impl GraphEndpoints {
	/// Production Graph API host.
	pub const DEFAULT_BASE: &str = "https://graph.facebook.com";
	/// Version used for page listing and page reads.
	pub const PAGES_VERSION: &str = "v19.0";
	/// Version used for lead-form listing.
	pub const FORMS_VERSION: &str = "v18.0";

	/// Parses and validates `base`; non-HTTPS bases are accepted only for loopback hosts.
	pub fn new(base: &str) -> Result<Self, ConfigError> {
		let base = Url::parse(base).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if base.cannot_be_a_base() {
			return Err(ConfigError::InvalidVar {
				name: "GRAPH_BASE_URL",
				reason: "the URL cannot carry a path".into(),
			});
		}
		if base.scheme() != "https" && !is_loopback(&base) {
			return Err(ConfigError::InsecureEndpoint { url: base.to_string() });
		}

		Ok(Self { base })
	}

	/// Returns the validated base URL.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Builds `{base}/{segments...}` with each segment percent-encoded.
	pub fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
		let mut url = self.base.clone();

		url.set_query(None);

		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}

		url
	}

	/// Returns `true` when `url` shares the scheme, host, and port of the base URL.
	pub fn is_same_origin(&self, url: &Url) -> bool {
		url.origin() == self.base.origin()
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}
