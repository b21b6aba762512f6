//! Crate-level error types shared across the resolver, store, Graph client, and service.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Which token a caller found missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// Long-lived user token.
	LongLived,
	/// Page-scoped token.
	Page,
}
impl TokenKind {
	/// Returns a stable label for messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::LongLived => "long-lived",
			TokenKind::Page => "page",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Lead export could not be produced.
	#[error(transparent)]
	Export(#[from] crate::export::ExportError),

	/// Graph API rejected the request.
	#[error("Graph API rejected the request ({status}): {message}.")]
	Graph {
		/// HTTP status code.
		status: u16,
		/// Graph error code, when the response carried an error envelope.
		code: Option<i64>,
		/// Graph-supplied message or a body preview.
		message: String,
	},
	/// A required token has not been obtained yet.
	#[error("No {kind} token is available.")]
	MissingToken {
		/// Token that was missing.
		kind: TokenKind,
	},
	/// A caller-supplied identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::account::IdentifierError),
	/// A required request parameter was absent.
	#[error("Missing required parameter `{name}`.")]
	MissingParameter {
		/// Parameter name as exposed to callers.
		name: &'static str,
	},
	/// No page has been selected yet.
	#[error("No page is selected; get a page token first.")]
	NoPageSelected,
	/// No account is selected or stored.
	#[error("No account selected or available.")]
	NoCurrentAccount,
	/// The long-lived token manages no pages.
	#[error("No pages found for the long-lived token.")]
	NoPages,
	/// The requested page is not managed by the long-lived token.
	#[error("Page with ID {page_id} not found.")]
	PageNotFound {
		/// Requested page identifier.
		page_id: String,
	},
	/// The cached page token belongs to a different page than the one requested.
	#[error(
		"Page ID mismatch. Current: {}, Requested: {requested}. Please get a new page token first.",
		current.as_deref().unwrap_or("")
	)]
	PageMismatch {
		/// Page the cached token belongs to.
		current: Option<String>,
		/// Page the caller asked for.
		requested: String,
	},
	/// The requested form is not listed for the selected page.
	#[error("Form with ID {form_id} not found.")]
	FormNotFound {
		/// Requested form identifier.
		form_id: String,
	},
	/// The page has no lead-generation forms to export from.
	#[error("Page {page_id} has no lead-generation forms.")]
	NoLeadForms {
		/// Page identifier.
		page_id: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Graph base URL cannot be parsed.
	#[error("Graph base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Graph base URL is not HTTPS and not a loopback address.
	#[error("Graph base URL `{url}` must use HTTPS.")]
	InsecureEndpoint {
		/// Offending URL.
		url: String,
	},
	/// A credential required by the requested operation is not configured.
	#[error("Missing configuration value `{name}`.")]
	MissingCredential {
		/// Environment variable name.
		name: &'static str,
	},
	/// An environment variable holds an unusable value.
	#[error("Configuration value `{name}` is invalid: {reason}.")]
	InvalidVar {
		/// Environment variable name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// An identifier supplied through configuration failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::account::IdentifierError),
	/// Pinned credential declarations could not be parsed.
	#[error(transparent)]
	PinnedCredentials(#[from] crate::resolver::PinnedCredentialError),
	/// The pinned fallback forms file could not be read or parsed.
	#[error("Fallback forms file `{path}` is unusable: {message}.")]
	FallbackForms {
		/// Configured file path.
		path: String,
		/// Read or parse failure.
		message: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Graph API throttled the caller.
	#[error("Graph API rate limit reached.")]
	RateLimited {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Graph throttling code, when available.
		code: Option<i64>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Graph API failed without an error envelope.
	#[error("Graph API returned an unexpected response: {message}.")]
	Upstream {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Graph API responded with JSON that could not be parsed.
	#[error("Graph API returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the Graph API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the Graph API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
