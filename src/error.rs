//! Crate-level error types shared by discovery, authentication flows, and the client.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type JsonPathError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Descriptor could not be located or failed minimal validation.
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
	/// Site rejected credentials, a registration step, or a token request.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Site answered with HTTP 429.
	#[error(transparent)]
	RateLimited(#[from] RateLimitError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Site answered with an error status not covered by a more specific variant.
	#[error("API error (HTTP {status}): {message}")]
	Api {
		/// HTTP status code returned by the site.
		status: u16,
		/// Response body text.
		message: String,
	},
	/// Endpoint name is not declared by the descriptor.
	#[error("Unknown endpoint `{name}`. Available endpoints: {}.", .available.join(", "))]
	UnknownEndpoint {
		/// Requested endpoint name.
		name: String,
		/// Declared endpoint names, sorted.
		available: Vec<String>,
	},
	/// Successful response carried a body that is not valid JSON for the expected shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: JsonPathError,
		/// HTTP status code of the response.
		status: Option<u16>,
	},
}
impl Error {
	/// HTTP status code attached to the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Discovery(e) => e.status(),
			Self::Authentication(e) => e.status,
			Self::RateLimited(_) => Some(429),
			Self::Api { status, .. } => Some(*status),
			Self::Decode { status, .. } => *status,
			_ => None,
		}
	}
}

/// Failures raised while locating or validating a descriptor.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
	/// A fetch returned an error status other than 404.
	#[error("Failed to fetch {url}: HTTP {status}.")]
	HttpStatus {
		/// Domain being discovered.
		domain: String,
		/// Fetched URL.
		url: String,
		/// HTTP status code returned by the fetch.
		status: u16,
	},
	/// Descriptor exceeds the accepted size.
	#[error("ia.json from {domain} exceeds maximum file size ({size} bytes > {limit}).")]
	TooLarge {
		/// Domain being discovered.
		domain: String,
		/// Received body size in bytes.
		size: usize,
		/// Accepted maximum in bytes.
		limit: usize,
	},
	/// Descriptor body is not valid JSON.
	#[error("ia.json from {domain} is not valid JSON.")]
	InvalidJson {
		/// Domain being discovered.
		domain: String,
		/// Parser failure.
		#[source]
		source: serde_json::Error,
	},
	/// A required top-level field is absent.
	#[error("ia.json from {domain} is missing required field `{field}`.")]
	MissingField {
		/// Domain being discovered.
		domain: String,
		/// Missing field name.
		field: &'static str,
	},
	/// The `version` field cannot be interpreted.
	#[error("ia.json from {domain} has invalid version `{version}`.")]
	InvalidVersion {
		/// Domain being discovered.
		domain: String,
		/// Raw version text.
		version: String,
	},
	/// The declared major version is not supported.
	#[error("Unsupported ia.json major version {major} (expected 1).")]
	UnsupportedVersion {
		/// Domain being discovered.
		domain: String,
		/// Declared major version.
		major: i64,
	},
	/// Every fetch failed and the last failure was a transport error.
	#[error("Failed to discover ia.json for {domain}.")]
	Transport {
		/// Domain being discovered.
		domain: String,
		/// Last transport failure observed while probing.
		#[source]
		source: TransportError,
	},
	/// No fetch returned a document.
	#[error("No ia.json file found for {domain}.")]
	NotFound {
		/// Domain being discovered.
		domain: String,
	},
}
impl DiscoveryError {
	/// Domain the failure relates to.
	pub fn domain(&self) -> &str {
		match self {
			Self::HttpStatus { domain, .. }
			| Self::TooLarge { domain, .. }
			| Self::InvalidJson { domain, .. }
			| Self::MissingField { domain, .. }
			| Self::InvalidVersion { domain, .. }
			| Self::UnsupportedVersion { domain, .. }
			| Self::Transport { domain, .. }
			| Self::NotFound { domain } => domain,
		}
	}

	/// HTTP status associated with the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::HttpStatus { status, .. } => Some(*status),
			Self::NotFound { .. } => Some(404),
			_ => None,
		}
	}
}

/// Authentication or authorization failure reported by a site.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct AuthenticationError {
	/// Human-readable summary including the response body.
	pub message: String,
	/// Machine-readable error code, either parsed from the body or assigned by the flow.
	pub error_code: Option<String>,
	/// HTTP status code, when available.
	pub status: Option<u16>,
}
impl AuthenticationError {
	/// Creates an error for a rejected HTTP exchange.
	pub fn rejected(message: impl Into<String>, status: u16) -> Self {
		Self { message: message.into(), error_code: None, status: Some(status) }
	}

	/// Attaches a machine-readable error code.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_code = Some(code.into());

		self
	}
}

/// Rate limit failure (HTTP 429).
#[derive(Debug, ThisError)]
#[error("Rate limit exceeded: {message}")]
pub struct RateLimitError {
	/// Response body text.
	pub message: String,
	/// Seconds to wait before retrying, from a numeric `Retry-After` header.
	pub retry_after: Option<f64>,
}

/// Configuration and validation failures raised locally.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request payload could not be serialized.
	#[error("Request payload could not be serialized.")]
	Serialize(#[source] serde_json::Error),
	/// Descriptor does not match the expected structure.
	#[error("Descriptor is malformed at `{}`.", .source.path())]
	InvalidDescriptor {
		/// Path-aware parsing failure.
		#[source]
		source: JsonPathError,
	},
	/// Descriptor byte length exceeds the accepted size.
	#[error("Descriptor exceeds maximum size ({size} bytes > {limit}).")]
	DescriptorTooLarge {
		/// Received size in bytes.
		size: usize,
		/// Accepted maximum in bytes.
		limit: usize,
	},
	/// Descriptor declares a major version other than 1.
	#[error("Descriptor version `{version}` is not supported (expected 1.x).")]
	UnsupportedVersion {
		/// Declared version text.
		version: String,
	},
	/// A URL built from descriptor data could not be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// The descriptor declares no `auth.signed_key` section.
	#[error("This site does not support signed_key authentication.")]
	MissingSignedKey,
	/// The descriptor declares no `auth.oauth2` section.
	#[error("This site does not support OAuth 2.0 authorization.")]
	MissingOAuth2,
	/// Signing was requested without a configured secret.
	#[error("No secret configured; set credentials first.")]
	MissingSecret,
	/// Strict path handling found a placeholder with no matching parameter.
	#[error("Path `{path}` has no value for placeholder `{{{placeholder}}}`.")]
	UnresolvedPathParameter {
		/// Endpoint path template.
		path: String,
		/// Placeholder name without braces.
		placeholder: String,
	},
	/// A blocking entry point was invoked from inside an async runtime.
	#[error("Blocking operations cannot run inside an async runtime; use the async variant.")]
	BlockingInsideRuntime,
	/// The private runtime backing a blocking call could not be created.
	#[error("Runtime for blocking operations could not be created.")]
	Runtime(#[source] std::io::Error),
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

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded its deadline.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Target URL.
		url: String,
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling {url}.")]
	Io {
		/// Target URL.
		url: String,
		/// IO failure.
		#[source]
		source: std::io::Error,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}
