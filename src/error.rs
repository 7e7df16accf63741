//! Client-level error types shared across the executor, refresh coordinator, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Only these outcomes cross the public boundary; the internal "refresh and retry" signal is
/// absorbed by [`ApiClient`](crate::client::ApiClient) before anything reaches the caller.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure raised while constructing a store.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Network failure; no response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Login call rejected the supplied credentials.
	#[error("{message}")]
	CredentialsInvalid {
		/// Backend-supplied reason string.
		message: String,
	},
	/// Session expired and could not be renewed; credentials have been cleared.
	#[error("Unauthorized")]
	Unauthorized,
	/// Backend answered with a non-success status.
	#[error("{message}")]
	RequestFailed {
		/// HTTP status code.
		status: u16,
		/// Message extracted from the error body, or the status text.
		message: String,
	},
	/// Success body could not be decoded into the requested type.
	#[error("Response body is malformed JSON.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status associated with the error, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::CredentialsInvalid { .. } | Self::Unauthorized => Some(401),
			Self::RequestFailed { status, .. } | Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot carry request paths.
	#[error("Base URL `{url}` must be an absolute http(s) URL.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// A configured route or request path is malformed.
	#[error("Path `{path}` must start with `/`.")]
	InvalidPath {
		/// Offending path.
		path: String,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	UnresolvablePath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token lifetime must be positive.
	#[error("The default token TTL must be positive.")]
	NonPositiveTtl,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Serialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL of the failed call.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}
