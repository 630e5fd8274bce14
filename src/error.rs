//! Client-level error types shared across the request pipeline, refresh coordinator, and stores.

// self
use crate::{_prelude::*, refresh::RefreshError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
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
	/// Transport failure (DNS, TCP, TLS) on a protected-resource call.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A refresh was required but no refresh token is stored.
	#[error("No refresh token is stored; sign in again.")]
	MissingCredential,
	/// The auth endpoint rejected the stored refresh token.
	#[error("Session expired: the refresh token was rejected with HTTP {status}: {message}.")]
	RefreshRejected {
		/// HTTP status returned by the refresh endpoint.
		status: u16,
		/// Server-supplied message.
		message: String,
	},
	/// The refresh call failed before the auth endpoint could answer.
	#[error("Session could not be refreshed: {reason}.")]
	RefreshUnavailable {
		/// Human-readable failure summary.
		reason: String,
	},
	/// The replayed request was rejected with 401 again.
	#[error("Request was unauthorized after refreshing credentials; sign in again.")]
	RetryExhausted,
	/// Any non-2xx response that is not a refreshable 401.
	#[error("Upstream returned HTTP {status}: {message}.")]
	Upstream {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message or canonical reason phrase.
		message: String,
	},
	/// Response payload could not be decoded into the requested type.
	#[error("Response payload could not be decoded.")]
	Decode {
		/// Structured decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns true when the session has been invalidated and the user must sign in again.
	pub fn requires_reauthentication(&self) -> bool {
		matches!(
			self,
			Self::MissingCredential
				| Self::RefreshRejected { .. }
				| Self::RefreshUnavailable { .. }
				| Self::RetryExhausted
		)
	}

	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::RefreshRejected { status, .. } | Self::Upstream { status, .. } => Some(*status),
			Self::RetryExhausted => Some(401),
			_ => None,
		}
	}
}
impl From<RefreshError> for Error {
	fn from(e: RefreshError) -> Self {
		match e {
			RefreshError::MissingCredential => Self::MissingCredential,
			RefreshError::Rejected { status, message } => Self::RefreshRejected { status, message },
			other => Self::RefreshUnavailable { reason: other.to_string() },
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
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Base URL or endpoint path does not form a valid URL.
	#[error("Endpoint URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL must use http or https, got `{scheme}`.")]
	UnsupportedScheme {
		/// Rejected scheme.
		scheme: String,
	},
	/// Base URL cannot carry path segments.
	#[error("Base URL `{url}` cannot be used as a base.")]
	CannotBeABase {
		/// Offending URL string.
		url: String,
	},
	/// Refresh timeout must be positive when set.
	#[error("The refresh timeout must be positive.")]
	NonPositiveRefreshTimeout,
	/// Cookie lifetimes must be positive.
	#[error("The {token} token lifetime must be positive.")]
	NonPositiveLifetime {
		/// Which token the lifetime belongs to.
		token: &'static str,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
	/// Header name or value is invalid.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
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
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}
