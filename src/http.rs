//! Transport primitives for protected-resource and auth-endpoint calls.
//!
//! The module exposes [`HttpTransport`], the client's only dependency on an HTTP stack.
//! Requests and responses are plain [`::http`] values with buffered bodies, so custom
//! transports (and test doubles) can be written without pulling in reqwest.

// self
use crate::{_prelude::*, error::TransportError};

/// Buffered outbound request.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Buffered inbound response.
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports used by the client.
///
/// Implementations must resolve with a response for every HTTP status, including 4xx and 5xx;
/// only failures that prevent a response from arriving (DNS, TCP, TLS, body read) map to
/// [`TransportError`]. Status interpretation belongs to the client.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport with a fresh reqwest client.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let url = request.uri().to_string();
			let request = reqwest::Request::try_from(request)
				.map_err(|e| TransportError::network(&url, e))?;
			let response =
				client.execute(request).await.map_err(|e| TransportError::network(&url, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(&url, e))?.to_vec();
			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Extracts a human-readable message from an error response body.
///
/// Prefers the `error` or `message` field of a JSON object, then the trimmed body text, then
/// the canonical reason phrase for `status`.
pub fn error_message(status: ::http::StatusCode, body: &[u8]) -> String {
	const MAX_TEXT_LEN: usize = 256;

	if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body)
	{
		let field = ["error", "message"]
			.iter()
			.find_map(|key| map.get(*key).and_then(serde_json::Value::as_str));

		if let Some(message) = field.filter(|m| !m.trim().is_empty()) {
			return message.trim().to_owned();
		}
	}

	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if !text.is_empty() {
		return text.chars().take(MAX_TEXT_LEN).collect();
	}

	status
		.canonical_reason()
		.map(str::to_owned)
		.unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
