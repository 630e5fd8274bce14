// crates.io
use ::http::{
	Method, StatusCode,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{RefreshRequestBody, TokenPair, TokenSecret},
	http::{self, HttpRequest, HttpTransport},
	refresh::RefreshError,
};

/// Boxed future returned by [`RefreshEndpoint::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenPair, RefreshError>> + 'a + Send>>;

/// Remote service that exchanges a refresh token for a new token pair.
pub trait RefreshEndpoint
where
	Self: Send + Sync,
{
	/// Exchanges `refresh_token` for a new pair. Any failure rejects the refresh.
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

/// [`RefreshEndpoint`] that POSTs `{"refreshToken": ...}` as JSON over an [`HttpTransport`].
pub struct HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	url: Url,
}
impl<T> HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an endpoint targeting `url` through `transport`.
	pub fn new(transport: Arc<T>, url: Url) -> Self {
		Self { transport, url }
	}

	/// Absolute URL of the refresh endpoint.
	pub fn url(&self) -> &Url {
		&self.url
	}

	fn build_request(&self, refresh_token: &TokenSecret) -> Result<HttpRequest, RefreshError> {
		let payload = RefreshRequestBody { refresh_token: refresh_token.expose() };
		let body = serde_json::to_vec(&payload)
			.map_err(|e| RefreshError::Request { message: e.to_string() })?;

		::http::Request::builder()
			.method(Method::POST)
			.uri(self.url.as_str())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(body)
			.map_err(|e| RefreshError::Request { message: e.to_string() })
	}
}
impl<T> RefreshEndpoint for HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(async move {
			let request = self.build_request(refresh_token)?;
			let response = self
				.transport
				.send(request)
				.await
				.map_err(|e| RefreshError::Network { message: source_chain(&e) })?;
			let status = response.status();

			if !status.is_success() {
				return Err(RefreshError::Rejected {
					status: status.as_u16(),
					message: http::error_message(status, response.body()),
				});
			}

			decode_pair(status, response.body())
		})
	}
}
impl<T> Debug for HttpRefreshEndpoint<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRefreshEndpoint").field("url", &self.url.as_str()).finish()
	}
}

fn decode_pair(status: StatusCode, body: &[u8]) -> Result<TokenPair, RefreshError> {
	let deserializer = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(deserializer).map_err(|e| RefreshError::MalformedResponse {
		message: format!("HTTP {} body failed at `{}`: {}", status.as_u16(), e.path(), e.inner()),
	})
}

fn source_chain(err: &dyn StdError) -> String {
	let mut message = err.to_string();
	let mut source = err.source();

	while let Some(inner) = source {
		message.push_str(": ");
		message.push_str(&inner.to_string());

		source = inner.source();
	}

	message
}
