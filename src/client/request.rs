//! Request descriptions and the replay marker threaded through the executor.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError, http::HttpRequest};

/// Position of a dispatch within one logical request.
///
/// A logical request is sent at most twice: once as [`Attempt::First`] and, after a
/// successful refresh, once more as [`Attempt::Retried`], which has no successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attempt {
	/// Initial dispatch with the stored access token.
	First,
	/// Replay with a freshly obtained access token.
	Retried,
}
impl Attempt {
	/// Returns the attempt that may follow an authorization failure, if any.
	pub const fn next(self) -> Option<Self> {
		match self {
			Self::First => Some(Self::Retried),
			Self::Retried => None,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::First => "first",
			Self::Retried => "retried",
		}
	}
}

/// Caller-supplied description of a protected-resource call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path (optionally with query) resolved against the configured base URL.
	pub path: String,
	/// Caller headers, forwarded unchanged except for `Authorization`.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
	/// Sends the request without credentials and disables the refresh flow.
	pub skip_auth: bool,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None, skip_auth: false }
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Serializes `body` as JSON and sets `Content-Type: application/json` unless the caller
	/// already chose a content type.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::RequestBody)?);

		if !self.headers.contains_key(CONTENT_TYPE) {
			self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}

		Ok(self)
	}

	/// Sets a raw body; the caller is responsible for the content type.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Adds (or replaces) a header.
	pub fn header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
		let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
		let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;

		self.headers.insert(header_name, header_value);

		Ok(self)
	}

	/// Marks the request as public: no bearer token, no refresh on 401.
	pub fn skip_auth(mut self) -> Self {
		self.skip_auth = true;

		self
	}

	/// Builds the wire request, attaching `token` as a bearer credential unless `skip_auth`.
	pub(crate) fn to_http(
		&self,
		url: &Url,
		token: Option<&TokenSecret>,
	) -> Result<HttpRequest, ConfigError> {
		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let headers = request.headers_mut();

		headers.extend(self.headers.clone());

		if !headers.contains_key(ACCEPT) {
			headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
		}
		if let Some(token) = token.filter(|_| !self.skip_auth) {
			let mut value = HeaderValue::from_str(&token.bearer())
				.map_err(|_| ConfigError::InvalidHeader { name: AUTHORIZATION.to_string() })?;

			value.set_sensitive(true);
			headers.insert(AUTHORIZATION, value);
		}

		Ok(request)
	}
}
