//! Access/refresh token pair exchanged with the auth endpoints.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access + refresh token pair as issued by the login and refresh endpoints.
///
/// The wire shape is `{"accessToken": "...", "refreshToken": "..."}`. Both halves are
/// opaque signed tokens; the client never inspects them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	/// Short-lived credential attached to protected calls.
	pub access_token: TokenSecret,
	/// Long-lived credential exchanged for a new pair.
	pub refresh_token: TokenSecret,
}
impl TokenPair {
	/// Creates a pair from raw token strings.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}
}

/// Request body sent to the refresh endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequestBody<'a> {
	pub(crate) refresh_token: &'a str,
}
