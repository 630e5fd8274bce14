//! Credential storage contract, cookie lifetimes, and built-in store implementations.
//!
//! Stores hold exactly one [`TokenPair`] (or nothing). Every entry carries an expiry instant
//! derived from a [`CookiePolicy`], mirroring the browser cookies the web client keeps its
//! tokens in; an expired entry reads as absent. All trait operations are total.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
};

/// Storage backend contract implemented by credential stores.
///
/// Reads and writes are synchronous; implementations must not block on I/O for reads.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored access token, if present and unexpired.
	fn access_token(&self) -> Option<TokenSecret>;

	/// Returns the stored refresh token, if present and unexpired.
	fn refresh_token(&self) -> Option<TokenSecret>;

	/// Overwrites the access token.
	fn set_access_token(&self, token: TokenSecret);

	/// Overwrites the refresh token.
	fn set_refresh_token(&self, token: TokenSecret);

	/// Overwrites both tokens so readers never observe a mixed pair.
	fn replace(&self, pair: TokenPair);

	/// Removes both tokens. Idempotent.
	fn clear(&self);
}

/// Lifetimes applied to newly stored tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePolicy {
	/// Lifetime of a stored access token.
	pub access_ttl: Duration,
	/// Lifetime of a stored refresh token.
	pub refresh_ttl: Duration,
}
impl CookiePolicy {
	/// Default access token lifetime (two weeks).
	pub const DEFAULT_ACCESS_TTL: Duration = Duration::weeks(2);
	/// Default refresh token lifetime (one year).
	pub const DEFAULT_REFRESH_TTL: Duration = Duration::days(365);

	/// Creates a policy with explicit lifetimes.
	pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
		Self { access_ttl, refresh_ttl }
	}
}
impl Default for CookiePolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_ACCESS_TTL, Self::DEFAULT_REFRESH_TTL)
	}
}

/// A stored token and the instant it stops being readable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
	/// Token secret.
	pub secret: TokenSecret,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl StoredToken {
	fn issue(secret: TokenSecret, ttl: Duration, now: OffsetDateTime) -> Self {
		Self { secret, expires_at: now + ttl }
	}

	fn live_at(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		(now < self.expires_at).then(|| self.secret.clone())
	}
}

/// Snapshot of both credential slots shared by the built-in stores.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Access token slot.
	pub access_token: Option<StoredToken>,
	/// Refresh token slot.
	pub refresh_token: Option<StoredToken>,
}
impl Credentials {
	pub(crate) fn access_at(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.access_token.as_ref().and_then(|token| token.live_at(now))
	}

	pub(crate) fn refresh_at(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.refresh_token.as_ref().and_then(|token| token.live_at(now))
	}

	pub(crate) fn set_access(&mut self, policy: &CookiePolicy, token: TokenSecret) {
		self.access_token = Some(StoredToken::issue(token, policy.access_ttl, now()));
	}

	pub(crate) fn set_refresh(&mut self, policy: &CookiePolicy, token: TokenSecret) {
		self.refresh_token = Some(StoredToken::issue(token, policy.refresh_ttl, now()));
	}

	pub(crate) fn replace(&mut self, policy: &CookiePolicy, pair: TokenPair) {
		let issued = now();

		self.access_token = Some(StoredToken::issue(pair.access_token, policy.access_ttl, issued));
		self.refresh_token =
			Some(StoredToken::issue(pair.refresh_token, policy.refresh_ttl, issued));
	}

	pub(crate) fn clear(&mut self) {
		self.access_token = None;
		self.refresh_token = None;
	}
}

/// Error type produced when opening a persistent store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

pub(crate) fn now() -> OffsetDateTime {
	OffsetDateTime::now_utc()
}
