//! Thread-safe in-memory [`CredentialStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	store::{CookiePolicy, CredentialStore, Credentials, now},
};

/// Keeps the current token pair in-process; the default store for tests and short-lived
/// sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
	policy: CookiePolicy,
	inner: RwLock<Credentials>,
}
impl MemoryStore {
	/// Creates an empty store with custom cookie lifetimes.
	pub fn with_policy(policy: CookiePolicy) -> Self {
		Self { policy, inner: Default::default() }
	}

	/// Returns a copy of both slots, including expired entries.
	pub fn snapshot(&self) -> Credentials {
		self.inner.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn access_token(&self) -> Option<TokenSecret> {
		self.inner.read().access_at(now())
	}

	fn refresh_token(&self) -> Option<TokenSecret> {
		self.inner.read().refresh_at(now())
	}

	fn set_access_token(&self, token: TokenSecret) {
		self.inner.write().set_access(&self.policy, token);
	}

	fn set_refresh_token(&self, token: TokenSecret) {
		self.inner.write().set_refresh(&self.policy, token);
	}

	fn replace(&self, pair: TokenPair) {
		self.inner.write().replace(&self.policy, pair);
	}

	fn clear(&self) {
		self.inner.write().clear();
	}
}
