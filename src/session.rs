//! Session invalidation: clearing local trust state and telling the application about it.

// self
use crate::{
	_prelude::*,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::CredentialStore,
};

type Listener = Arc<dyn Fn(InvalidationReason) + Send + Sync>;

/// Why a session was invalidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
	/// A refresh was needed but no refresh token was stored.
	MissingCredential,
	/// The refresh endpoint rejected the refresh token.
	RefreshRejected,
	/// The refresh call failed before the endpoint answered.
	RefreshUnavailable,
	/// A replayed request was rejected with 401 again.
	RetryExhausted,
	/// The application signed the user out.
	SignOut,
}
impl InvalidationReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::MissingCredential => "missing_credential",
			Self::RefreshRejected => "refresh_rejected",
			Self::RefreshUnavailable => "refresh_unavailable",
			Self::RetryExhausted => "retry_exhausted",
			Self::SignOut => "sign_out",
		}
	}

	/// Maps a terminal pipeline error to its reason; `None` for non-terminal errors.
	pub fn for_error(error: &Error) -> Option<Self> {
		match error {
			Error::MissingCredential => Some(Self::MissingCredential),
			Error::RefreshRejected { .. } => Some(Self::RefreshRejected),
			Error::RefreshUnavailable { .. } => Some(Self::RefreshUnavailable),
			Error::RetryExhausted => Some(Self::RetryExhausted),
			_ => None,
		}
	}
}
impl Display for InvalidationReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Clears stored credentials and notifies registered listeners.
///
/// Redirecting the user to a login flow is the listener's job; the invalidator only drops
/// local trust state.
#[derive(Clone)]
pub struct SessionInvalidator {
	store: Arc<dyn CredentialStore>,
	listeners: Arc<RwLock<Vec<Listener>>>,
	// Set once any invalidation has run; guards the check-and-clear section.
	ended: Arc<Mutex<bool>>,
}
impl SessionInvalidator {
	/// Creates an invalidator over `store`.
	pub fn new(store: Arc<dyn CredentialStore>) -> Self {
		Self { store, listeners: Default::default(), ended: Default::default() }
	}

	/// Registers a callback invoked once per ended session.
	///
	/// Listeners run when an invalidation clears stored credentials, or on the first
	/// invalidation when nothing was ever stored. Further invalidations against an already empty
	/// store, such as every caller that shared one failed refresh, are not reported again.
	pub fn on_invalidate(&self, listener: impl Fn(InvalidationReason) + Send + Sync + 'static) {
		self.listeners.write().push(Arc::new(listener));
	}

	/// Clears both tokens unconditionally. Idempotent and infallible.
	pub fn invalidate(&self, reason: InvalidationReason) {
		const KIND: OperationKind = OperationKind::Invalidate;

		let _span = OperationSpan::new(KIND, reason.as_str()).entered();

		obs::record_outcome(KIND, OperationOutcome::Attempt);

		if !self.clear_store() {
			#[cfg(feature = "tracing")]
			tracing::debug!(reason = reason.as_str(), "session already invalidated");

			obs::record_outcome(KIND, OperationOutcome::Success);

			return;
		}

		#[cfg(feature = "tracing")]
		tracing::warn!(reason = reason.as_str(), "session invalidated; sign-in required");

		let listeners = self.listeners.read().clone();

		for listener in listeners {
			listener(reason);
		}

		obs::record_outcome(KIND, OperationOutcome::Success);
	}

	// Returns whether listeners should hear about this invalidation.
	fn clear_store(&self) -> bool {
		let mut ended = self.ended.lock();
		let had_credentials =
			self.store.access_token().is_some() || self.store.refresh_token().is_some();

		self.store.clear();

		let notify = had_credentials || !*ended;

		*ended = true;

		notify
	}
}
impl Debug for SessionInvalidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionInvalidator")
			.field("listeners", &self.listeners.read().len())
			.finish()
	}
}
