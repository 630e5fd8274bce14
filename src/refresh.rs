//! Single-flight token refresh with waiter fan-out, timeouts, and metrics.
//!
//! [`RefreshCoordinator::obtain_fresh_token`] guarantees that concurrent demand for a new
//! access token results in at most one call to the refresh endpoint per coordinator. The first
//! caller leads the refresh; callers arriving while it is in flight park on a oneshot waiter
//! and receive the leader's outcome. The in-flight flag is reset by a drop guard, so a timed
//! out or cancelled leader still releases every waiter.

mod endpoint;
mod metrics;

pub use endpoint::*;
pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	store::CredentialStore,
};

/// Outcome shared by the leader and every waiter of one refresh.
pub type RefreshOutcome = Result<TokenSecret, RefreshError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

/// Refresh failures fanned out to every waiter.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh token is stored; no network call was made.
	#[error("no refresh token is stored")]
	MissingCredential,
	/// The refresh endpoint answered with a non-2xx status.
	#[error("refresh endpoint rejected the refresh token with HTTP {status}: {message}")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message.
		message: String,
	},
	/// The refresh endpoint answered 2xx with a body that is not a token pair.
	#[error("refresh endpoint returned a malformed token pair: {message}")]
	MalformedResponse {
		/// Decoding failure with the offending path.
		message: String,
	},
	/// The refresh request could not be built.
	#[error("refresh request could not be built: {message}")]
	Request {
		/// Underlying failure.
		message: String,
	},
	/// Transport failure while calling the refresh endpoint.
	#[error("network error while calling the refresh endpoint: {message}")]
	Network {
		/// Underlying failure.
		message: String,
	},
	/// The refresh call exceeded the configured timeout.
	#[error("refresh call did not complete within {after}")]
	TimedOut {
		/// Configured limit.
		after: Duration,
	},
	/// The leading caller was dropped before the refresh completed.
	#[error("refresh was abandoned before completing")]
	Abandoned,
}

/// In-flight flag plus the callers parked on it.
///
/// A nonempty waiting set implies `in_flight`.
#[derive(Debug, Default)]
pub struct RefreshState {
	in_flight: bool,
	waiters: Vec<Waiter>,
}
impl RefreshState {
	/// Whether a refresh call is currently in flight.
	pub fn is_in_flight(&self) -> bool {
		self.in_flight
	}

	/// Number of callers parked on the in-flight refresh.
	pub fn waiting(&self) -> usize {
		self.waiters.len()
	}
}

enum Admission<'a> {
	Lead(LeadGuard<'a>),
	Follow(oneshot::Receiver<RefreshOutcome>),
	Reuse(TokenSecret),
}

/// Resets the in-flight flag and releases waiters exactly once, even if the leader is dropped.
struct LeadGuard<'a> {
	state: &'a Mutex<RefreshState>,
	released: bool,
}
impl LeadGuard<'_> {
	fn release(mut self, outcome: RefreshOutcome) {
		self.released = true;

		fan_out(self.state, outcome);
	}
}
impl Drop for LeadGuard<'_> {
	fn drop(&mut self) {
		if !self.released {
			fan_out(self.state, Err(RefreshError::Abandoned));
		}
	}
}

fn fan_out(state: &Mutex<RefreshState>, outcome: RefreshOutcome) {
	let waiters = {
		let mut state = state.lock();

		state.in_flight = false;

		std::mem::take(&mut state.waiters)
	};

	for waiter in waiters {
		// A waiter whose caller went away has nothing to receive.
		let _ = waiter.send(outcome.clone());
	}
}

/// Coordinates token refreshes for one client.
pub struct RefreshCoordinator {
	endpoint: Arc<dyn RefreshEndpoint>,
	store: Arc<dyn CredentialStore>,
	timeout: Option<Duration>,
	state: Mutex<RefreshState>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates a coordinator without a refresh timeout.
	pub fn new(endpoint: Arc<dyn RefreshEndpoint>, store: Arc<dyn CredentialStore>) -> Self {
		Self {
			endpoint,
			store,
			timeout: None,
			state: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Bounds each refresh call; on expiry the leader and all waiters fail with
	/// [`RefreshError::TimedOut`].
	///
	/// A bound requires the Tokio time driver on the runtime that polls the refresh. Without one
	/// the coordinator only needs an executor.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Shared counters for refresh activity.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Whether a refresh call is currently in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().is_in_flight()
	}

	/// Number of callers parked on the in-flight refresh.
	pub fn waiting(&self) -> usize {
		self.state.lock().waiting()
	}

	/// Returns an access token newer than `stale`, refreshing at most once across all
	/// concurrent callers.
	///
	/// `stale` is the access token the failed request carried. When the store already holds a
	/// different access token, another caller rotated the pair after that request went out and
	/// the stored token is returned without a network call. Otherwise the caller either leads a
	/// refresh or waits for the one in flight. On success the new pair is stored before any
	/// waiter is released; on failure the store is left untouched.
	pub async fn obtain_fresh_token(&self, stale: Option<&TokenSecret>) -> RefreshOutcome {
		const KIND: OperationKind = OperationKind::Refresh;

		match self.admit(stale) {
			Admission::Reuse(token) => {
				self.metrics.record_reused();

				Ok(token)
			},
			Admission::Follow(waiter) => {
				self.metrics.record_coalesced();

				waiter.await.unwrap_or(Err(RefreshError::Abandoned))
			},
			Admission::Lead(guard) => {
				let span = OperationSpan::new(KIND, "obtain_fresh_token");

				obs::record_outcome(KIND, OperationOutcome::Attempt);

				let outcome = span.instrument(self.refresh_once()).await;

				obs::record_result(KIND, &outcome);
				guard.release(outcome.clone());

				outcome
			},
		}
	}

	// Check-and-set runs under the lock with no await point.
	fn admit(&self, stale: Option<&TokenSecret>) -> Admission<'_> {
		let mut state = self.state.lock();

		if state.in_flight {
			let (tx, rx) = oneshot::channel();

			state.waiters.push(tx);

			return Admission::Follow(rx);
		}
		if let Some(current) = self.store.access_token().filter(|current| Some(current) != stale) {
			return Admission::Reuse(current);
		}

		state.in_flight = true;

		Admission::Lead(LeadGuard { state: &self.state, released: false })
	}

	async fn refresh_once(&self) -> RefreshOutcome {
		let Some(refresh_token) = self.store.refresh_token() else {
			self.metrics.record_failure();

			return Err(RefreshError::MissingCredential);
		};

		self.metrics.record_attempt();

		let call = self.endpoint.refresh(&refresh_token);
		let result = match self.timeout {
			Some(limit) => tokio::time::timeout(limit.unsigned_abs(), call)
				.await
				.unwrap_or(Err(RefreshError::TimedOut { after: limit })),
			None => call.await,
		};

		match result {
			Ok(pair) => {
				let access_token = pair.access_token.clone();

				self.store.replace(pair);
				self.metrics.record_success();

				Ok(access_token)
			},
			Err(e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %e, "token refresh failed");

				self.metrics.record_failure();

				Err(e)
			},
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("timeout", &self.timeout)
			.field("state", &*self.state.lock())
			.field("metrics", &self.metrics)
			.finish()
	}
}
