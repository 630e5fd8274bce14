//! Authenticated request executor.
//!
//! [`AuthClient`] attaches the stored access token to every protected call, and on a 401 asks
//! the shared [`RefreshCoordinator`] for a fresh token before replaying the call exactly once.
//! Terminal authorization failures clear the session through the [`SessionInvalidator`].

mod payload;
mod request;

pub use payload::*;
pub use request::*;

// crates.io
use ::http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	config::ClientConfig,
	http::{self, HttpResponse, HttpTransport},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	refresh::{HttpRefreshEndpoint, RefreshCoordinator, RefreshEndpoint, RefreshMetrics},
	session::{InvalidationReason, SessionInvalidator},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport>;

/// Executes protected-resource calls with transparent token refresh.
///
/// Clones share the transport, the credential store, the refresh coordinator, and the
/// invalidation listeners, so a refresh triggered through one clone is observed by all.
pub struct AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: Arc<ClientConfig>,
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	coordinator: Arc<RefreshCoordinator>,
	invalidator: SessionInvalidator,
}
impl<T> AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over a caller-provided transport.
	///
	/// The refresh endpoint is called through the same transport at
	/// [`ClientConfig::refresh_url`].
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		let transport = transport.into();
		let endpoint = HttpRefreshEndpoint::new(transport.clone(), config.refresh_url()?);
		let coordinator = RefreshCoordinator::new(Arc::new(endpoint), store.clone())
			.with_timeout(config.refresh_timeout);

		Ok(Self {
			config: Arc::new(config),
			transport,
			invalidator: SessionInvalidator::new(store.clone()),
			store,
			coordinator: Arc::new(coordinator),
		})
	}

	/// Routes refreshes through `endpoint` instead of the HTTP refresh endpoint.
	pub fn with_refresh_endpoint(mut self, endpoint: Arc<dyn RefreshEndpoint>) -> Self {
		let coordinator = RefreshCoordinator::new(endpoint, self.store.clone())
			.with_timeout(self.config.refresh_timeout);

		self.coordinator = Arc::new(coordinator);

		self
	}

	/// Validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store shared with the refresh coordinator.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Underlying transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Refresh coordinator shared by every clone of this client.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Counters for refresh activity.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Registers a callback invoked once per ended session.
	///
	/// Concurrent requests that fail on the same refresh produce a single notification; see
	/// [`SessionInvalidator::on_invalidate`].
	pub fn on_invalidate(&self, listener: impl Fn(InvalidationReason) + Send + Sync + 'static) {
		self.invalidator.on_invalidate(listener);
	}

	/// Whether an access or refresh token is currently stored.
	pub fn is_authenticated(&self) -> bool {
		self.store.access_token().is_some() || self.store.refresh_token().is_some()
	}

	/// Stores a pair obtained out of band.
	pub fn establish_session(&self, pair: TokenPair) {
		self.store.replace(pair);
	}

	/// Clears the session and notifies listeners with [`InvalidationReason::SignOut`].
	pub fn sign_out(&self) {
		self.invalidator.invalidate(InvalidationReason::SignOut);
	}

	/// Exchanges credentials at the login endpoint and stores the issued pair.
	///
	/// The call is public: a 401 here is a failed sign-in surfaced as [`Error::Upstream`] and
	/// never triggers a refresh.
	pub async fn sign_in<B>(&self, credentials: &B) -> Result<TokenPair>
	where
		B: ?Sized + Serialize,
	{
		const KIND: OperationKind = OperationKind::SignIn;

		let span = OperationSpan::new(KIND, "sign_in");

		obs::record_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async {
				let request =
					ApiRequest::post(self.config.login_path.clone()).json(credentials)?.skip_auth();
				let pair = self.run(&request, &span).await?.deserialize::<TokenPair>()?;

				self.store.replace(pair.clone());

				Ok::<_, Error>(pair)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Executes `request`, refreshing and replaying once on a 401.
	pub async fn execute(&self, request: ApiRequest) -> Result<Payload> {
		const KIND: OperationKind = OperationKind::Request;

		let span = OperationSpan::new(KIND, "execute");

		obs::record_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.run(&request, &span)).await;

		obs::record_result(KIND, &result);

		result
	}

	/// `GET path`.
	pub async fn get(&self, path: impl Into<String>) -> Result<Payload> {
		self.execute(ApiRequest::get(path)).await
	}

	/// `POST path` with a JSON body.
	pub async fn post<B>(&self, path: impl Into<String>, body: &B) -> Result<Payload>
	where
		B: ?Sized + Serialize,
	{
		self.execute(ApiRequest::post(path).json(body)?).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put<B>(&self, path: impl Into<String>, body: &B) -> Result<Payload>
	where
		B: ?Sized + Serialize,
	{
		self.execute(ApiRequest::put(path).json(body)?).await
	}

	/// `PATCH path` with a JSON body.
	pub async fn patch<B>(&self, path: impl Into<String>, body: &B) -> Result<Payload>
	where
		B: ?Sized + Serialize,
	{
		self.execute(ApiRequest::patch(path).json(body)?).await
	}

	/// `DELETE path`.
	pub async fn delete(&self, path: impl Into<String>) -> Result<Payload> {
		self.execute(ApiRequest::delete(path)).await
	}

	async fn run(&self, request: &ApiRequest, span: &OperationSpan) -> Result<Payload> {
		let url = self.config.endpoint(&request.path)?;
		let mut token = if request.skip_auth { None } else { self.store.access_token() };
		let mut attempt = Attempt::First;

		loop {
			span.record_attempt(attempt.as_str());

			let response = self.dispatch(request, &url, token.as_ref(), attempt).await?;
			let status = response.status();

			if status.is_success() {
				return Ok(Payload::from_body(response.body()));
			}
			if status != StatusCode::UNAUTHORIZED || request.skip_auth {
				return Err(Error::Upstream {
					status: status.as_u16(),
					message: http::error_message(status, response.body()),
				});
			}

			let Some(next) = attempt.next() else {
				return Err(self.terminate(Error::RetryExhausted));
			};

			match self.coordinator.obtain_fresh_token(token.as_ref()).await {
				Ok(fresh) => {
					token = Some(fresh);
					attempt = next;
				},
				Err(e) => return Err(self.terminate(e.into())),
			}
		}
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		url: &Url,
		token: Option<&TokenSecret>,
		attempt: Attempt,
	) -> Result<HttpResponse> {
		let wire = request.to_http(url, token)?;

		#[cfg(feature = "tracing")]
		tracing::debug!(
			method = %request.method,
			path = %request.path,
			attempt = attempt.as_str(),
			authenticated = token.is_some() && !request.skip_auth,
			"dispatching request"
		);
		#[cfg(not(feature = "tracing"))]
		let _ = attempt;

		Ok(self.transport.send(wire).await?)
	}

	fn terminate(&self, error: Error) -> Error {
		if let Some(reason) = InvalidationReason::for_error(&error) {
			self.invalidator.invalidate(reason);
		}

		error
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestTransport> {
	/// Creates a client with its own reqwest-backed transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		Self::with_transport(config, store, ReqwestTransport::new()?)
	}
}
impl<T> Clone for AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			coordinator: self.coordinator.clone(),
			invalidator: self.invalidator.clone(),
		}
	}
}
impl<T> Debug for AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("authenticated", &self.is_authenticated())
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
