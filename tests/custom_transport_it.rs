// std
use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use ::http::{StatusCode, header::AUTHORIZATION};
use parking_lot::Mutex;
use time::Duration;
// self
use appreciation_client::{
	auth::TokenPair,
	client::AuthClient,
	config::ClientConfig,
	error::{Error, TransportError},
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	session::InvalidationReason,
	store::{CredentialStore, MemoryStore},
};

#[derive(Clone, Copy)]
enum RefreshBehavior {
	Unreachable,
	Hang,
}

struct FakeTransport {
	refresh: RefreshBehavior,
	resource_unreachable: bool,
	refresh_calls: AtomicUsize,
	resource_calls: AtomicUsize,
}
impl FakeTransport {
	fn new(refresh: RefreshBehavior) -> Self {
		Self {
			refresh,
			resource_unreachable: false,
			refresh_calls: AtomicUsize::new(0),
			resource_calls: AtomicUsize::new(0),
		}
	}
}
impl HttpTransport for FakeTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let url = request.uri().to_string();

		if request.uri().path() == "/auth/refresh" {
			self.refresh_calls.fetch_add(1, Ordering::SeqCst);

			let behavior = self.refresh;

			return Box::pin(async move {
				match behavior {
					RefreshBehavior::Unreachable => Err(TransportError::network(
						url,
						io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
					)),
					RefreshBehavior::Hang => std::future::pending().await,
				}
			});
		}

		self.resource_calls.fetch_add(1, Ordering::SeqCst);

		let unreachable = self.resource_unreachable;
		let authorized = request
			.headers()
			.get(AUTHORIZATION)
			.is_some_and(|value| value.as_bytes() == b"Bearer A2");

		Box::pin(async move {
			if unreachable {
				return Err(TransportError::network(
					url,
					io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
				));
			}

			let mut response = HttpResponse::new(b"{}".to_vec());

			if !authorized {
				*response.status_mut() = StatusCode::UNAUTHORIZED;
			}

			Ok(response)
		})
	}
}

fn build_client(
	transport: FakeTransport,
	timeout: Option<Duration>,
) -> (AuthClient<FakeTransport>, Arc<FakeTransport>, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());

	store.replace(TokenPair::new("A1", "R1"));

	let builder = ClientConfig::builder();
	let builder = match timeout {
		Some(limit) => builder.refresh_timeout(limit),
		None => builder.without_refresh_timeout(),
	};
	let config = builder.build().expect("Test configuration should be valid.");
	let transport = Arc::new(transport);
	let client =
		AuthClient::<FakeTransport>::with_transport(config, store.clone(), transport.clone())
			.expect("Client over a fake transport should build.");

	(client, transport, store)
}

#[tokio::test]
async fn unreachable_refresh_endpoint_invalidates_the_session() {
	let (client, transport, store) =
		build_client(FakeTransport::new(RefreshBehavior::Unreachable), None);
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = seen.clone();

	client.on_invalidate(move |reason| sink.lock().push(reason));

	let err = client.get("/users/me").await.expect_err("Unreachable refresh should fail.");

	match err {
		Error::RefreshUnavailable { ref reason } => {
			assert!(reason.contains("connection refused"), "Unexpected reason: {reason}");
		},
		ref other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(err.requires_reauthentication());
	assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(store.refresh_token(), None);
	assert_eq!(*seen.lock(), vec![InvalidationReason::RefreshUnavailable]);
}

#[tokio::test]
async fn hung_refresh_times_out_for_every_waiter() {
	let (client, transport, store) =
		build_client(FakeTransport::new(RefreshBehavior::Hang), Some(Duration::milliseconds(100)));
	let (first, second) = tokio::join!(client.get("/users/me"), client.get("/appreciations"));

	for result in [first, second] {
		match result.expect_err("Timed out refresh should fail every caller.") {
			Error::RefreshUnavailable { reason } => {
				assert!(reason.contains("did not complete"), "Unexpected reason: {reason}");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(client.refresh_metrics().failures(), 1);
	assert!(!client.coordinator().is_refreshing());
	assert_eq!(store.access_token(), None);
}

#[tokio::test]
async fn resource_network_errors_keep_the_session() {
	let mut transport = FakeTransport::new(RefreshBehavior::Unreachable);

	transport.resource_unreachable = true;

	let (client, transport, store) = build_client(transport, None);
	let err = client.get("/users/me").await.expect_err("Network failure should surface.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert!(!err.requires_reauthentication());
	assert_eq!(transport.resource_calls.load(Ordering::SeqCst), 1);
	assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
	assert_eq!(store.access_token().map(|token| token.expose().to_owned()), Some("A1".into()));
}
