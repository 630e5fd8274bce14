#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use appreciation_client::{
	_preludet::*,
	auth::TokenSecret,
	client::{ApiRequest, ReqwestAuthClient},
	session::InvalidationReason,
	store::CredentialStore,
};

fn track_invalidations(client: &ReqwestAuthClient) -> Arc<Mutex<Vec<InvalidationReason>>> {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = seen.clone();

	client.on_invalidate(move |reason| sink.lock().push(reason));

	seen
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_replayed() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), Some(("A1", "R1")));
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/me").header("authorization", "Bearer A1");
			then.status(401).json_body(json!({ "error": "Token expired" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "R1" }));
			then.status(200).json_body(json!({ "accessToken": "A2", "refreshToken": "R2" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/me").header("authorization", "Bearer A2");
			then.status(200).json_body(json!({ "id": "u-1", "availablePoints": 100 }));
		})
		.await;
	let payload = client.get("/users/me").await.expect("Replayed request should succeed.");

	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert_eq!(payload.into_json(), Some(json!({ "id": "u-1", "availablePoints": 100 })));
	assert_eq!(store.access_token(), Some(TokenSecret::new("A2")));
	assert_eq!(store.refresh_token(), Some(TokenSecret::new("R2")));
	assert_eq!(client.refresh_metrics().successes(), 1);
}

#[tokio::test]
async fn missing_refresh_token_fails_without_calling_the_endpoint() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), None);
	let seen = track_invalidations(&client);
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/me").header_missing("authorization");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "A2", "refreshToken": "R2" }));
		})
		.await;
	let err = client.get("/users/me").await.expect_err("Missing credentials should fail.");

	resource.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(matches!(err, Error::MissingCredential));
	assert!(err.requires_reauthentication());
	assert_eq!(store.access_token(), None);
	assert_eq!(*seen.lock(), vec![InvalidationReason::MissingCredential]);
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), Some(("A1", "R1")));

	server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer A1");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.delay(std::time::Duration::from_millis(200))
				.json_body(json!({ "accessToken": "A2", "refreshToken": "R2" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer A2");
			then.status(200).json_body(json!({ "ok": true }));
		})
		.await;
	let (first, second, third) = tokio::join!(
		client.get("/appreciations"),
		client.get("/users/me"),
		client.get("/users/me/weekly-points"),
	);

	for result in [first, second, third] {
		assert_eq!(
			result.expect("Every concurrent request should succeed.").into_json(),
			Some(json!({ "ok": true }))
		);
	}

	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(3).await;

	assert_eq!(store.access_token(), Some(TokenSecret::new("A2")));
	assert_eq!(client.refresh_metrics().attempts(), 1);
	assert!(!client.coordinator().is_refreshing());
}

#[tokio::test]
async fn rejected_refresh_invalidates_the_session() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), Some(("A1", "R1")));
	let seen = track_invalidations(&client);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/users/me");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(400).json_body(json!({ "error": "Invalid refresh token" }));
		})
		.await;
	let err = client.get("/users/me").await.expect_err("Rejected refresh should fail.");

	refresh.assert_calls_async(1).await;

	match err {
		Error::RefreshRejected { status, message } => {
			assert_eq!(status, 400);
			assert_eq!(message, "Invalid refresh token");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(store.access_token(), None);
	assert_eq!(store.refresh_token(), None);
	assert!(!client.is_authenticated());
	assert_eq!(*seen.lock(), vec![InvalidationReason::RefreshRejected]);
}

#[tokio::test]
async fn concurrent_callers_of_a_rejected_refresh_end_the_session_once() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), Some(("A1", "R1")));
	let seen = track_invalidations(&client);

	server
		.mock_async(|when, then| {
			when.method(GET);
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(400)
				.delay(std::time::Duration::from_millis(200))
				.json_body(json!({ "error": "Invalid refresh token" }));
		})
		.await;
	let (first, second, third) = tokio::join!(
		client.get("/appreciations"),
		client.get("/users/me"),
		client.get("/users/me/weekly-points"),
	);

	for result in [first, second, third] {
		assert!(matches!(
			result.expect_err("Every caller should share the rejection."),
			Error::RefreshRejected { status: 400, .. }
		));
	}

	refresh.assert_calls_async(1).await;

	assert_eq!(store.refresh_token(), None);
	assert_eq!(client.refresh_metrics().coalesced(), 2);
	assert_eq!(*seen.lock(), vec![InvalidationReason::RefreshRejected]);
}

#[tokio::test]
async fn server_errors_surface_without_refreshing() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), Some(("A1", "R1")));
	let resource = server
		.mock_async(|when, then| {
			when.method(POST).path("/appreciations").json_body(json!({ "points": 5 }));
			then.status(500).body("database unavailable");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "A2", "refreshToken": "R2" }));
		})
		.await;
	let err = client
		.post("/appreciations", &json!({ "points": 5 }))
		.await
		.expect_err("Server error should surface.");

	resource.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	match err {
		Error::Upstream { status, message } => {
			assert_eq!(status, 500);
			assert_eq!(message, "database unavailable");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(store.access_token(), Some(TokenSecret::new("A1")));
}

#[tokio::test]
async fn second_401_after_refresh_is_terminal() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), Some(("A1", "R1")));
	let seen = track_invalidations(&client);
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/users/me");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "accessToken": "A2", "refreshToken": "R2" }));
		})
		.await;
	let err = client.get("/users/me").await.expect_err("Replay rejection should be terminal.");

	resource.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert!(matches!(err, Error::RetryExhausted));
	assert_eq!(store.access_token(), None);
	assert_eq!(*seen.lock(), vec![InvalidationReason::RetryExhausted]);
}

#[tokio::test]
async fn public_requests_skip_the_refresh_flow() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), Some(("A1", "R1")));
	let resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/leaderboard").header_missing("authorization");
			then.status(401).json_body(json!({ "message": "Sign in to view" }));
		})
		.await;
	let err = client
		.execute(ApiRequest::get("/leaderboard").skip_auth())
		.await
		.expect_err("Public 401 should surface.");

	resource.assert_calls_async(1).await;

	assert!(matches!(err, Error::Upstream { status: 401, .. }));
	assert_eq!(store.refresh_token(), Some(TokenSecret::new("R1")));
	assert_eq!(client.refresh_metrics().attempts(), 0);
}

#[tokio::test]
async fn sign_in_stores_the_issued_pair() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), None);
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/login")
				.header_missing("authorization")
				.json_body(json!({ "email": "ana@example.com", "password": "hunter2" }));
			then.status(200).json_body(json!({
				"accessToken": "A1",
				"refreshToken": "R1",
				"user": { "id": "u-1" }
			}));
		})
		.await;
	let pair = client
		.sign_in(&json!({ "email": "ana@example.com", "password": "hunter2" }))
		.await
		.expect("Sign-in should succeed.");

	login.assert_calls_async(1).await;

	assert_eq!(pair.access_token.expose(), "A1");
	assert!(client.is_authenticated());
	assert_eq!(store.refresh_token(), Some(TokenSecret::new("R1")));

	client.sign_out();

	assert!(!client.is_authenticated());
}

#[tokio::test]
async fn failed_sign_in_surfaces_upstream_error() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url(), None);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401).json_body(json!({ "error": "Invalid credentials" }));
		})
		.await;

	let err = client
		.sign_in(&json!({ "email": "ana@example.com", "password": "wrong" }))
		.await
		.expect_err("Bad credentials should fail.");

	match err {
		Error::Upstream { status, message } => {
			assert_eq!(status, 401);
			assert_eq!(message, "Invalid credentials");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(store.access_token(), None);
	assert_eq!(client.refresh_metrics().attempts(), 0);
}
