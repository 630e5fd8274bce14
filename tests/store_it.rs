// std
use std::{env, process, sync::Arc};
// crates.io
use time::Duration;
// self
use appreciation_client::{
	auth::{TokenPair, TokenSecret},
	store::{CookiePolicy, CredentialStore, FileStore, MemoryStore},
};

fn secret(value: &str) -> Option<TokenSecret> {
	Some(TokenSecret::new(value))
}

#[test]
fn memory_store_replaces_and_clears_the_pair() {
	let store = MemoryStore::default();

	assert_eq!(store.access_token(), None);

	store.replace(TokenPair::new("A1", "R1"));
	store.set_access_token(TokenSecret::new("A1b"));

	assert_eq!(store.access_token(), secret("A1b"));
	assert_eq!(store.refresh_token(), secret("R1"));

	store.clear();
	store.clear();

	assert_eq!(store.access_token(), None);
	assert_eq!(store.refresh_token(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replacements_never_expose_a_mixed_pair() {
	let store = Arc::new(MemoryStore::default());

	store.replace(TokenPair::new("A0", "R0"));

	let writers = (1..=8).map(|round| {
		let store = store.clone();

		tokio::spawn(async move {
			store.replace(TokenPair::new(format!("A{round}"), format!("R{round}")));
		})
	});
	let readers = (0..8).map(|_| {
		let store = store.clone();

		tokio::spawn(async move {
			for _ in 0..100 {
				let snapshot = store.snapshot();
				let access = snapshot.access_token.expect("Access slot should stay filled.");
				let refresh = snapshot.refresh_token.expect("Refresh slot should stay filled.");

				assert_eq!(access.secret.expose()[1..], refresh.secret.expose()[1..]);
			}
		})
	});
	let handles = writers.chain(readers).collect::<Vec<_>>();

	for handle in handles {
		handle.await.expect("Store task should not panic.");
	}
}

#[test]
fn expired_cookies_read_as_absent() {
	let policy = CookiePolicy::new(Duration::ZERO, Duration::days(1));
	let store = MemoryStore::with_policy(policy);

	store.replace(TokenPair::new("A1", "R1"));

	assert_eq!(store.access_token(), None);
	assert_eq!(store.refresh_token(), secret("R1"));
}

#[test]
fn file_store_survives_reopen() {
	let path = env::temp_dir()
		.join(format!("appreciation-client-store-it-{}", process::id()))
		.join("session.json");

	{
		let store = FileStore::open(path.clone()).expect("File store should open.");

		store.replace(TokenPair::new("A1", "R1"));
	}

	let reopened = FileStore::open(path.clone()).expect("File store should reopen.");

	assert_eq!(reopened.access_token(), secret("A1"));
	assert_eq!(reopened.refresh_token(), secret("R1"));

	reopened.clear();

	let cleared = FileStore::open(path.clone()).expect("File store should reopen after clear.");

	assert_eq!(cleared.refresh_token(), None);

	let _ = std::fs::remove_dir_all(path.parent().expect("Store path should have a parent."));
}
