//! Signs in against a running appreciation service and calls a protected endpoint.
//!
//! 1. Point `APPRECIATION_API_URL` at the service (defaults to `http://localhost:3000`).
//! 2. Export `APPRECIATION_EMAIL` and `APPRECIATION_PASSWORD`.
//! 3. Run `cargo run --example authenticated_session`.
//!
//! Tokens are persisted next to the system temp dir, so a second run reuses the session and
//! exercises the refresh path once the access token expires server-side.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::WrapErr};
use serde_json::json;
// self
use appreciation_client::{
	client::ReqwestAuthClient,
	config::ClientConfig,
	store::{CredentialStore, FileStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::from_env()?;
	let store_path = env::temp_dir().join("appreciation-client-demo.json");
	let store: Arc<dyn CredentialStore> =
		Arc::new(FileStore::open_with_policy(store_path.clone(), config.cookie_policy)?);
	let client = ReqwestAuthClient::new(config, store)?;

	client.on_invalidate(|reason| println!("Session ended ({reason}); sign in again."));

	if !client.is_authenticated() {
		let email = env::var("APPRECIATION_EMAIL").wrap_err("APPRECIATION_EMAIL is not set")?;
		let password =
			env::var("APPRECIATION_PASSWORD").wrap_err("APPRECIATION_PASSWORD is not set")?;

		client.sign_in(&json!({ "email": email, "password": password })).await?;

		println!("Signed in; tokens stored at {}.", store_path.display());
	}

	let me = client.get("/users/me").await?;

	println!("Current user: {}.", me.as_json().map(|v| v.to_string()).unwrap_or_default());

	let metrics = client.refresh_metrics();

	println!(
		"Refresh attempts: {}, coalesced waiters: {}, reused tokens: {}.",
		metrics.attempts(),
		metrics.coalesced(),
		metrics.reused()
	);

	Ok(())
}
