//! Authenticated HTTP client for the appreciation service: bearer attachment, single-flight
//! token refresh, one-shot replay, and session invalidation in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Helpers for tests that drive a reqwest-backed client against a mock server; compiled
	//! under `cfg(test)` or with the `test` feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::ReqwestAuthClient,
		config::ClientConfig,
		store::{CredentialStore, MemoryStore},
	};

	/// Builds a [`ClientConfig`] pointing at a mock server base URL.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::builder()
			.base_url(Url::parse(base_url).expect("Mock server base URL should parse."))
			.build()
			.expect("Test client configuration should be valid.")
	}

	/// Constructs a reqwest-backed client over an in-memory store seeded with `pair`.
	pub fn build_reqwest_test_client(
		base_url: &str,
		pair: Option<(&str, &str)>,
	) -> (ReqwestAuthClient, Arc<MemoryStore>) {
		let config = test_config(base_url);
		let store_backend = Arc::new(MemoryStore::with_policy(config.cookie_policy));

		if let Some((access, refresh)) = pair {
			store_backend.replace(crate::auth::TokenPair::new(access, refresh));
		}

		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let client = ReqwestAuthClient::new(config, store)
			.expect("Reqwest test client should build.");

		(client, store_backend)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
