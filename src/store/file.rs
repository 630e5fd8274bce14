//! File-backed [`CredentialStore`] that survives process restarts.

// std
#[cfg(unix)] use std::{fs::Permissions, os::unix::fs::PermissionsExt};
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	store::{CookiePolicy, CredentialStore, Credentials, StoreError, now},
};

/// Persists the credential pair to a JSON file after each mutation.
///
/// The in-memory copy is authoritative. A failed write is logged and the mutation still takes
/// effect for the running process, so the trait stays total.
#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
	policy: CookiePolicy,
	inner: RwLock<Credentials>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		Self::open_with_policy(path, CookiePolicy::default())
	}

	/// Same as [`FileStore::open`] with custom cookie lifetimes.
	pub fn open_with_policy(
		path: impl Into<PathBuf>,
		policy: CookiePolicy,
	) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, policy, inner: RwLock::new(snapshot) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Credentials, StoreError> {
		if !path.exists() {
			return Ok(Credentials::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(Credentials::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Credentials) -> Result<(), StoreError> {
		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credentials: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			// Owner-only before any secret is written.
			#[cfg(unix)]
			file.set_permissions(Permissions::from_mode(0o600)).map_err(|e| {
				StoreError::Backend {
					message: format!("Failed to restrict {}: {e}", tmp_path.display()),
				}
			})?;
			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn mutate(&self, apply: impl FnOnce(&mut Credentials)) {
		let mut guard = self.inner.write();

		apply(&mut guard);

		if let Err(e) = self.persist_locked(&guard) {
			#[cfg(feature = "tracing")]
			tracing::warn!(
				path = %self.path.display(),
				error = %e,
				"credential store write failed"
			);
			#[cfg(not(feature = "tracing"))]
			let _ = e;
		}
	}
}
impl CredentialStore for FileStore {
	fn access_token(&self) -> Option<TokenSecret> {
		self.inner.read().access_at(now())
	}

	fn refresh_token(&self) -> Option<TokenSecret> {
		self.inner.read().refresh_at(now())
	}

	fn set_access_token(&self, token: TokenSecret) {
		self.mutate(|credentials| credentials.set_access(&self.policy, token));
	}

	fn set_refresh_token(&self, token: TokenSecret) {
		self.mutate(|credentials| credentials.set_refresh(&self.policy, token));
	}

	fn replace(&self, pair: TokenPair) {
		self.mutate(|credentials| credentials.replace(&self.policy, pair));
	}

	fn clear(&self) {
		self.mutate(Credentials::clear);
	}
}
