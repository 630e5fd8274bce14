//! Client configuration: service base URL, auth endpoint paths, and refresh timing.

// self
use crate::{_prelude::*, error::ConfigError, store::CookiePolicy};

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "APPRECIATION_API_URL";
/// Local development address used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
/// Default path of the refresh endpoint relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
/// Default path of the login endpoint relative to the base URL.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
/// Suggested upper bound for a single refresh call; see [`ClientConfigBuilder::refresh_timeout`].
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(30);

/// Immutable, validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL shared by protected resources and the auth endpoints.
	pub base_url: Url,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Login endpoint path.
	pub login_path: String,
	/// Upper bound for one refresh call; `None` (the default) waits indefinitely.
	pub refresh_timeout: Option<Duration>,
	/// Lifetimes applied by stores built from this configuration.
	pub cookie_policy: CookiePolicy,
}
impl ClientConfig {
	/// Creates a new builder seeded with the defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Builds a configuration from [`BASE_URL_ENV`], falling back to [`DEFAULT_BASE_URL`].
	pub fn from_env() -> Result<Self, ConfigError> {
		let mut builder = Self::builder();

		if let Some(raw) = std::env::var(BASE_URL_ENV).ok().filter(|v| !v.trim().is_empty()) {
			builder = builder.base_url(parse_url(raw.trim())?);
		}

		builder.build()
	}

	/// Resolves `path` (which may carry a query string) against the base URL.
	///
	/// Unlike [`Url::join`], the base path is preserved: a base of `http://host/api` and a path
	/// of `/users` resolve to `http://host/api/users`.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let path = path.trim_start_matches('/');

		parse_url(&format!("{base}/{path}"))
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.refresh_path)
	}

	/// Absolute URL of the login endpoint.
	pub fn login_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.login_path)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
	/// Base URL override; [`DEFAULT_BASE_URL`] when unset.
	pub base_url: Option<Url>,
	/// Refresh path override.
	pub refresh_path: Option<String>,
	/// Login path override.
	pub login_path: Option<String>,
	/// Refresh timeout; unset by default.
	pub refresh_timeout: Option<Duration>,
	/// Cookie lifetime override.
	pub cookie_policy: Option<CookiePolicy>,
}
impl ClientConfigBuilder {
	/// Sets the base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = Some(path.into());

		self
	}

	/// Sets the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = Some(path.into());

		self
	}

	/// Bounds a single refresh call.
	///
	/// The bound is enforced with `tokio::time::timeout`, so every call that may refresh must
	/// then run inside a Tokio runtime with the time driver enabled.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Lets a refresh call wait indefinitely, clearing any earlier bound.
	pub fn without_refresh_timeout(mut self) -> Self {
		self.refresh_timeout = None;

		self
	}

	/// Sets the lifetimes applied to stored tokens.
	pub fn cookie_policy(mut self, policy: CookiePolicy) -> Self {
		self.cookie_policy = Some(policy);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = match self.base_url {
			Some(url) => url,
			None => parse_url(DEFAULT_BASE_URL)?,
		};
		let config = ClientConfig {
			base_url,
			refresh_path: self.refresh_path.unwrap_or_else(|| DEFAULT_REFRESH_PATH.into()),
			login_path: self.login_path.unwrap_or_else(|| DEFAULT_LOGIN_PATH.into()),
			refresh_timeout: self.refresh_timeout,
			cookie_policy: self.cookie_policy.unwrap_or_default(),
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		match self.base_url.scheme() {
			"http" | "https" => {},
			other => return Err(ConfigError::UnsupportedScheme { scheme: other.to_owned() }),
		}

		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::CannotBeABase { url: self.base_url.to_string() });
		}
		if self.refresh_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveRefreshTimeout);
		}
		if !self.cookie_policy.access_ttl.is_positive() {
			return Err(ConfigError::NonPositiveLifetime { token: "access" });
		}
		if !self.cookie_policy.refresh_ttl.is_positive() {
			return Err(ConfigError::NonPositiveLifetime { token: "refresh" });
		}

		self.refresh_url()?;
		self.login_url()?;

		Ok(())
	}
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })
}
