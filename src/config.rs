//! Client configuration and its validating builder.

// self
use crate::{_prelude::*, error::ConfigError};

/// Default sentinel the backend returns for rejected login credentials.
pub const DEFAULT_CREDENTIALS_SENTINEL: &str = "Invalid username or password";

/// Errors raised while building a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ConfigBuildError {
	/// Base URL cannot have paths joined onto it (e.g. `mailto:`).
	#[error("API base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Base URL must use HTTP or HTTPS.
	#[error("API base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Endpoint paths must not be blank.
	#[error("The {endpoint} endpoint path cannot be blank.")]
	BlankEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// The sentinel must not be blank.
	#[error("Credentials sentinel cannot be blank.")]
	BlankSentinel,
	/// Timeouts must be positive.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
}

/// Backend paths used by the client's own flows, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointPaths {
	/// Token refresh endpoint.
	pub refresh: String,
	/// Login endpoint.
	pub login: String,
	/// Registration endpoint.
	pub register: String,
	/// Logout endpoint.
	pub logout: String,
}
impl Default for EndpointPaths {
	fn default() -> Self {
		Self {
			refresh: "token/refresh/".into(),
			login: "login/".into(),
			register: "register/".into(),
			logout: "logout/".into(),
		}
	}
}

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// API base URL; always ends with `/` so relative paths join beneath it.
	pub base_url: Url,
	/// Paths of the endpoints the client calls on its own.
	pub endpoints: EndpointPaths,
	/// Message that marks a 401 as "wrong credentials" rather than "session expired".
	pub credentials_sentinel: String,
	/// Per-request timeout; `None` waits indefinitely.
	pub timeout: Option<Duration>,
}
impl ClientConfig {
	/// Creates a builder for the provided API base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `path` beneath the base URL. A leading `/` is ignored so `"/login/"` and
	/// `"login/"` address the same endpoint; absolute URLs are used as-is.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let relative = path.trim_start_matches('/');

		self.base_url
			.join(relative)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// API base URL.
	pub base_url: Url,
	/// Endpoint paths.
	pub endpoints: EndpointPaths,
	/// Invalid-credentials sentinel.
	pub credentials_sentinel: String,
	/// Optional request timeout.
	pub timeout: Option<Duration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: EndpointPaths::default(),
			credentials_sentinel: DEFAULT_CREDENTIALS_SENTINEL.into(),
			timeout: None,
		}
	}

	/// Overrides the token refresh path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the login path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the registration path.
	pub fn register_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.register = path.into();

		self
	}

	/// Overrides the logout path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = path.into();

		self
	}

	/// Overrides the invalid-credentials sentinel.
	pub fn credentials_sentinel(mut self, sentinel: impl Into<String>) -> Self {
		self.credentials_sentinel = sentinel.into();

		self
	}

	/// Bounds every request, refresh calls included.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigBuildError> {
		let mut base_url = self.base_url;

		if base_url.cannot_be_a_base() {
			return Err(ConfigBuildError::CannotBeABase { url: base_url.to_string() });
		}
		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigBuildError::UnsupportedScheme { url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		validate_path("refresh", &self.endpoints.refresh)?;
		validate_path("login", &self.endpoints.login)?;
		validate_path("register", &self.endpoints.register)?;
		validate_path("logout", &self.endpoints.logout)?;

		if self.credentials_sentinel.trim().is_empty() {
			return Err(ConfigBuildError::BlankSentinel);
		}
		if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ConfigBuildError::ZeroTimeout);
		}

		Ok(ClientConfig {
			base_url,
			endpoints: self.endpoints,
			credentials_sentinel: self.credentials_sentinel,
			timeout: self.timeout,
		})
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ConfigBuildError> {
	if path.trim().trim_matches('/').is_empty() {
		Err(ConfigBuildError::BlankEndpoint { endpoint })
	} else {
		Ok(())
	}
}
