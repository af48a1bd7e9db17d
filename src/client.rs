//! The storefront client: request executor, refresh coordinator, and account helpers.

pub mod account;
pub mod refresh;
pub mod request;

pub use refresh::*;

// self
use crate::{
	_prelude::*, config::ClientConfig, error::ConfigError, http::ReqwestHttpClient, session::Session,
};

/// Authenticated client for the storefront REST backend.
///
/// Every call reads the current guest identifier and tokens from the shared [`Session`], and a
/// 401 runs exactly one refresh-and-retry cycle. Clones share the session, the refresh
/// coordinator, and the metrics, so concurrent calls from any clone join the same refresh.
#[derive(Clone)]
pub struct StorefrontClient {
	/// Validated configuration.
	pub config: ClientConfig,
	/// HTTP client wrapper used for every outbound request.
	pub http_client: ReqwestHttpClient,
	/// Session context holding tokens and the guest identity.
	pub session: Arc<Session>,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	coordinator: Arc<RefreshCoordinator>,
}
impl StorefrontClient {
	/// Creates a client with its own reqwest transport built from `config`.
	pub fn new(config: ClientConfig, session: Arc<Session>) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Ok(Self::with_http_client(config, session, http_client))
	}

	/// Creates a client that reuses a caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		session: Arc<Session>,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self {
			config,
			http_client,
			session,
			refresh_metrics: Default::default(),
			coordinator: Default::default(),
		}
	}

	/// Returns `true` while a token refresh is on the wire.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.is_in_flight()
	}
}
impl Debug for StorefrontClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StorefrontClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("session", &self.session)
			.finish()
	}
}
