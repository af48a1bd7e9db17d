//! Transport primitives: the reqwest wrapper, outgoing payload shapes, and tolerant response
//! parsing.
//!
//! [`RequestOptions`] describes one call (body, content type, and whether the access and
//! refresh tokens travel with it). [`ResponseBody`] is the explicit result of parsing a
//! response: callers decide what an empty or malformed body means instead of treating it as a
//! failure.

pub mod payload;
pub mod response;

pub use payload::*;
pub use response::*;

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, config::ClientConfig, error::ConfigError};

/// Header carrying the anonymous visitor identifier (`Guest-Id`; header names are
/// case-insensitive and kept lowercase here).
pub const GUEST_ID_HEADER: &str = "guest-id";

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the configured request timeout.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self(builder.build()?))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ReqwestHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestHttpClient(..)")
	}
}
