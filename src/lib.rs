//! Authenticated storefront API client: guest identities, durable token sessions, and
//! single-flight token refresh wrapped around every outgoing request.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		client::StorefrontClient,
		config::ClientConfig,
		session::{LogoutListener, LogoutReason, Session},
		store::{MemoryStore, SessionStore},
	};

	/// Logout listener that records every notification for later assertions.
	#[derive(Debug, Default)]
	pub struct RecordingLogout {
		calls: AtomicUsize,
		reasons: Mutex<Vec<LogoutReason>>,
	}
	impl RecordingLogout {
		/// Number of logout notifications observed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Reasons delivered with each notification, in order.
		pub fn reasons(&self) -> Vec<LogoutReason> {
			self.reasons.lock().clone()
		}
	}
	impl LogoutListener for RecordingLogout {
		fn logged_out(&self, reason: LogoutReason) {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.reasons.lock().push(reason);
		}
	}

	/// Fixture bundle returned by [`build_test_client`].
	pub struct TestClient {
		/// Client under test.
		pub client: StorefrontClient,
		/// Backing store shared with the client's session.
		pub store: Arc<MemoryStore>,
		/// Listener wired into the client's session.
		pub logout: Arc<RecordingLogout>,
	}

	/// Builds a client pointed at `base` (usually an `httpmock` server URL) backed by an
	/// in-memory store and a recording logout listener.
	pub async fn build_test_client(base: &str) -> TestClient {
		let store = Arc::new(MemoryStore::default());

		build_test_client_with_store(base, store).await
	}

	/// Same as [`build_test_client`] but reuses a caller-provided store, e.g. one seeded with
	/// tokens before the session opens.
	pub async fn build_test_client_with_store(base: &str, store: Arc<MemoryStore>) -> TestClient {
		let backend: Arc<dyn SessionStore> = store.clone();
		let logout = Arc::new(RecordingLogout::default());
		let listener: Arc<dyn LogoutListener> = logout.clone();
		let session = Session::open(backend)
			.await
			.expect("Failed to open test session over the in-memory store.")
			.with_listener(listener);
		let config = ClientConfig::builder(
			Url::parse(base).expect("Mock server base URL should parse successfully."),
		)
		.build()
		.expect("Test client configuration should build successfully.");
		let client = StorefrontClient::new(config, Arc::new(session))
			.expect("Failed to build storefront client for tests.");

		TestClient { client, store, logout }
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, Method, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
