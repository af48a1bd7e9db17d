//! Session context: token store, guest identity, and the logout side effect, owned by one
//! explicitly constructed value instead of process-wide globals.

pub mod guest;
pub mod logout;
pub mod tokens;

pub use guest::GuestIdentity;
pub use logout::*;
pub use tokens::TokenStore;

// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreError},
};

/// Shared session state consumed by [`StorefrontClient`](crate::client::StorefrontClient).
pub struct Session {
	store: Arc<dyn SessionStore>,
	tokens: TokenStore,
	guest: GuestIdentity,
	listener: Arc<dyn LogoutListener>,
}
impl Session {
	/// Opens a session over `store`, loading any tokens persisted by an earlier visit.
	pub async fn open(store: Arc<dyn SessionStore>) -> Result<Self, StoreError> {
		let tokens = TokenStore::open(store.clone()).await?;
		let guest = GuestIdentity::new(store.clone());

		Ok(Self { store, tokens, guest, listener: Arc::new(NoopLogout) })
	}

	/// Installs the listener notified whenever the session is torn down.
	pub fn with_listener(mut self, listener: Arc<dyn LogoutListener>) -> Self {
		self.listener = listener;

		self
	}

	/// Token store backing this session.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Guest identity provider backing this session.
	pub fn guest(&self) -> &GuestIdentity {
		&self.guest
	}

	/// Raw storage backend.
	pub fn store(&self) -> &Arc<dyn SessionStore> {
		&self.store
	}

	/// Clears tokens and the guest identity, then notifies the listener.
	///
	/// The listener is notified even when a storage write fails; the first storage error is
	/// returned afterwards.
	pub async fn logout(&self, reason: LogoutReason) -> Result<(), StoreError> {
		let tokens = self.tokens.clear().await;
		let guest = self.guest.clear().await;

		tracing::info!(reason = reason.as_str(), "Session logged out.");
		self.listener.logged_out(reason);

		tokens.and(guest)
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("authenticated", &self.tokens.record().is_authenticated())
			.finish()
	}
}
