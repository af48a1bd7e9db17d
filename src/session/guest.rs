//! Guest identity provider.

// self
use crate::{
	_prelude::*,
	auth::{GuestId, GuestRecord},
	store::{self, GUEST_KEY, SessionStore, StoreError},
};

/// Lazily creates, persists, and caches the anonymous visitor identifier.
///
/// The check, load, generate, and persist steps run under one async lock, so concurrent first
/// calls persist exactly one identifier.
pub struct GuestIdentity {
	store: Arc<dyn SessionStore>,
	cached: AsyncMutex<Option<GuestId>>,
}
impl GuestIdentity {
	/// Creates a provider over `store`; nothing is read until the first [`get`](Self::get).
	pub fn new(store: Arc<dyn SessionStore>) -> Self {
		Self { store, cached: AsyncMutex::new(None) }
	}

	/// Returns the cached identifier, else the persisted one, else a freshly generated one.
	pub async fn get(&self) -> Result<GuestId, StoreError> {
		let mut cached = self.cached.lock().await;

		if let Some(id) = cached.as_ref() {
			return Ok(id.clone());
		}
		if let Some(value) = self.store.load(GUEST_KEY).await? {
			match store::decode::<GuestRecord>(GUEST_KEY, value) {
				Ok(record) => {
					*cached = Some(record.guest_id.clone());

					return Ok(record.guest_id);
				},
				Err(err) => tracing::warn!(error = %err, "Replacing unreadable guest entry."),
			}
		}

		let guest_id = GuestId::generate();
		let record = GuestRecord { guest_id: guest_id.clone() };

		self.store.save(GUEST_KEY, store::encode(GUEST_KEY, &record)?).await?;
		tracing::debug!("Generated a new guest identifier.");

		*cached = Some(guest_id.clone());

		Ok(guest_id)
	}

	/// Drops the cached and the persisted identifier.
	pub async fn clear(&self) -> Result<(), StoreError> {
		let mut cached = self.cached.lock().await;

		*cached = None;

		self.store.remove(GUEST_KEY).await
	}
}
impl Debug for GuestIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GuestIdentity(..)")
	}
}
