//! Thread-safe in-memory [`SessionStore`] implementation for tests and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, JsonValue>>>;

/// Storage backend that keeps entries in-process.
///
/// Clones share the same map, so a clone handed to a second [`Session`](crate::session::Session)
/// behaves like a reload of the same profile.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Synchronous snapshot of an entry, handy for assertions.
	pub fn peek(&self, key: &str) -> Option<JsonValue> {
		self.0.read().get(key).cloned()
	}

	/// Synchronously seeds an entry, e.g. tokens from a previous visit.
	pub fn seed(&self, key: impl Into<String>, value: JsonValue) {
		self.0.write().insert(key.into(), value);
	}
}
impl SessionStore for MemoryStore {
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<JsonValue>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn save<'a>(&'a self, key: &'a str, value: JsonValue) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key.to_owned(), value);

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(key);

			Ok(())
		})
	}
}
