//! Durable key/value persistence for session state, plus built-in backends.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Key of the persisted token record.
pub const AUTH_KEY: &str = "auth";
/// Key of the persisted guest record.
pub const GUEST_KEY: &str = "guest";

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for JSON-serialized session entries.
///
/// Entries must survive for the life of the profile the store represents; a [`FileStore`]
/// reopened over the same path sees exactly what the previous instance wrote.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the entry stored under `key`, if present.
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<JsonValue>>;

	/// Persists or replaces the entry stored under `key`.
	fn save<'a>(&'a self, key: &'a str, value: JsonValue) -> StoreFuture<'a, ()>;

	/// Deletes the entry stored under `key`; succeeds when nothing was stored.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Decodes a typed entry, mapping decoder failures into [`StoreError::Serialization`].
pub(crate) fn decode<T>(key: &str, value: JsonValue) -> Result<T, StoreError>
where
	T: for<'de> Deserialize<'de>,
{
	serde_json::from_value(value).map_err(|e| StoreError::Serialization {
		message: format!("Failed to decode `{key}` entry: {e}"),
	})
}

/// Encodes a typed entry, mapping encoder failures into [`StoreError::Serialization`].
pub(crate) fn encode<T>(key: &str, value: &T) -> Result<JsonValue, StoreError>
where
	T: Serialize,
{
	serde_json::to_value(value).map_err(|e| StoreError::Serialization {
		message: format!("Failed to encode `{key}` entry: {e}"),
	})
}
