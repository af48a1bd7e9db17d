//! Token store: the in-memory view of the persisted `auth` entry.

// self
use crate::{
	_prelude::*,
	auth::{AuthRecord, TokenPair, TokenSecret},
	store::{self, AUTH_KEY, SessionStore, StoreError},
};

/// Publishes the current token pair and persists every change before it becomes visible.
///
/// Writes are serialized, so a reader that observes a pair after `set` resolves sees exactly
/// what was persisted.
pub struct TokenStore {
	store: Arc<dyn SessionStore>,
	current: RwLock<AuthRecord>,
	writes: AsyncMutex<()>,
}
impl TokenStore {
	/// Loads the persisted record. A missing or undecodable entry opens as an empty session.
	pub async fn open(store: Arc<dyn SessionStore>) -> Result<Self, StoreError> {
		let current = match store.load(AUTH_KEY).await? {
			Some(value) => store::decode::<AuthRecord>(AUTH_KEY, value).unwrap_or_else(|err| {
				tracing::warn!(error = %err, "Ignoring unreadable auth entry.");

				AuthRecord::default()
			}),
			None => AuthRecord::default(),
		};

		Ok(Self { store, current: RwLock::new(current), writes: AsyncMutex::new(()) })
	}

	/// Snapshot of the full record, profile fields included.
	pub fn record(&self) -> AuthRecord {
		self.current.read().clone()
	}

	/// Current pair when both tokens are present.
	pub fn tokens(&self) -> Option<TokenPair> {
		self.current.read().tokens()
	}

	/// Current access token.
	pub fn access(&self) -> Option<TokenSecret> {
		self.current.read().access().cloned()
	}

	/// Current refresh token.
	pub fn refresh(&self) -> Option<TokenSecret> {
		self.current.read().refresh().cloned()
	}

	/// Persists and publishes a new pair, keeping profile fields.
	pub async fn set(&self, pair: TokenPair) -> Result<(), StoreError> {
		let _write = self.writes.lock().await;
		let next = self.record().with_tokens(pair);

		self.commit(next).await
	}

	/// Persists and publishes a whole record (login/registration bundle).
	pub async fn replace(&self, record: AuthRecord) -> Result<(), StoreError> {
		let _write = self.writes.lock().await;

		self.commit(record).await
	}

	/// Persists an empty record.
	pub async fn clear(&self) -> Result<(), StoreError> {
		let _write = self.writes.lock().await;

		self.commit(AuthRecord::cleared()).await
	}

	async fn commit(&self, record: AuthRecord) -> Result<(), StoreError> {
		let encoded = store::encode(AUTH_KEY, &record)?;

		self.store.save(AUTH_KEY, encoded).await?;
		*self.current.write() = record;

		Ok(())
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore").field("current", &*self.current.read()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[tokio::test]
	async fn open_reads_persisted_tokens() {
		let backend = MemoryStore::default();

		backend.seed(AUTH_KEY, serde_json::json!({ "access": "old", "refresh": "r1", "id": 4 }));

		let tokens =
			TokenStore::open(Arc::new(backend.clone())).await.expect("Token store should open.");

		assert_eq!(tokens.tokens(), Some(TokenPair::new("old", "r1")));
		assert_eq!(tokens.record().profile.get("id"), Some(&serde_json::json!(4)));
	}

	#[tokio::test]
	async fn unreadable_entry_opens_empty() {
		let backend = MemoryStore::default();

		backend.seed(AUTH_KEY, serde_json::json!({ "access": 12 }));

		let tokens =
			TokenStore::open(Arc::new(backend)).await.expect("Token store should still open.");

		assert!(tokens.access().is_none());
		assert!(tokens.refresh().is_none());
	}

	#[tokio::test]
	async fn set_persists_before_publishing() {
		let backend = MemoryStore::default();
		let tokens = TokenStore::open(Arc::new(backend.clone()))
			.await
			.expect("Token store should open over an empty backend.");

		tokens.set(TokenPair::new("new", "r1")).await.expect("Set should persist the pair.");

		assert_eq!(tokens.access().map(|s| s.expose().to_owned()), Some("new".into()));
		assert_eq!(
			backend.peek(AUTH_KEY),
			Some(serde_json::json!({ "access": "new", "refresh": "r1" }))
		);

		tokens.clear().await.expect("Clear should persist an empty record.");

		assert!(tokens.tokens().is_none());
		assert_eq!(backend.peek(AUTH_KEY), Some(serde_json::json!({})));
	}
}
