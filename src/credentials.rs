//! Access/refresh credential storage split across an in-process cache and a durable medium.
//!
//! The in-process access token, when set, wins over the durable copy. The refresh token is only
//! ever read from durable storage. Every operation is best-effort: storage failures are logged
//! and degrade to "no token", and a client built without a durable medium simply never finds
//! one.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	obs::trace_event,
	store::{DurableStore, StoredEntry},
};

/// Durable entry name holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Durable entry name holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Credential pair storage shared by the executor and refresh coordinator.
pub struct CredentialStore {
	durable: Option<Arc<dyn DurableStore>>,
	cached_access: RwLock<Option<TokenSecret>>,
	path: String,
	max_ttl: Duration,
}
impl CredentialStore {
	/// Creates a store over an optional durable medium.
	///
	/// `path` scopes the persisted entries; `max_ttl` bounds every persisted lifetime.
	pub fn new(
		durable: Option<Arc<dyn DurableStore>>,
		path: impl Into<String>,
		max_ttl: Duration,
	) -> Self {
		Self { durable, cached_access: RwLock::new(None), path: path.into(), max_ttl }
	}

	/// Returns the in-process access token, falling back to the durable copy.
	pub async fn access_token(&self) -> Option<TokenSecret> {
		let cached = self.cached_access.read().clone();

		if cached.is_some() {
			return cached;
		}

		self.read_durable(ACCESS_TOKEN_KEY).await
	}

	/// Returns the in-process access token only, without consulting durable storage.
	pub(crate) fn cached_access_token(&self) -> Option<TokenSecret> {
		self.cached_access.read().clone()
	}

	/// Replaces the in-process access token without touching durable storage.
	pub fn set_access_token(&self, token: impl Into<TokenSecret>) {
		*self.cached_access.write() = Some(token.into());
	}

	/// Returns the durable refresh token, if one is stored.
	pub async fn refresh_token(&self) -> Option<TokenSecret> {
		self.read_durable(REFRESH_TOKEN_KEY).await
	}

	/// Persists the token pair and refreshes the in-process access cache.
	///
	/// The access entry lives for `ttl` when supplied; both entries are capped at the configured
	/// maximum lifetime. A `None` refresh token leaves the stored one untouched.
	pub async fn persist_tokens(
		&self,
		access: &TokenSecret,
		refresh: Option<&TokenSecret>,
		ttl: Option<Duration>,
	) {
		let access_ttl =
			ttl.filter(|t| t.is_positive()).map_or(self.max_ttl, |t| t.min(self.max_ttl));

		*self.cached_access.write() = Some(access.clone());

		self.write_durable(StoredEntry::new(
			ACCESS_TOKEN_KEY,
			access.expose(),
			self.path.as_str(),
			access_ttl,
		))
		.await;

		if let Some(refresh) = refresh {
			self.write_durable(StoredEntry::new(
				REFRESH_TOKEN_KEY,
				refresh.expose(),
				self.path.as_str(),
				self.max_ttl,
			))
			.await;
		}
	}

	/// Drops both tokens from the cache and expires them in durable storage.
	pub async fn clear(&self) {
		self.cached_access.write().take();

		self.write_durable(StoredEntry::expired(ACCESS_TOKEN_KEY, self.path.as_str())).await;
		self.write_durable(StoredEntry::expired(REFRESH_TOKEN_KEY, self.path.as_str())).await;
	}

	async fn read_durable(&self, name: &str) -> Option<TokenSecret> {
		let store = self.durable.as_ref()?;

		match store.read(name, &self.path).await {
			Ok(entry) => entry.filter(|e| !e.value.is_empty()).map(|e| TokenSecret::new(e.value)),
			Err(e) => {
				trace_event!(warn, "Failed to read credential entry `{name}`: {e}");

				None
			},
		}
	}

	async fn write_durable(&self, entry: StoredEntry) {
		let Some(store) = self.durable.as_ref() else {
			return;
		};
		let name = entry.name.clone();

		if let Err(e) = store.write(entry).await {
			trace_event!(warn, "Failed to write credential entry `{name}`: {e}");
		}
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore")
			.field("durable", &self.durable.is_some())
			.field("cached_access_set", &self.cached_access.read().is_some())
			.field("path", &self.path)
			.field("max_ttl", &self.max_ttl)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::{MemoryStore, StoreError, StoreFuture};

	fn store_with_memory() -> (CredentialStore, Arc<MemoryStore>) {
		let memory = Arc::new(MemoryStore::default());
		let durable: Arc<dyn DurableStore> = memory.clone();

		(CredentialStore::new(Some(durable), "/", Duration::days(7)), memory)
	}

	#[tokio::test]
	async fn in_process_token_wins_over_durable_copy() {
		let (store, _) = store_with_memory();

		store
			.persist_tokens(&TokenSecret::new("durable"), Some(&TokenSecret::new("refresh")), None)
			.await;
		store.set_access_token("in-process");

		assert_eq!(store.access_token().await.as_ref().map(TokenSecret::expose), Some("in-process"));
		assert_eq!(store.refresh_token().await.as_ref().map(TokenSecret::expose), Some("refresh"));
	}

	#[tokio::test]
	async fn set_access_token_does_not_touch_durable_storage() {
		let (store, memory) = store_with_memory();

		store.set_access_token("memory-only");

		assert!(memory.live_entries().is_empty());
	}

	#[tokio::test]
	async fn durable_copy_is_read_after_restart() {
		let memory = Arc::new(MemoryStore::default());
		let first = CredentialStore::new(Some(memory.clone()), "/", Duration::days(7));

		first.persist_tokens(&TokenSecret::new("a-1"), Some(&TokenSecret::new("r-1")), None).await;

		let second = CredentialStore::new(Some(memory), "/", Duration::days(7));

		assert_eq!(second.access_token().await.as_ref().map(TokenSecret::expose), Some("a-1"));
	}

	#[tokio::test]
	async fn persisted_lifetimes_are_capped() {
		let (store, memory) = store_with_memory();

		store
			.persist_tokens(
				&TokenSecret::new("a"),
				Some(&TokenSecret::new("r")),
				Some(Duration::days(30)),
			)
			.await;

		let horizon = OffsetDateTime::now_utc() + Duration::days(7);

		for entry in memory.live_entries() {
			assert!(entry.expires_at <= horizon, "{entry:?} outlives the configured maximum.");
		}

		store
			.persist_tokens(&TokenSecret::new("a"), Some(&TokenSecret::new("r")), Some(Duration::minutes(15)))
			.await;

		let access = memory
			.read(ACCESS_TOKEN_KEY, "/")
			.await
			.expect("Memory store read should succeed.")
			.expect("Access entry should be present.");

		assert!(access.expires_at <= OffsetDateTime::now_utc() + Duration::minutes(15));
	}

	#[tokio::test]
	async fn clear_is_idempotent() {
		let (store, memory) = store_with_memory();

		store.clear().await;
		store.clear().await;

		assert!(memory.live_entries().is_empty());
		assert!(store.access_token().await.is_none());

		store.persist_tokens(&TokenSecret::new("a"), Some(&TokenSecret::new("r")), None).await;
		store.clear().await;

		assert!(memory.live_entries().is_empty());
		assert!(store.access_token().await.is_none());
		assert!(store.refresh_token().await.is_none());
	}

	#[tokio::test]
	async fn missing_medium_degrades_to_no_token() {
		let store = CredentialStore::new(None, "/", Duration::days(7));

		assert!(store.access_token().await.is_none());
		assert!(store.refresh_token().await.is_none());

		store.persist_tokens(&TokenSecret::new("a"), Some(&TokenSecret::new("r")), None).await;

		assert_eq!(store.access_token().await.as_ref().map(TokenSecret::expose), Some("a"));
		assert!(store.refresh_token().await.is_none());

		store.clear().await;

		assert!(store.access_token().await.is_none());
	}

	#[tokio::test]
	async fn failing_medium_degrades_to_no_token() {
		struct Broken;
		impl DurableStore for Broken {
			fn write(&self, _entry: StoredEntry) -> StoreFuture<'_, ()> {
				Box::pin(async { Err(StoreError::Backend { message: "read-only".into() }) })
			}

			fn read<'a>(
				&'a self,
				_name: &'a str,
				_path: &'a str,
			) -> StoreFuture<'a, Option<StoredEntry>> {
				Box::pin(async { Err(StoreError::Backend { message: "unavailable".into() }) })
			}
		}

		let store = CredentialStore::new(Some(Arc::new(Broken)), "/", Duration::days(7));

		assert!(store.refresh_token().await.is_none());

		store.persist_tokens(&TokenSecret::new("a"), Some(&TokenSecret::new("r")), None).await;
		store.clear().await;

		assert!(store.access_token().await.is_none());
	}
}
