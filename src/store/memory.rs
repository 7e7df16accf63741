//! Thread-safe in-memory [`DurableStore`] for tests and embedded hosts.

// self
use crate::{
	_prelude::*,
	store::{DurableStore, StoreError, StoreFuture, StoreKey, StoredEntry},
};

type EntryMap = Arc<RwLock<HashMap<StoreKey, StoredEntry>>>;

/// Storage backend that keeps entries in-process, shared across clones.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(EntryMap);
impl MemoryStore {
	/// Returns every entry that has not yet expired.
	pub fn live_entries(&self) -> Vec<StoredEntry> {
		let now = OffsetDateTime::now_utc();

		self.0.read().values().filter(|entry| entry.is_live_at(now)).cloned().collect()
	}

	fn write_now(map: EntryMap, entry: StoredEntry) -> Result<(), StoreError> {
		map.write().insert(entry.key(), entry);

		Ok(())
	}

	fn read_now(map: EntryMap, key: StoreKey) -> Option<StoredEntry> {
		let now = OffsetDateTime::now_utc();

		map.read().get(&key).filter(|entry| entry.is_live_at(now)).cloned()
	}
}
impl DurableStore for MemoryStore {
	fn write(&self, entry: StoredEntry) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::write_now(map, entry) })
	}

	fn read<'a>(&'a self, name: &'a str, path: &'a str) -> StoreFuture<'a, Option<StoredEntry>> {
		let map = self.0.clone();
		let key = StoreKey::new(name, path);

		Box::pin(async move { Ok(Self::read_now(map, key)) })
	}
}
