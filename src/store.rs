//! Durable, cookie-style storage contracts and built-in store implementations.
//!
//! Entries are addressed by `(name, path)` and carry an absolute expiry. Removal is expressed
//! as a write with an already-elapsed expiry so every reader observes the same outcome; stores
//! must never hand back an entry whose expiry has passed.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`DurableStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by durable credential stores.
pub trait DurableStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the entry addressed by its name + path.
	fn write(&self, entry: StoredEntry) -> StoreFuture<'_, ()>;

	/// Fetches the live entry for the name + path, if present and not yet expired.
	fn read<'a>(&'a self, name: &'a str, path: &'a str) -> StoreFuture<'a, Option<StoredEntry>>;
}

/// Named value with a path scope and a bounded lifetime.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
	/// Entry name (e.g. `access_token`).
	pub name: String,
	/// Entry value; treat as secret.
	pub value: String,
	/// Path scope the entry belongs to.
	pub path: String,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
}
impl StoredEntry {
	/// Builds an entry that lives for `ttl` from now.
	pub fn new(
		name: impl Into<String>,
		value: impl Into<String>,
		path: impl Into<String>,
		ttl: Duration,
	) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			path: path.into(),
			expires_at: OffsetDateTime::now_utc() + ttl,
		}
	}

	/// Builds an immediately-expired tombstone for the name + path.
	pub fn expired(name: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: String::new(),
			path: path.into(),
			expires_at: OffsetDateTime::UNIX_EPOCH,
		}
	}

	/// Returns `true` while the entry has not reached its expiry.
	pub fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Returns the key addressing this entry.
	pub fn key(&self) -> StoreKey {
		StoreKey::new(&self.name, &self.path)
	}
}
impl Debug for StoredEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StoredEntry")
			.field("name", &self.name)
			.field("value", &"<redacted>")
			.field("path", &self.path)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Error type produced by [`DurableStore`] implementations.
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

/// Unique key identifying a stored entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// Entry name.
	pub name: String,
	/// Path scope.
	pub path: String,
}
impl StoreKey {
	/// Builds a key for the provided name + path.
	pub fn new(name: &str, path: &str) -> Self {
		Self { name: name.to_owned(), path: path.to_owned() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn tombstones_are_never_live() {
		let now = OffsetDateTime::now_utc();
		let live = StoredEntry::new("access_token", "abc", "/", Duration::minutes(5));
		let dead = StoredEntry::expired("access_token", "/");

		assert!(live.is_live_at(now));
		assert!(!dead.is_live_at(now));
		assert_eq!(live.key(), dead.key());
	}

	#[test]
	fn entry_debug_redacts_value() {
		let entry = StoredEntry::new("refresh_token", "very-secret", "/", Duration::minutes(5));

		assert!(!format!("{entry:?}").contains("very-secret"));
	}
}
