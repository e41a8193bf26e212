//! Time-based memo cache shared by directory operations.

// std
use std::{any::Any, collections::HashMap, future::Future};
// crates.io
use tokio::sync::RwLock;
// self
use crate::{_prelude::*, cache::entry::CacheEntry, metrics};

type Slot = Arc<dyn Any + Send + Sync>;

/// Cache of supplier results keyed by request signature, each valid for its own TTL.
///
/// Expired entries are skipped on read and overwritten on the next successful computation;
/// nothing sweeps them in the background. Concurrent misses on the same key each run their
/// supplier, and the last one to finish wins.
#[derive(Clone, Debug, Default)]
pub struct MemoCache {
	entries: Arc<RwLock<HashMap<String, CacheEntry<Slot>>>>,
}
impl MemoCache {
	/// Create an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Return the live value stored under `key`, if it holds a `T`.
	pub async fn get<T>(&self, key: &str) -> Option<Arc<T>>
	where
		T: Any + Send + Sync,
	{
		let now = Instant::now();
		let slot = {
			let entries = self.entries.read().await;

			entries.get(key).filter(|entry| entry.is_live(now)).map(|entry| entry.value().clone())
		}?;

		slot.downcast::<T>().ok()
	}

	/// Store `value` under `key` until `now + ttl`, replacing any previous entry.
	pub async fn insert<T>(&self, key: impl Into<String>, value: Arc<T>, ttl: Duration)
	where
		T: Any + Send + Sync,
	{
		self.store(key.into(), value, Instant::now(), ttl).await;
	}

	/// Serve the live value for `key`, or run `supplier` and memoize its success.
	///
	/// The expiry is measured from the moment of the call. Supplier failures are not cached.
	pub async fn get_or_compute<T, F, Fut>(
		&self,
		key: &str,
		ttl: Duration,
		supplier: F,
	) -> Result<Arc<T>>
	where
		T: Any + Send + Sync,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let now = Instant::now();

		if let Some(value) = self.get::<T>(key).await {
			tracing::debug!(key, "memo cache hit");

			metrics::record_cache_lookup(namespace(key), true);

			return Ok(value);
		}

		tracing::debug!(key, "memo cache miss");

		metrics::record_cache_lookup(namespace(key), false);

		let value = Arc::new(supplier().await?);

		self.store(key.to_owned(), value.clone(), now, ttl).await;

		Ok(value)
	}

	/// Drop every entry, live or expired.
	pub async fn clear(&self) {
		let mut entries = self.entries.write().await;
		let dropped = entries.len();

		entries.clear();

		tracing::debug!(dropped, "memo cache cleared");
	}

	/// Number of physically stored entries, including expired ones.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	/// Whether no entries are stored.
	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}

	async fn store<T>(&self, key: String, value: Arc<T>, now: Instant, ttl: Duration)
	where
		T: Any + Send + Sync,
	{
		let slot: Slot = value;

		self.entries.write().await.insert(key, CacheEntry::with_ttl(slot, now, ttl));
	}
}

/// Leading segment of a cache key, e.g. `users` for `users:start:200`.
fn namespace(key: &str) -> &str {
	key.split_once(':').map_or(key, |(head, _)| head)
}
