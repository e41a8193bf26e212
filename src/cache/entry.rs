//! Cache entry definitions.

// self
use crate::_prelude::*;

/// Memoized value together with the instant it stops being servable.
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
	value: V,
	expires_at: Instant,
}
impl<V> CacheEntry<V> {
	/// Create an entry that lives until `expires_at`.
	pub fn new(value: V, expires_at: Instant) -> Self {
		Self { value, expires_at }
	}

	/// Create an entry that lives for `ttl` from `now`.
	pub fn with_ttl(value: V, now: Instant, ttl: Duration) -> Self {
		Self::new(value, now + ttl)
	}

	/// Stored value, regardless of liveness.
	pub fn value(&self) -> &V {
		&self.value
	}

	/// Instant after which the entry is logically absent.
	pub fn expires_at(&self) -> Instant {
		self.expires_at
	}

	/// Whether the entry may still be served at `now`.
	pub fn is_live(&self, now: Instant) -> bool {
		now < self.expires_at
	}
}
