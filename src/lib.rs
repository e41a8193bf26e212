//! Async Okta user-directory client with cursor pagination, retry/backoff, and a TTL memo cache.
//!
//! [`DirectoryClient`] is the entry point: it fetches single users, single pages, or the whole
//! directory, normalizes every record into a [`NormalizedUser`], and memoizes results in an
//! injected [`MemoCache`]. The [`directory`] and [`export`] modules work on the returned
//! snapshots.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod config;
pub mod directory;
pub mod export;
pub mod http;
pub mod metrics;
pub mod normalize;
pub mod security;

mod client;
mod error;
mod _prelude {
	pub use std::{
		sync::Arc,
		time::{Duration, SystemTime},
	};

	pub use chrono::{DateTime, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use crate::{
	cache::memo::MemoCache,
	client::{DirectoryClient, PingReport, UserPage},
	config::{DirectoryConfig, RetryPolicy},
	directory::{Direction, SortKey, UserListing, UserQuery},
	error::{Error, Result},
	metrics::ClientMetricsSnapshot,
	normalize::{NormalizedUser, RawProfile, RawUserRecord},
};
