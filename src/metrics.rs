//! Metrics helpers and per-client telemetry bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
// crates.io
use http::StatusCode;
use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use smallvec::SmallVec;
// self
use crate::_prelude::*;

type LabelSet = SmallVec<[Label; 2]>;

const METRIC_CACHE_LOOKUPS_TOTAL: &str = "directory_cache_lookups_total";
const METRIC_UPSTREAM_REQUESTS_TOTAL: &str = "directory_upstream_requests_total";
const METRIC_UPSTREAM_DURATION: &str = "directory_upstream_duration_seconds";
const METRIC_UPSTREAM_TIMEOUTS_TOTAL: &str = "directory_upstream_timeouts_total";
const METRIC_UPSTREAM_RETRIES_TOTAL: &str = "directory_upstream_retries_total";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Thread-safe metrics accumulator for a single directory client.
#[derive(Debug, Default)]
pub struct ClientMetrics {
	lookups: AtomicU64,
	misses: AtomicU64,
	upstream_requests: AtomicU64,
	upstream_failures: AtomicU64,
}
impl ClientMetrics {
	/// Create a new metrics accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a logical directory lookup.
	pub fn record_lookup(&self) {
		self.lookups.fetch_add(1, Ordering::Relaxed);
	}

	/// Record that a lookup had to compute its value.
	pub fn record_miss(&self) {
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	/// Record one upstream attempt and whether it failed.
	pub fn record_upstream(&self, failed: bool) {
		self.upstream_requests.fetch_add(1, Ordering::Relaxed);

		if failed {
			self.upstream_failures.fetch_add(1, Ordering::Relaxed);
		}
	}

	/// Take a point-in-time snapshot for status reporting.
	pub fn snapshot(&self) -> ClientMetricsSnapshot {
		ClientMetricsSnapshot {
			lookups: self.lookups.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			upstream_requests: self.upstream_requests.load(Ordering::Relaxed),
			upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
		}
	}
}

/// Read-only snapshot of per-client telemetry counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientMetricsSnapshot {
	/// Logical lookups served by the client.
	pub lookups: u64,
	/// Lookups that missed the cache.
	pub misses: u64,
	/// Individual upstream HTTP attempts.
	pub upstream_requests: u64,
	/// Upstream attempts that ended in a non-success status, timeout, or transport error.
	pub upstream_failures: u64,
}
impl ClientMetricsSnapshot {
	/// Lookups answered from the cache.
	pub fn hits(&self) -> u64 {
		self.lookups.saturating_sub(self.misses)
	}

	/// Convenience method to compute the cache hit rate.
	pub fn hit_rate(&self) -> f64 {
		if self.lookups == 0 { 0.0 } else { self.hits() as f64 / self.lookups as f64 }
	}
}

/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record a memo cache lookup for the given key namespace.
pub fn record_cache_lookup(namespace: &str, hit: bool) {
	let mut labels = LabelSet::new();

	labels.push(Label::new("namespace", namespace.to_owned()));
	labels.push(Label::new("outcome", if hit { "hit" } else { "miss" }));

	metrics::counter!(METRIC_CACHE_LOOKUPS_TOTAL, labels.iter()).increment(1);
}

/// Record a completed upstream attempt along with its latency.
pub fn record_upstream_response(status: StatusCode, elapsed: Duration) {
	let mut labels = LabelSet::new();

	labels.push(Label::new("status_class", status_class(status)));

	metrics::counter!(METRIC_UPSTREAM_REQUESTS_TOTAL, labels.iter()).increment(1);
	metrics::histogram!(METRIC_UPSTREAM_DURATION).record(elapsed.as_secs_f64());
}

/// Record an upstream attempt aborted by its timeout.
pub fn record_upstream_timeout() {
	metrics::counter!(METRIC_UPSTREAM_TIMEOUTS_TOTAL).increment(1);
}

/// Record a scheduled retry.
pub fn record_retry() {
	metrics::counter!(METRIC_UPSTREAM_RETRIES_TOTAL).increment(1);
}

fn status_class(status: StatusCode) -> &'static str {
	match status.as_u16() {
		429 => "throttled",
		100..=199 => "1xx",
		200..=299 => "2xx",
		300..=399 => "3xx",
		400..=499 => "4xx",
		_ => "5xx",
	}
}
