//! Retry utilities for upstream HTTP requests.

// std
use std::future::Future;
// crates.io
use http::{HeaderMap, header::RETRY_AFTER};
use tokio::time;
// self
use crate::{
	_prelude::*,
	config::RetryPolicy,
	error::is_retryable_status,
	http::client::UpstreamResponse,
	metrics,
};

/// Tracks attempts against a [`RetryPolicy`] and computes the wait before each retry.
#[derive(Debug)]
pub struct RetryExecutor<'a> {
	policy: &'a RetryPolicy,
	attempts_used: u32,
}
impl<'a> RetryExecutor<'a> {
	/// Create a new executor respecting the supplied retry policy.
	pub fn new(policy: &'a RetryPolicy) -> Self {
		Self { policy, attempts_used: 0 }
	}

	/// Number of attempts that have already been made.
	pub fn attempts_used(&self) -> u32 {
		self.attempts_used
	}

	/// Whether another attempt is permitted under the policy.
	pub fn can_retry(&self) -> bool {
		self.attempts_used < self.policy.max_attempts
	}

	/// Record a finished attempt.
	pub fn record_attempt(&mut self) {
		self.attempts_used = self.attempts_used.saturating_add(1);
	}

	/// Compute the delay before the next attempt, or `None` once the budget is spent.
	pub fn next_backoff(&self, retry_after: Option<Duration>) -> Option<Duration> {
		if !self.can_retry() {
			tracing::debug!(attempts = self.attempts_used, "retry budget exhausted");

			return None;
		}

		let retry = self.attempts_used.saturating_sub(1);
		let delay = backoff_delay(self.policy, retry, retry_after);

		tracing::debug!(attempt = self.attempts_used + 1, ?delay, ?retry_after, "retry backoff computed");

		Some(delay)
	}

	/// Drive `attempt` until it succeeds, fails terminally, or the budget runs out.
	///
	/// Retries on 429, any 5xx, and per-attempt timeouts. Other statuses and transport errors
	/// propagate immediately. After exhaustion the last observed error is returned unchanged.
	pub async fn run<F, Fut>(mut self, mut attempt: F) -> Result<UpstreamResponse>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<UpstreamResponse>>,
	{
		loop {
			let outcome = attempt().await;

			self.record_attempt();

			let (error, hint) = match outcome {
				Ok(response) if response.status().is_success() => return Ok(response),
				Ok(response) => {
					let status = response.status();
					let error = Error::HttpStatus { status, url: response.url };

					if !is_retryable_status(status) {
						return Err(error);
					}

					(error, retry_after(&response.headers))
				},
				Err(error) if error.is_timeout() => (error, None),
				Err(error) => return Err(error),
			};
			let Some(delay) = self.next_backoff(hint) else {
				return Err(error);
			};

			tracing::warn!(error = %error, attempt = self.attempts_used, ?delay, "retrying upstream request");

			metrics::record_retry();

			if !delay.is_zero() {
				time::sleep(delay).await;
			}
		}
	}
}

/// Wait before the zero-based `retry`: the server's hint when present, else policy backoff.
pub fn backoff_delay(policy: &RetryPolicy, retry: u32, retry_after: Option<Duration>) -> Duration {
	retry_after.unwrap_or_else(|| policy.compute_backoff(retry))
}

/// Parse a `Retry-After` header given either as seconds or as an HTTP date.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(seconds) = raw.parse::<f64>() {
		return Some(seconds)
			.filter(|seconds| *seconds > 0.)
			.and_then(|seconds| Duration::try_from_secs_f64(seconds).ok());
	}

	httpdate::parse_http_date(raw)
		.ok()
		.and_then(|at| at.duration_since(SystemTime::now()).ok())
		.filter(|delay| !delay.is_zero())
}
