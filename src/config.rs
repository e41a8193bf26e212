//! Directory configuration, retry policy, and validation.
//!
//! Configuration is normally sourced from the process environment at service startup and then
//! shared, read-only, by the directory client.

// std
use std::cell::RefCell;
// crates.io
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::{_prelude::*, security::{self, ApiToken}};

thread_local! {
	static SMALL_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_rng(&mut rand::rng()));
}

/// Environment variable holding the organization base URL.
pub const ENV_ORG_URL: &str = "OKTA_ORG_URL";
/// Environment variable holding the API token.
pub const ENV_API_TOKEN: &str = "OKTA_API_TOKEN";
/// Optional per-attempt timeout override, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "OKTA_TIMEOUT_MS";
/// Optional cache TTL override, in seconds.
pub const ENV_CACHE_TTL_SECS: &str = "OKTA_CACHE_TTL_SECS";
/// Optional pagination guard.
pub const ENV_MAX_PAGES: &str = "OKTA_MAX_PAGES";

/// Default timeout applied to each HTTP attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default lifetime of memoized directory results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
/// Largest page the upstream accepts.
pub const MAX_PAGE_SIZE: u32 = 200;
/// Smallest accepted per-attempt timeout.
pub const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(100);

/// Retry configuration for upstream requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
	/// Total attempts, including the first request.
	pub max_attempts: u32,
	/// Delay before the first retry; doubled on each subsequent retry.
	pub base_delay: Duration,
	/// Upper bound applied to the computed exponential backoff.
	pub max_delay: Duration,
	/// Upper bound of the random jitter added to each computed backoff.
	pub max_jitter: Duration,
}
impl RetryPolicy {
	/// Validate invariants for retry configuration.
	pub fn validate(&self) -> Result<()> {
		if self.max_attempts == 0 {
			return Err(Error::Validation {
				field: "retry_policy.max_attempts",
				reason: "Must allow at least one attempt.".into(),
			});
		}
		if self.base_delay.is_zero() {
			return Err(Error::Validation {
				field: "retry_policy.base_delay",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.max_delay < self.base_delay {
			return Err(Error::Validation {
				field: "retry_policy.max_delay",
				reason: "Must be greater than or equal to base_delay.".into(),
			});
		}

		Ok(())
	}

	/// Exponential backoff for the zero-based retry `attempt`, with jitter, capped at `max_delay`.
	pub fn compute_backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.min(16);
		let base = self.base_delay.saturating_mul(1 << exponent);
		let jittered = base.saturating_add(random_within(Duration::ZERO, self.max_jitter));

		jittered.min(self.max_delay)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 4,
			base_delay: Duration::from_millis(500),
			max_delay: Duration::from_millis(5_000),
			max_jitter: Duration::from_millis(200),
		}
	}
}

/// Settings describing how to reach and cache the upstream directory.
///
/// Deserialize-only: the embedded [`ApiToken`] has no serialized form.
#[derive(Clone, Debug, Deserialize)]
pub struct DirectoryConfig {
	/// Organization base URL, e.g. `https://example.okta.com`.
	pub org_url: Url,
	/// API token sent with every request.
	pub api_token: ApiToken,
	/// Whether the organization URL must use HTTPS.
	#[serde(default = "default_true")]
	pub require_https: bool,
	/// Timeout applied to each individual HTTP attempt.
	#[serde(default = "default_attempt_timeout")]
	pub attempt_timeout: Duration,
	/// Lifetime of memoized directory results.
	#[serde(default = "default_cache_ttl")]
	pub cache_ttl: Duration,
	/// Page size requested while walking the full directory.
	#[serde(default = "default_page_size")]
	pub page_size: u32,
	/// Optional cap on pages followed by a full fetch; `None` trusts the upstream to terminate.
	#[serde(default)]
	pub max_pages: Option<u32>,
	/// Retry policy for upstream requests.
	#[serde(default)]
	pub retry_policy: RetryPolicy,
}
impl DirectoryConfig {
	/// Construct a configuration with default timeouts, TTL, and retry policy.
	pub fn new(org_url: impl AsRef<str>, api_token: &str) -> Result<Self> {
		let org_url = Url::parse(org_url.as_ref())?;

		Ok(Self {
			org_url,
			api_token: ApiToken::new(api_token)?,
			require_https: true,
			attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
			cache_ttl: DEFAULT_CACHE_TTL,
			page_size: MAX_PAGE_SIZE,
			max_pages: None,
			retry_policy: RetryPolicy::default(),
		})
	}

	/// Load configuration from the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Load configuration through an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let Some(org_url) = read(ENV_ORG_URL) else {
			tracing::warn!(variable = ENV_ORG_URL, "directory base url is not configured");

			return Err(Error::Configuration {
				field: "org_url",
				reason: format!("{ENV_ORG_URL} is not set."),
			});
		};
		let Some(api_token) = read(ENV_API_TOKEN) else {
			tracing::warn!(variable = ENV_API_TOKEN, "directory api token is not configured");

			return Err(Error::Configuration {
				field: "api_token",
				reason: format!("{ENV_API_TOKEN} is not set."),
			});
		};
		let mut config = Self::new(&org_url, &api_token).map_err(|err| match err {
			Error::Url(err) =>
				Error::Configuration { field: "org_url", reason: format!("Invalid URL: {err}.") },
			other => other,
		})?;

		if let Some(raw) = read(ENV_TIMEOUT_MS) {
			config.attempt_timeout = Duration::from_millis(parse_number(ENV_TIMEOUT_MS, &raw)?);
		}
		if let Some(raw) = read(ENV_CACHE_TTL_SECS) {
			config.cache_ttl = Duration::from_secs(parse_number(ENV_CACHE_TTL_SECS, &raw)?);
		}
		if let Some(raw) = read(ENV_MAX_PAGES) {
			config.max_pages = Some(parse_number(ENV_MAX_PAGES, &raw)?);
		}

		config.validate()?;

		Ok(config)
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Replace the retry policy.
	pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
		self.retry_policy = retry_policy;

		self
	}

	/// Validate the configuration against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		if self.require_https {
			security::enforce_https(&self.org_url)?;
		}
		if self.org_url.host_str().is_none() {
			return Err(Error::Configuration {
				field: "org_url",
				reason: "Must include a host component.".into(),
			});
		}
		if self.attempt_timeout < MIN_ATTEMPT_TIMEOUT {
			return Err(Error::Validation {
				field: "attempt_timeout",
				reason: format!("Must be at least {MIN_ATTEMPT_TIMEOUT:?}."),
			});
		}
		if self.cache_ttl.is_zero() {
			return Err(Error::Validation {
				field: "cache_ttl",
				reason: "Must be greater than zero.".into(),
			});
		}
		if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
			return Err(Error::Validation {
				field: "page_size",
				reason: format!("Must be between 1 and {MAX_PAGE_SIZE}."),
			});
		}
		if self.max_pages == Some(0) {
			return Err(Error::Validation {
				field: "max_pages",
				reason: "Must be at least 1 when set.".into(),
			});
		}

		self.retry_policy.validate()
	}

	/// Resolve an absolute API path against the organization URL.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		Ok(self.org_url.join(path)?)
	}
}

/// Clamp a caller-requested page size into the range the upstream accepts.
pub fn clamp_page_size(limit: Option<u32>) -> u32 {
	limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

fn parse_number<T>(field: &'static str, raw: &str) -> Result<T>
where
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
{
	raw.parse::<T>().map_err(|err| Error::Configuration {
		field,
		reason: format!("Expected a non-negative integer, got {raw:?}: {err}."),
	})
}

fn random_within(min: Duration, max: Duration) -> Duration {
	if max <= min {
		return max;
	}
	SMALL_RNG.with(|cell| {
		let mut rng = cell.borrow_mut();
		let nanos = max.as_nanos() - min.as_nanos();
		let jitter = rng.random_range(0..=nanos.min(u64::MAX as u128));

		min + Duration::from_nanos(jitter as u64)
	})
}

fn default_true() -> bool {
	true
}

fn default_attempt_timeout() -> Duration {
	DEFAULT_ATTEMPT_TIMEOUT
}

fn default_cache_ttl() -> Duration {
	DEFAULT_CACHE_TTL
}

fn default_page_size() -> u32 {
	MAX_PAGE_SIZE
}
