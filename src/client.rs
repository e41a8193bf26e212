//! Directory client composing fetch, retry, pagination, normalization, and memoization.

// crates.io
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::{
	_prelude::*,
	cache::memo::MemoCache,
	config::{DirectoryConfig, clamp_page_size},
	http::{
		client::{UpstreamResponse, build_client, send_once},
		pagination::next_cursor,
		retry::RetryExecutor,
	},
	metrics::{ClientMetrics, ClientMetricsSnapshot},
	normalize::{NormalizedUser, RawUserRecord, normalize_user},
};

/// Collection endpoint for directory users.
pub const USERS_PATH: &str = "/api/v1/users";
/// Timeout applied to the single health-check request.
pub const PING_TIMEOUT: Duration = Duration::from_secs(8);
/// Longest accepted user identifier.
pub const MAX_USER_ID_LEN: usize = 200;

const ALL_USERS_KEY: &str = "users:all";

/// One page of normalized users plus the cursor for the page after it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
	/// Users on this page, in upstream order.
	pub users: Vec<NormalizedUser>,
	/// Cursor for the next page; `None` on the last page.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next_cursor: Option<String>,
}

/// Outcome of a single upstream health-check request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingReport {
	/// Whether the upstream answered with a success status.
	pub ok: bool,
	/// Status code returned by the upstream.
	pub status: u16,
	/// Number of records returned when the body was a JSON array.
	pub sample: Option<usize>,
	/// Round-trip latency in milliseconds.
	pub elapsed_ms: u64,
	/// Wall-clock time of the check.
	pub checked_at: DateTime<Utc>,
}

/// Client over the upstream user directory with a shared memo cache.
///
/// Every directory operation is memoized under a key derived from its arguments for the
/// configured TTL. Cloning is cheap and clones share the cache.
#[derive(Clone, Debug)]
pub struct DirectoryClient {
	config: Arc<DirectoryConfig>,
	client: Arc<Client>,
	cache: MemoCache,
	metrics: Arc<ClientMetrics>,
}
impl DirectoryClient {
	/// Build a directory client with the default reqwest client.
	pub fn new(config: DirectoryConfig, cache: MemoCache) -> Result<Self> {
		config.validate()?;

		let client = build_client()?;

		tracing::info!(
			org = %config.org_url,
			token = %config.api_token.fingerprint(),
			ttl = ?config.cache_ttl,
			"directory client initialised"
		);

		Ok(Self::with_client(config, client, cache))
	}

	/// Build a directory client from `OKTA_*` environment variables with a fresh cache.
	pub fn from_env() -> Result<Self> {
		Self::new(DirectoryConfig::from_env()?, MemoCache::new())
	}

	/// Build a directory client using the supplied HTTP client (primarily for tests).
	pub fn with_client(config: DirectoryConfig, client: Client, cache: MemoCache) -> Self {
		Self {
			config: Arc::new(config),
			client: Arc::new(client),
			cache,
			metrics: ClientMetrics::new(),
		}
	}

	/// Active configuration.
	pub fn config(&self) -> &DirectoryConfig {
		&self.config
	}

	/// Shared memo cache.
	pub fn cache(&self) -> &MemoCache {
		&self.cache
	}

	/// Point-in-time telemetry for this client.
	pub fn metrics(&self) -> ClientMetricsSnapshot {
		self.metrics.snapshot()
	}

	/// Drop every memoized directory result.
	pub async fn clear_cache(&self) {
		self.cache.clear().await;

		tracing::info!("directory cache cleared");
	}

	/// Fetch a single user by id; `Ok(None)` when the upstream reports it missing.
	///
	/// Missing users are not memoized.
	#[tracing::instrument(skip(self), fields(org = %self.config.org_url))]
	pub async fn fetch_one(&self, id: &str) -> Result<Option<Arc<NormalizedUser>>> {
		let id = validate_user_id(id)?;
		let url = self.user_url(id)?;

		self.metrics.record_lookup();

		let lookup = self
			.cache
			.get_or_compute(&format!("user:{id}"), self.config.cache_ttl, || async {
				self.metrics.record_miss();

				let response = self.get_with_retry(&url).await?;
				let raw: RawUserRecord = response.json()?;

				Ok(normalize_user(&raw))
			})
			.await;

		match lookup {
			Ok(user) => Ok(Some(user)),
			Err(err) if err.is_not_found() => {
				tracing::debug!("user not found upstream");

				Ok(None)
			},
			Err(err) => Err(err),
		}
	}

	/// Fetch one page of users starting at `cursor`; `limit` is clamped to 1..=200.
	#[tracing::instrument(skip(self), fields(org = %self.config.org_url))]
	pub async fn fetch_page(&self, cursor: Option<&str>, limit: Option<u32>) -> Result<Arc<UserPage>> {
		let cursor = cursor.filter(|cursor| !cursor.is_empty());
		let key = format!(
			"users:{}:{}",
			cursor.unwrap_or("start"),
			limit.map_or_else(|| "default".to_owned(), |limit| limit.to_string())
		);

		self.metrics.record_lookup();

		self.cache
			.get_or_compute(&key, self.config.cache_ttl, || async {
				self.metrics.record_miss();

				self.request_page(cursor, clamp_page_size(limit)).await
			})
			.await
	}

	/// Fetch every user by following page cursors until the upstream stops issuing them.
	///
	/// Pages are requested sequentially through [`Self::fetch_page`], so each page is memoized
	/// on its own as well. Without `max_pages` the walk is bounded only by the
	/// upstream's own page chain.
	///
	/// Pages already memoized by earlier `fetch_page(_, Some(200))` calls are reused, so the
	/// combined snapshot may mix page generations and be up to twice the cache TTL old.
	#[tracing::instrument(skip(self), fields(org = %self.config.org_url))]
	pub async fn fetch_all(&self) -> Result<Arc<Vec<NormalizedUser>>> {
		self.metrics.record_lookup();

		self.cache
			.get_or_compute(ALL_USERS_KEY, self.config.cache_ttl, || async {
				self.metrics.record_miss();

				self.walk_pages().await
			})
			.await
	}

	/// Issue one uncached, unretried request to check upstream reachability and credentials.
	#[tracing::instrument(skip(self), fields(org = %self.config.org_url))]
	pub async fn ping(&self) -> Result<PingReport> {
		let mut url = self.config.endpoint(USERS_PATH)?;

		url.query_pairs_mut().append_pair("limit", "1");

		let response = self.attempt(&url, PING_TIMEOUT).await?;
		let sample = serde_json::from_slice::<serde_json::Value>(&response.body)
			.ok()
			.and_then(|body| body.as_array().map(Vec::len));

		Ok(PingReport {
			ok: response.status().is_success(),
			status: response.status().as_u16(),
			sample,
			elapsed_ms: response.elapsed.as_millis().try_into().unwrap_or(u64::MAX),
			checked_at: Utc::now(),
		})
	}

	async fn walk_pages(&self) -> Result<Vec<NormalizedUser>> {
		let mut users = Vec::new();
		let mut cursor: Option<String> = None;
		let mut pages = 0_u32;

		loop {
			if let Some(max_pages) = self.config.max_pages
				&& pages >= max_pages
			{
				tracing::warn!(pages, "pagination limit reached before the final page");

				return Err(Error::PaginationLimit { pages: max_pages });
			}

			let page = self.fetch_page(cursor.as_deref(), Some(self.config.page_size)).await?;

			pages += 1;
			users.extend(page.users.iter().cloned());

			match &page.next_cursor {
				Some(next) => cursor = Some(next.clone()),
				None => break,
			}
		}

		tracing::debug!(pages, users = users.len(), "directory walk complete");

		Ok(users)
	}

	async fn request_page(&self, cursor: Option<&str>, limit: u32) -> Result<UserPage> {
		let mut url = self.config.endpoint(USERS_PATH)?;

		{
			let mut query = url.query_pairs_mut();

			query.append_pair("limit", &limit.to_string());

			if let Some(cursor) = cursor {
				query.append_pair("after", cursor);
			}
		}

		let response = self.get_with_retry(&url).await?;
		let raw: Vec<RawUserRecord> = response.json()?;
		let next_cursor = next_cursor(response.headers(), &response.url);
		let users = raw.iter().map(normalize_user).collect::<Vec<_>>();

		tracing::debug!(count = users.len(), has_next = next_cursor.is_some(), "page fetched");

		Ok(UserPage { users, next_cursor })
	}

	async fn get_with_retry(&self, url: &Url) -> Result<UpstreamResponse> {
		RetryExecutor::new(&self.config.retry_policy)
			.run(|| self.attempt(url, self.config.attempt_timeout))
			.await
	}

	async fn attempt(&self, url: &Url, timeout: Duration) -> Result<UpstreamResponse> {
		let outcome = send_once(&self.client, &self.config, url, timeout).await;
		let failed = !matches!(&outcome, Ok(response) if response.status().is_success());

		self.metrics.record_upstream(failed);

		outcome
	}

	fn user_url(&self, id: &str) -> Result<Url> {
		let mut url = self.config.endpoint(USERS_PATH)?;

		url.path_segments_mut()
			.map_err(|_| Error::Configuration {
				field: "org_url",
				reason: "Cannot be used as a base URL.".into(),
			})?
			.push(id);

		Ok(url)
	}
}

fn validate_user_id(id: &str) -> Result<&str> {
	let id = id.trim();

	if id.is_empty() {
		return Err(Error::Validation { field: "id", reason: "Must not be empty.".into() });
	}
	if id.chars().count() > MAX_USER_ID_LEN {
		return Err(Error::Validation {
			field: "id",
			reason: format!("Must be {MAX_USER_ID_LEN} characters or fewer."),
		});
	}

	Ok(id)
}
