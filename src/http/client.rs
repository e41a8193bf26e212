//! Single-attempt HTTP fetch against the upstream directory.

// crates.io
use http::{
	HeaderMap, HeaderValue, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use reqwest::{Client, redirect::Policy};
use serde::de::DeserializeOwned;
use tokio::time;
use url::Url;
// self
use crate::{_prelude::*, config::DirectoryConfig, metrics};

/// Maximum redirect depth followed by the default client.
pub const MAX_REDIRECTS: usize = 10;

/// Raw upstream response captured by a single attempt.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
	/// URL the request was issued against.
	pub url: Url,
	/// Status returned by the upstream.
	pub status: StatusCode,
	/// Response headers, including pagination and retry hints.
	pub headers: HeaderMap,
	/// Fully buffered response body.
	pub body: Vec<u8>,
	/// Round-trip duration of the attempt.
	pub elapsed: Duration,
}
impl UpstreamResponse {
	/// Response status helper.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers helper.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Decode the body as JSON.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		Ok(serde_json::from_slice(&self.body)?)
	}
}

/// Build the reqwest client used for upstream calls.
pub fn build_client() -> Result<Client> {
	Ok(Client::builder()
		.redirect(Policy::limited(MAX_REDIRECTS))
		.user_agent(format!("okta-directory/{}", env!("CARGO_PKG_VERSION")))
		.connect_timeout(Duration::from_secs(5))
		.build()?)
}

/// Issue exactly one authenticated GET, aborting it once `timeout` elapses.
///
/// Non-success statuses are returned as responses; only the timeout is reported as
/// [`Error::Timeout`]. Retrying is the caller's concern.
pub async fn send_once(
	client: &Client,
	config: &DirectoryConfig,
	url: &Url,
	timeout: Duration,
) -> Result<UpstreamResponse> {
	let request = client
		.get(url.clone())
		.header(ACCEPT, HeaderValue::from_static("application/json"))
		.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
		.header(AUTHORIZATION, config.api_token.authorization()?)
		.timeout(timeout);
	let start = Instant::now();
	let exchange = async {
		let response = request.send().await?;
		let status = response.status();
		let headers = response.headers().clone();
		let body = response.bytes().await?.to_vec();

		Ok::<_, reqwest::Error>((status, headers, body))
	};
	let (status, headers, body) = match time::timeout(timeout, exchange).await {
		Ok(Ok(parts)) => parts,
		Ok(Err(err)) if err.is_timeout() => return Err(timed_out(url, timeout)),
		Ok(Err(err)) => return Err(err.into()),
		Err(_) => return Err(timed_out(url, timeout)),
	};
	let elapsed = start.elapsed();

	metrics::record_upstream_response(status, elapsed);

	tracing::debug!(url = %url, status = %status, elapsed = ?elapsed, "upstream fetch complete");

	Ok(UpstreamResponse { url: url.clone(), status, headers, body, elapsed })
}

fn timed_out(url: &Url, timeout: Duration) -> Error {
	metrics::record_upstream_timeout();

	tracing::debug!(url = %url, timeout = ?timeout, "upstream fetch timed out");

	Error::Timeout { url: url.clone(), timeout }
}
