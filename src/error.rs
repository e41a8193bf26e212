//! Crate-wide error types and `Result` alias.

// crates.io
use http::StatusCode;

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the directory client crate.
///
/// Display output never includes upstream response bodies, so it is safe to hand to callers.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error("Directory is not configured; {field}: {reason}")]
	Configuration { field: &'static str, reason: String },
	#[error("Upstream HTTP status {status} from {url}.")]
	HttpStatus { status: StatusCode, url: url::Url },
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Pagination exceeded the configured limit of {pages} pages.")]
	PaginationLimit { pages: u32 },
	#[error("Security violation: {0}")]
	Security(String),
	#[error("Upstream request to {url} timed out after {timeout:?}.")]
	Timeout { url: url::Url, timeout: std::time::Duration },
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Upstream status code carried by the error, if any.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::HttpStatus { status, .. } => Some(*status),
			Self::Reqwest(err) => err.status(),
			_ => None,
		}
	}

	/// Whether the upstream reported the resource as missing.
	pub fn is_not_found(&self) -> bool {
		self.status() == Some(StatusCode::NOT_FOUND)
	}

	/// Whether the error is a per-attempt timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}

	/// Whether the failure is transient: rate limiting, a server error, or a timeout.
	pub fn is_retryable(&self) -> bool {
		if self.is_timeout() {
			return true;
		}

		self.status().is_some_and(is_retryable_status)
	}

	/// Status a route handler should surface for this failure.
	///
	/// Not-found is a valid directory result and never reaches this mapping.
	pub fn response_status(&self) -> StatusCode {
		match self {
			Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
			Self::Validation { .. } => StatusCode::BAD_REQUEST,
			Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
			_ => StatusCode::BAD_GATEWAY,
		}
	}
}

/// Statuses worth retrying: 429 and any 5xx.
pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
	status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
