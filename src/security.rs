//! Security utilities covering HTTPS enforcement and API token handling.
//!
//! # Threat Model
//! The API token grants read access to the whole organization directory. It must never reach
//! logs, debug output, or error messages; a truncated SHA-256 fingerprint is used wherever an
//! operator needs to tell tokens apart.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// crates.io
use base64::prelude::*;
use http::HeaderValue;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;
// self
use crate::_prelude::*;

/// Authorization scheme used by the Okta management API.
pub const AUTH_SCHEME: &str = "SSWS";

/// Number of digest bytes kept in a token fingerprint.
const FINGERPRINT_BYTES: usize = 9;

/// Okta API token, redacted in every formatting path.
///
/// Deserializable from configuration but never serialized back out.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ApiToken {
	secret: Arc<str>,
}
impl ApiToken {
	/// Wrap a raw token, rejecting blank values.
	pub fn new(value: &str) -> Result<Self> {
		let cleaned = value.trim();

		if cleaned.is_empty() {
			return Err(Error::Configuration {
				field: "api_token",
				reason: "Must not be empty.".into(),
			});
		}
		if !cleaned.is_ascii() || cleaned.chars().any(|c| c.is_ascii_control()) {
			return Err(Error::Configuration {
				field: "api_token",
				reason: "Must be printable ASCII.".into(),
			});
		}

		Ok(Self { secret: Arc::from(cleaned) })
	}

	/// Short, stable identifier for the token that is safe to log.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.secret.as_bytes());

		BASE64_URL_SAFE_NO_PAD.encode(&digest[..FINGERPRINT_BYTES])
	}

	/// Build the `Authorization` header value, marked sensitive for HTTP tooling.
	pub fn authorization(&self) -> Result<HeaderValue> {
		let mut value = HeaderValue::from_str(&format!("{AUTH_SCHEME} {}", self.secret))
			.map_err(|err| Error::Configuration {
				field: "api_token",
				reason: format!("Cannot be used as a header value: {err}."),
			})?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl Debug for ApiToken {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		write!(f, "ApiToken({})", self.fingerprint())
	}
}
impl TryFrom<String> for ApiToken {
	type Error = Error;

	fn try_from(value: String) -> Result<Self> {
		Self::new(&value)
	}
}

/// Ensure the provided URL uses HTTPS.
pub fn enforce_https(url: &Url) -> Result<()> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(Error::Security(format!("Upstream URL {url} must use HTTPS.")))
	}
}
