//! Integration tests exercising the directory client against a mock upstream.

mod directory_client;
mod health;
mod pagination;

// std
use std::time::Duration;
// crates.io
use okta_directory::{DirectoryClient, DirectoryConfig, MemoCache, RetryPolicy};
use serde_json::{Value, json};
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";
pub const AUTHORIZATION: &str = "SSWS test-token";

pub fn fast_retry_policy(max_attempts: u32) -> RetryPolicy {
	RetryPolicy {
		max_attempts,
		base_delay: Duration::from_millis(10),
		max_delay: Duration::from_millis(50),
		max_jitter: Duration::ZERO,
	}
}

pub fn config(server: &MockServer) -> DirectoryConfig {
	DirectoryConfig::new(server.uri(), TOKEN)
		.expect("config")
		.with_require_https(false)
		.with_retry_policy(fast_retry_policy(4))
}

pub fn client_with(config: DirectoryConfig) -> DirectoryClient {
	DirectoryClient::new(config, MemoCache::new()).expect("client")
}

pub fn raw_user(id: &str, first: &str, last: &str) -> Value {
	json!({
		"id": id,
		"status": "ACTIVE",
		"profile": {
			"firstName": first,
			"lastName": last,
			"email": format!("{}@example.com", first.to_lowercase()),
			"department": "Engineering",
			"city": "London",
			"countryCode": "gb"
		}
	})
}
