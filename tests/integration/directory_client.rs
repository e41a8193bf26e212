//! Single-user lookups, memoization, and retry behaviour.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use http::StatusCode;
use okta_directory::{Error, Result};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{header, method, path},
};
// self
use crate::{AUTHORIZATION, client_with, config, fast_retry_policy, raw_user};

#[tokio::test]
async fn fetch_one_is_memoized_within_ttl() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/00u1"))
		.and(header("authorization", AUTHORIZATION))
		.and(header("accept", "application/json"))
		.respond_with(ResponseTemplate::new(200).set_body_json(raw_user("00u1", "Ada", "Lovelace")))
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let first = client.fetch_one("00u1").await?.expect("user present");
	let second = client.fetch_one("00u1").await?.expect("user present");

	assert_eq!(first.display_name, "Ada Lovelace");
	assert_eq!(first.location.as_deref(), Some("London, GB"));
	assert!(Arc::ptr_eq(&first, &second), "second lookup should be served from cache");

	let metrics = client.metrics();

	assert_eq!(metrics.lookups, 2);
	assert_eq!(metrics.misses, 1);
	assert_eq!(metrics.upstream_requests, 1);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn missing_user_is_none_and_not_retried() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/missing"))
		.respond_with(ResponseTemplate::new(404).set_body_string(r#"{"errorCode":"E0000007"}"#))
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));

	assert!(client.fetch_one("missing").await?.is_none());

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn clearing_the_cache_forces_a_new_upstream_call() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/00u2"))
		.respond_with(ResponseTemplate::new(200).set_body_json(raw_user("00u2", "Grace", "Hopper")))
		.expect(2)
		.mount(&server)
		.await;

	let client = client_with(config(&server));

	client.fetch_one("00u2").await?;
	client.clear_cache().await;

	assert!(client.cache().is_empty().await);

	client.fetch_one("00u2").await?;

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn shared_cache_spans_client_clones() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/00u3"))
		.respond_with(ResponseTemplate::new(200).set_body_json(raw_user("00u3", "Alan", "Turing")))
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let clone = client.clone();

	client.fetch_one("00u3").await?;
	clone.fetch_one("00u3").await?;

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn rate_limited_request_is_retried_once() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/00u4"))
		.respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0.05"))
		.up_to_n_times(1)
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/api/v1/users/00u4"))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(raw_user("00u4", "Barbara", "Liskov")),
		)
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let user = client.fetch_one("00u4").await?.expect("user present");

	assert_eq!(user.display_name, "Barbara Liskov");
	assert_eq!(client.metrics().upstream_requests, 2);
	assert_eq!(client.metrics().upstream_failures, 1);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_status() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/00u5"))
		.respond_with(ResponseTemplate::new(503).set_body_string("upstream secret detail"))
		.expect(3)
		.mount(&server)
		.await;

	let client = client_with(config(&server).with_retry_policy(fast_retry_policy(3)));
	let err = client.fetch_one("00u5").await.unwrap_err();

	assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
	assert_eq!(err.response_status(), StatusCode::BAD_GATEWAY);
	assert!(!err.to_string().contains("secret"), "upstream bodies must not leak");
	assert!(client.cache().is_empty().await, "failures must not be cached");

	server.verify().await;
}

#[tokio::test]
async fn client_errors_are_not_retried() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/00u6"))
		.respond_with(ResponseTemplate::new(403))
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let err = client.fetch_one("00u6").await.unwrap_err();

	assert!(matches!(err, Error::HttpStatus { status: StatusCode::FORBIDDEN, .. }));

	server.verify().await;
}

#[tokio::test]
async fn attempts_that_time_out_are_retried_then_reported() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/slow"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(raw_user("slow", "Slow", "Poke"))
				.set_delay(Duration::from_secs(2)),
		)
		.expect(2)
		.mount(&server)
		.await;

	let mut config = config(&server).with_retry_policy(fast_retry_policy(2));

	config.attempt_timeout = Duration::from_millis(100);

	let client = client_with(config);
	let err = client.fetch_one("slow").await.unwrap_err();

	assert!(err.is_timeout(), "expected timeout, got {err:?}");
	assert_eq!(err.response_status(), StatusCode::GATEWAY_TIMEOUT);

	server.verify().await;
}

#[tokio::test]
async fn blank_ids_are_rejected_before_any_request() {
	let server = MockServer::start().await;
	let client = client_with(config(&server));
	let err = client.fetch_one("   ").await.unwrap_err();

	assert!(matches!(err, Error::Validation { field: "id", .. }));
	assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
