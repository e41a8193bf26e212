// crates.io
use okta_directory::Result;
use serde_json::json;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{header, method, path, query_param},
};
// self
use crate::{AUTHORIZATION, client_with, config, raw_user};

#[tokio::test]
async fn ping_reports_a_healthy_upstream() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.and(query_param("limit", "1"))
		.and(header("authorization", AUTHORIZATION))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([raw_user("00u1", "Ada", "Lovelace")])))
		.expect(2)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let report = client.ping().await?;

	assert!(report.ok);
	assert_eq!(report.status, 200);
	assert_eq!(report.sample, Some(1));

	// Health checks bypass the memo.
	client.ping().await?;

	assert!(client.cache().is_empty().await);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn ping_reports_rejected_credentials_without_retrying() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.respond_with(
			ResponseTemplate::new(401)
				.set_body_json(json!({ "errorCode": "E0000011", "errorSummary": "Invalid token provided" })),
		)
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let report = client.ping().await?;

	assert!(!report.ok);
	assert_eq!(report.status, 401);
	assert_eq!(report.sample, None);

	let json = serde_json::to_value(&report)?;

	assert_eq!(json["status"], 401);
	assert!(json.get("checkedAt").is_some());

	server.verify().await;
	Ok(())
}
