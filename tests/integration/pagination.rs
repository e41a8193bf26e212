//! Cursor pagination through `Link` headers.

// crates.io
use okta_directory::{Error, Result};
use serde_json::json;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{header, method, path, query_param, query_param_is_missing},
};
// self
use crate::{AUTHORIZATION, client_with, config, raw_user};

fn next_link(server: &MockServer, cursor: &str) -> String {
	format!(r#"<{}/api/v1/users?after={cursor}&limit=200>; rel="next""#, server.uri())
}

#[tokio::test]
async fn fetch_page_exposes_the_next_cursor() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.and(query_param("limit", "1"))
		.and(query_param_is_missing("after"))
		.and(header("authorization", AUTHORIZATION))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!([raw_user("00u1", "Ada", "Lovelace")]))
				.insert_header(
					"link",
					format!(
						r#"<{0}/api/v1/users?limit=1>; rel="self", <{0}/api/v1/users?after=abc&limit=1>; rel="next""#,
						server.uri()
					)
					.as_str(),
				),
		)
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let page = client.fetch_page(None, Some(1)).await?;

	assert_eq!(page.users.len(), 1);
	assert_eq!(page.users[0].id, "00u1");
	assert_eq!(page.next_cursor.as_deref(), Some("abc"));

	// Same arguments within the TTL are served from the memo.
	client.fetch_page(None, Some(1)).await?;

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn oversized_limits_are_clamped() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.and(query_param("limit", "200"))
		.and(query_param("after", "xyz"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let page = client.fetch_page(Some("xyz"), Some(5_000)).await?;

	assert!(page.users.is_empty());
	assert_eq!(page.next_cursor, None);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn fetch_all_follows_cursors_in_order_and_memoizes() -> Result<()> {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.and(query_param_is_missing("after"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!([
					raw_user("00u1", "Ada", "Lovelace"),
					raw_user("00u2", "Grace", "Hopper"),
				]))
				.insert_header("link", next_link(&server, "X").as_str()),
		)
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.and(query_param("after", "X"))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(json!([raw_user("00u3", "Alan", "Turing")])),
		)
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let users = client.fetch_all().await?;
	let ids = users.iter().map(|user| user.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, ["00u1", "00u2", "00u3"]);

	let again = client.fetch_all().await?;

	assert_eq!(again.len(), 3);

	// Pages walked by `fetch_all` are memoized individually.
	let second = client.fetch_page(Some("X"), Some(200)).await?;

	assert_eq!(second.users[0].id, "00u3");

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn page_limit_stops_an_endless_walk() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!([raw_user("00u1", "Ada", "Lovelace")]))
				.insert_header("link", next_link(&server, "again").as_str()),
		)
		.expect(1)
		.mount(&server)
		.await;

	let mut config = config(&server);

	config.max_pages = Some(1);

	let client = client_with(config);
	let err = client.fetch_all().await.unwrap_err();

	assert!(matches!(err, Error::PaginationLimit { pages: 1 }));
	// Only the page that was fetched is memoized, never the partial walk.
	assert_eq!(client.cache().len().await, 1);

	server.verify().await;
}

#[tokio::test]
async fn malformed_records_degrade_instead_of_failing() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!([
			raw_user("00u1", "Ada", "Lovelace"),
			null,
			"junk",
			{ "id": "00u9", "status": "ACTIVE", "profile": "not-an-object" },
			{ "id": "00u8", "profile": { "firstName": 42, "lastName": "Hopper", "department": true } },
		])))
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let users = client.fetch_all().await?;
	let names = users.iter().map(|user| user.display_name.as_str()).collect::<Vec<_>>();

	assert_eq!(names, ["Ada Lovelace", "Unknown", "Unknown", "Unknown", "Hopper"]);
	assert_eq!(users[1].id, "");
	assert_eq!(users[3].id, "00u9");
	assert_eq!(users[4].department, None);

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn non_object_single_record_degrades_to_defaults() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users/odd"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!("junk")))
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let user = client.fetch_one("odd").await?.expect("user present");

	assert_eq!(user.display_name, "Unknown");

	server.verify().await;
	Ok(())
}

#[tokio::test]
async fn fetch_all_reuses_pages_memoized_by_fetch_page() -> Result<()> {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/api/v1/users"))
		.and(query_param("limit", "200"))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(json!([raw_user("00u1", "Ada", "Lovelace")])),
		)
		.expect(1)
		.mount(&server)
		.await;

	let client = client_with(config(&server));
	let page = client.fetch_page(None, Some(200)).await?;
	let users = client.fetch_all().await?;

	assert_eq!(users.as_slice(), page.users.as_slice());
	assert_eq!(client.cache().len().await, 2);

	server.verify().await;
	Ok(())
}
