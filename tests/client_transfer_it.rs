#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use session_client::{_preludet::*, http::MultipartForm};

#[tokio::test]
async fn upload_is_replayed_after_refresh() {
	let server = MockServer::start_async().await;
	let (client, _, reauth) = build_reqwest_test_client(&server.base_url());

	client.establish_session("old-token", "r-1", None).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(POST).path("/books/7/cover").header("authorization", "Bearer old-token");
			then.status(401);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/books/7/cover")
				.header("authorization", "Bearer new-token")
				.header_exists("content-type");
			then.status(201).json_body(json!({ "url": "/covers/7.png" }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({
				"data": { "access_token": "new-token", "refresh_token": "r-2" }
			}));
		})
		.await;

	let form = MultipartForm::new().text("alt", "Dune cover").file(
		"cover",
		"dune.png",
		Some("image/png".into()),
		vec![0x89, 0x50, 0x4e, 0x47],
	);
	let uploaded: Value =
		client.upload("/books/7/cover", form).await.expect("Upload should succeed after refresh.");

	assert_eq!(uploaded["url"], "/covers/7.png");

	rejected.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;

	assert_eq!(reauth.count(), 0);
}

#[tokio::test]
async fn download_returns_raw_bytes_with_bearer() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_reqwest_test_client(&server.base_url());

	client.establish_session("a-1", "r-1", None).await;

	let report = server
		.mock_async(|when, then| {
			when.method(GET).path("/reports/loans.csv").header("authorization", "Bearer a-1");
			then.status(200)
				.header("content-type", "text/csv")
				.header("content-disposition", "attachment; filename=\"loans.csv\"")
				.body("id,title\n1,Dune\n");
		})
		.await;
	let download =
		client.download("/reports/loans.csv").await.expect("Download should succeed.");

	assert_eq!(download.bytes, b"id,title\n1,Dune\n");
	assert_eq!(download.content_type.as_deref(), Some("text/csv"));
	assert_eq!(download.file_name.as_deref(), Some("loans.csv"));

	report.assert_calls_async(1).await;
}

#[tokio::test]
async fn empty_success_body_decodes_for_ignored_results() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_reqwest_test_client(&server.base_url());

	client.establish_session("a-1", "r-1", None).await;

	server
		.mock_async(|when, then| {
			when.method(DELETE).path("/loans/3");
			then.status(204);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/search").query_param("q", "dune messiah");
			then.status(200).json_body(json!({ "total": 1 }));
		})
		.await;

	let _: serde::de::IgnoredAny =
		client.delete("/loans/3").await.expect("Empty 204 body should decode.");
	let found: Value = client
		.get_with_query("/search", [("q", "dune messiah")])
		.await
		.expect("Query request should succeed.");

	assert_eq!(found["total"], 1);
}

#[tokio::test]
async fn anonymous_requests_omit_authorization() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_reqwest_test_client(&server.base_url());
	let public = server
		.mock_async(|when, then| {
			when.method(GET).path("/catalog").header_missing("authorization");
			then.status(200).json_body(json!([]));
		})
		.await;
	let catalog: Vec<Value> = client.get("/catalog").await.expect("Public request should succeed.");

	assert!(catalog.is_empty());

	public.assert_calls_async(1).await;
}
