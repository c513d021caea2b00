#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use iajson::{
	CallParams, Client, Error, RawDescriptor,
	error::ConfigError,
	http::ReqwestTransport,
	signer::{self, SigningAlgorithm},
};

const API_KEY: &str = "key-it";
const SECRET: &str = "secret-it";

fn descriptor(server: &MockServer) -> RawDescriptor {
	RawDescriptor::from_value(json!({
		"version": "1.0",
		"site": { "name": "Mock Shop", "type": "ecommerce" },
		"api": {
			"base_url": server.base_url(),
			"public": {
				"search": { "method": "GET", "path": "/products", "description": "Fixture." },
				"product": { "method": "GET", "path": "/products/{id}", "description": "Fixture." }
			},
			"protected": {
				"create_order": { "method": "POST", "path": "/orders", "description": "Fixture." },
				"cancel_order": {
					"method": "DELETE",
					"path": "/orders/{id}",
					"description": "Fixture."
				}
			},
			"user_required": {
				"profile": { "method": "GET", "path": "/me", "description": "Fixture." }
			}
		},
		"auth": {
			"signed_key": {
				"register_url": server.url("/ia/register"),
				"header_prefix": "X-Shop-"
			}
		}
	}))
}

fn client(server: &MockServer) -> Client<ReqwestTransport> {
	Client::builder(descriptor(server))
		.timeout(time::Duration::seconds(5))
		.build()
		.expect("Client should build for the mock server.")
}

fn signed_client(server: &MockServer) -> Client<ReqwestTransport> {
	Client::builder(descriptor(server))
		.api_key(API_KEY)
		.secret(SECRET)
		.build()
		.expect("Signed client should build for the mock server.")
}

#[tokio::test]
async fn get_sends_remaining_arguments_as_query() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/products").query_param("q", "boots").query_param("limit", "5");
			then.status(200).json_body(json!({ "items": [{ "id": "p-1" }] }));
		})
		.await;
	let body = client(&server)
		.call("search", CallParams::new().with("q", "boots").with("limit", 5))
		.await
		.expect("Search call should succeed.");

	mock.assert_async().await;

	assert_eq!(body["items"][0]["id"], "p-1");
}

#[tokio::test]
async fn path_placeholders_are_substituted() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/products/p-42");
			then.status(200).json_body(json!({ "id": "p-42" }));
		})
		.await;
	let body = client(&server)
		.call("product", CallParams::new().with("id", "p-42"))
		.await
		.expect("Product call should succeed.");

	mock.assert_async().await;

	assert_eq!(body, json!({ "id": "p-42" }));
}

#[tokio::test]
async fn protected_post_is_signed_over_the_json_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/orders")
				.header("content-type", "application/json")
				.header("X-Shop-Key", API_KEY)
				.header_exists("X-Shop-Signature")
				.header_exists("X-Shop-Timestamp")
				.json_body(json!({ "product_id": "p-1", "quantity": 2 }));
			then.status(201).json_body(json!({ "order_id": "o-1" }));
		})
		.await;
	let body = signed_client(&server)
		.call("create_order", CallParams::new().with("product_id", "p-1").with("quantity", 2))
		.await
		.expect("Signed order call should succeed.");

	mock.assert_async().await;

	assert_eq!(body["order_id"], "o-1");
}

#[tokio::test]
async fn signature_matches_the_sent_body_and_timestamp() {
	let server = MockServer::start_async().await;
	let client = signed_client(&server);
	let (signature, timestamp) =
		client.sign(r#"{"product_id":"p-1"}"#).expect("Signing should succeed.");

	assert_eq!(
		signature,
		signer::sign(SECRET, timestamp, r#"{"product_id":"p-1"}"#, SigningAlgorithm::Sha256)
	);
	assert!(signer::verify_signature(
		SECRET,
		timestamp,
		r#"{"product_id":"p-1"}"#,
		&signature,
		SigningAlgorithm::Sha256,
		signer::DEFAULT_MAX_AGE_SECONDS,
	));
}

#[tokio::test]
async fn delete_without_arguments_sends_no_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/orders/o-9").header_exists("X-Shop-Signature").body("");
			then.status(204);
		})
		.await;
	let body = signed_client(&server)
		.call("cancel_order", CallParams::new().with("id", "o-9"))
		.await
		.expect("Cancel call should succeed.");

	mock.assert_async().await;

	assert_eq!(body, json!({}));
}

#[tokio::test]
async fn protected_calls_without_credentials_go_unsigned() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/orders").header_missing("X-Shop-Signature");
			then.status(401).json_body(json!({ "error": { "code": "missing_signature" } }));
		})
		.await;
	let err = client(&server)
		.call("create_order", CallParams::new().with("product_id", "p-1"))
		.await
		.expect_err("Unsigned call should be rejected by the site.");

	mock.assert_async().await;

	match err {
		Error::Authentication(err) => {
			assert_eq!(err.status, Some(401));
			assert_eq!(err.error_code.as_deref(), Some("missing_signature"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn public_calls_carry_no_auth_headers() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/products")
				.header_missing("X-Shop-Key")
				.header_missing("authorization");
			then.status(200).json_body(json!({ "items": [] }));
		})
		.await;
	let mut client = signed_client(&server);

	client.set_access_token("token-default");
	client.call("search", CallParams::new()).await.expect("Public call should succeed.");

	mock.assert_async().await;
}

#[tokio::test]
async fn user_required_calls_send_the_bearer_token() {
	let server = MockServer::start_async().await;
	let default_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer token-default");
			then.status(200).json_body(json!({ "name": "Ada" }));
		})
		.await;
	let mut client = client(&server);

	client.set_access_token("token-default");

	let body =
		client.call("profile", CallParams::new()).await.expect("Profile call should succeed.");

	default_mock.assert_async().await;

	assert_eq!(body["name"], "Ada");

	let override_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer token-override");
			then.status(200).json_body(json!({ "name": "Grace" }));
		})
		.await;
	let body = client
		.call("profile", CallParams::new().access_token("token-override"))
		.await
		.expect("Profile call with override should succeed.");

	override_mock.assert_async().await;

	assert_eq!(body["name"], "Grace");
}

#[tokio::test]
async fn user_required_calls_without_a_token_send_no_authorization() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header_missing("authorization");
			then.status(401).json_body(json!({ "error": { "code": "login_required" } }));
		})
		.await;
	let err = client(&server)
		.call("profile", CallParams::new())
		.await
		.expect_err("Tokenless profile call should be rejected by the site.");

	mock.assert_async().await;

	assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn rate_limits_surface_retry_after() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(429).header("retry-after", "3.5").body("slow down");
		})
		.await;

	match client(&server).call("search", CallParams::new()).await {
		Err(Error::RateLimited(err)) => {
			assert_eq!(err.retry_after, Some(3.5));
			assert_eq!(err.message, "slow down");
		},
		other => panic!("Unexpected result: {other:?}."),
	}
}

#[tokio::test]
async fn rate_limits_without_retry_after_leave_it_unset() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(429);
		})
		.await;

	match client(&server).call("search", CallParams::new()).await {
		Err(Error::RateLimited(err)) => assert_eq!(err.retry_after, None),
		other => panic!("Unexpected result: {other:?}."),
	}
}

#[tokio::test]
async fn server_errors_map_to_api_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(503).body("maintenance");
		})
		.await;

	let err = client(&server)
		.call("search", CallParams::new())
		.await
		.expect_err("Server error should surface.");

	assert_eq!(err.status(), Some(503));
	assert!(matches!(err, Error::Api { ref message, .. } if message == "maintenance"));
}

#[tokio::test]
async fn unknown_endpoints_fail_before_any_request() {
	let server = MockServer::start_async().await;
	let err = client(&server)
		.call("refund", CallParams::new())
		.await
		.expect_err("Unknown endpoint should be rejected.");

	match err {
		Error::UnknownEndpoint { name, available } => {
			assert_eq!(name, "refund");
			assert_eq!(available, ["cancel_order", "create_order", "product", "profile", "search"]);
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn strict_path_parameters_reject_missing_placeholders() {
	let server = MockServer::start_async().await;
	let client = Client::builder(descriptor(&server))
		.strict_path_parameters(true)
		.build()
		.expect("Strict client should build.");
	let err = client
		.call("product", CallParams::new())
		.await
		.expect_err("Missing placeholder should be rejected in strict mode.");

	assert!(matches!(err, Error::Config(ConfigError::UnresolvedPathParameter { .. })));
}

#[tokio::test]
async fn non_json_success_bodies_fail_to_decode() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products");
			then.status(200).body("<html></html>");
		})
		.await;

	let err = client(&server)
		.call("search", CallParams::new())
		.await
		.expect_err("HTML body should not decode.");

	assert!(matches!(err, Error::Decode { status: Some(200), .. }));
}
