#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use iajson::{
	Client, Error, RawDescriptor,
	auth::{
		self, AppCredentials, AuthorizationRequest, PkceChallenge, Secret, TOKEN_EXCHANGE_FAILED,
		TOKEN_REFRESH_FAILED,
	},
	descriptor::OAuth2Config,
	error::ConfigError,
	http::ReqwestTransport,
};
use time::Duration;

const CLIENT_ID: &str = "client-it";
const CLIENT_SECRET: &str = "secret-it";
const REDIRECT_URI: &str = "https://agent.example/callback";

fn raw(server: &MockServer) -> RawDescriptor {
	RawDescriptor::from_value(json!({
		"version": "1.0",
		"site": { "name": "Mock Shop", "type": "ecommerce" },
		"api": { "base_url": server.base_url() },
		"auth": {
			"oauth2": {
				"authorization_url": server.url("/oauth/authorize"),
				"token_url": server.url("/oauth/token"),
				"scopes": { "profile:read": "Read profile.", "orders:write": "Place orders." },
				"pkce_required": true
			}
		}
	}))
}

fn config(server: &MockServer) -> OAuth2Config {
	OAuth2Config::from_descriptor(&raw(server)).expect("OAuth section should parse.")
}

fn app() -> AppCredentials {
	AppCredentials::new(CLIENT_ID, CLIENT_SECRET)
}

#[tokio::test]
async fn authorization_url_and_code_exchange_round_out_the_flow() {
	let server = MockServer::start_async().await;
	let config = config(&server);
	let pkce = PkceChallenge::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
	let url = auth::build_authorization_url(
		&config,
		&AuthorizationRequest::new(CLIENT_ID, REDIRECT_URI).with_state("state-1").with_pkce(&pkce),
	);
	let url = url::Url::parse(&url).expect("Authorization URL should parse.");
	let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

	assert_eq!(url.path(), "/oauth/authorize");
	assert!(pairs.contains(&("scope".into(), "profile:read orders:write".into())));
	assert!(pairs.contains(&("state".into(), "state-1".into())));
	assert!(pairs.contains(&(
		"code_challenge".into(),
		"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into()
	)));

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("client_id", CLIENT_ID)
				.form_urlencoded_tuple("client_secret", CLIENT_SECRET)
				.form_urlencoded_tuple("code", "code-1")
				.form_urlencoded_tuple("redirect_uri", REDIRECT_URI)
				.form_urlencoded_tuple(
					"code_verifier",
					"dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
				);
			then.status(200).json_body(json!({
				"access_token": "access-1",
				"token_type": "bearer",
				"expires_in": 3600,
				"refresh_token": "refresh-1",
				"scope": "profile:read"
			}));
		})
		.await;
	let tokens = auth::exchange_code(
		&ReqwestTransport::default(),
		&config,
		&app(),
		"code-1",
		REDIRECT_URI,
		Some(&pkce.verifier),
		Duration::seconds(5),
	)
	.await
	.expect("Code exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(tokens.access_token.expose(), "access-1");
	assert_eq!(tokens.token_type, "bearer");
	assert_eq!(tokens.expires_in_duration(), Some(Duration::hours(1)));
	assert_eq!(tokens.refresh_token.as_ref().map(Secret::expose), Some("refresh-1"));
	assert_eq!(tokens.scope.as_deref(), Some("profile:read"));
}

#[tokio::test]
async fn exchange_without_verifier_omits_it_and_defaults_token_type() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("code", "code-2")
				.form_urlencoded_tuple_missing("code_verifier");
			then.status(200).json_body(json!({ "access_token": "access-2" }));
		})
		.await;
	let tokens = auth::exchange_code(
		&ReqwestTransport::default(),
		&config(&server),
		&app(),
		"code-2",
		REDIRECT_URI,
		None,
		Duration::seconds(5),
	)
	.await
	.expect("Code exchange without PKCE should succeed.");

	mock.assert_async().await;

	assert_eq!(tokens.token_type, "Bearer");
	assert!(tokens.refresh_token.is_none());
	assert!(tokens.expires_in.is_none());
}

#[tokio::test]
async fn refresh_posts_the_refresh_grant() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-1")
				.form_urlencoded_tuple("client_id", CLIENT_ID);
			then.status(200).json_body(json!({ "access_token": "access-3", "expires_in": 60 }));
		})
		.await;
	let tokens = auth::refresh_token(
		&ReqwestTransport::default(),
		&config(&server),
		&app(),
		&Secret::new("refresh-1"),
		Duration::seconds(5),
	)
	.await
	.expect("Refresh should succeed.");

	mock.assert_async().await;

	assert_eq!(tokens.access_token.expose(), "access-3");
	assert_eq!(tokens.expires_in, Some(60));
}

#[tokio::test]
async fn token_endpoint_failures_carry_flow_specific_codes() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400).json_body(json!({ "error": "invalid_grant" }));
		})
		.await;

	let transport = ReqwestTransport::default();
	let config = config(&server);
	let err = auth::exchange_code(
		&transport,
		&config,
		&app(),
		"expired",
		REDIRECT_URI,
		None,
		Duration::seconds(5),
	)
	.await
	.expect_err("Rejected exchange should fail.");

	match err {
		Error::Authentication(err) => {
			assert_eq!(err.status, Some(400));
			assert_eq!(err.error_code.as_deref(), Some(TOKEN_EXCHANGE_FAILED));
			assert!(err.message.contains("invalid_grant"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	let err = auth::refresh_token(
		&transport,
		&config,
		&app(),
		&Secret::new("revoked"),
		Duration::seconds(5),
	)
	.await
	.expect_err("Rejected refresh should fail.");

	match err {
		Error::Authentication(err) =>
			assert_eq!(err.error_code.as_deref(), Some(TOKEN_REFRESH_FAILED)),
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn issued_tokens_drive_user_required_calls() {
	let server = MockServer::start_async().await;
	let mut value = raw(&server).into_value();

	value["api"]["user_required"] =
		json!({ "profile": { "method": "GET", "path": "/me", "description": "Fixture." } });

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer access-9");
			then.status(200).json_body(json!({ "id": "u-1" }));
		})
		.await;
	let client = Client::builder(RawDescriptor::from_value(value))
		.access_token("access-9")
		.build()
		.expect("Client should build.");
	let body = client
		.call("profile", iajson::CallParams::new())
		.await
		.expect("Profile call should succeed.");

	mock.assert_async().await;

	assert_eq!(body["id"], "u-1");
}

#[test]
fn oauth_section_is_required() {
	let raw = RawDescriptor::from_value(json!({ "version": "1.0", "auth": {} }));

	assert!(matches!(
		OAuth2Config::from_descriptor(&raw),
		Err(Error::Config(ConfigError::MissingOAuth2))
	));
}
