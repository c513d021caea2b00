//! Starts an authorization-code + PKCE flow from a descriptor's OAuth 2.0 section, exchanges
//! the returned code, and calls a `user_required` endpoint with the issued token.

// std
use std::collections::HashMap;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use iajson::{
	CallParams, Client, RawDescriptor,
	auth::{self, AppCredentials, AuthorizationRequest},
	http::ReqwestTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").form_urlencoded_tuple("code", "auth-code");
			then.status(200).json_body(json!({
				"access_token": "user-token",
				"expires_in": 3600,
				"refresh_token": "user-refresh"
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer user-token");
			then.status(200).json_body(json!({ "name": "Ada" }));
		})
		.await;

	let mut client = Client::new(RawDescriptor::from_value(json!({
		"version": "1.0",
		"site": { "name": "Demo Shop", "type": "ecommerce" },
		"api": {
			"base_url": server.base_url(),
			"user_required": {
				"profile": { "method": "GET", "path": "/me", "description": "Current user." }
			}
		},
		"auth": {
			"oauth2": {
				"authorization_url": server.url("/oauth/authorize"),
				"token_url": server.url("/oauth/token"),
				"scopes": { "profile:read": "Read your profile." },
				"pkce_required": true
			}
		}
	})))?;
	let config =
		client.oauth2_config().cloned().ok_or_else(|| eyre!("Site does not offer OAuth 2.0."))?;
	let pkce = auth::generate_pkce_challenge();
	let state = auth::generate_state();
	let redirect_uri = "https://agent.example/oauth/callback";
	let authorize_url = auth::build_authorization_url(
		&config,
		&AuthorizationRequest::new("demo-client", redirect_uri)
			.with_state(state.clone())
			.with_pkce(&pkce),
	);

	println!("Send the user to {authorize_url}.");

	// Simulate the redirect back to the agent.
	let callback = Url::parse(&format!("{redirect_uri}?code=auth-code&state={state}"))?;
	let query: HashMap<_, _> = callback.query_pairs().into_owned().collect();

	if query.get("state") != Some(&state) {
		return Err(eyre!("State mismatch."));
	}

	let code = query.get("code").ok_or_else(|| eyre!("Callback carried no code."))?;
	let tokens = auth::exchange_code(
		&ReqwestTransport::default(),
		&config,
		&AppCredentials::new("demo-client", "demo-secret"),
		code,
		redirect_uri,
		Some(&pkce.verifier),
		client.timeout(),
	)
	.await?;

	println!("Token expires in {:?}.", tokens.expires_in_duration());

	client.set_access_token(tokens.access_token);

	let profile = client.call("profile", CallParams::new()).await?;

	println!("Profile: {profile}.");

	Ok(())
}
