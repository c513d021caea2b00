//! OAuth 2.0 authorization-code helpers for `user_required` endpoints.
//!
//! The site's `auth.oauth2` section supplies the endpoints. Callers build the authorization URL,
//! send the user there, and exchange the returned code (plus the PKCE verifier they kept) for a
//! [`TokenResponse`]. Tokens are then attached per call or on the client.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{self, Secret},
	descriptor::OAuth2Config,
	http::{self, HttpTransport},
	obs::{self, OperationKind},
};

/// Error code attached to rejected code exchanges.
pub const TOKEN_EXCHANGE_FAILED: &str = "token_exchange_failed";
/// Error code attached to rejected refresh grants.
pub const TOKEN_REFRESH_FAILED: &str = "token_refresh_failed";

const PKCE_VERIFIER_LEN: usize = 64;
const STATE_LEN: usize = 32;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PkceMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	#[default]
	S256,
}
impl PkceMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub const fn as_str(self) -> &'static str {
		match self {
			PkceMethod::S256 => "S256",
		}
	}
}

/// PKCE verifier and the challenge derived from it.
///
/// The verifier stays with the caller until the code exchange; the client never retains it.
#[derive(Clone, Debug)]
pub struct PkceChallenge {
	/// Secret code verifier.
	pub verifier: Secret,
	/// `BASE64URL(SHA256(verifier))` without padding.
	pub challenge: String,
	/// Challenge method.
	pub method: PkceMethod,
}
impl PkceChallenge {
	/// Derives the S256 challenge for an existing verifier.
	pub fn from_verifier(verifier: impl Into<Secret>) -> Self {
		let verifier = verifier.into();
		let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.expose().as_bytes()));

		Self { verifier, challenge, method: PkceMethod::S256 }
	}
}

/// Generates a fresh 64-character verifier and its S256 challenge.
pub fn generate_pkce_challenge() -> PkceChallenge {
	PkceChallenge::from_verifier(random_string(PKCE_VERIFIER_LEN))
}

/// Generates a 32-character alphanumeric value for the `state` parameter.
pub fn generate_state() -> String {
	random_string(STATE_LEN)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

/// OAuth application credentials registered with the site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppCredentials {
	/// Application client identifier.
	pub client_id: String,
	/// Application client secret.
	pub client_secret: Secret,
}
impl AppCredentials {
	/// Creates application credentials.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret>) -> Self {
		Self { client_id: client_id.into(), client_secret: client_secret.into() }
	}
}

/// Parameters of an authorization redirect.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	client_id: String,
	redirect_uri: String,
	scopes: Vec<String>,
	state: Option<String>,
	code_challenge: Option<(String, PkceMethod)>,
}
impl AuthorizationRequest {
	/// Starts a request for `client_id` returning to `redirect_uri`.
	pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			redirect_uri: redirect_uri.into(),
			scopes: Vec::new(),
			state: None,
			code_challenge: None,
		}
	}

	/// Requests specific scopes. An empty list requests every scope the site declares.
	pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Attaches an opaque CSRF `state` value.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Attaches the challenge half of `pkce`.
	pub fn with_pkce(mut self, pkce: &PkceChallenge) -> Self {
		self.code_challenge = Some((pkce.challenge.clone(), pkce.method));

		self
	}
}

/// Builds the URL the user visits to grant access.
///
/// Parameters are form-encoded and appended with `&` when the authorization URL already has a
/// query string, `?` otherwise.
pub fn build_authorization_url(config: &OAuth2Config, request: &AuthorizationRequest) -> String {
	let scope = if request.scopes.is_empty() {
		config.scope_names().join(" ")
	} else {
		request.scopes.join(" ")
	};
	let mut query = url::form_urlencoded::Serializer::new(String::new());

	query
		.append_pair("response_type", "code")
		.append_pair("client_id", &request.client_id)
		.append_pair("redirect_uri", &request.redirect_uri)
		.append_pair("scope", &scope);

	if let Some(state) = &request.state {
		query.append_pair("state", state);
	}
	if let Some((challenge, method)) = &request.code_challenge {
		query
			.append_pair("code_challenge", challenge)
			.append_pair("code_challenge_method", method.as_str());
	}

	let separator = if config.authorization_url.contains('?') { '&' } else { '?' };

	format!("{}{separator}{}", config.authorization_url, query.finish())
}

/// Token endpoint response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
	/// Access token for `Authorization: Bearer`.
	pub access_token: Secret,
	/// Token type; `Bearer` when the site omits it.
	#[serde(default = "default_token_type")]
	pub token_type: String,
	/// Lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Refresh token, when issued.
	#[serde(default)]
	pub refresh_token: Option<Secret>,
	/// Granted scopes, space-separated.
	#[serde(default)]
	pub scope: Option<String>,
}
impl TokenResponse {
	/// Token lifetime as a [`Duration`].
	pub fn expires_in_duration(&self) -> Option<Duration> {
		self.expires_in.map(Duration::seconds)
	}
}

fn default_token_type() -> String {
	"Bearer".into()
}

/// Exchanges an authorization code for tokens.
pub async fn exchange_code<C>(
	transport: &C,
	config: &OAuth2Config,
	app: &AppCredentials,
	code: &str,
	redirect_uri: &str,
	code_verifier: Option<&Secret>,
	timeout: Duration,
) -> Result<TokenResponse>
where
	C: ?Sized + HttpTransport,
{
	obs::observe(OperationKind::CodeExchange, "exchange_code", async move {
		let mut form = vec![
			("grant_type", "authorization_code"),
			("client_id", app.client_id.as_str()),
			("client_secret", app.client_secret.expose()),
			("code", code),
			("redirect_uri", redirect_uri),
		];

		if let Some(verifier) = code_verifier {
			form.push(("code_verifier", verifier.expose()));
		}

		request_token(
			transport,
			&config.token_url,
			&form,
			timeout,
			"Token exchange rejected",
			TOKEN_EXCHANGE_FAILED,
		)
		.await
	})
	.await
}

/// Obtains a new access token with a refresh token.
pub async fn refresh_token<C>(
	transport: &C,
	config: &OAuth2Config,
	app: &AppCredentials,
	refresh_token: &Secret,
	timeout: Duration,
) -> Result<TokenResponse>
where
	C: ?Sized + HttpTransport,
{
	obs::observe(OperationKind::TokenRefresh, "refresh_token", async move {
		let form = [
			("grant_type", "refresh_token"),
			("client_id", app.client_id.as_str()),
			("client_secret", app.client_secret.expose()),
			("refresh_token", refresh_token.expose()),
		];

		request_token(
			transport,
			&config.token_url,
			&form,
			timeout,
			"Token refresh rejected",
			TOKEN_REFRESH_FAILED,
		)
		.await
	})
	.await
}

async fn request_token<C>(
	transport: &C,
	token_url: &str,
	form: &[(&str, &str)],
	timeout: Duration,
	action: &str,
	error_code: &str,
) -> Result<TokenResponse>
where
	C: ?Sized + HttpTransport,
{
	let request = http::form_post(token_url, form)?;
	let response = http::execute(transport, request, timeout).await?;

	if auth::is_rejected(&response) {
		return Err(auth::rejection(action, &response, Some(error_code)).into());
	}

	http::decode_json(&response)
}
