//! Signed-key agent registration.
//!
//! Registration is a two-request handshake around an out-of-band step:
//!
//! 1. [`register`] posts the agent's [`AgentInfo`] to the site's `register_url`.
//! 2. The site delivers a verification code to the agent's webhook.
//! 3. [`verify`] echoes that code back and receives the [`Credentials`].
//!
//! The [`Client`](crate::Client) tracks progress through [`RegistrationState`].

// crates.io
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{self, Secret},
	http::{self, HttpTransport},
	obs::{self, OperationKind},
};

/// Error code attached to failed verification attempts.
pub const VERIFICATION_FAILED: &str = "verification_failed";

/// Agent metadata sent with a registration request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentInfo {
	/// Agent display name.
	pub name: String,
	/// Domain the agent operates from.
	pub domain: String,
	/// Webhook that receives the verification code.
	pub webhook_url: String,
	/// Contact address for the agent's operator.
	pub contact: String,
	/// Optional description; omitted from the payload when empty.
	#[serde(skip_serializing_if = "String::is_empty")]
	pub description: String,
}
impl AgentInfo {
	/// Creates agent metadata without a description.
	pub fn new(
		name: impl Into<String>,
		domain: impl Into<String>,
		webhook_url: impl Into<String>,
		contact: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			domain: domain.into(),
			webhook_url: webhook_url.into(),
			contact: contact.into(),
			description: String::new(),
		}
	}

	/// Sets the description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();

		self
	}
}

/// Signed-key credentials issued after verification.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Credentials {
	/// Public key identifier sent with every signed request.
	pub api_key: String,
	/// Signing secret.
	pub secret: Secret,
	/// Expiry timestamp as sent by the site, if any.
	#[serde(default)]
	pub expires_at: Option<String>,
	/// Permissions granted to the agent.
	#[serde(default)]
	pub permissions: Vec<String>,
}
impl Credentials {
	/// Creates credentials without expiry or permissions.
	pub fn new(api_key: impl Into<String>, secret: impl Into<Secret>) -> Self {
		Self {
			api_key: api_key.into(),
			secret: secret.into(),
			expires_at: None,
			permissions: Vec::new(),
		}
	}

	/// Parses [`Credentials::expires_at`] as an RFC 3339 timestamp.
	///
	/// Returns `None` when the site sent no expiry or one in another format.
	pub fn expires_at_datetime(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::parse(self.expires_at.as_deref()?, &Rfc3339).ok()
	}

	/// Returns true when the credentials carry an expiry that is not after `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at_datetime().is_some_and(|expires_at| expires_at <= now)
	}
}

/// Progress of the registration handshake for one client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RegistrationState {
	/// No registration request has been sent.
	#[default]
	Unregistered,
	/// The registration request was accepted; waiting for the verification code.
	Requested {
		/// URL the registration request was sent to.
		register_url: String,
	},
	/// Credentials were issued and stored.
	Verified,
}

/// Derives the verification URL by replacing `/register` with `/verify`.
pub fn derive_verify_url(register_url: &str) -> String {
	register_url.replace("/register", "/verify")
}

/// Sends the registration request and returns the site's response body.
///
/// An empty success body yields an empty JSON object. The response never carries credentials.
pub async fn register<C>(
	transport: &C,
	register_url: &str,
	agent: &AgentInfo,
	timeout: Duration,
) -> Result<Value>
where
	C: ?Sized + HttpTransport,
{
	obs::observe(OperationKind::Registration, "register", async move {
		let request = http::json_post(register_url, agent)?;

		#[cfg(feature = "tracing")]
		tracing::debug!(url = register_url, agent = %agent.name, "sending registration request");

		let response = http::execute(transport, request, timeout).await?;

		if auth::is_rejected(&response) {
			return Err(auth::rejection("Registration rejected", &response, None).into());
		}

		http::decode_json(&response)
	})
	.await
}

/// Echoes `verification_code` to `verify_url` and returns the issued credentials.
pub async fn verify<C>(
	transport: &C,
	verify_url: &str,
	verification_code: &str,
	timeout: Duration,
) -> Result<Credentials>
where
	C: ?Sized + HttpTransport,
{
	obs::observe(OperationKind::Verification, "verify", async move {
		let payload = serde_json::json!({ "verification_code": verification_code });
		let request = http::json_post(verify_url, &payload)?;
		let response = http::execute(transport, request, timeout).await?;

		if auth::is_rejected(&response) {
			return Err(auth::rejection(
				"Verification failed",
				&response,
				Some(VERIFICATION_FAILED),
			)
			.into());
		}

		http::decode_json(&response)
	})
	.await
}
