// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	descriptor::{OrderedMap, RawDescriptor},
	error::ConfigError,
	signer::{DEFAULT_HEADER_PREFIX, SigningAlgorithm},
};

/// The descriptor's `auth` section. Unknown schemes are ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AuthConfig {
	/// Signed-key scheme, when offered.
	#[serde(default)]
	pub signed_key: Option<SignedKeyConfig>,
	/// OAuth 2.0 scheme, when offered.
	#[serde(default)]
	pub oauth2: Option<OAuth2Config>,
}
impl AuthConfig {
	/// Signing parameters to use for protected requests, falling back to defaults when the site
	/// declares no signed-key section.
	pub fn signing(&self) -> (SigningAlgorithm, &str) {
		match &self.signed_key {
			Some(config) => (config.algorithm, config.header_prefix.as_str()),
			None => (SigningAlgorithm::default(), DEFAULT_HEADER_PREFIX),
		}
	}
}

/// Signed-key registration and signing parameters.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SignedKeyConfig {
	/// URL accepting registration requests.
	pub register_url: String,
	/// Digest algorithm; `sha256` when omitted.
	#[serde(default)]
	pub algorithm: SigningAlgorithm,
	/// Header name prefix; `X-IA-` when omitted.
	#[serde(default = "default_header_prefix")]
	pub header_prefix: String,
}

fn default_header_prefix() -> String {
	DEFAULT_HEADER_PREFIX.into()
}

/// OAuth 2.0 endpoints and metadata.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct OAuth2Config {
	/// Authorization endpoint users are sent to.
	pub authorization_url: String,
	/// Token endpoint used for code exchange and refresh.
	pub token_url: String,
	/// Scope names mapped to their descriptions, in declaration order.
	pub scopes: OrderedMap<String>,
	/// Supported grant types; `["authorization_code"]` when omitted.
	#[serde(default = "default_grant_types")]
	pub grant_types: Vec<String>,
	/// Whether PKCE is mandatory.
	#[serde(default)]
	pub pkce_required: bool,
}
impl OAuth2Config {
	/// Reads the `auth.oauth2` section straight from a raw descriptor.
	pub fn from_descriptor(raw: &RawDescriptor) -> Result<Self> {
		let section = match raw.as_value().pointer("/auth/oauth2") {
			None | Some(Value::Null) => return Err(ConfigError::MissingOAuth2.into()),
			Some(section) => section,
		};

		serde_path_to_error::deserialize(section)
			.map_err(|source| ConfigError::InvalidDescriptor { source }.into())
	}

	/// Declared scope names in declaration order.
	pub fn scope_names(&self) -> Vec<String> {
		self.scopes.keys().map(str::to_owned).collect()
	}
}

fn default_grant_types() -> Vec<String> {
	vec!["authorization_code".into()]
}
