//! HMAC request signing for `signed_key` authentication.
//!
//! The signing string is exactly `"{timestamp}.{body}"`, where `timestamp` is Unix seconds and
//! `body` is the raw request body (empty for bodiless requests). Clients attach the resulting
//! digest through [`create_signed_headers`]; sites check it with [`verify_signature`], which is
//! the only place timestamp freshness is enforced.

// crates.io
use hmac::{Hmac, Mac};
use oauth2::http::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;
// self
use crate::{_prelude::*, error::ConfigError};

/// Header prefix used when the descriptor does not declare one.
pub const DEFAULT_HEADER_PREFIX: &str = "X-IA-";
/// Freshness window applied by [`verify_signature`] callers that have no site policy.
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 60;

/// HMAC digest algorithms a descriptor may declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningAlgorithm {
	/// HMAC-SHA256.
	#[default]
	Sha256,
	/// HMAC-SHA512.
	Sha512,
}
impl SigningAlgorithm {
	/// Returns the identifier used in descriptors.
	pub const fn as_str(self) -> &'static str {
		match self {
			SigningAlgorithm::Sha256 => "sha256",
			SigningAlgorithm::Sha512 => "sha512",
		}
	}
}
impl Display for SigningAlgorithm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Computes the hex-encoded HMAC of `"{timestamp}.{body}"` keyed by `secret`.
pub fn sign(secret: &str, timestamp: i64, body: &str, algorithm: SigningAlgorithm) -> String {
	let signing_string = format!("{timestamp}.{body}");

	match algorithm {
		SigningAlgorithm::Sha256 => mac_hex::<Hmac<Sha256>>(secret, &signing_string),
		SigningAlgorithm::Sha512 => mac_hex::<Hmac<Sha512>>(secret, &signing_string),
	}
}

fn mac_hex<M>(secret: &str, message: &str) -> String
where
	M: Mac + hmac::digest::KeyInit,
{
	// Infallible: HMAC hashes long keys and zero-pads short ones, so no length is rejected.
	let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(secret.as_bytes())
		.expect("HMAC should accept keys of any length.");

	mac.update(message.as_bytes());

	hex::encode(mac.finalize().into_bytes())
}

/// The three authentication headers attached to a signed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeaders {
	/// Header name prefix, e.g. `X-IA-`.
	pub prefix: String,
	/// API key issued during registration.
	pub api_key: String,
	/// Hex-encoded request signature.
	pub signature: String,
	/// Unix timestamp (seconds) covered by the signature.
	pub timestamp: i64,
}
impl SignedHeaders {
	/// Returns the `(name, value)` pairs in `Key`, `Signature`, `Timestamp` order.
	pub fn pairs(&self) -> [(String, String); 3] {
		let prefix = &self.prefix;

		[
			(format!("{prefix}Key"), self.api_key.clone()),
			(format!("{prefix}Signature"), self.signature.clone()),
			(format!("{prefix}Timestamp"), self.timestamp.to_string()),
		]
	}

	/// Inserts the headers into `headers`, replacing any previous values.
	pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), ConfigError> {
		for (name, value) in self.pairs() {
			let header_name = HeaderName::from_bytes(name.as_bytes())
				.map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
			let header_value = HeaderValue::from_str(&value)
				.map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;

			headers.insert(header_name, header_value);
		}

		Ok(())
	}
}

/// Builds the signed header set for `body`, stamping the current time unless `timestamp` is
/// supplied.
pub fn create_signed_headers(
	api_key: &str,
	secret: &str,
	body: &str,
	prefix: &str,
	algorithm: SigningAlgorithm,
	timestamp: Option<i64>,
) -> SignedHeaders {
	let timestamp = timestamp.unwrap_or_else(unix_now);
	let signature = sign(secret, timestamp, body, algorithm);

	SignedHeaders { prefix: prefix.to_owned(), api_key: api_key.to_owned(), signature, timestamp }
}

/// Site-side check of an incoming signature.
///
/// Returns `false` when `timestamp` is more than `max_age_seconds` away from the current time
/// in either direction, otherwise compares the recomputed digest against `expected_signature`
/// in constant time.
pub fn verify_signature(
	secret: &str,
	timestamp: i64,
	body: &str,
	expected_signature: &str,
	algorithm: SigningAlgorithm,
	max_age_seconds: u64,
) -> bool {
	if unix_now().abs_diff(timestamp) > max_age_seconds {
		return false;
	}

	let computed = sign(secret, timestamp, body, algorithm);

	computed.as_bytes().ct_eq(expected_signature.as_bytes()).into()
}

pub(crate) fn unix_now() -> i64 {
	OffsetDateTime::now_utc().unix_timestamp()
}
