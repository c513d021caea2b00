//! Maps endpoint responses onto decoded JSON or typed errors.

// crates.io
use oauth2::{HttpResponse, http::StatusCode};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{AuthenticationError, RateLimitError},
	http,
};

/// Converts `response` into its JSON body, or the error its status calls for.
///
/// - 429 yields [`RateLimitError`] with the numeric `Retry-After` value.
/// - 401 and 403 yield [`AuthenticationError`] carrying `error.code` from a JSON body.
/// - Any other status of 400 or above yields [`Error::Api`].
/// - An empty success body decodes as `{}`.
pub(crate) fn map_response(response: &HttpResponse) -> Result<Value> {
	let status = response.status();

	if status == StatusCode::TOO_MANY_REQUESTS {
		return Err(RateLimitError {
			message: http::body_text(response),
			retry_after: http::parse_retry_after(response.headers()),
		}
		.into());
	}
	if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
		let status_code = status.as_u16();
		let error = AuthenticationError::rejected(
			format!("Authentication failed (HTTP {status_code}): {}", http::body_text(response)),
			status_code,
		);

		return Err(match error_code(response.body()) {
			Some(code) => error.with_error_code(code),
			None => error,
		}
		.into());
	}
	if status.as_u16() >= 400 {
		return Err(Error::Api { status: status.as_u16(), message: http::body_text(response) });
	}

	http::decode_json(response)
}

fn error_code(body: &[u8]) -> Option<String> {
	let value: Value = serde_json::from_slice(body).ok()?;

	match value.pointer("/error/code")? {
		Value::String(code) => Some(code.clone()),
		Value::Null => None,
		other => Some(other.to_string()),
	}
}
