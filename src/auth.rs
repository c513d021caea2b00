//! Agent registration and OAuth 2.0 authorization helpers.
//!
//! Both flows are plain async functions over [`HttpTransport`](crate::http::HttpTransport); the
//! [`Client`](crate::Client) wraps the registration flow and stores the issued credentials.

pub mod oauth;
pub mod registration;
pub mod secret;

pub use oauth::*;
pub use registration::*;
pub use secret::*;

// crates.io
use oauth2::HttpResponse;
// self
use crate::{error::AuthenticationError, http};

fn is_rejected(response: &HttpResponse) -> bool {
	response.status().as_u16() >= 400
}

fn rejection(
	action: &str,
	response: &HttpResponse,
	error_code: Option<&str>,
) -> AuthenticationError {
	let status = response.status().as_u16();
	let error = AuthenticationError::rejected(
		format!("{action} (HTTP {status}): {}", http::body_text(response)),
		status,
	);

	match error_code {
		Some(code) => error.with_error_code(code),
		None => error,
	}
}
