//! Locates and minimally validates a site's descriptor.
//!
//! Fetches `https://{domain}/ia.json` and then `https://{domain}/.well-known/ia.json`, one
//! request each, in that order. A 404 or a transport failure moves on to the next location;
//! any other error status, an oversized body, invalid JSON, or a failed validation stops the
//! search immediately.

// crates.io
use oauth2::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
// self
use crate::{
	_prelude::*,
	descriptor::{MAX_DESCRIPTOR_SIZE, RawDescriptor},
	error::{DiscoveryError, TransportError},
	http::{self, HttpTransport},
	obs::{self, OperationKind},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Locations tried for the descriptor, in priority order.
pub const DISCOVERY_PATHS: [&str; 2] = ["/ia.json", "/.well-known/ia.json"];

/// Deadline applied to each discovery fetch unless the caller supplies one.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::seconds(15);

/// Discovers the descriptor for `domain` with a fresh reqwest transport.
#[cfg(feature = "reqwest")]
pub async fn discover(domain: &str, timeout: Duration) -> Result<RawDescriptor> {
	discover_with(&ReqwestTransport::default(), domain, timeout).await
}

/// Discovers the descriptor for `domain` through `transport`.
///
/// `domain` is a bare host name such as `example.com`; every fetch uses HTTPS.
pub async fn discover_with<C>(
	transport: &C,
	domain: &str,
	timeout: Duration,
) -> Result<RawDescriptor>
where
	C: ?Sized + HttpTransport,
{
	obs::observe(OperationKind::Discovery, "discover", async move {
		let mut last_transport_error: Option<TransportError> = None;

		for path in DISCOVERY_PATHS {
			let url = format!("https://{domain}{path}");

			#[cfg(feature = "tracing")]
			tracing::debug!(%url, "probing descriptor location");

			let request = fetch_request(&url)?;
			let response = match http::execute(transport, request, timeout).await {
				Ok(response) => response,
				Err(Error::Transport(e)) => {
					last_transport_error = Some(e);

					continue;
				},
				Err(e) => return Err(e),
			};
			let status = response.status();

			if status == StatusCode::NOT_FOUND {
				continue;
			}
			if status.as_u16() >= 400 {
				return Err(DiscoveryError::HttpStatus {
					domain: domain.to_owned(),
					url,
					status: status.as_u16(),
				}
				.into());
			}

			let body = response.body();

			if body.len() > MAX_DESCRIPTOR_SIZE {
				return Err(DiscoveryError::TooLarge {
					domain: domain.to_owned(),
					size: body.len(),
					limit: MAX_DESCRIPTOR_SIZE,
				}
				.into());
			}

			let value = serde_json::from_slice(body).map_err(|source| {
				DiscoveryError::InvalidJson { domain: domain.to_owned(), source }
			})?;
			let raw = RawDescriptor::from_value(value);

			raw.validate(domain)?;

			return Ok(raw);
		}

		Err(match last_transport_error {
			Some(source) => DiscoveryError::Transport { domain: domain.to_owned(), source },
			None => DiscoveryError::NotFound { domain: domain.to_owned() },
		}
		.into())
	})
	.await
}

fn fetch_request(url: &str) -> Result<oauth2::HttpRequest> {
	let url = http::parse_url(url)?;
	let mut headers = HeaderMap::new();

	headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

	http::build_request(Method::GET, &url, headers, Vec::new())
}
