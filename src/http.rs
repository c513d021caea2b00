//! Transport primitives shared by discovery, the authentication flows, and the client.
//!
//! The module exposes [`HttpTransport`] so downstream crates can plug in custom HTTP stacks.
//! Each network operation asks the transport for a short-lived [`AsyncHttpClient`] handle bound
//! to that operation's deadline, dispatches exactly one request, and maps failures into
//! [`TransportError`] without retrying.

pub use oauth2::{self, AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};

// std
use std::ops::Deref;
// crates.io
use oauth2::http::{HeaderMap, HeaderValue, Method, header};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Default deadline applied to token, registration, and endpoint requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(30);

/// Abstraction over HTTP transports capable of executing a single request/response exchange.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared across client
/// instances, and the handles they return must own whatever state is required so their
/// request futures remain `Send` for the lifetime of the in-flight operation.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle bound to a request deadline.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle whose requests fail once `timeout` elapses.
	fn with_timeout(&self, timeout: Duration) -> Self::Handle;

	/// Reports whether a transport failure was caused by the request deadline.
	fn is_timeout(error: &Self::TransportError) -> bool {
		let _ = error;

		false
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_timeout(&self, timeout: Duration) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), timeout: timeout.unsigned_abs() }
	}

	fn is_timeout(error: &Self::TransportError) -> bool {
		error.is_timeout()
	}
}

/// Handle returned by [`ReqwestTransport`] that applies a per-request deadline.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	timeout: std::time::Duration,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = Some(self.timeout);

			let response = self.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Dispatches `request` through `transport`, mapping transport failures into crate errors.
pub(crate) async fn execute<C>(
	transport: &C,
	request: HttpRequest,
	timeout: Duration,
) -> Result<HttpResponse>
where
	C: ?Sized + HttpTransport,
{
	let url = request.uri().to_string();
	let handle = transport.with_timeout(timeout);

	handle.call(request).await.map_err(|err| map_transport_error::<C>(url, err))
}

fn map_transport_error<C>(url: String, err: HttpClientError<C::TransportError>) -> Error
where
	C: ?Sized + HttpTransport,
{
	match err {
		HttpClientError::Reqwest(inner) =>
			if C::is_timeout(&inner) {
				TransportError::Timeout { url, source: inner }.into()
			} else {
				TransportError::Network { url, source: inner }.into()
			},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(source) => TransportError::Io { url, source }.into(),
		HttpClientError::Other(message) =>
			TransportError::Network { url, source: message.into() }.into(),
		_ => TransportError::Network { url, source: "Unknown HTTP client failure.".into() }.into(),
	}
}

/// Builds a request with an optional body and the given extra headers.
pub(crate) fn build_request(
	method: Method,
	url: &Url,
	headers: HeaderMap,
	body: Vec<u8>,
) -> Result<HttpRequest> {
	let mut request = HttpRequest::new(body);

	*request.method_mut() = method;
	*request.uri_mut() =
		url.as_str().parse().map_err(oauth2::http::Error::from).map_err(ConfigError::from)?;
	*request.headers_mut() = headers;

	Ok(request)
}

/// Builds a `POST` carrying `payload` as a JSON document.
pub(crate) fn json_post<T>(url: &str, payload: &T) -> Result<HttpRequest>
where
	T: ?Sized + Serialize,
{
	let url = parse_url(url)?;
	let body = serde_json::to_vec(payload).map_err(ConfigError::Serialize)?;
	let mut headers = HeaderMap::new();

	headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
	headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

	build_request(Method::POST, &url, headers, body)
}

/// Builds a `POST` carrying `form` as `application/x-www-form-urlencoded` pairs.
pub(crate) fn form_post(url: &str, form: &[(&str, &str)]) -> Result<HttpRequest> {
	let url = parse_url(url)?;
	let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(form).finish();
	let mut headers = HeaderMap::new();

	headers.insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static("application/x-www-form-urlencoded"),
	);
	headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

	build_request(Method::POST, &url, headers, body.into_bytes())
}

/// Parses `raw` into a [`Url`], reporting the offending text on failure.
pub(crate) fn parse_url(raw: &str) -> Result<Url> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source }.into())
}

/// Returns the response body as text, replacing invalid UTF-8 sequences.
pub(crate) fn body_text(response: &HttpResponse) -> String {
	String::from_utf8_lossy(response.body()).into_owned()
}

/// Decodes a JSON response body into `T`, treating an empty body as JSON `{}`.
pub(crate) fn decode_json<T>(response: &HttpResponse) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let body: &[u8] = if response.body().is_empty() { b"{}" } else { response.body() };
	let de = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(de).map_err(|source| Error::Decode {
		source,
		status: Some(response.status().as_u16()),
	})
}

/// Parses a `Retry-After` header as fractional seconds.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<f64> {
	let raw = headers.get(header::RETRY_AFTER)?.to_str().ok()?.trim();

	raw.parse::<f64>().ok().filter(|secs| secs.is_finite())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_fractional_seconds() {
		let mut headers = HeaderMap::new();

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(header::RETRY_AFTER, HeaderValue::from_static("3.5"));

		assert_eq!(parse_retry_after(&headers), Some(3.5));

		headers.insert(
			header::RETRY_AFTER,
			HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
		);

		assert_eq!(parse_retry_after(&headers), None);
	}

	#[test]
	fn decode_json_treats_empty_body_as_object() {
		let response = HttpResponse::new(Vec::new());
		let value: serde_json::Value =
			decode_json(&response).expect("Empty body should decode as an empty object.");

		assert_eq!(value, serde_json::json!({}));
	}

	#[test]
	fn form_post_encodes_pairs() {
		let request = form_post(
			"https://example.com/token",
			&[("grant_type", "refresh_token"), ("scope", "a b")],
		)
		.expect("Form request should build.");

		assert_eq!(request.method(), Method::POST);
		assert_eq!(request.body().as_slice(), b"grant_type=refresh_token&scope=a+b");
		assert_eq!(
			request.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/x-www-form-urlencoded")
		);
	}

	#[test]
	fn parse_url_reports_offending_text() {
		let err = parse_url("not a url").expect_err("Relative text should not parse as a URL.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidUrl { ref url, .. }) if url == "not a url"
		));
	}
}
