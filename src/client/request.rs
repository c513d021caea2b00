//! Turns an endpoint plus call arguments into an authenticated HTTP request.

// crates.io
use oauth2::{
	HttpRequest,
	http::{HeaderMap, HeaderValue, header},
};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	descriptor::{AccessLevel, AuthConfig, Endpoint, PathSegment, path_segments},
	error::ConfigError,
	http,
	signer,
};

/// Arguments for one endpoint call.
///
/// Keys matching `{placeholder}` segments of the endpoint path are substituted into the path;
/// the rest travel as a JSON body for `POST`/`PUT`/`PATCH`/`DELETE` or as the query string
/// otherwise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallParams {
	values: Map<String, Value>,
	access_token: Option<Secret>,
}
impl CallParams {
	/// Creates an empty argument set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces one argument.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.values.insert(key.into(), value.into());

		self
	}

	/// Overrides the client's bearer token for this call only.
	pub fn access_token(mut self, token: impl Into<Secret>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Arguments in insertion order.
	pub fn values(&self) -> &Map<String, Value> {
		&self.values
	}
}
impl From<Map<String, Value>> for CallParams {
	fn from(values: Map<String, Value>) -> Self {
		Self { values, access_token: None }
	}
}

/// Client-held authentication material consulted while preparing a request.
pub(crate) struct RequestAuth<'a> {
	pub(crate) config: &'a AuthConfig,
	pub(crate) api_key: Option<&'a str>,
	pub(crate) secret: Option<&'a Secret>,
	pub(crate) access_token: Option<&'a Secret>,
}

/// Builds the HTTP request for `endpoint`.
pub(crate) fn prepare(
	base_url: &str,
	endpoint: &Endpoint,
	params: CallParams,
	auth: RequestAuth<'_>,
	strict_path_parameters: bool,
) -> Result<HttpRequest> {
	let CallParams { values: mut remaining, access_token } = params;
	let path = resolve_path(&endpoint.path, &mut remaining, strict_path_parameters)?;
	let mut url = http::parse_url(&format!("{base_url}{path}"))?;
	let mut headers = HeaderMap::new();
	let mut body = String::new();

	if !remaining.is_empty() {
		if endpoint.sends_body() {
			body = serde_json::to_string(&remaining).map_err(ConfigError::Serialize)?;

			headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
		} else {
			append_query(&mut url, &remaining);
		}
	}

	if let (true, Some(api_key), Some(secret)) =
		(endpoint.level.is_signed(), auth.api_key, auth.secret)
	{
		let (algorithm, prefix) = auth.config.signing();

		signer::create_signed_headers(api_key, secret.expose(), &body, prefix, algorithm, None)
			.apply(&mut headers)?;
	}

	let bearer = access_token
		.as_ref()
		.or(auth.access_token)
		.filter(|_| endpoint.level == AccessLevel::UserRequired);

	if let Some(token) = bearer {
		let value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
			.map_err(|_| ConfigError::InvalidHeader { name: header::AUTHORIZATION.to_string() })?;

		headers.insert(header::AUTHORIZATION, value);
	}

	http::build_request(endpoint.method.clone(), &url, headers, body.into_bytes())
}

/// Substitutes `{name}` placeholders from `params`, removing each consumed key.
///
/// Placeholders without a value stay literal, or fail when `strict` is set. A placeholder
/// repeated in the path is filled only at its first occurrence.
pub(crate) fn resolve_path(
	path: &str,
	params: &mut Map<String, Value>,
	strict: bool,
) -> Result<String> {
	let mut resolved = String::with_capacity(path.len());
	let mut consumed = Vec::new();

	for segment in path_segments(path) {
		match segment {
			PathSegment::Literal(text) => resolved.push_str(text),
			PathSegment::Placeholder(name) => match params.shift_remove(name) {
				Some(value) => {
					resolved.push_str(&render_value(&value));
					consumed.push(name);
				},
				None if strict && !consumed.contains(&name) =>
					return Err(ConfigError::UnresolvedPathParameter {
						path: path.to_owned(),
						placeholder: name.to_owned(),
					}
					.into()),
				None => {
					resolved.push('{');
					resolved.push_str(name);
					resolved.push('}');
				},
			},
		}
	}

	Ok(resolved)
}

/// Renders a JSON value for a path segment or query string.
///
/// Strings appear verbatim, `null` as the empty string, and every other value in its compact
/// JSON form.
pub(crate) fn render_value(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

fn append_query(url: &mut Url, params: &Map<String, Value>) {
	let mut pairs = url.query_pairs_mut();

	for (key, value) in params {
		match value {
			Value::Array(items) =>
				for item in items {
					pairs.append_pair(key, &render_value(item));
				},
			other => {
				pairs.append_pair(key, &render_value(other));
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::Method;
	use serde_json::json;
	// self
	use super::*;
	use crate::descriptor::{Descriptor, RawDescriptor};

	fn descriptor() -> Descriptor {
		Descriptor::parse(&RawDescriptor::from_value(json!({
			"version": "1.0",
			"site": { "name": "Shop", "type": "ecommerce" },
			"api": {
				"base_url": "https://api.shop.example/v1",
				"public": {
					"search": { "method": "GET", "path": "/search", "description": "Search." },
					"touch": { "method": "POST", "path": "/touch", "description": "Touch." }
				},
				"protected": {
					"order": {
						"method": "GET",
						"path": "/users/{id}/orders/{order_id}",
						"description": "Order."
					},
					"create": { "method": "POST", "path": "/orders", "description": "Create." }
				},
				"user_required": {
					"me": { "method": "GET", "path": "/me", "description": "Me." }
				}
			},
			"auth": {
				"signed_key": {
					"register_url": "https://shop.example/ia/register",
					"header_prefix": "X-Shop-"
				}
			}
		})))
		.expect("Descriptor fixture should parse.")
	}

	fn no_auth(config: &AuthConfig) -> RequestAuth<'_> {
		RequestAuth { config, api_key: None, secret: None, access_token: None }
	}

	fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
		request.headers().get(name).and_then(|value| value.to_str().ok())
	}

	#[test]
	fn resolve_path_consumes_matched_parameters() {
		let mut params = json!({ "id": 7, "order_id": "A1", "status": "open" })
			.as_object()
			.cloned()
			.expect("Fixture should be an object.");
		let path = resolve_path("/users/{id}/orders/{order_id}", &mut params, false)
			.expect("Lenient resolution should succeed.");

		assert_eq!(path, "/users/7/orders/A1");
		assert_eq!(Value::Object(params), json!({ "status": "open" }));
	}

	#[test]
	fn resolve_path_leaves_missing_placeholders_unless_strict() {
		let mut params = Map::new();
		let path = resolve_path("/products/{id}", &mut params, false)
			.expect("Lenient resolution should succeed.");

		assert_eq!(path, "/products/{id}");

		let err = resolve_path("/products/{id}", &mut params, true)
			.expect_err("Strict resolution should reject the missing placeholder.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::UnresolvedPathParameter { ref placeholder, .. })
				if placeholder == "id"
		));
	}

	#[test]
	fn resolve_path_fills_repeated_placeholder_once() {
		let mut params =
			json!({ "id": "x" }).as_object().cloned().expect("Fixture should be an object.");
		let path = resolve_path("/a/{id}/b/{id}", &mut params, true)
			.expect("Repeated placeholder should not trip strict mode.");

		assert_eq!(path, "/a/x/b/{id}");
	}

	#[test]
	fn render_value_follows_query_conventions() {
		assert_eq!(render_value(&json!("a b")), "a b");
		assert_eq!(render_value(&json!(2.5)), "2.5");
		assert_eq!(render_value(&json!(true)), "true");
		assert_eq!(render_value(&json!(null)), "");
		assert_eq!(render_value(&json!({ "k": [1, 2] })), r#"{"k":[1,2]}"#);
	}

	#[test]
	fn get_arguments_become_query_pairs() {
		let descriptor = descriptor();
		let endpoint = descriptor.endpoint("search").expect("Endpoint should exist.");
		let params = CallParams::new().with("q", "red shoes").with("tags", json!(["a", "b"]));
		let request = prepare(
			&descriptor.base_url,
			endpoint,
			params,
			no_auth(&descriptor.auth),
			false,
		)
		.expect("Request should build.");

		assert_eq!(request.method(), Method::GET);
		assert_eq!(
			request.uri().to_string(),
			"https://api.shop.example/v1/search?q=red+shoes&tags=a&tags=b"
		);
		assert!(request.body().is_empty());
		assert!(header(&request, "content-type").is_none());
	}

	#[test]
	fn body_methods_send_compact_json_only_when_arguments_remain() {
		let descriptor = descriptor();
		let endpoint = descriptor.endpoint("touch").expect("Endpoint should exist.");
		let request = prepare(
			&descriptor.base_url,
			endpoint,
			CallParams::new().with("b", 2).with("a", "x"),
			no_auth(&descriptor.auth),
			false,
		)
		.expect("Request should build.");

		assert_eq!(request.body().as_slice(), br#"{"b":2,"a":"x"}"#);
		assert_eq!(header(&request, "content-type"), Some("application/json"));

		let request = prepare(
			&descriptor.base_url,
			endpoint,
			CallParams::new(),
			no_auth(&descriptor.auth),
			false,
		)
		.expect("Request should build.");

		assert!(request.body().is_empty());
		assert!(header(&request, "content-type").is_none());
	}

	#[test]
	fn protected_requests_sign_the_exact_body() {
		let descriptor = descriptor();
		let endpoint = descriptor.endpoint("create").expect("Endpoint should exist.");
		let secret = Secret::new("s3cr3t");
		let auth = RequestAuth {
			config: &descriptor.auth,
			api_key: Some("key-1"),
			secret: Some(&secret),
			access_token: None,
		};
		let request = prepare(
			&descriptor.base_url,
			endpoint,
			CallParams::new().with("sku", "p-1"),
			auth,
			false,
		)
		.expect("Request should build.");
		let body = r#"{"sku":"p-1"}"#;
		let timestamp: i64 = header(&request, "x-shop-timestamp")
			.and_then(|value| value.parse().ok())
			.expect("Timestamp header should be numeric.");

		assert_eq!(header(&request, "x-shop-key"), Some("key-1"));
		assert_eq!(
			header(&request, "x-shop-signature"),
			Some(signer::sign("s3cr3t", timestamp, body, signer::SigningAlgorithm::Sha256).as_str())
		);
	}

	#[test]
	fn signing_requires_both_key_and_secret() {
		let descriptor = descriptor();
		let endpoint = descriptor.endpoint("order").expect("Endpoint should exist.");
		let auth = RequestAuth {
			config: &descriptor.auth,
			api_key: Some("key-1"),
			secret: None,
			access_token: None,
		};
		let request = prepare(
			&descriptor.base_url,
			endpoint,
			CallParams::new().with("id", 1).with("order_id", 2),
			auth,
			false,
		)
		.expect("Request should build.");

		assert_eq!(request.uri().to_string(), "https://api.shop.example/v1/users/1/orders/2");
		assert!(header(&request, "x-shop-key").is_none());
	}

	#[test]
	fn bearer_token_prefers_per_call_override() {
		let descriptor = descriptor();
		let endpoint = descriptor.endpoint("me").expect("Endpoint should exist.");
		let client_token = Secret::new("client-token");
		let auth = || RequestAuth {
			config: &descriptor.auth,
			api_key: None,
			secret: None,
			access_token: Some(&client_token),
		};
		let request = prepare(&descriptor.base_url, endpoint, CallParams::new(), auth(), false)
			.expect("Request should build.");

		assert_eq!(header(&request, "authorization"), Some("Bearer client-token"));

		let request = prepare(
			&descriptor.base_url,
			endpoint,
			CallParams::new().access_token("call-token"),
			auth(),
			false,
		)
		.expect("Request should build.");

		assert_eq!(header(&request, "authorization"), Some("Bearer call-token"));
		assert_eq!(endpoint.level, AccessLevel::UserRequired);
	}

	#[test]
	fn public_requests_never_carry_auth_headers() {
		let descriptor = descriptor();
		let endpoint = descriptor.endpoint("search").expect("Endpoint should exist.");
		let secret = Secret::new("s3cr3t");
		let token = Secret::new("token");
		let auth = RequestAuth {
			config: &descriptor.auth,
			api_key: Some("key-1"),
			secret: Some(&secret),
			access_token: Some(&token),
		};
		let request = prepare(&descriptor.base_url, endpoint, CallParams::new(), auth, false)
			.expect("Request should build.");

		assert!(request.headers().is_empty());
	}
}
