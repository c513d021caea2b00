// crates.io
use oauth2::http::Method;
use serde::de::{Deserializer, Error as _};
use serde_json::Value;
// self
use crate::{_prelude::*, descriptor::OrderedMap};

/// Authentication tier of an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
	/// No authentication.
	Public,
	/// Requires signed-key headers.
	Protected,
	/// Requires signed-key headers plus a user bearer token.
	UserRequired,
}
impl AccessLevel {
	/// Returns the descriptor group name.
	pub const fn as_str(self) -> &'static str {
		match self {
			AccessLevel::Public => "public",
			AccessLevel::Protected => "protected",
			AccessLevel::UserRequired => "user_required",
		}
	}

	/// Returns true when requests at this level carry signed-key headers.
	pub const fn is_signed(self) -> bool {
		matches!(self, AccessLevel::Protected | AccessLevel::UserRequired)
	}
}
impl Display for AccessLevel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Declared query parameter or body field.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
	/// Parameter name.
	pub name: String,
	/// Declared JSON type, `string` when omitted.
	pub kind: String,
	/// Whether callers must supply the parameter.
	pub required: bool,
	/// Human-readable description.
	pub description: String,
	/// Default value applied by the site.
	pub default: Option<Value>,
	/// Example value.
	pub example: Option<Value>,
	/// Allowed values.
	pub allowed: Option<Vec<Value>>,
	/// Inclusive numeric lower bound.
	pub min: Option<f64>,
	/// Inclusive numeric upper bound.
	pub max: Option<f64>,
	/// Regular expression the value must match.
	pub pattern: Option<String>,
}

#[derive(Deserialize)]
struct ParameterDocument {
	#[serde(rename = "type", default = "default_kind")]
	kind: String,
	#[serde(default)]
	required: bool,
	#[serde(default)]
	description: String,
	#[serde(default)]
	default: Option<Value>,
	#[serde(default)]
	example: Option<Value>,
	#[serde(rename = "enum", default)]
	allowed: Option<Vec<Value>>,
	#[serde(default)]
	min: Option<f64>,
	#[serde(default)]
	max: Option<f64>,
	#[serde(default)]
	pattern: Option<String>,
}
impl ParameterDocument {
	fn into_parameter(self, name: String) -> Parameter {
		Parameter {
			name,
			kind: self.kind,
			required: self.required,
			description: self.description,
			default: self.default,
			example: self.example,
			allowed: self.allowed,
			min: self.min,
			max: self.max,
			pattern: self.pattern,
		}
	}
}

fn default_kind() -> String {
	"string".into()
}

/// Declared endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Endpoint {
	/// Unique endpoint name.
	pub name: String,
	/// HTTP method, compared case-sensitively.
	pub method: Method,
	/// Path template appended to the base URL; may contain `{placeholder}` segments.
	pub path: String,
	/// Human-readable description.
	pub description: String,
	/// Authentication tier, taken from the group that declared the endpoint.
	pub level: AccessLevel,
	/// Query parameters in declaration order.
	pub parameters: Vec<Parameter>,
	/// Body fields in declaration order.
	pub body_fields: Vec<Parameter>,
	/// Advisory rate limit text, e.g. `10/minute`.
	pub rate_limit: Option<String>,
	/// OAuth scopes the endpoint needs.
	pub scopes: Vec<String>,
	/// Whether the site marked the endpoint as deprecated.
	pub deprecated: bool,
}
impl Endpoint {
	/// Returns true when arguments travel as a JSON body rather than the query string.
	pub fn sends_body(&self) -> bool {
		matches!(self.method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
	}

	/// Placeholder names in the path template, in order of appearance.
	pub fn path_parameters(&self) -> Vec<&str> {
		path_segments(&self.path)
			.into_iter()
			.filter_map(|segment| match segment {
				PathSegment::Placeholder(name) => Some(name),
				PathSegment::Literal(_) => None,
			})
			.collect()
	}
}

#[derive(Deserialize)]
pub(crate) struct EndpointDocument {
	#[serde(deserialize_with = "deserialize_method")]
	method: Method,
	path: String,
	description: String,
	#[serde(default)]
	parameters: Option<OrderedMap<ParameterDocument>>,
	#[serde(default)]
	body: Option<OrderedMap<ParameterDocument>>,
	#[serde(default)]
	rate_limit: Option<String>,
	#[serde(default)]
	scopes: Vec<String>,
	#[serde(default)]
	deprecated: bool,
}
impl EndpointDocument {
	pub(crate) fn into_endpoint(self, name: String, level: AccessLevel) -> Endpoint {
		let collect = |fields: Option<OrderedMap<ParameterDocument>>| {
			fields
				.unwrap_or_default()
				.into_iter()
				.map(|(name, doc)| doc.into_parameter(name))
				.collect::<Vec<_>>()
		};

		Endpoint {
			name,
			method: self.method,
			path: self.path,
			description: self.description,
			level,
			parameters: collect(self.parameters),
			body_fields: collect(self.body),
			rate_limit: self.rate_limit,
			scopes: self.scopes,
			deprecated: self.deprecated,
		}
	}
}

fn deserialize_method<'de, D>(deserializer: D) -> Result<Method, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	Method::from_bytes(raw.as_bytes())
		.map_err(|_| D::Error::custom(format!("`{raw}` is not a valid HTTP method")))
}

/// Piece of a path template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PathSegment<'a> {
	/// Text copied verbatim.
	Literal(&'a str),
	/// `{name}` placeholder; the name is a non-empty run of word characters.
	Placeholder(&'a str),
}

/// Splits `path` into literal text and `{name}` placeholders.
///
/// A brace that does not open a well-formed placeholder stays literal.
pub(crate) fn path_segments(path: &str) -> Vec<PathSegment<'_>> {
	let mut segments = Vec::new();
	let mut literal_start = 0;
	let mut cursor = 0;

	while let Some(offset) = path[cursor..].find('{') {
		let open = cursor + offset;
		let name_start = open + 1;
		let name_len = path[name_start..]
			.char_indices()
			.find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
			.map_or(path.len() - name_start, |(idx, _)| idx);
		let name_end = name_start + name_len;

		if name_len > 0 && path[name_end..].starts_with('}') {
			if literal_start < open {
				segments.push(PathSegment::Literal(&path[literal_start..open]));
			}

			segments.push(PathSegment::Placeholder(&path[name_start..name_end]));

			cursor = name_end + 1;
			literal_start = cursor;
		} else {
			cursor = name_start;
		}
	}

	if literal_start < path.len() {
		segments.push(PathSegment::Literal(&path[literal_start..]));
	}

	segments
}
