//! Descriptor data structures shared by discovery and the client.
//!
//! A [`RawDescriptor`] is the JSON document exactly as fetched; [`Descriptor`] is its typed,
//! immutable view. Endpoint groups are merged into a single name-keyed set in
//! `public`, `protected`, `user_required` order, so a name declared in several groups resolves
//! to the last group that declares it.

/// Signed-key and OAuth 2.0 sections.
pub mod auth;
/// Endpoint and parameter records.
pub mod endpoint;
/// Site metadata.
pub mod site;

pub use auth::*;
pub use endpoint::*;
pub use site::*;

// std
use std::marker::PhantomData;
// crates.io
use serde::de::{Deserializer, MapAccess, Visitor};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DiscoveryError},
};

/// Largest descriptor accepted, in bytes.
pub const MAX_DESCRIPTOR_SIZE: usize = 1_048_576;

/// The only descriptor major version this crate understands.
pub const SUPPORTED_MAJOR_VERSION: i64 = 1;

const REQUIRED_FIELDS: [&str; 3] = ["version", "site", "api"];

/// Descriptor document as fetched, before typed parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDescriptor(Value);
impl RawDescriptor {
	/// Wraps an already-parsed JSON document.
	pub fn from_value(value: Value) -> Self {
		Self(value)
	}

	/// Parses a descriptor from bytes, enforcing [`MAX_DESCRIPTOR_SIZE`] before decoding.
	pub fn from_slice(bytes: &[u8]) -> Result<Self> {
		if bytes.len() > MAX_DESCRIPTOR_SIZE {
			return Err(ConfigError::DescriptorTooLarge {
				size: bytes.len(),
				limit: MAX_DESCRIPTOR_SIZE,
			}
			.into());
		}

		let de = &mut serde_json::Deserializer::from_slice(bytes);
		let value = serde_path_to_error::deserialize(de)
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;

		Ok(Self(value))
	}

	/// Borrows the underlying JSON document.
	pub fn as_value(&self) -> &Value {
		&self.0
	}

	/// Returns the underlying JSON document.
	pub fn into_value(self) -> Value {
		self.0
	}

	/// Minimal structural validation: required top-level keys and a supported major version.
	///
	/// `domain` only labels the error.
	pub fn validate(&self, domain: &str) -> Result<(), DiscoveryError> {
		for field in REQUIRED_FIELDS {
			if self.0.get(field).is_none() {
				return Err(DiscoveryError::MissingField { domain: domain.to_owned(), field });
			}
		}

		let invalid = |version: String| DiscoveryError::InvalidVersion {
			domain: domain.to_owned(),
			version,
		};
		let version = match &self.0["version"] {
			Value::String(version) => version,
			other => return Err(invalid(other.to_string())),
		};
		let major = major_version(version).ok_or_else(|| invalid(version.clone()))?;

		if major != SUPPORTED_MAJOR_VERSION {
			return Err(DiscoveryError::UnsupportedVersion { domain: domain.to_owned(), major });
		}

		Ok(())
	}
}
impl From<Value> for RawDescriptor {
	fn from(value: Value) -> Self {
		Self::from_value(value)
	}
}

/// Extracts the integer before the first `.` of a version string.
pub fn major_version(version: &str) -> Option<i64> {
	version.split('.').next()?.trim().parse().ok()
}

/// Typed, immutable view of a descriptor.
#[derive(Clone, Debug)]
pub struct Descriptor {
	/// Declared descriptor format version, e.g. `1.0`.
	pub version: String,
	/// Site metadata.
	pub site: SiteInfo,
	/// Base URL every endpoint path is appended to.
	pub base_url: String,
	/// Authentication schemes offered by the site.
	pub auth: AuthConfig,
	/// Free-form `security` section, kept as-is.
	pub security: Option<Value>,
	/// Capability flags in declaration order.
	pub capabilities: OrderedMap<bool>,
	endpoints: Vec<Endpoint>,
	index: HashMap<String, usize>,
}
impl Descriptor {
	/// Parses the typed view of `raw`.
	pub fn parse(raw: &RawDescriptor) -> Result<Self> {
		let document: DescriptorDocument = serde_path_to_error::deserialize(raw.as_value())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;

		if major_version(&document.version) != Some(SUPPORTED_MAJOR_VERSION) {
			return Err(ConfigError::UnsupportedVersion { version: document.version }.into());
		}

		let DescriptorDocument { version, site, api, auth, security, capabilities } = document;
		let mut descriptor = Self {
			version,
			site,
			base_url: api.base_url,
			auth: auth.unwrap_or_default(),
			security,
			capabilities: capabilities.unwrap_or_default(),
			endpoints: Vec::new(),
			index: HashMap::new(),
		};

		for (level, group) in [
			(AccessLevel::Public, api.public),
			(AccessLevel::Protected, api.protected),
			(AccessLevel::UserRequired, api.user_required),
		] {
			for (name, doc) in group.unwrap_or_default() {
				descriptor.insert(doc.into_endpoint(name, level));
			}
		}

		Ok(descriptor)
	}

	fn insert(&mut self, endpoint: Endpoint) {
		match self.index.get(&endpoint.name) {
			Some(&slot) => self.endpoints[slot] = endpoint,
			None => {
				self.index.insert(endpoint.name.clone(), self.endpoints.len());
				self.endpoints.push(endpoint);
			},
		}
	}

	/// Endpoints in declaration order, optionally restricted to one access level.
	pub fn endpoints(&self, level: Option<AccessLevel>) -> Vec<&Endpoint> {
		self.endpoints
			.iter()
			.filter(|endpoint| level.is_none_or(|level| endpoint.level == level))
			.collect()
	}

	/// Looks up an endpoint by exact name.
	pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
		self.index.get(name).map(|&slot| &self.endpoints[slot])
	}

	/// Declared endpoint names, sorted.
	pub fn endpoint_names(&self) -> Vec<String> {
		let mut names: Vec<_> =
			self.endpoints.iter().map(|endpoint| endpoint.name.clone()).collect();

		names.sort();

		names
	}
}

#[derive(Deserialize)]
struct DescriptorDocument {
	version: String,
	site: SiteInfo,
	api: ApiDocument,
	#[serde(default)]
	auth: Option<AuthConfig>,
	#[serde(default)]
	security: Option<Value>,
	#[serde(default)]
	capabilities: Option<OrderedMap<bool>>,
}

#[derive(Deserialize)]
struct ApiDocument {
	base_url: String,
	#[serde(default)]
	public: Option<OrderedMap<EndpointDocument>>,
	#[serde(default)]
	protected: Option<OrderedMap<EndpointDocument>>,
	#[serde(default)]
	user_required: Option<OrderedMap<EndpointDocument>>,
}

/// String-keyed map that keeps the declaration order of a JSON object.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderedMap<T>(Vec<(String, T)>);
impl<T> OrderedMap<T> {
	/// Number of entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when the map holds no entries.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Looks up the first entry named `key`.
	pub fn get(&self, key: &str) -> Option<&T> {
		self.0.iter().find(|(name, _)| name == key).map(|(_, value)| value)
	}

	/// Entry names in declaration order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|(name, _)| name.as_str())
	}

	/// Entries in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value))
	}
}
impl<T> Default for OrderedMap<T> {
	fn default() -> Self {
		Self(Vec::new())
	}
}
impl<T> IntoIterator for OrderedMap<T> {
	type IntoIter = std::vec::IntoIter<(String, T)>;
	type Item = (String, T);

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
impl<K, T> FromIterator<(K, T)> for OrderedMap<T>
where
	K: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, T)>,
	{
		Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
	}
}
impl<'de, T> Deserialize<'de> for OrderedMap<T>
where
	T: Deserialize<'de>,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct EntriesVisitor<T>(PhantomData<T>);
		impl<'de, T> Visitor<'de> for EntriesVisitor<T>
		where
			T: Deserialize<'de>,
		{
			type Value = OrderedMap<T>;

			fn expecting(&self, f: &mut Formatter) -> FmtResult {
				f.write_str("a JSON object")
			}

			fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));

				while let Some(entry) = map.next_entry::<String, T>()? {
					entries.push(entry);
				}

				Ok(OrderedMap(entries))
			}
		}

		deserializer.deserialize_map(EntriesVisitor(PhantomData))
	}
}
