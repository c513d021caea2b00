// self
use crate::_prelude::*;

/// Site metadata from the descriptor's `site` section.
///
/// `name` and `type` are required; every other field defaults to an empty string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
	/// Display name.
	pub name: String,
	/// Site category, e.g. `ecommerce`.
	#[serde(rename = "type")]
	pub site_type: String,
	/// Free-form description.
	#[serde(default)]
	pub description: String,
	/// Public homepage.
	#[serde(default)]
	pub url: String,
	/// Logo URL.
	#[serde(default)]
	pub logo: String,
	/// ISO 4217 currency code for monetary values.
	#[serde(default)]
	pub currency: String,
	/// Preferred content language.
	#[serde(default)]
	pub language: String,
	/// IANA time zone of the site.
	#[serde(default)]
	pub timezone: String,
	/// Contact address for API questions.
	#[serde(default)]
	pub contact: String,
}
