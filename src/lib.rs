//! Discover, authenticate against, and call the machine-readable API a site publishes through its
//! `ia.json` descriptor.
//!
//! The crate is organized leaf-first:
//!
//! - [`signer`] computes HMAC request signatures and the signed header set.
//! - [`descriptor`] turns a raw descriptor into typed site, endpoint, and auth records.
//! - [`discovery`] searches the well-known descriptor locations for a domain.
//! - [`auth`] implements agent registration and the OAuth 2.0 authorization-code + PKCE flow.
//! - [`client`] ties it together and turns endpoint calls into authenticated HTTP requests.
//!
//! Every network operation is an `async fn` written against [`http::HttpTransport`]; the
//! [`blocking`] module (default `blocking` feature) drives the same futures to completion for
//! synchronous callers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "blocking")] pub mod blocking;
pub mod client;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod http;
pub mod obs;
pub mod signer;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use serde_json::{Value, json};

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::{Client, ClientBuilder},
		descriptor::RawDescriptor,
		http::ReqwestTransport,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = Client<ReqwestTransport>;

	/// Builds a descriptor whose `api.base_url` points at `base_url` and whose endpoint groups
	/// cover every access level and body-placement rule exercised by the test suite.
	pub fn test_descriptor(base_url: &str) -> RawDescriptor {
		RawDescriptor::from_value(json!({
			"version": "1.0",
			"site": { "name": "Test Store", "type": "ecommerce", "currency": "EUR" },
			"api": {
				"base_url": base_url,
				"public": {
					"search_products": {
						"method": "GET",
						"path": "/products",
						"description": "Search the catalogue.",
						"parameters": {
							"q": { "type": "string", "required": true },
							"limit": { "type": "integer", "min": 1, "max": 100, "default": 20 }
						}
					},
					"get_product": {
						"method": "GET",
						"path": "/products/{id}",
						"description": "Fetch one product."
					}
				},
				"protected": {
					"create_order": {
						"method": "POST",
						"path": "/orders",
						"description": "Place an order.",
						"body": {
							"product_id": { "type": "string", "required": true },
							"quantity": { "type": "integer", "required": true }
						},
						"rate_limit": "10/minute"
					},
					"get_order": {
						"method": "GET",
						"path": "/users/{id}/orders/{order_id}",
						"description": "Fetch an order."
					}
				},
				"user_required": {
					"get_profile": {
						"method": "GET",
						"path": "/me",
						"description": "Current user profile.",
						"scopes": ["profile:read"]
					},
					"delete_account": {
						"method": "DELETE",
						"path": "/me",
						"description": "Delete the current account.",
						"deprecated": true
					}
				}
			},
			"auth": {
				"signed_key": {
					"register_url": format!("{base_url}/ia/register"),
					"algorithm": "sha256",
					"header_prefix": "X-IA-"
				},
				"oauth2": {
					"authorization_url": format!("{base_url}/oauth/authorize"),
					"token_url": format!("{base_url}/oauth/token"),
					"scopes": {
						"profile:read": "Read the profile.",
						"orders:write": "Place orders."
					},
					"pkce_required": true
				}
			},
			"capabilities": { "webhooks": false, "streaming": true }
		}))
	}

	/// Builds a reqwest-backed client for `base_url` with short test timeouts.
	pub fn test_client_builder(base_url: &str) -> ClientBuilder<ReqwestTransport> {
		Client::builder(test_descriptor(base_url)).timeout(Duration::seconds(5))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};

pub use crate::{
	client::{CallParams, Client, ClientBuilder},
	descriptor::{AccessLevel, Descriptor, Endpoint, Parameter, RawDescriptor, SiteInfo},
	error::{Error, Result},
};
