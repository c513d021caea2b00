//! Builds a client from a descriptor served by a local mock site, then calls a public endpoint
//! and a signed protected endpoint.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use iajson::{AccessLevel, CallParams, Client, RawDescriptor};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/products").query_param("q", "boots");
			then.status(200).json_body(json!({ "items": [{ "id": "p-1", "name": "Boots" }] }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/orders").header_exists("X-IA-Signature");
			then.status(201).json_body(json!({ "order_id": "o-1" }));
		})
		.await;

	// `Client::discover("shop.example")` fetches the same document over HTTPS.
	let raw = RawDescriptor::from_value(json!({
		"version": "1.0",
		"site": { "name": "Demo Shop", "type": "ecommerce", "currency": "EUR" },
		"api": {
			"base_url": server.base_url(),
			"public": {
				"search_products": {
					"method": "GET",
					"path": "/products",
					"description": "Search the catalogue.",
					"parameters": { "q": { "type": "string", "required": true } }
				}
			},
			"protected": {
				"create_order": {
					"method": "POST",
					"path": "/orders",
					"description": "Place an order."
				}
			}
		},
		"auth": { "signed_key": { "register_url": server.url("/ia/register") } }
	}));
	let client = Client::builder(raw).api_key("demo-key").secret("demo-secret").build()?;

	println!("Connected to {} ({}).", client.site().name, client.site().site_type);

	for endpoint in client.endpoints(None) {
		println!("  {} {} {} [{}]", endpoint.name, endpoint.method, endpoint.path, endpoint.level);
	}

	let products = client.call("search_products", CallParams::new().with("q", "boots")).await?;

	println!("Search returned {products}.");

	let order = client
		.call("create_order", CallParams::new().with("product_id", "p-1").with("quantity", 1))
		.await?;

	println!("Order placed: {order}.");
	println!("{} protected endpoint(s).", client.endpoints(Some(AccessLevel::Protected)).len());

	Ok(())
}
