//! Registers an agent with the synchronous API, completes verification with the code the site
//! would deliver to the agent's webhook, and makes a signed call with the issued credentials.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use iajson::{CallParams, Client, RawDescriptor, auth::AgentInfo};

fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start();

	server.mock(|when, then| {
		when.method(POST).path("/ia/register");
		then.status(202).json_body(json!({ "status": "pending_verification" }));
	});
	server.mock(|when, then| {
		when.method(POST).path("/ia/verify").json_body(json!({ "verification_code": "123456" }));
		then.status(200).json_body(json!({
			"api_key": "issued-key",
			"secret": "issued-secret",
			"expires_at": "2031-01-01T00:00:00Z",
			"permissions": ["orders:read"]
		}));
	});
	server.mock(|when, then| {
		when.method(GET).path("/orders").header("X-IA-Key", "issued-key");
		then.status(200).json_body(json!({ "orders": [] }));
	});

	let mut client = Client::new(RawDescriptor::from_value(json!({
		"version": "1.0",
		"site": { "name": "Demo Shop", "type": "ecommerce" },
		"api": {
			"base_url": server.base_url(),
			"protected": {
				"list_orders": { "method": "GET", "path": "/orders", "description": "List orders." }
			}
		},
		"auth": { "signed_key": { "register_url": server.url("/ia/register") } }
	})))?;
	let agent = AgentInfo::new(
		"Price Helper",
		"helper.example",
		"https://helper.example/ia/webhook",
		"ops@helper.example",
	)
	.with_description("Compares prices across shops.");
	let pending = client.register_blocking(&agent)?;

	println!("Registration accepted: {pending}.");
	println!("State: {:?}.", client.registration_state());

	// The site posts the code to the webhook; a real agent reads it from there.
	let credentials = client.complete_registration_blocking("123456", None)?;

	println!(
		"Issued key {} with permissions {:?}, expires {:?}.",
		credentials.api_key,
		credentials.permissions,
		credentials.expires_at_datetime()
	);

	let orders = client.call_blocking("list_orders", CallParams::new())?;

	println!("Orders: {orders}.");

	Ok(())
}
