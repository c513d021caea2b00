//! Synchronous entry points.
//!
//! Every function here drives the corresponding async operation to completion on a shared
//! current-thread Tokio runtime owned by this module, so the protocol logic exists exactly once.
//! Calling any of them from inside an async runtime returns
//! [`ConfigError::BlockingInsideRuntime`] instead of deadlocking; use the async variant there.

// std
use std::sync::OnceLock;
// crates.io
use serde_json::Value;
use tokio::runtime::{Builder, Handle, Runtime};
// self
use crate::{
	_prelude::*,
	auth::{self, AgentInfo, AppCredentials, Credentials, Secret, TokenResponse},
	client::{CallParams, Client},
	descriptor::{OAuth2Config, RawDescriptor},
	discovery,
	error::ConfigError,
	http::HttpTransport,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> Result<&'static Runtime> {
	if let Some(runtime) = RUNTIME.get() {
		return Ok(runtime);
	}

	let runtime =
		Builder::new_current_thread().enable_all().build().map_err(ConfigError::Runtime)?;

	// A concurrent initializer may win; the losing runtime is dropped here, outside any runtime.
	let _ = RUNTIME.set(runtime);

	RUNTIME
		.get()
		.ok_or_else(|| ConfigError::Runtime(std::io::Error::other("Runtime unavailable.")).into())
}

/// Runs `fut` to completion on the shared runtime.
pub fn block_on<F, T>(fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	if Handle::try_current().is_ok() {
		return Err(ConfigError::BlockingInsideRuntime.into());
	}

	runtime()?.block_on(fut)
}

/// Blocking [`discovery::discover_with`].
pub fn discover_with<C>(transport: &C, domain: &str, timeout: Duration) -> Result<RawDescriptor>
where
	C: ?Sized + HttpTransport,
{
	block_on(discovery::discover_with(transport, domain, timeout))
}

/// Blocking [`discovery::discover`].
#[cfg(feature = "reqwest")]
pub fn discover(domain: &str, timeout: Duration) -> Result<RawDescriptor> {
	discover_with(&ReqwestTransport::default(), domain, timeout)
}

/// Blocking [`auth::register`].
pub fn register<C>(
	transport: &C,
	register_url: &str,
	agent: &AgentInfo,
	timeout: Duration,
) -> Result<Value>
where
	C: ?Sized + HttpTransport,
{
	block_on(auth::register(transport, register_url, agent, timeout))
}

/// Blocking [`auth::verify`].
pub fn verify<C>(
	transport: &C,
	verify_url: &str,
	verification_code: &str,
	timeout: Duration,
) -> Result<Credentials>
where
	C: ?Sized + HttpTransport,
{
	block_on(auth::verify(transport, verify_url, verification_code, timeout))
}

/// Blocking [`auth::exchange_code`].
pub fn exchange_code<C>(
	transport: &C,
	config: &OAuth2Config,
	app: &AppCredentials,
	code: &str,
	redirect_uri: &str,
	code_verifier: Option<&Secret>,
	timeout: Duration,
) -> Result<TokenResponse>
where
	C: ?Sized + HttpTransport,
{
	block_on(auth::exchange_code(
		transport,
		config,
		app,
		code,
		redirect_uri,
		code_verifier,
		timeout,
	))
}

/// Blocking [`auth::refresh_token`].
pub fn refresh_token<C>(
	transport: &C,
	config: &OAuth2Config,
	app: &AppCredentials,
	refresh_token: &Secret,
	timeout: Duration,
) -> Result<TokenResponse>
where
	C: ?Sized + HttpTransport,
{
	block_on(auth::refresh_token(transport, config, app, refresh_token, timeout))
}

impl<C> Client<C>
where
	C: ?Sized + HttpTransport,
{
	/// Blocking [`Client::discover_with`].
	pub fn discover_with_blocking(
		transport: impl Into<Arc<C>>,
		domain: &str,
		timeout: Duration,
	) -> Result<Self> {
		block_on(Self::discover_with(transport, domain, timeout))
	}

	/// Blocking [`Client::call`].
	pub fn call_blocking(&self, name: &str, params: CallParams) -> Result<Value> {
		block_on(self.call(name, params))
	}

	/// Blocking [`Client::register`].
	pub fn register_blocking(&mut self, agent: &AgentInfo) -> Result<Value> {
		block_on(self.register(agent))
	}

	/// Blocking [`Client::complete_registration`].
	pub fn complete_registration_blocking(
		&mut self,
		verification_code: &str,
		verify_url: Option<&str>,
	) -> Result<Credentials> {
		block_on(self.complete_registration(verification_code, verify_url))
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Blocking [`Client::discover`].
	pub fn discover_blocking(domain: &str) -> Result<Self> {
		block_on(Self::discover(domain))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn block_on_drives_futures_outside_a_runtime() {
		let value = block_on(async { Ok(42) }).expect("Plain future should complete.");

		assert_eq!(value, 42);
		assert_eq!(block_on(async { Ok("again") }).expect("Runtime should be reusable."), "again");
	}

	#[tokio::test]
	async fn block_on_refuses_to_nest_inside_a_runtime() {
		let err = block_on(async { Ok(()) }).expect_err("Nested blocking should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::BlockingInsideRuntime)));
	}
}
