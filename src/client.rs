//! Typed client for one site's descriptor.
//!
//! A [`Client`] is built once from a [`RawDescriptor`] (fetched through
//! [`discovery`](crate::discovery) or supplied by the caller), keeps the parsed endpoint set
//! immutable, and owns the mutable authentication state: signed-key credentials, the default
//! bearer token, and registration progress. Credential mutators take `&mut self`, so sharing a
//! client across tasks goes through the caller's own synchronization.

pub mod request;
pub mod response;

pub use request::CallParams;

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{self, AgentInfo, Credentials, RegistrationState, Secret},
	descriptor::{
		AccessLevel, Descriptor, Endpoint, OAuth2Config, OrderedMap, RawDescriptor, SignedKeyConfig,
		SiteInfo,
	},
	discovery,
	error::ConfigError,
	http::{self, HttpTransport},
	obs::{self, OperationKind},
	signer,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestSiteClient = Client<ReqwestTransport>;

/// Calls the endpoints one descriptor declares.
pub struct Client<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	raw: RawDescriptor,
	descriptor: Descriptor,
	api_key: Option<String>,
	secret: Option<Secret>,
	access_token: Option<Secret>,
	timeout: Duration,
	strict_path_parameters: bool,
	registration: RegistrationState,
}
impl<C> Client<C>
where
	C: ?Sized + HttpTransport,
{
	/// Starts a builder that dispatches through `transport`.
	pub fn builder_with_transport(
		raw: RawDescriptor,
		transport: impl Into<Arc<C>>,
	) -> ClientBuilder<C> {
		ClientBuilder {
			raw,
			transport: transport.into(),
			api_key: None,
			secret: None,
			access_token: None,
			timeout: http::DEFAULT_TIMEOUT,
			strict_path_parameters: false,
		}
	}

	/// Discovers `domain` through `transport` and builds a client with default settings.
	///
	/// `timeout` bounds each discovery fetch.
	pub async fn discover_with(
		transport: impl Into<Arc<C>>,
		domain: &str,
		timeout: Duration,
	) -> Result<Self> {
		let transport = transport.into();
		let raw = discovery::discover_with(transport.as_ref(), domain, timeout).await?;

		Self::builder_with_transport(raw, transport).build()
	}

	/// Parsed descriptor.
	pub fn descriptor(&self) -> &Descriptor {
		&self.descriptor
	}

	/// Descriptor document as fetched.
	pub fn raw(&self) -> &RawDescriptor {
		&self.raw
	}

	/// Site metadata.
	pub fn site(&self) -> &SiteInfo {
		&self.descriptor.site
	}

	/// Base URL endpoint paths are appended to.
	pub fn base_url(&self) -> &str {
		&self.descriptor.base_url
	}

	/// Declared descriptor version.
	pub fn version(&self) -> &str {
		&self.descriptor.version
	}

	/// Capability flags.
	pub fn capabilities(&self) -> &OrderedMap<bool> {
		&self.descriptor.capabilities
	}

	/// Free-form `security` section.
	pub fn security(&self) -> Option<&Value> {
		self.descriptor.security.as_ref()
	}

	/// Signed-key section, when the site offers it.
	pub fn signed_key_config(&self) -> Option<&SignedKeyConfig> {
		self.descriptor.auth.signed_key.as_ref()
	}

	/// OAuth 2.0 section, when the site offers it.
	pub fn oauth2_config(&self) -> Option<&OAuth2Config> {
		self.descriptor.auth.oauth2.as_ref()
	}

	/// Request deadline applied to endpoint calls and registration requests.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Endpoints in declaration order, optionally restricted to one access level.
	pub fn endpoints(&self, level: Option<AccessLevel>) -> Vec<&Endpoint> {
		self.descriptor.endpoints(level)
	}

	/// Looks up an endpoint by name.
	pub fn endpoint(&self, name: &str) -> Result<&Endpoint> {
		self.descriptor.endpoint(name).ok_or_else(|| Error::UnknownEndpoint {
			name: name.to_owned(),
			available: self.descriptor.endpoint_names(),
		})
	}

	/// Sets or replaces the signed-key credentials.
	pub fn set_credentials(&mut self, api_key: impl Into<String>, secret: impl Into<Secret>) {
		self.api_key = Some(api_key.into());
		self.secret = Some(secret.into());
	}

	/// Returns true when both an API key and a secret are configured.
	pub fn has_credentials(&self) -> bool {
		self.api_key.is_some() && self.secret.is_some()
	}

	/// Sets or replaces the default bearer token for `user_required` endpoints.
	pub fn set_access_token(&mut self, token: impl Into<Secret>) {
		self.access_token = Some(token.into());
	}

	/// Removes the default bearer token.
	pub fn clear_access_token(&mut self) {
		self.access_token = None;
	}

	/// Registration progress of this client.
	pub fn registration_state(&self) -> &RegistrationState {
		&self.registration
	}

	/// Signs `body` with the configured secret and the site's signing parameters.
	///
	/// Returns the hex signature and the Unix timestamp it covers.
	pub fn sign(&self, body: &str) -> Result<(String, i64)> {
		let secret = self.secret.as_ref().ok_or(ConfigError::MissingSecret)?;
		let (algorithm, prefix) = self.descriptor.auth.signing();
		let headers = signer::create_signed_headers(
			self.api_key.as_deref().unwrap_or_default(),
			secret.expose(),
			body,
			prefix,
			algorithm,
			None,
		);

		Ok((headers.signature, headers.timestamp))
	}

	/// Calls the endpoint named `name`.
	///
	/// Returns the decoded JSON body; an empty success body yields `{}`.
	pub async fn call(&self, name: &str, params: CallParams) -> Result<Value> {
		obs::observe(OperationKind::EndpointCall, "call", async move {
			let endpoint = self.endpoint(name)?;
			let request = request::prepare(
				&self.descriptor.base_url,
				endpoint,
				params,
				request::RequestAuth {
					config: &self.descriptor.auth,
					api_key: self.api_key.as_deref(),
					secret: self.secret.as_ref(),
					access_token: self.access_token.as_ref(),
				},
				self.strict_path_parameters,
			)?;

			#[cfg(feature = "tracing")]
			tracing::debug!(
				endpoint = name,
				method = %request.method(),
				uri = %request.uri(),
				level = endpoint.level.as_str(),
				"dispatching endpoint call"
			);

			let response = http::execute(self.transport.as_ref(), request, self.timeout).await?;

			response::map_response(&response)
		})
		.await
	}

	/// Sends the registration request to the site's `register_url`.
	///
	/// Moves the client to [`RegistrationState::Requested`]; credentials arrive only through
	/// [`Client::complete_registration`].
	pub async fn register(&mut self, agent: &AgentInfo) -> Result<Value> {
		let register_url =
			self.signed_key_config().ok_or(ConfigError::MissingSignedKey)?.register_url.clone();
		let body =
			auth::register(self.transport.as_ref(), &register_url, agent, self.timeout).await?;

		self.registration = RegistrationState::Requested { register_url };

		Ok(body)
	}

	/// Submits the verification code and stores the issued credentials on the client.
	///
	/// Without `verify_url` the URL is derived from the site's `register_url`.
	pub async fn complete_registration(
		&mut self,
		verification_code: &str,
		verify_url: Option<&str>,
	) -> Result<Credentials> {
		let verify_url = match verify_url {
			Some(url) => url.to_owned(),
			None => auth::derive_verify_url(
				&self.signed_key_config().ok_or(ConfigError::MissingSignedKey)?.register_url,
			),
		};
		let credentials =
			auth::verify(self.transport.as_ref(), &verify_url, verification_code, self.timeout)
				.await?;

		self.set_credentials(credentials.api_key.clone(), credentials.secret.clone());
		self.registration = RegistrationState::Verified;

		Ok(credentials)
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Starts a builder backed by a default reqwest transport.
	pub fn builder(raw: RawDescriptor) -> ClientBuilder<ReqwestTransport> {
		Self::builder_with_transport(raw, ReqwestTransport::default())
	}

	/// Builds a client with default settings.
	pub fn new(raw: RawDescriptor) -> Result<Self> {
		Self::builder(raw).build()
	}

	/// Discovers `domain` and builds a client with default settings.
	pub async fn discover(domain: &str) -> Result<Self> {
		let timeout = discovery::DEFAULT_DISCOVERY_TIMEOUT;

		Self::discover_with(ReqwestTransport::default(), domain, timeout).await
	}
}
impl<C> Clone for Client<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			raw: self.raw.clone(),
			descriptor: self.descriptor.clone(),
			api_key: self.api_key.clone(),
			secret: self.secret.clone(),
			access_token: self.access_token.clone(),
			timeout: self.timeout,
			strict_path_parameters: self.strict_path_parameters,
			registration: self.registration.clone(),
		}
	}
}
impl<C> Debug for Client<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("site", &self.descriptor.site.name)
			.field("base_url", &self.descriptor.base_url)
			.field("endpoints", &self.descriptor.endpoints(None).len())
			.field("credentials_set", &self.has_credentials())
			.field("access_token_set", &self.access_token.is_some())
			.field("registration", &self.registration)
			.finish()
	}
}

/// Builder for [`Client`].
pub struct ClientBuilder<C>
where
	C: ?Sized + HttpTransport,
{
	raw: RawDescriptor,
	transport: Arc<C>,
	api_key: Option<String>,
	secret: Option<Secret>,
	access_token: Option<Secret>,
	timeout: Duration,
	strict_path_parameters: bool,
}
impl<C> ClientBuilder<C>
where
	C: ?Sized + HttpTransport,
{
	/// Sets the API key used for signed requests.
	pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
		self.api_key = Some(api_key.into());

		self
	}

	/// Sets the signing secret.
	pub fn secret(mut self, secret: impl Into<Secret>) -> Self {
		self.secret = Some(secret.into());

		self
	}

	/// Sets the API key and secret from previously issued credentials.
	pub fn credentials(self, credentials: &Credentials) -> Self {
		self.api_key(credentials.api_key.clone()).secret(credentials.secret.clone())
	}

	/// Sets the default bearer token for `user_required` endpoints.
	pub fn access_token(mut self, token: impl Into<Secret>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Sets the request deadline for endpoint calls and registration.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Fails calls whose path placeholders have no matching argument instead of sending them
	/// with the literal `{name}` text.
	pub fn strict_path_parameters(mut self, strict: bool) -> Self {
		self.strict_path_parameters = strict;

		self
	}

	/// Swaps the transport.
	pub fn transport<T>(self, transport: impl Into<Arc<T>>) -> ClientBuilder<T>
	where
		T: ?Sized + HttpTransport,
	{
		ClientBuilder {
			raw: self.raw,
			transport: transport.into(),
			api_key: self.api_key,
			secret: self.secret,
			access_token: self.access_token,
			timeout: self.timeout,
			strict_path_parameters: self.strict_path_parameters,
		}
	}

	/// Parses the descriptor and builds the client.
	pub fn build(self) -> Result<Client<C>> {
		let descriptor = Descriptor::parse(&self.raw)?;

		Ok(Client {
			transport: self.transport,
			raw: self.raw,
			descriptor,
			api_key: self.api_key,
			secret: self.secret,
			access_token: self.access_token,
			timeout: self.timeout,
			strict_path_parameters: self.strict_path_parameters,
			registration: RegistrationState::Unregistered,
		})
	}
}
impl<C> Debug for ClientBuilder<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("api_key_set", &self.api_key.is_some())
			.field("secret_set", &self.secret.is_some())
			.field("access_token_set", &self.access_token.is_some())
			.field("timeout", &self.timeout)
			.field("strict_path_parameters", &self.strict_path_parameters)
			.finish()
	}
}
