// self
use crate::{
	_prelude::*,
	config::{BaseUrlResolver, ClientConfig, validate_base_url, validate_path},
	error::ConfigError,
};

/// Builder for [`ClientConfig`] values.
pub struct ClientConfigBuilder {
	resolver: Arc<dyn BaseUrlResolver>,
	refresh_path: String,
	reauth_route: String,
	cookie_path: String,
	default_token_ttl: Duration,
	user_agent: Option<String>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults and the provided resolver.
	pub fn new(resolver: Arc<dyn BaseUrlResolver>) -> Self {
		Self {
			resolver,
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			reauth_route: ClientConfig::DEFAULT_REAUTH_ROUTE.into(),
			cookie_path: ClientConfig::DEFAULT_COOKIE_PATH.into(),
			default_token_ttl: ClientConfig::DEFAULT_TOKEN_TTL,
			user_agent: None,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the re-authentication route.
	pub fn reauth_route(mut self, route: impl Into<String>) -> Self {
		self.reauth_route = route.into();

		self
	}

	/// Overrides the path scope used for persisted credentials.
	pub fn cookie_path(mut self, path: impl Into<String>) -> Self {
		self.cookie_path = path.into();

		self
	}

	/// Overrides the fallback credential lifetime.
	pub fn default_token_ttl(mut self, ttl: Duration) -> Self {
		self.default_token_ttl = ttl;

		self
	}

	/// Sets the `User-Agent` header sent with every request.
	pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
		self.user_agent = Some(agent.into());

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		validate_base_url(&self.resolver.base_url())?;
		validate_path(&self.refresh_path)?;
		validate_path(&self.reauth_route)?;
		validate_path(&self.cookie_path)?;

		if !self.default_token_ttl.is_positive() {
			return Err(ConfigError::NonPositiveTtl);
		}

		Ok(ClientConfig {
			resolver: self.resolver,
			refresh_path: self.refresh_path,
			reauth_route: self.reauth_route,
			cookie_path: self.cookie_path,
			default_token_ttl: self.default_token_ttl,
			user_agent: self.user_agent,
		})
	}
}
impl Debug for ClientConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfigBuilder")
			.field("base_url", &self.resolver.base_url().as_str())
			.field("refresh_path", &self.refresh_path)
			.finish_non_exhaustive()
	}
}
