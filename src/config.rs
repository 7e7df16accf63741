//! Client configuration: base URL resolution, fixed routes, and credential lifetimes.
//!
//! The base URL is not read from a process-wide global; callers hand a [`BaseUrlResolver`] to
//! [`ClientConfigBuilder`] at construction time so server-side and embedded hosts can decide
//! where requests go without the client branching on its execution context.

/// Builder API for assembling client configs.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Supplies the base URL every request path is resolved against.
pub trait BaseUrlResolver
where
	Self: Send + Sync,
{
	/// Returns the current base URL.
	fn base_url(&self) -> Url;
}

/// Resolver that always yields the same base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticBaseUrl(pub Url);
impl BaseUrlResolver for StaticBaseUrl {
	fn base_url(&self) -> Url {
		self.0.clone()
	}
}

/// Immutable configuration consumed by [`ApiClient`](crate::client::ApiClient).
#[derive(Clone)]
pub struct ClientConfig {
	/// Base URL source.
	pub resolver: Arc<dyn BaseUrlResolver>,
	/// Path of the refresh endpoint, relative to the base URL.
	pub refresh_path: String,
	/// Route handed to the re-authentication handler on terminal failure.
	pub reauth_route: String,
	/// Path scope attached to persisted credential entries.
	pub cookie_path: String,
	/// Lifetime used for persisted credentials when the backend omits `expires_in`.
	pub default_token_ttl: Duration,
	/// Optional `User-Agent` header value.
	pub user_agent: Option<String>,
}
impl ClientConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default re-authentication route.
	pub const DEFAULT_REAUTH_ROUTE: &'static str = "/login";
	/// Default credential path scope.
	pub const DEFAULT_COOKIE_PATH: &'static str = "/";
	/// Default credential lifetime.
	pub const DEFAULT_TOKEN_TTL: Duration = Duration::days(7);

	/// Creates a new builder for the provided static base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(Arc::new(StaticBaseUrl(base_url)))
	}

	/// Creates a new builder around a custom resolver.
	pub fn builder_with_resolver(resolver: Arc<dyn BaseUrlResolver>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(resolver)
	}

	/// Resolves a request path (optionally carrying a query string) against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		validate_path(path)?;

		let mut base = self.resolver.base_url();

		validate_base_url(&base)?;
		base.set_query(None);
		base.set_fragment(None);

		let joined = format!("{}{path}", base.as_str().trim_end_matches('/'));

		Url::parse(&joined)
			.map_err(|source| ConfigError::UnresolvablePath { path: path.to_owned(), source })
	}

	/// Resolves the refresh endpoint URL.
	pub fn refresh_endpoint(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.refresh_path)
	}

	/// Headers sent with every outbound request.
	pub(crate) fn base_headers(&self) -> Vec<(String, String)> {
		let mut headers = Vec::with_capacity(2);

		if let Some(agent) = &self.user_agent {
			headers.push(("user-agent".to_owned(), agent.clone()));
		}

		headers
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("base_url", &self.resolver.base_url().as_str())
			.field("refresh_path", &self.refresh_path)
			.field("reauth_route", &self.reauth_route)
			.field("cookie_path", &self.cookie_path)
			.field("default_token_ttl", &self.default_token_ttl)
			.field("user_agent", &self.user_agent)
			.finish()
	}
}

pub(crate) fn validate_base_url(url: &Url) -> Result<(), ConfigError> {
	if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
		Err(ConfigError::InvalidBaseUrl { url: url.to_string() })
	} else {
		Ok(())
	}
}

pub(crate) fn validate_path(path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') { Ok(()) } else { Err(ConfigError::InvalidPath { path: path.to_owned() }) }
}
