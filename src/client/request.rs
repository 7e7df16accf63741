//! Request descriptors accepted by [`ApiClient`](crate::client::ApiClient).

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::ConfigError,
	http::{HttpRequest, Method, MultipartForm, RequestBody},
};

/// Transport-agnostic description of one logical request.
///
/// The descriptor is reused verbatim when the request is replayed after a refresh; only the
/// bearer credential is re-read for each attempt.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// Request method.
	pub method: Method,
	/// Path relative to the configured base URL; must start with `/`.
	pub path: String,
	/// Query pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Request payload.
	pub body: RequestBody,
	/// Surface a 401 as a credential error instead of entering the refresh cycle.
	pub skip_auth_redirect: bool,
}
impl ApiRequest {
	/// Creates a bodiless request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: RequestBody::Empty,
			skip_auth_redirect: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Appends query pairs.
	pub fn query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = RequestBody::Json(serde_json::to_vec(body).map_err(ConfigError::Serialize)?);

		Ok(self)
	}

	/// Attaches a multipart form; no JSON content type is sent.
	pub fn multipart(mut self, form: MultipartForm) -> Self {
		self.body = RequestBody::Multipart(form);

		self
	}

	/// Marks the request as the login call.
	pub fn skip_auth_redirect(mut self) -> Self {
		self.skip_auth_redirect = true;

		self
	}

	/// Resolves the descriptor into a concrete transport request.
	pub(crate) fn to_http(
		&self,
		config: &ClientConfig,
		token: Option<&TokenSecret>,
		accept: &str,
	) -> Result<HttpRequest, ConfigError> {
		let mut url = config.endpoint(&self.path)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut headers = config.base_headers();

		headers.push(("accept".into(), accept.into()));

		if !self.body.is_multipart() {
			headers.push(("content-type".into(), "application/json".into()));
		}
		if let Some(token) = token {
			headers.push(("authorization".into(), token.bearer()));
		}

		Ok(HttpRequest { method: self.method, url, headers, body: self.body.clone() })
	}
}
