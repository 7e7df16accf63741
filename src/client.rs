//! Public request executor with transparent refresh-and-retry.
//!
//! Every verb helper funnels into one execution path: attach the current bearer token, send,
//! classify. A first 401 hands off to the [`RefreshCoordinator`]; if it yields a token the
//! identical request is replayed once with `is_retry` set, and that second outcome is final.
//! If the refresh fails, or the replay is rejected again, credentials are cleared, the
//! [`ReauthHandler`] is told to navigate to the re-authentication route, and the caller sees
//! [`Error::Unauthorized`].
//!
//! Requests are cancelled by dropping their future. Dropping a caller that is driving a shared
//! refresh hands the exchange to the next waiter without starting a second one.

pub mod request;

pub use request::ApiRequest;

// self
use crate::{
	_prelude::*,
	auth::{IssuedTokens, TokenEnvelope, TokenSecret},
	classify::{self, AttemptFlags, Classification},
	config::ClientConfig,
	credentials::CredentialStore,
	http::{HttpResponse, HttpTransport, MultipartForm},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, trace_event},
	refresh::RefreshCoordinator,
	store::DurableStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_ANY: &str = "*/*";

/// Receives the re-authentication transition after a terminal auth failure.
pub trait ReauthHandler
where
	Self: Send + Sync,
{
	/// Navigates to (or otherwise signals) the re-authentication route.
	fn reauthenticate(&self, route: &str);
}

/// Handler that only logs the transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReauth;
impl ReauthHandler for LogReauth {
	fn reauthenticate(&self, route: &str) {
		trace_event!(warn, "Session ended; re-authentication required at {route}.");
	}
}

/// Raw payload returned by [`ApiClient::download`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Download {
	/// Response body.
	pub bytes: Vec<u8>,
	/// `Content-Type` header, if present.
	pub content_type: Option<String>,
	/// File name from `Content-Disposition`, if present.
	pub file_name: Option<String>,
}
impl Download {
	fn from_response(response: HttpResponse) -> Self {
		let content_type = response.header("content-type").map(str::to_owned);
		let file_name = response.header("content-disposition").and_then(disposition_file_name);

		Self { bytes: response.body, content_type, file_name }
	}
}

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated HTTP client owning the credential store and refresh coordinator.
///
/// Share one instance (typically behind `Arc`) among all callers that should observe the same
/// session; independent instances never share refresh state.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	config: ClientConfig,
	credentials: Arc<CredentialStore>,
	refresher: RefreshCoordinator<T>,
	reauth: Arc<dyn ReauthHandler>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over the caller-provided transport and optional durable medium.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		durable: Option<Arc<dyn DurableStore>>,
	) -> Self {
		let transport = transport.into();
		let credentials = Arc::new(CredentialStore::new(
			durable,
			config.cookie_path.clone(),
			config.default_token_ttl,
		));
		let refresher =
			RefreshCoordinator::new(transport.clone(), credentials.clone(), config.clone());

		Self { transport, config, credentials, refresher, reauth: Arc::new(LogReauth) }
	}

	/// Replaces the re-authentication handler.
	pub fn with_reauth_handler(mut self, handler: Arc<dyn ReauthHandler>) -> Self {
		self.reauth = handler;

		self
	}

	/// Returns the client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns the credential store.
	pub fn credentials(&self) -> &CredentialStore {
		&self.credentials
	}

	/// Returns the refresh coordinator.
	pub fn refresher(&self) -> &RefreshCoordinator<T> {
		&self.refresher
	}

	/// Stores a token pair obtained outside the client (e.g. from a prior session).
	pub async fn establish_session(
		&self,
		access: impl Into<TokenSecret>,
		refresh: impl Into<TokenSecret>,
		ttl: Option<Duration>,
	) {
		let refresh = refresh.into();

		self.credentials.persist_tokens(&access.into(), Some(&refresh), ttl).await;
	}

	/// Posts credentials to the login endpoint and persists the issued pair.
	///
	/// A 401 surfaces as [`Error::CredentialsInvalid`] with the backend's message; it never
	/// triggers a refresh or navigation.
	pub async fn login<B>(&self, path: &str, credentials: &B) -> Result<IssuedTokens>
	where
		B: ?Sized + Serialize,
	{
		let request = ApiRequest::post(path).json(credentials)?.skip_auth_redirect();
		let response = self.send(&request, FlowKind::Request, ACCEPT_JSON).await?;
		let status = response.status;
		let issued = classify::decode_json::<TokenEnvelope>(status, &response.body)?
			.into_issued()
			.ok_or_else(|| Error::RequestFailed {
				status,
				message: "Login response carries no access token.".into(),
			})?;

		self.credentials
			.persist_tokens(&issued.access_token, issued.refresh_token.as_ref(), issued.expires_in)
			.await;

		Ok(issued)
	}

	/// Drops the session from every cache.
	pub async fn logout(&self) {
		self.credentials.clear().await;
	}

	/// Sends a `GET` and decodes the JSON response.
	pub async fn get<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute(ApiRequest::get(path)).await
	}

	/// Sends a `GET` with query pairs and decodes the JSON response.
	pub async fn get_with_query<R, I, K, V>(&self, path: &str, query: I) -> Result<R>
	where
		R: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.execute(ApiRequest::get(path).query(query)).await
	}

	/// Sends a JSON `POST` and decodes the JSON response.
	pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.execute(ApiRequest::post(path).json(body)?).await
	}

	/// Sends a JSON `PUT` and decodes the JSON response.
	pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.execute(ApiRequest::put(path).json(body)?).await
	}

	/// Sends a JSON `PATCH` and decodes the JSON response.
	pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.execute(ApiRequest::patch(path).json(body)?).await
	}

	/// Sends a `DELETE` and decodes the JSON response.
	pub async fn delete<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute(ApiRequest::delete(path)).await
	}

	/// Posts a multipart form and decodes the JSON response.
	pub async fn upload<R>(&self, path: &str, form: MultipartForm) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute(ApiRequest::post(path).multipart(form)).await
	}

	/// Sends a `GET` and returns the raw body.
	pub async fn download(&self, path: &str) -> Result<Download> {
		let response = self.send(&ApiRequest::get(path), FlowKind::Download, ACCEPT_ANY).await?;

		Ok(Download::from_response(response))
	}

	/// Sends an arbitrary request and decodes the JSON response.
	///
	/// An empty success body decodes as `{}`; use [`serde::de::IgnoredAny`] or
	/// `serde_json::Value` when the endpoint returns no content.
	pub async fn execute<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.execute_raw(request).await?;

		classify::decode_json(response.status, &response.body)
	}

	/// Sends an arbitrary request and returns the undecoded success response.
	pub async fn execute_raw(&self, request: ApiRequest) -> Result<HttpResponse> {
		let kind = if request.body.is_multipart() { FlowKind::Upload } else { FlowKind::Request };

		self.send(&request, kind, ACCEPT_JSON).await
	}

	async fn send(&self, request: &ApiRequest, kind: FlowKind, accept: &str) -> Result<HttpResponse> {
		let span = FlowSpan::new(kind, "send");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span.instrument(self.send_with_retry(request, kind, accept)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}

	async fn send_with_retry(
		&self,
		request: &ApiRequest,
		kind: FlowKind,
		accept: &str,
	) -> Result<HttpResponse> {
		let (classification, sent) = self.attempt(request, false, accept).await?;

		match classification {
			Classification::Success(response) => return Ok(response),
			Classification::Failed(e) => return Err(e),
			Classification::Terminal => return Err(self.terminate().await),
			Classification::RetryRequired => {},
		}

		if !self.refresher.refresh(sent.as_ref()).await {
			return Err(self.terminate().await);
		}

		trace_event!(debug, "Replaying {} {} after refresh.", request.method, request.path);
		obs::record_flow_outcome(kind, FlowOutcome::Retry);

		let (classification, _) = self.attempt(request, true, accept).await?;

		match classification {
			Classification::Success(response) => Ok(response),
			Classification::Failed(e) => Err(e),
			Classification::Terminal | Classification::RetryRequired => Err(self.terminate().await),
		}
	}

	/// Sends one attempt, returning its classification and the token it carried.
	async fn attempt(
		&self,
		request: &ApiRequest,
		is_retry: bool,
		accept: &str,
	) -> Result<(Classification, Option<TokenSecret>)> {
		let token = self.credentials.access_token().await;
		let http = request.to_http(&self.config, token.as_ref(), accept)?;
		let response = self.transport.execute(http).await?;
		let flags = AttemptFlags { skip_auth_redirect: request.skip_auth_redirect, is_retry };

		Ok((classify::classify(response, flags), token))
	}

	async fn terminate(&self) -> Error {
		trace_event!(warn, "Session could not be renewed; clearing credentials.");

		self.credentials.clear().await;
		self.reauth.reauthenticate(&self.config.reauth_route);

		Error::Unauthorized
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client that provisions its own reqwest-backed transport.
	pub fn new(config: ClientConfig, durable: Option<Arc<dyn DurableStore>>) -> Result<Self> {
		let transport = ReqwestTransport::from_builder(ReqwestClient::builder())?;

		Ok(Self::with_transport(config, transport, durable))
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("credentials", &self.credentials)
			.field("refresher", &self.refresher)
			.finish()
	}
}

fn disposition_file_name(header: &str) -> Option<String> {
	header.split(';').map(str::trim).find_map(|param| {
		let (key, value) = param.split_once('=')?;

		key.trim()
			.eq_ignore_ascii_case("filename")
			.then(|| value.trim().trim_matches('"').to_owned())
			.filter(|name| !name.is_empty())
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{RecordingReauth, ScriptedTransport, test_config},
		http::Method,
		store::MemoryStore,
	};

	fn client(
		transport: ScriptedTransport,
	) -> (ApiClient<ScriptedTransport>, Arc<ScriptedTransport>, Arc<RecordingReauth>) {
		let transport = Arc::new(transport);
		let reauth = Arc::new(RecordingReauth::default());
		let durable: Arc<dyn DurableStore> = Arc::new(MemoryStore::default());
		let client = ApiClient::with_transport(
			test_config("https://api.example.com"),
			transport.clone(),
			Some(durable),
		)
		.with_reauth_handler(reauth.clone());

		(client, transport, reauth)
	}

	#[test]
	fn disposition_parsing_handles_quotes_and_case() {
		assert_eq!(
			disposition_file_name(r#"attachment; FileName="report.pdf""#),
			Some("report.pdf".into()),
		);
		assert_eq!(disposition_file_name("inline"), None);
	}

	#[tokio::test]
	async fn download_returns_raw_bytes_and_metadata() {
		let (client, transport, _) = client(ScriptedTransport::new(|_| async {
			Ok(HttpResponse::new(200, vec![0xde, 0xad])
				.with_header("Content-Type", "application/pdf")
				.with_header("Content-Disposition", "attachment; filename=\"loans.pdf\""))
		}));
		let download = client.download("/reports/loans").await.expect("Download should succeed.");

		assert_eq!(download.bytes, vec![0xde, 0xad]);
		assert_eq!(download.content_type.as_deref(), Some("application/pdf"));
		assert_eq!(download.file_name.as_deref(), Some("loans.pdf"));
		assert_eq!(transport.requests()[0].header("accept"), Some("*/*"));
	}

	#[tokio::test]
	async fn verbs_use_matching_methods_and_bodies() {
		let (client, transport, _) =
			client(ScriptedTransport::new(|_| async { Ok(HttpResponse::new(200, "{}")) }));
		let body = serde_json::json!({ "title": "Dune" });
		let _: serde_json::Value = client.post("/books", &body).await.expect("POST should succeed.");
		let _: serde_json::Value = client.put("/books/1", &body).await.expect("PUT should succeed.");
		let _: serde_json::Value =
			client.patch("/books/1", &body).await.expect("PATCH should succeed.");
		let _: serde_json::Value = client.delete("/books/1").await.expect("DELETE should succeed.");
		let methods: Vec<_> = transport.requests().iter().map(|request| request.method).collect();

		assert_eq!(methods, [Method::Post, Method::Put, Method::Patch, Method::Delete]);
	}

	#[tokio::test]
	async fn transport_failures_propagate_without_touching_credentials() {
		let (client, _, reauth) = client(ScriptedTransport::new(|request| async move {
			Err(crate::error::TransportError::network(
				&request.url,
				std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"),
			))
		}));

		client.establish_session("a", "r", None).await;

		let err = client
			.get::<serde_json::Value>("/books")
			.await
			.expect_err("Transport failures should surface.");

		assert!(matches!(err, Error::Transport(_)));
		assert_eq!(reauth.count(), 0);
		assert!(client.credentials().refresh_token().await.is_some());
	}

	#[tokio::test]
	async fn generic_failure_is_not_retried() {
		let (client, transport, reauth) = client(ScriptedTransport::new(|_| async {
			Ok(HttpResponse::new(403, r#"{"error":"Forbidden for students"}"#))
		}));

		client.establish_session("a", "r", None).await;

		let err = client
			.get::<serde_json::Value>("/transactions")
			.await
			.expect_err("403 should surface.");

		assert!(matches!(
			err,
			Error::RequestFailed { status: 403, ref message } if message == "Forbidden for students"
		));
		assert_eq!(transport.requests().len(), 1);
		assert_eq!(reauth.count(), 0);
	}

	#[tokio::test]
	async fn login_persists_issued_pair() {
		let (client, transport, _) = client(ScriptedTransport::new(|_| async {
			Ok(HttpResponse::new(
				200,
				r#"{"data":{"access_token":"a-1","refresh_token":"r-1","expires_in":600}}"#,
			))
		}));
		let issued = client
			.login("/auth/login", &serde_json::json!({ "username": "ada", "password": "pw" }))
			.await
			.expect("Login should succeed.");

		assert_eq!(issued.access_token.expose(), "a-1");
		assert_eq!(
			client.credentials().refresh_token().await.as_ref().map(TokenSecret::expose),
			Some("r-1"),
		);
		assert_eq!(transport.requests()[0].header("authorization"), None);
	}
}
