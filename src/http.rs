//! Transport primitives for authenticated requests.
//!
//! The module exposes [`HttpTransport`], the client's only dependency on an HTTP stack, along
//! with owned request/response types. Request bodies are owned and cloneable so a failed
//! attempt can be replayed verbatim after a token refresh.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing client requests.
///
/// Implementations must return `Ok` for every response that carries a status code, including
/// error statuses; `Err` is reserved for failures where no response was received.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and buffers the full response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP verbs used by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the uppercase method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully resolved request handed to a transport.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// Request method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Header pairs in insertion order.
	pub headers: Vec<(String, String)>,
	/// Request payload.
	pub body: RequestBody,
}
impl HttpRequest {
	/// Returns the first header value matching `name`, case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}
}

/// Owned request payload.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// Serialized JSON bytes.
	Json(Vec<u8>),
	/// Multipart form; the transport sets its own boundary content type.
	Multipart(MultipartForm),
}
impl RequestBody {
	/// Returns `true` for multipart payloads.
	pub fn is_multipart(&self) -> bool {
		matches!(self, Self::Multipart(_))
	}
}

/// Replayable multipart form.
#[derive(Clone, Debug, Default)]
pub struct MultipartForm {
	/// Parts in submission order.
	pub parts: Vec<FormPart>,
}
impl MultipartForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(FormPart { name: name.into(), content: PartContent::Text(value.into()) });

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		content_type: Option<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push(FormPart {
			name: name.into(),
			content: PartContent::File {
				file_name: file_name.into(),
				content_type,
				bytes: bytes.into(),
			},
		});

		self
	}
}

/// Single multipart field.
#[derive(Clone, Debug)]
pub struct FormPart {
	/// Field name.
	pub name: String,
	/// Field content.
	pub content: PartContent,
}

/// Content carried by a [`FormPart`].
#[derive(Clone, Debug)]
pub enum PartContent {
	/// Plain text value.
	Text(String),
	/// Binary file payload.
	File {
		/// File name reported to the server.
		file_name: String,
		/// Optional MIME type.
		content_type: Option<String>,
		/// Raw bytes.
		bytes: Vec<u8>,
	},
}

/// Buffered response returned by a transport.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase, when the transport knows it.
	pub reason: Option<String>,
	/// Header pairs in arrival order.
	pub headers: Vec<(String, String)>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Builds a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, reason: None, headers: Vec::new(), body: body.into() }
	}

	/// Appends a header pair.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Returns the first header value matching `name`, case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Transport-level status text used when the body carries no message.
	pub fn status_text(&self) -> String {
		match self.reason.as_deref() {
			Some(reason) if !reason.is_empty() => reason.to_owned(),
			_ => format!("Request failed with status {}", self.status),
		}
	}
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
	headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the transport from a configured reqwest builder.
	pub fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, ConfigError> {
		builder.build().map(Self).map_err(ConfigError::http_client_build)
	}

	fn build(
		client: &ReqwestClient,
		request: HttpRequest,
	) -> Result<reqwest::RequestBuilder, ReqwestError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = client.request(method, request.url);

		for (name, value) in request.headers {
			builder = builder.header(name, value);
		}

		Ok(match request.body {
			RequestBody::Empty => builder,
			RequestBody::Json(bytes) => builder.body(bytes),
			RequestBody::Multipart(form) => builder.multipart(Self::multipart(form)?),
		})
	}

	fn multipart(form: MultipartForm) -> Result<reqwest::multipart::Form, ReqwestError> {
		let mut out = reqwest::multipart::Form::new();

		for part in form.parts {
			out = match part.content {
				PartContent::Text(value) => out.text(part.name, value),
				PartContent::File { file_name, content_type, bytes } => {
					let mut file = reqwest::multipart::Part::bytes(bytes).file_name(file_name);

					if let Some(content_type) = content_type {
						file = file.mime_str(&content_type)?;
					}

					out.part(part.name, file)
				},
			};
		}

		Ok(out)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let url = request.url.clone();
			let builder =
				Self::build(&client, request).map_err(|e| TransportError::network(&url, e))?;
			let response = builder.send().await.map_err(|e| TransportError::network(&url, e))?;
			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(&url, e))?.to_vec();

			Ok(HttpResponse {
				status: status.as_u16(),
				reason: status.canonical_reason().map(str::to_owned),
				headers,
				body,
			})
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn header_lookup_is_case_insensitive() {
		let response = HttpResponse::new(200, "").with_header("Content-Type", "application/json");

		assert_eq!(response.header("content-type"), Some("application/json"));
		assert_eq!(response.header("authorization"), None);
	}

	#[test]
	fn status_text_prefers_reason_phrase() {
		let mut response = HttpResponse::new(503, "");

		assert_eq!(response.status_text(), "Request failed with status 503");

		response.reason = Some("Service Unavailable".into());

		assert_eq!(response.status_text(), "Service Unavailable");
		assert!(!response.is_success());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_transport_builds_from_builder() {
		let transport = ReqwestTransport::from_builder(ReqwestClient::builder().user_agent("tests"))
			.expect("Default reqwest builder should succeed.");

		assert!(format!("{transport:?}").contains("ReqwestTransport"));
	}

	#[test]
	fn multipart_forms_are_replayable() {
		let form = MultipartForm::new()
			.text("title", "Dune")
			.file("cover", "dune.png", Some("image/png".into()), vec![1, 2, 3]);
		let body = RequestBody::Multipart(form);
		let replay = body.clone();

		assert!(replay.is_multipart());

		let RequestBody::Multipart(form) = replay else {
			panic!("Cloned body should remain multipart.");
		};

		assert_eq!(form.parts.len(), 2);
	}
}
