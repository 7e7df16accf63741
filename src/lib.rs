//! Authenticated HTTP client core: cookie-style credential storage, single-flight token refresh,
//! and a bounded refresh-and-retry cycle shared by every concurrent caller.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::{ApiClient, ReauthHandler},
		config::ClientConfig,
		error::TransportError,
		http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
		store::{DurableStore, MemoryStore},
	};
	#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

	type Handler = Box<dyn Fn(HttpRequest) -> TransportFuture<'static> + Send + Sync>;

	/// Transport that records every request and answers through a caller-supplied handler.
	pub struct ScriptedTransport {
		requests: Mutex<Vec<HttpRequest>>,
		handler: Handler,
	}
	impl ScriptedTransport {
		/// Wraps an async handler invoked once per request.
		pub fn new<F, Fut>(handler: F) -> Self
		where
			F: 'static + Send + Sync + Fn(HttpRequest) -> Fut,
			Fut: 'static + Send + Future<Output = Result<HttpResponse, TransportError>>,
		{
			Self {
				requests: Mutex::new(Vec::new()),
				handler: Box::new(move |request| Box::pin(handler(request))),
			}
		}

		/// Returns every request seen so far, in dispatch order.
		pub fn requests(&self) -> Vec<HttpRequest> {
			self.requests.lock().clone()
		}

		/// Returns the requests whose URL path equals `path`.
		pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
			self.requests.lock().iter().filter(|request| request.url.path() == path).cloned().collect()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request.clone());

			(self.handler)(request)
		}
	}
	impl Debug for ScriptedTransport {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("ScriptedTransport")
				.field("requests", &self.requests.lock().len())
				.finish_non_exhaustive()
		}
	}

	/// Re-authentication handler that records every navigation request.
	#[derive(Debug, Default)]
	pub struct RecordingReauth {
		routes: Mutex<Vec<String>>,
	}
	impl RecordingReauth {
		/// Returns the routes navigated to so far, in call order.
		pub fn routes(&self) -> Vec<String> {
			self.routes.lock().clone()
		}

		/// Returns how many times re-authentication was requested.
		pub fn count(&self) -> usize {
			self.routes.lock().len()
		}
	}
	impl ReauthHandler for RecordingReauth {
		fn reauthenticate(&self, route: &str) {
			self.routes.lock().push(route.to_owned());
		}
	}

	/// Parses a config for the provided base URL, panicking on invalid fixtures.
	pub fn test_config(base_url: &str) -> ClientConfig {
		let url = Url::parse(base_url).expect("Failed to parse test base URL.");

		ClientConfig::builder(url).build().expect("Failed to build test client config.")
	}

	/// Reqwest-backed client type used across integration tests.
	#[cfg(feature = "reqwest")]
	pub type ReqwestTestClient = ApiClient<ReqwestTransport>;

	/// Constructs an [`ApiClient`] backed by an in-memory store, a recording re-auth handler,
	/// and the reqwest transport used across integration tests.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (ReqwestTestClient, Arc<MemoryStore>, Arc<RecordingReauth>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn DurableStore> = store_backend.clone();
		let reauth = Arc::new(RecordingReauth::default());
		let client =
			ApiClient::with_transport(test_config(base_url), ReqwestTransport::default(), Some(store))
				.with_reauth_handler(reauth.clone());

		(client, store_backend, reauth)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::OnceCell as AsyncOnceCell;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
