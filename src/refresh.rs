//! Single-flight refresh coordination.
//!
//! [`RefreshCoordinator::refresh`] exchanges the durable refresh token for a new pair. However
//! many callers ask at once, one backend call is made: the first caller installs a shared
//! [`AsyncOnceCell`] under a mutex before its first suspension point, and every later caller
//! awaits that same cell. The slot is emptied once the outcome is known, or once every caller
//! holding it has been dropped, so the next expiry starts a fresh cycle.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{RefreshRequest, TokenEnvelope, TokenSecret},
	config::ClientConfig,
	credentials::CredentialStore,
	http::{HttpRequest, HttpTransport, Method, RequestBody},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, trace_event},
};

type RefreshState = Arc<InFlight>;

/// Shared outcome of one refresh cycle.
struct InFlight {
	outcome: AsyncOnceCell<bool>,
	/// Callers currently awaiting `outcome`; only touched under the slot mutex.
	holders: AtomicUsize,
}

/// Owns the in-flight refresh handle for one client instance.
pub struct RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	credentials: Arc<CredentialStore>,
	config: ClientConfig,
	in_flight: Mutex<Option<RefreshState>>,
	metrics: RefreshMetrics,
}
impl<T> RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a coordinator sharing the client's transport and credential store.
	pub fn new(transport: Arc<T>, credentials: Arc<CredentialStore>, config: ClientConfig) -> Self {
		Self {
			transport,
			credentials,
			config,
			in_flight: Mutex::new(None),
			metrics: RefreshMetrics::default(),
		}
	}

	/// Returns the coordinator's counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns `true` while a refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.in_flight.lock().is_some()
	}

	/// Obtains a new access token, sharing any refresh already in flight.
	///
	/// `stale` is the access token the failed request carried. If no refresh is pending and the
	/// cached token has already moved on from it, a newer token was committed after that request
	/// left and the call resolves `true` without contacting the backend.
	///
	/// Returns `false` when no refresh token is stored or the exchange fails; the caller owns the
	/// terminal handling.
	pub async fn refresh(&self, stale: Option<&TokenSecret>) -> bool {
		let state = {
			let mut slot = self.in_flight.lock();

			match slot.as_ref() {
				Some(state) => {
					self.metrics.record_joined();
					state.holders.fetch_add(1, Ordering::Relaxed);

					state.clone()
				},
				None => {
					if let Some(current) = self.credentials.cached_access_token()
						&& stale != Some(&current)
					{
						trace_event!(debug, "Access token already rotated; skipping refresh.");

						return true;
					}

					let state = Arc::new(InFlight {
						outcome: AsyncOnceCell::new(),
						holders: AtomicUsize::new(1),
					});

					*slot = Some(state.clone());

					state
				},
			}
		};
		let release = SlotRelease { slot: &self.in_flight, state };

		*release.state.outcome.get_or_init(|| self.run()).await
	}

	async fn run(&self) -> bool {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let refreshed = span.instrument(self.exchange()).await;

		if refreshed {
			self.metrics.record_success();
			obs::record_flow_outcome(KIND, FlowOutcome::Success);
		} else {
			self.metrics.record_failure();
			obs::record_flow_outcome(KIND, FlowOutcome::Failure);
		}

		refreshed
	}

	async fn exchange(&self) -> bool {
		let Some(refresh_token) = self.credentials.refresh_token().await else {
			trace_event!(debug, "No refresh token stored; refresh skipped.");

			return false;
		};
		let url = match self.config.refresh_endpoint() {
			Ok(url) => url,
			Err(e) => {
				trace_event!(warn, "Refresh endpoint is unresolvable: {e}");

				return false;
			},
		};
		let body = match serde_json::to_vec(&RefreshRequest { refresh_token: refresh_token.expose() })
		{
			Ok(body) => body,
			Err(e) => {
				trace_event!(warn, "Refresh request body could not be serialized: {e}");

				return false;
			},
		};
		let mut headers = self.config.base_headers();

		headers.push(("accept".into(), "application/json".into()));
		headers.push(("content-type".into(), "application/json".into()));

		let request = HttpRequest { method: Method::Post, url, headers, body: RequestBody::Json(body) };

		self.metrics.record_attempt();

		let response = match self.transport.execute(request).await {
			Ok(response) => response,
			Err(e) => {
				trace_event!(warn, "Refresh call failed: {e}");

				return false;
			},
		};

		if !response.is_success() {
			trace_event!(warn, "Refresh endpoint answered {}.", response.status);

			return false;
		}

		let issued = match serde_json::from_slice::<TokenEnvelope>(&response.body) {
			Ok(envelope) => envelope.into_issued(),
			Err(e) => {
				trace_event!(warn, "Refresh response is malformed: {e}");

				return false;
			},
		};
		let Some(issued) = issued else {
			trace_event!(warn, "Refresh response carries no access token.");

			return false;
		};
		let rotated = issued.refresh_token.unwrap_or(refresh_token);

		self.credentials.persist_tokens(&issued.access_token, Some(&rotated), issued.expires_in).await;

		trace_event!(info, "Access token refreshed.");

		true
	}
}
impl<T> Debug for RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &self.is_refreshing())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Empties the in-flight slot once the shared outcome is settled.
///
/// An unsettled state is kept while other callers still hold it, so one of them can take over
/// the exchange if the driving caller is dropped.
struct SlotRelease<'a> {
	slot: &'a Mutex<Option<RefreshState>>,
	state: RefreshState,
}
impl Drop for SlotRelease<'_> {
	fn drop(&mut self) {
		let mut slot = self.slot.lock();
		let remaining = self.state.holders.fetch_sub(1, Ordering::Relaxed) - 1;
		let current = slot.as_ref().is_some_and(|state| Arc::ptr_eq(state, &self.state));

		if current && (self.state.outcome.is_initialized() || remaining == 0) {
			slot.take();
		}
	}
}
