//! Session refresh with single-flight de-duplication.
//!
//! [`StorefrontClient::refresh_session`] exchanges the stored refresh token for a new access
//! token. Concurrent callers share one network call through [`RefreshCoordinator`]: whoever
//! reaches the flight lock first performs the exchange, and everyone who started waiting while
//! it was on the wire receives a clone of its outcome. Any failure tears the session down
//! before the error is returned.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use reqwest::header::{CONTENT_TYPE, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	client::StorefrontClient,
	error::RefreshError,
	http::REFRESH_FIELD,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::LogoutReason,
};

/// Single-flight primitive guarding the refresh exchange.
///
/// Every caller snapshots the completion epoch under a synchronous lock before its first
/// suspension point, then queues on the flight lock. A caller whose snapshot is stale once it
/// holds the lock joins the refresh that completed meanwhile instead of starting another one.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	flight: AsyncMutex<()>,
	state: Mutex<FlightState>,
}
impl RefreshCoordinator {
	/// Returns `true` while the leader's exchange is running.
	pub fn is_in_flight(&self) -> bool {
		self.state.lock().in_flight
	}

	/// Number of refreshes completed so far.
	///
	/// Requests read this before sending with the current access token, so a 401 answered after
	/// another caller's refresh finished is recognized as already handled.
	pub fn epoch(&self) -> u64 {
		self.state.lock().epoch
	}

	/// Runs `exchange` unless a refresh that this caller can share completes first.
	pub async fn run<F, Fut>(&self, metrics: &RefreshMetrics, exchange: F) -> Result<(), RefreshError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<(), RefreshError>>,
	{
		let observed = self.epoch();

		self.run_since(observed, metrics, exchange).await
	}

	/// Like [`run`](Self::run), but joins any refresh completed after `observed` was read.
	pub async fn run_since<F, Fut>(
		&self,
		observed: u64,
		metrics: &RefreshMetrics,
		exchange: F,
	) -> Result<(), RefreshError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<(), RefreshError>>,
	{
		let _flight = self.flight.lock().await;

		{
			let state = self.state.lock();

			if state.epoch != observed {
				metrics.record_join();
				tracing::debug!("Joined an in-flight session refresh.");

				return state.last.clone().unwrap_or(Ok(()));
			}
		}

		let marker = InFlight::mark(&self.state);

		metrics.record_network_call();

		let outcome = exchange().await;

		marker.complete(outcome.clone());

		outcome
	}
}

#[derive(Debug, Default)]
struct FlightState {
	epoch: u64,
	in_flight: bool,
	last: Option<Result<(), RefreshError>>,
}

/// Clears the in-flight flag on every exit path, including cancellation of the leader.
struct InFlight<'a>(&'a Mutex<FlightState>);
impl<'a> InFlight<'a> {
	fn mark(state: &'a Mutex<FlightState>) -> Self {
		state.lock().in_flight = true;

		Self(state)
	}

	fn complete(self, outcome: Result<(), RefreshError>) {
		let mut state = self.0.lock();

		state.epoch += 1;
		state.last = Some(outcome);
	}
}
impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.lock().in_flight = false;
	}
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
	#[serde(default)]
	access: Option<TokenSecret>,
	#[serde(default)]
	refresh: Option<TokenSecret>,
}

impl StorefrontClient {
	/// Exchanges the stored refresh token for a new access token.
	///
	/// Resolves only after the new pair is persisted and visible through the token store. On
	/// failure the session is logged out and the error is returned to every waiting caller.
	pub async fn refresh_session(&self) -> Result<(), RefreshError> {
		let observed = self.coordinator.epoch();

		self.refresh_session_since(observed).await
	}

	/// Refreshes unless a refresh completed after `observed` (a [`RefreshCoordinator::epoch`]
	/// reading), in which case that refresh's outcome is returned without a network call.
	pub(crate) async fn refresh_session_since(&self, observed: u64) -> Result<(), RefreshError> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				self.refresh_metrics.record_attempt();

				let outcome = self
					.coordinator
					.run_since(observed, &self.refresh_metrics, || self.exchange_refresh_token())
					.await;

				match &outcome {
					Ok(()) => self.refresh_metrics.record_success(),
					Err(_) => self.refresh_metrics.record_failure(),
				}

				outcome
			})
			.await;

		match &result {
			Ok(()) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn exchange_refresh_token(&self) -> Result<(), RefreshError> {
		let result = self.try_exchange_refresh_token().await;

		if let Err(err) = &result {
			let reason = match err {
				RefreshError::MissingRefreshToken => LogoutReason::MissingRefreshToken,
				RefreshError::Rejected { status: 401, .. } => LogoutReason::RefreshRejected,
				_ => LogoutReason::RefreshFailed,
			};

			tracing::warn!(error = %err, "Session refresh failed; logging out.");

			if let Err(store_err) = self.session.logout(reason).await {
				tracing::warn!(error = %store_err, "Failed to clear the session after refresh failure.");
			}
		}

		result
	}

	async fn try_exchange_refresh_token(&self) -> Result<(), RefreshError> {
		let refresh = self.session.tokens().refresh().ok_or(RefreshError::MissingRefreshToken)?;
		let url = self
			.config
			.endpoint(&self.config.endpoints.refresh)
			.map_err(|e| RefreshError::Transport { message: e.to_string() })?;
		let mut body = JsonMap::new();

		body.insert(REFRESH_FIELD.into(), JsonValue::String(refresh.expose().into()));

		let response = self
			.http_client
			.post(url)
			.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.body(JsonValue::Object(body).to_string())
			.send()
			.await
			.map_err(|e| RefreshError::Transport { message: e.to_string() })?;
		let status = response.status();

		obs::record_response_status(FlowKind::Refresh, status);

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();

			return Err(RefreshError::Rejected { status: status.as_u16(), body });
		}

		let bytes =
			response.bytes().await.map_err(|e| RefreshError::Transport { message: e.to_string() })?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let payload: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| RefreshError::MalformedResponse {
				path: e.path().to_string(),
				message: e.inner().to_string(),
			})?;
		let access = payload
			.access
			.filter(|secret| !secret.is_blank())
			.ok_or(RefreshError::MissingAccessToken)?;
		// Backends that rotate refresh tokens return the replacement alongside the access token.
		let refresh = payload.refresh.filter(|secret| !secret.is_blank()).unwrap_or(refresh);

		self.session
			.tokens()
			.set(TokenPair { access, refresh })
			.await
			.map_err(|e| RefreshError::Storage { message: e.to_string() })?;
		tracing::debug!("Session refreshed.");

		Ok(())
	}
}
