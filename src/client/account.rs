//! Account flows that create or destroy the session: login, registration, and logout.

// self
use crate::{
	_prelude::*,
	auth::AuthRecord,
	client::StorefrontClient,
	http::{RequestOptions, RequestOutcome, ResponseBody},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::LogoutReason,
	store::{self, AUTH_KEY},
};

impl StorefrontClient {
	/// Posts credentials (e.g. `{ "email_or_username": .., "password": .. }`) to the login
	/// endpoint and stores the returned tokens and profile fields.
	///
	/// Wrong credentials resolve to [`RequestOutcome::InvalidCredentials`] and leave the
	/// session untouched.
	pub async fn login(&self, credentials: JsonValue) -> Result<RequestOutcome> {
		let path = self.config.endpoints.login.clone();

		self.authenticate(FlowKind::Login, &path, credentials).await
	}

	/// Posts a registration payload and stores the returned tokens when the backend signs the
	/// new account in right away.
	pub async fn register(&self, payload: JsonValue) -> Result<RequestOutcome> {
		let path = self.config.endpoints.register.clone();

		self.authenticate(FlowKind::Register, &path, payload).await
	}

	/// Invalidates the refresh token server-side, then clears the local session.
	///
	/// The local session is cleared even when the server call fails; the server error is
	/// returned afterwards.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let path = self.config.endpoints.logout.clone();
				let remote = self
					.post(&path, RequestOptions::new().require_access().require_refresh())
					.await;

				// A failed refresh during the call already tore the session down.
				if !matches!(remote, Err(Error::Refresh(_))) {
					self.session.logout(LogoutReason::UserRequested).await?;
				}

				remote.map(|_| ())
			})
			.await;

		match &result {
			Ok(()) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn authenticate(
		&self,
		kind: FlowKind,
		path: &str,
		payload: JsonValue,
	) -> Result<RequestOutcome> {
		let span = FlowSpan::new(kind, "authenticate");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let outcome = self.post(path, RequestOptions::json(payload)).await?;

				if let RequestOutcome::Body(body) = &outcome {
					self.store_auth_bundle(body).await?;
				}

				Ok(outcome)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}

	async fn store_auth_bundle(&self, body: &ResponseBody) -> Result<()> {
		let Some(value) = body.json() else {
			tracing::debug!("Authentication response carried no data; session unchanged.");

			return Ok(());
		};
		let record: AuthRecord = store::decode(AUTH_KEY, value.clone())?;

		if !record.is_authenticated() {
			tracing::debug!("Authentication response carried no access token; session unchanged.");

			return Ok(());
		}

		self.session.tokens().replace(record).await?;

		Ok(())
	}
}
