//! Request executor with one refresh-and-retry cycle on 401.

// crates.io
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
// self
use crate::{
	_prelude::*,
	client::StorefrontClient,
	error::{RequestError, TransportError},
	http::{
		ContentType, GUEST_ID_HEADER, RequestOptions, RequestOutcome, ResponseBody,
		payload::{self, EncodedBody},
		response,
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl StorefrontClient {
	/// Sends one request to `path` (relative to the base URL).
	///
	/// Returns the parsed body on success, which may be [`ResponseBody::Empty`]. A 401 whose
	/// body carries the configured credentials sentinel resolves to
	/// [`RequestOutcome::InvalidCredentials`]. Any other 401 refreshes the session and resends
	/// the original request exactly once; a second failure is terminal. Body validation
	/// happens before anything touches the network.
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		options: RequestOptions,
	) -> Result<RequestOutcome> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.execute(method, path, &options)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Sends a `GET` request.
	pub async fn get(&self, path: &str, options: RequestOptions) -> Result<RequestOutcome> {
		self.request(Method::GET, path, options).await
	}

	/// Sends a `POST` request.
	pub async fn post(&self, path: &str, options: RequestOptions) -> Result<RequestOutcome> {
		self.request(Method::POST, path, options).await
	}

	/// Sends a `PUT` request.
	pub async fn put(&self, path: &str, options: RequestOptions) -> Result<RequestOutcome> {
		self.request(Method::PUT, path, options).await
	}

	/// Sends a `PATCH` request.
	pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<RequestOutcome> {
		self.request(Method::PATCH, path, options).await
	}

	/// Sends a `DELETE` request.
	pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<RequestOutcome> {
		self.request(Method::DELETE, path, options).await
	}

	async fn execute(
		&self,
		method: Method,
		path: &str,
		options: &RequestOptions,
	) -> Result<RequestOutcome> {
		// Read before the access token so a refresh finishing mid-flight is not repeated.
		let observed = self.coordinator.epoch();
		let url = self.config.endpoint(path)?;
		let refresh = self.session.tokens().refresh();
		let body = payload::encode_body(&method, options, refresh.as_ref())?;
		let headers = self.build_headers(options).await;
		let (status, data) = self.send(&method, &url, headers, &body).await?;

		obs::record_response_status(FlowKind::Request, status);

		if status.is_success() {
			return Ok(RequestOutcome::Body(data));
		}
		if status != StatusCode::UNAUTHORIZED {
			return Err(RequestError::new(status.as_u16(), data, url.as_str()).into());
		}
		if data.message() == Some(self.config.credentials_sentinel.as_str()) {
			return Ok(RequestOutcome::InvalidCredentials(self.config.credentials_sentinel.clone()));
		}

		tracing::debug!(%method, url = %url, "Request unauthorized; refreshing before one retry.");

		self.refresh_session_since(observed).await?;

		let headers = self.build_headers(options).await;
		let (status, data) = self.send(&method, &url, headers, &body).await?;

		obs::record_response_status(FlowKind::Request, status);

		if status.is_success() {
			Ok(RequestOutcome::Body(data))
		} else {
			tracing::debug!(%method, url = %url, status = status.as_u16(), "Retry failed.");

			Err(RequestError::new(status.as_u16(), data, url.as_str()).into())
		}
	}

	/// Headers for one attempt, read from the session at call time.
	async fn build_headers(&self, options: &RequestOptions) -> HeaderMap {
		let mut headers = HeaderMap::new();

		if options.content_type == ContentType::Json {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Json.as_str()));
		}

		match self.session.guest().get().await {
			Ok(guest_id) => match HeaderValue::from_str(&guest_id) {
				Ok(value) => {
					headers.insert(GUEST_ID_HEADER, value);
				},
				Err(_) => tracing::warn!("Guest identifier is not a valid header value."),
			},
			Err(err) => tracing::warn!(error = %err, "Guest identifier unavailable."),
		}

		if options.access_required {
			match self.session.tokens().access() {
				Some(access) => match HeaderValue::from_str(&access.bearer()) {
					Ok(mut value) => {
						value.set_sensitive(true);
						headers.insert(AUTHORIZATION, value);
					},
					Err(_) => tracing::warn!("Access token is not a valid header value."),
				},
				None => tracing::debug!("Access required but no access token is stored."),
			}
		}

		headers
	}

	async fn send(
		&self,
		method: &Method,
		url: &Url,
		headers: HeaderMap,
		body: &EncodedBody,
	) -> Result<(StatusCode, ResponseBody)> {
		let mut builder = self.http_client.request(method.clone(), url.clone()).headers(headers);

		builder = match body {
			EncodedBody::None => builder,
			EncodedBody::Json(text) => builder.body(text.clone()),
			EncodedBody::Form(form) => builder.multipart(form.to_form()?),
		};

		let response =
			builder.send().await.map_err(|e| TransportError::network(url.as_str(), e))?;

		Ok(response::read_body(response, url.as_str()).await?)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	use serde_json::json;
	// self
	use crate::{
		_preludet::*,
		client::StorefrontClient,
		config::ClientConfig,
		error::{ConfigError, RefreshError, TransportError},
		http::{ContentType, RequestOptions, RequestOutcome, ResponseBody},
		session::LogoutReason,
		store::{AUTH_KEY, GUEST_KEY, MemoryStore},
	};

	const JSON: &str = "application/json";

	fn seeded_store(access: &str, refresh: &str) -> Arc<MemoryStore> {
		let store = Arc::new(MemoryStore::default());

		store.seed(AUTH_KEY, json!({ "access": access, "refresh": refresh }));
		store.seed(GUEST_KEY, json!({ "guest_id": "guest-1" }));

		store
	}

	#[tokio::test]
	async fn success_returns_parsed_body_with_guest_header() {
		let server = MockServer::start_async().await;
		let products = server
			.mock_async(|when, then| {
				when.method(GET).path("/products/").header("guest-id", "guest-1");
				then.status(200).header("content-type", JSON).body(r#"{"count":2}"#);
			})
			.await;
		let TestClient { client, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let outcome = client
			.get("/products/", RequestOptions::new())
			.await
			.expect("Anonymous GET should succeed.");

		products.assert_async().await;

		assert_eq!(outcome.json(), Some(&json!({ "count": 2 })));
	}

	#[tokio::test]
	async fn no_content_and_malformed_bodies_yield_no_data() {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(DELETE).path("/cart/items/7/");
				then.status(204).header("content-type", JSON);
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/cart/");
				then.status(200).header("content-type", JSON).body("{\"items\": [");
			})
			.await;

		let TestClient { client, .. } = build_test_client(&server.base_url()).await;
		let deleted = client
			.delete("cart/items/7/", RequestOptions::new())
			.await
			.expect("204 should resolve successfully.");
		let cart =
			client.get("cart/", RequestOptions::new()).await.expect("Malformed JSON is not an error.");

		assert_eq!(deleted, RequestOutcome::Body(ResponseBody::Empty));
		assert!(cart.json().is_none());
		assert!(matches!(cart.body(), Some(ResponseBody::Malformed { .. })));
	}

	#[tokio::test]
	async fn non_unauthorized_failure_carries_server_message() {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/cart/add/");
				then.status(400).header("content-type", JSON).body(r#"{"detail":"Out of stock"}"#);
			})
			.await;

		let TestClient { client, .. } = build_test_client(&server.base_url()).await;
		let err = client
			.post("cart/add/", RequestOptions::json(json!({ "product": 9 })))
			.await
			.expect_err("400 should surface as a request error.");

		assert_eq!(err.status(), Some(400));

		match err {
			Error::Request(err) => assert_eq!(err.message, "Out of stock"),
			other => panic!("Expected a request error, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn credentials_sentinel_skips_refresh() {
		let server = MockServer::start_async().await;
		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/");
				then.status(200).header("content-type", JSON).body(r#"{"access":"new"}"#);
			})
			.await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/login/");
				then.status(401)
					.header("content-type", JSON)
					.body(r#"{"error":"Invalid username or password"}"#);
			})
			.await;

		let TestClient { client, logout, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let outcome = client
			.post("login/", RequestOptions::json(json!({ "email_or_username": "ada" })))
			.await
			.expect("Sentinel 401 should resolve, not fail.");

		assert_eq!(outcome.invalid_credentials(), Some("Invalid username or password"));
		assert_eq!(refresh.calls_async().await, 0);
		assert_eq!(logout.calls(), 0);
	}

	#[tokio::test]
	async fn unauthorized_refreshes_and_retries_once() {
		let server = MockServer::start_async().await;
		let stale = server
			.mock_async(|when, then| {
				when.method(GET).path("/orders/").header("authorization", "Bearer old");
				then.status(401).header("content-type", JSON).body(r#"{"detail":"Token expired"}"#);
			})
			.await;
		let fresh = server
			.mock_async(|when, then| {
				when.method(GET).path("/orders/").header("authorization", "Bearer new");
				then.status(200).header("content-type", JSON).body(r#"[{"id":1}]"#);
			})
			.await;
		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/").json_body(json!({ "refresh": "r1" }));
				then.status(200).header("content-type", JSON).body(r#"{"access":"new"}"#);
			})
			.await;
		let TestClient { client, store, logout } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let outcome = client
			.get("orders/", RequestOptions::new().require_access())
			.await
			.expect("Retry after refresh should succeed.");

		stale.assert_async().await;
		fresh.assert_async().await;
		refresh.assert_async().await;

		assert_eq!(outcome.json(), Some(&json!([{ "id": 1 }])));
		assert_eq!(
			store.peek(AUTH_KEY).and_then(|v| v.get("access").cloned()),
			Some(json!("new"))
		);
		assert_eq!(
			client.session.tokens().refresh().map(|s| s.expose().to_owned()),
			Some("r1".into())
		);
		assert_eq!(logout.calls(), 0);
	}

	#[tokio::test]
	async fn concurrent_unauthorized_requests_share_one_refresh() {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(GET).path("/profile/").header("authorization", "Bearer old");
				then.status(401).header("content-type", JSON).body(r#"{"detail":"Token expired"}"#);
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/profile/").header("authorization", "Bearer new");
				then.status(200).header("content-type", JSON).body(r#"{"id":4}"#);
			})
			.await;

		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/");
				then.status(200)
					.header("content-type", JSON)
					.body(r#"{"access":"new","refresh":"r2"}"#)
					.delay(Duration::from_millis(300));
			})
			.await;
		let TestClient { client, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let options = RequestOptions::new().require_access();
		let (a, b, c) = tokio::join!(
			client.get("profile/", options.clone()),
			client.get("profile/", options.clone()),
			client.get("profile/", options),
		);

		for outcome in [a, b, c] {
			assert_eq!(
				outcome.expect("Every caller should succeed after the shared refresh.").json(),
				Some(&json!({ "id": 4 }))
			);
		}

		refresh.assert_calls_async(1).await;

		assert_eq!(client.refresh_metrics.network_calls(), 1);
		assert_eq!(
			client.session.tokens().refresh().map(|s| s.expose().to_owned()),
			Some("r2".into())
		);
		assert!(!client.is_refreshing());
	}

	#[tokio::test]
	async fn late_unauthorized_reuses_the_finished_refresh() {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(GET).path("/fast/").header("authorization", "Bearer old");
				then.status(401);
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/slow/").header("authorization", "Bearer old");
				then.status(401).delay(Duration::from_millis(400));
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).header("authorization", "Bearer new");
				then.status(200).header("content-type", JSON).body(r#"{"ok":true}"#);
			})
			.await;

		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/").json_body(json!({ "refresh": "r1" }));
				then.status(200).header("content-type", JSON).body(r#"{"access":"new","refresh":"r2"}"#);
			})
			.await;
		let TestClient { client, logout, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let options = RequestOptions::new().require_access();
		let (fast, slow) = tokio::join!(
			client.get("fast/", options.clone()),
			client.get("slow/", options),
		);

		assert_eq!(fast.expect("Fast request should succeed.").json(), Some(&json!({ "ok": true })));
		assert_eq!(slow.expect("Slow request should succeed.").json(), Some(&json!({ "ok": true })));

		refresh.assert_calls_async(1).await;

		assert_eq!(client.refresh_metrics.network_calls(), 1);
		assert_eq!(client.refresh_metrics.joins(), 1);
		assert_eq!(logout.calls(), 0);
	}

	#[tokio::test]
	async fn rejected_refresh_logs_out() {
		let server = MockServer::start_async().await;
		let orders = server
			.mock_async(|when, then| {
				when.method(GET).path("/orders/");
				then.status(401).header("content-type", JSON).body(r#"{"detail":"Token expired"}"#);
			})
			.await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/");
				then.status(401).header("content-type", JSON).body(r#"{"detail":"Token is blacklisted"}"#);
			})
			.await;

		let TestClient { client, store, logout } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let err = client
			.get("orders/", RequestOptions::new().require_access())
			.await
			.expect_err("A rejected refresh should fail the request.");

		assert!(matches!(err, Error::Refresh(RefreshError::Rejected { status: 401, .. })));
		assert_eq!(orders.calls_async().await, 1);
		assert_eq!(logout.reasons(), vec![LogoutReason::RefreshRejected]);
		assert!(client.session.tokens().tokens().is_none());
		assert!(store.peek(GUEST_KEY).is_none());
	}

	async fn refresh_failure(status: u16, body: &'static str) -> (Error, Vec<LogoutReason>, bool) {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(GET).path("/orders/");
				then.status(401);
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/");
				then.status(status).header("content-type", JSON).body(body);
			})
			.await;

		let TestClient { client, logout, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let err = client
			.get("orders/", RequestOptions::new().require_access())
			.await
			.expect_err("A failed refresh should fail the request.");

		(err, logout.reasons(), client.session.tokens().tokens().is_none())
	}

	#[tokio::test]
	async fn refresh_server_error_logs_out() {
		let (err, reasons, cleared) = refresh_failure(500, r#"{"detail":"Boom"}"#).await;

		assert!(matches!(err, Error::Refresh(RefreshError::Rejected { status: 500, .. })));
		assert_eq!(err.status(), Some(500));
		assert_eq!(reasons, vec![LogoutReason::RefreshFailed]);
		assert!(cleared);
	}

	#[tokio::test]
	async fn refresh_without_access_logs_out() {
		let (err, reasons, cleared) = refresh_failure(200, r#"{"refresh":"r9"}"#).await;

		assert!(matches!(err, Error::Refresh(RefreshError::MissingAccessToken)));
		assert_eq!(reasons, vec![LogoutReason::RefreshFailed]);
		assert!(cleared);
	}

	#[tokio::test]
	async fn malformed_refresh_response_logs_out() {
		let (err, reasons, cleared) = refresh_failure(200, r#"{"access":"#).await;

		assert!(matches!(err, Error::Refresh(RefreshError::MalformedResponse { .. })));
		assert_eq!(reasons, vec![LogoutReason::RefreshFailed]);
		assert!(cleared);
	}

	#[tokio::test]
	async fn retry_transport_failure_reaches_the_caller() {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(GET).path("/orders/").header("authorization", "Bearer old");
				then.status(401);
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/orders/").header("authorization", "Bearer new");
				then.status(200).delay(Duration::from_secs(3));
			})
			.await;

		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/");
				then.status(200).header("content-type", JSON).body(r#"{"access":"new"}"#);
			})
			.await;
		let TestClient { client, logout, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let config = ClientConfig::builder(client.config.base_url.clone())
			.timeout(Duration::from_millis(500))
			.build()
			.expect("Config with a timeout should build.");
		let client = StorefrontClient::new(config, client.session.clone())
			.expect("Client with a timeout should build.");
		let err = client
			.get("orders/", RequestOptions::new().require_access())
			.await
			.expect_err("A timed-out retry should fail the request.");

		assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
		assert_eq!(refresh.calls_async().await, 1);
		assert_eq!(
			client.session.tokens().access().map(|s| s.expose().to_owned()),
			Some("new".into())
		);
		assert_eq!(logout.calls(), 0);
	}

	#[tokio::test]
	async fn missing_refresh_token_logs_out_without_calling_the_backend() {
		let server = MockServer::start_async().await;
		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/");
				then.status(200).header("content-type", JSON).body(r#"{"access":"new"}"#);
			})
			.await;

		server
			.mock_async(|when, then| {
				when.method(GET).path("/wishlist/");
				then.status(401);
			})
			.await;

		let TestClient { client, logout, .. } = build_test_client(&server.base_url()).await;
		let err = client
			.get("wishlist/", RequestOptions::new().require_access())
			.await
			.expect_err("No refresh token means the request cannot recover.");

		assert!(matches!(err, Error::Refresh(RefreshError::MissingRefreshToken)));
		assert_eq!(refresh.calls_async().await, 0);
		assert_eq!(logout.reasons(), vec![LogoutReason::MissingRefreshToken]);
	}

	#[tokio::test]
	async fn second_unauthorized_is_terminal() {
		let server = MockServer::start_async().await;
		let orders = server
			.mock_async(|when, then| {
				when.method(GET).path("/orders/");
				then.status(401).header("content-type", JSON).body(r#"{"detail":"Forbidden"}"#);
			})
			.await;
		let refresh = server
			.mock_async(|when, then| {
				when.method(POST).path("/token/refresh/");
				then.status(200).header("content-type", JSON).body(r#"{"access":"new"}"#);
			})
			.await;
		let TestClient { client, logout, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;
		let err = client
			.get("orders/", RequestOptions::new().require_access())
			.await
			.expect_err("A second 401 should not trigger another refresh.");

		assert_eq!(err.status(), Some(401));
		assert_eq!(orders.calls_async().await, 2);
		assert_eq!(refresh.calls_async().await, 1);
		assert_eq!(logout.calls(), 0);
	}

	#[tokio::test]
	async fn multipart_without_form_fails_before_the_network() {
		let server = MockServer::start_async().await;
		let upload = server
			.mock_async(|when, then| {
				when.method(POST).path("/profile/photo/");
				then.status(200);
			})
			.await;
		let TestClient { client, .. } = build_test_client(&server.base_url()).await;
		let err = client
			.post(
				"profile/photo/",
				RequestOptions::json(json!({ "photo": "x" })).content_type(ContentType::Multipart),
			)
			.await
			.expect_err("Multipart without form data should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MultipartBodyRequired)));
		assert_eq!(upload.calls_async().await, 0);
	}

	#[tokio::test]
	async fn refresh_required_merges_the_refresh_token() {
		let server = MockServer::start_async().await;
		let revoke = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/devices/revoke/")
					.header("content-type", JSON)
					.json_body(json!({ "device": "tablet", "refresh": "r1" }));
				then.status(204);
			})
			.await;
		let TestClient { client, .. } =
			build_test_client_with_store(&server.base_url(), seeded_store("old", "r1")).await;

		client
			.post("devices/revoke/", RequestOptions::json(json!({ "device": "tablet" })).require_refresh())
			.await
			.expect("Revocation should succeed.");

		revoke.assert_async().await;
	}
}
