//! Walks a visitor through a storefront session against a mock backend: browsing as a guest,
//! logging in, surviving an expired access token, uploading a profile photo, and logging out.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use storefront_client::{
	client::StorefrontClient,
	config::ClientConfig,
	http::{FormData, RequestOptions},
	session::{LogoutListener, LogoutReason, Session},
	store::{MemoryStore, SessionStore},
};

const JSON: &str = "application/json";

struct PrintLogout;
impl LogoutListener for PrintLogout {
	fn logged_out(&self, reason: LogoutReason) {
		println!("Session ended: {reason}.");
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let cart_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/cart/add/").header_exists("guest-id");
			then.status(201).header("content-type", JSON).body(r#"{"items":1}"#);
		})
		.await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/login/");
			then.status(200)
				.header("content-type", JSON)
				.body(r#"{"access":"expired","refresh":"r1","first_name":"Ada"}"#);
		})
		.await;
	let orders_stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders/").header("authorization", "Bearer expired");
			then.status(401).header("content-type", JSON).body(r#"{"detail":"Token expired"}"#);
		})
		.await;
	let orders_fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders/").header("authorization", "Bearer fresh");
			then.status(200).header("content-type", JSON).body(r#"[{"id":17,"total":"42.00"}]"#);
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token/refresh/").json_body(json!({ "refresh": "r1" }));
			then.status(200).header("content-type", JSON).body(r#"{"access":"fresh"}"#);
		})
		.await;
	let photo_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/profile/photo/").header("authorization", "Bearer fresh");
			then.status(204);
		})
		.await;
	let logout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/logout/").json_body(json!({ "refresh": "r1" }));
			then.status(205);
		})
		.await;
	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
	let session = Session::open(store).await?.with_listener(Arc::new(PrintLogout));
	let config = ClientConfig::builder(Url::parse(&server.base_url())?).build()?;
	let client = StorefrontClient::new(config, Arc::new(session))?;
	let cart = client.post("cart/add/", RequestOptions::json(json!({ "product": 3 }))).await?;

	println!("Guest {} cart: {:?}.", client.session.guest().get().await?, cart.json());

	let login = client.login(json!({ "email_or_username": "ada", "password": "pw" })).await?;

	if let Some(message) = login.invalid_credentials() {
		println!("Login rejected: {message}.");

		return Ok(());
	}

	let orders = client.get("orders/", RequestOptions::new().require_access()).await?;

	println!("Orders after one transparent refresh: {:?}.", orders.json());

	let photo = FormData::new().text("caption", "Ada").file(
		"photo",
		b"\x89PNG demo".to_vec(),
		Some("ada.png".into()),
		Some("image/png".into()),
	);

	client.post("profile/photo/", RequestOptions::form(photo).require_access()).await?;
	client.logout().await?;

	println!("Refresh calls on the wire: {}.", client.refresh_metrics.network_calls());

	cart_mock.assert_async().await;
	login_mock.assert_async().await;
	orders_stale.assert_async().await;
	orders_fresh.assert_async().await;
	refresh_mock.assert_async().await;
	photo_mock.assert_async().await;
	logout_mock.assert_async().await;

	Ok(())
}
