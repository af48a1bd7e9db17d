//! Token pair and the persisted `auth` record that bundles it with profile fields.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access/refresh credentials issued by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived credential sent with authenticated requests.
	pub access: TokenSecret,
	/// Longer-lived credential exchanged for new access tokens.
	pub refresh: TokenSecret,
}
impl TokenPair {
	/// Creates a pair from raw token strings.
	pub fn new(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { access: access.into(), refresh: refresh.into() }
	}
}

/// Contents of the persisted `auth` entry.
///
/// Login and registration responses carry the token pair alongside user profile fields
/// (name, email, etc.); everything that is not a token lands in [`AuthRecord::profile`] and is
/// written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthRecord {
	/// Current access token, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access: Option<TokenSecret>,
	/// Current refresh token, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh: Option<TokenSecret>,
	/// Additional fields bundled at login.
	#[serde(flatten)]
	pub profile: JsonMap<String, JsonValue>,
}
impl AuthRecord {
	/// Builds a record holding only the provided pair.
	pub fn from_pair(pair: TokenPair) -> Self {
		Self { access: Some(pair.access), refresh: Some(pair.refresh), profile: JsonMap::new() }
	}

	/// Decodes a record from a login/registration payload or a persisted entry.
	pub fn from_value(value: JsonValue) -> Result<Self, serde_json::Error> {
		serde_json::from_value(value)
	}

	/// Access token, ignoring blank values.
	pub fn access(&self) -> Option<&TokenSecret> {
		self.access.as_ref().filter(|secret| !secret.is_blank())
	}

	/// Refresh token, ignoring blank values.
	pub fn refresh(&self) -> Option<&TokenSecret> {
		self.refresh.as_ref().filter(|secret| !secret.is_blank())
	}

	/// Returns the complete pair when both tokens are present.
	pub fn tokens(&self) -> Option<TokenPair> {
		Some(TokenPair { access: self.access()?.clone(), refresh: self.refresh()?.clone() })
	}

	/// Returns `true` when the record carries an access token.
	pub fn is_authenticated(&self) -> bool {
		self.access().is_some()
	}

	/// Replaces both tokens while keeping the profile fields.
	pub fn with_tokens(mut self, pair: TokenPair) -> Self {
		self.access = Some(pair.access);
		self.refresh = Some(pair.refresh);

		self
	}

	/// Drops both tokens and every profile field.
	pub fn cleared() -> Self {
		Self::default()
	}
}
