//! Anonymous visitor identifiers used to own carts and wishlists before login.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

/// Error returned when a guest identifier fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum GuestIdError {
	/// The identifier was empty or whitespace.
	#[error("Guest identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Guest identifier contains whitespace.")]
	ContainsWhitespace,
}

/// Opaque guest identifier sent in the `Guest-Id` header.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GuestId(String);
impl GuestId {
	/// Validates and wraps an existing identifier.
	pub fn new(value: impl AsRef<str>) -> Result<Self, GuestIdError> {
		let view = value.as_ref();

		validate(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Generates a fresh random identifier (UUID v4).
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}
}
impl Deref for GuestId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for GuestId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<GuestId> for String {
	fn from(value: GuestId) -> Self {
		value.0
	}
}
impl TryFrom<String> for GuestId {
	type Error = GuestIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for GuestId {
	type Err = GuestIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for GuestId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Guest({})", self.0)
	}
}
impl Display for GuestId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Contents of the persisted `guest` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRecord {
	/// Identifier shared by every outgoing request.
	pub guest_id: GuestId,
}

fn validate(view: &str) -> Result<(), GuestIdError> {
	if view.is_empty() {
		return Err(GuestIdError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(GuestIdError::ContainsWhitespace);
	}

	Ok(())
}
