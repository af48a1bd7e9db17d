//! Tolerant response parsing.

// crates.io
use reqwest::{Response, header::CONTENT_TYPE};
// self
use crate::{_prelude::*, error::TransportError};

const MESSAGE_FIELDS: [&str; 3] = ["detail", "error", "message"];

/// Parsed response payload.
///
/// `Empty` and `Malformed` both mean "no data"; they are kept apart so callers can log or
/// inspect a body the server got wrong.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResponseBody {
	/// No content (204/205, non-JSON content type, or empty text).
	#[default]
	Empty,
	/// Successfully parsed JSON document.
	Json(JsonValue),
	/// JSON was announced but the text did not parse.
	Malformed {
		/// Raw response text.
		raw: String,
	},
}
impl ResponseBody {
	/// Parsed document, if any.
	pub fn json(&self) -> Option<&JsonValue> {
		match self {
			Self::Json(value) => Some(value),
			_ => None,
		}
	}

	/// Consumes the body and returns the parsed document, if any.
	pub fn into_json(self) -> Option<JsonValue> {
		match self {
			Self::Json(value) => Some(value),
			_ => None,
		}
	}

	/// Returns `true` when the body carries no usable data.
	pub fn is_empty(&self) -> bool {
		!matches!(self, Self::Json(_))
	}

	/// Deserializes the parsed document; `Ok(None)` when there is no data.
	pub fn deserialize<T>(&self) -> Result<Option<T>, serde_json::Error>
	where
		T: for<'de> Deserialize<'de>,
	{
		self.json().map(|value| T::deserialize(value)).transpose()
	}

	/// Server-supplied summary taken from the `detail`, `error`, or `message` string field.
	pub fn message(&self) -> Option<&str> {
		let object = self.json()?.as_object()?;

		MESSAGE_FIELDS.iter().find_map(|field| object.get(*field)?.as_str())
	}
}

/// Result of a request that did not fail.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome {
	/// Success (2xx), possibly without data.
	Body(ResponseBody),
	/// 401 whose body carried the invalid-credentials sentinel; holds the sentinel text.
	InvalidCredentials(String),
}
impl RequestOutcome {
	/// Response body for successful calls.
	pub fn body(&self) -> Option<&ResponseBody> {
		match self {
			Self::Body(body) => Some(body),
			Self::InvalidCredentials(_) => None,
		}
	}

	/// Parsed document for successful calls.
	pub fn json(&self) -> Option<&JsonValue> {
		self.body()?.json()
	}

	/// Consumes the outcome, keeping the body of successful calls.
	pub fn into_body(self) -> Option<ResponseBody> {
		match self {
			Self::Body(body) => Some(body),
			Self::InvalidCredentials(_) => None,
		}
	}

	/// Sentinel text when the server rejected the supplied credentials.
	pub fn invalid_credentials(&self) -> Option<&str> {
		match self {
			Self::InvalidCredentials(message) => Some(message),
			Self::Body(_) => None,
		}
	}
}

/// Returns `true` when a response with this status and content type may carry JSON.
pub fn expects_json(status: StatusCode, content_type: Option<&str>) -> bool {
	if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
		return false;
	}

	content_type.is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

/// Parses response text that was announced as JSON.
pub fn parse_text(text: &str) -> ResponseBody {
	if text.trim().is_empty() {
		return ResponseBody::Empty;
	}

	match serde_json::from_str(text) {
		Ok(value) => ResponseBody::Json(value),
		Err(e) => {
			tracing::debug!(error = %e, "Treating malformed JSON body as empty.");

			ResponseBody::Malformed { raw: text.to_owned() }
		},
	}
}

/// Reads and parses a response without failing on empty or malformed bodies.
pub(crate) async fn read_body(
	response: Response,
	url: &str,
) -> Result<(StatusCode, ResponseBody), TransportError> {
	let status = response.status();
	let content_type =
		response.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).map(str::to_owned);

	if !expects_json(status, content_type.as_deref()) {
		return Ok((status, ResponseBody::Empty));
	}

	let text = response.text().await.map_err(|e| TransportError::body(url, e))?;

	Ok((status, parse_text(&text)))
}
