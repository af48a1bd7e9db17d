//! Client-level error types shared across the executor, refresh coordinator, and stores.

// self
use crate::{_prelude::*, http::ResponseBody};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request validation problem; raised before any network call.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, body read).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Server answered with a non-success status the retry path could not resolve.
	#[error(transparent)]
	Request(#[from] RequestError),
	/// Session refresh failed; the session has been logged out.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
}
impl Error {
	/// HTTP status carried by the error, when it came from a server response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Request(err) => Some(err.status),
			Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path could not be joined onto the configured base URL.
	#[error("Path `{path}` cannot be joined onto the API base URL.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Multipart requests must carry a form container.
	#[error("A multipart request requires a form data body.")]
	MultipartBodyRequired,
	/// JSON requests cannot carry a form container.
	#[error("A JSON request cannot carry a form data body.")]
	JsonBodyRequired,
	/// The refresh token must be merged into a JSON object body.
	#[error("A request that embeds the refresh token needs a JSON object body.")]
	JsonBodyNotObject,
	/// A form part could not be assembled (invalid MIME type, etc.).
	#[error("Form part `{name}` is invalid.")]
	InvalidFormPart {
		/// Field name of the offending part.
		name: String,
		/// Underlying construction failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL of the failed call.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Response body could not be read.
	#[error("Response body from {url} could not be read.")]
	Body {
		/// Target URL of the failed call.
		url: String,
		/// Transport-specific read error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}

	/// Wraps a transport-specific body read error.
	pub fn body(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Body { url: url.into(), source: Box::new(src) }
	}
}

/// Terminal request failure carrying everything callers need to map server-side field errors.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct RequestError {
	/// HTTP status code of the final response.
	pub status: u16,
	/// Parsed response body, if any.
	pub data: ResponseBody,
	/// URL of the failed request.
	pub url: String,
	/// Human-readable summary taken from the body when the server supplied one.
	pub message: String,
}
impl RequestError {
	/// Builds an error from a final response, deriving the message from the body.
	pub fn new(status: u16, data: ResponseBody, url: impl Into<String>) -> Self {
		let url = url.into();
		let message = data
			.message()
			.map(str::to_owned)
			.unwrap_or_else(|| format!("Request to {url} failed with status {status}."));

		Self { status, data, url, message }
	}

	/// Field-level error payload for the provided key (e.g. `email`), if present.
	pub fn field(&self, name: &str) -> Option<&JsonValue> {
		self.data.json()?.get(name)
	}
}

/// Refresh failures. Cloneable so every caller sharing one in-flight refresh gets the same
/// outcome.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No usable refresh token is stored.
	#[error("No refresh token is available for this session.")]
	MissingRefreshToken,
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the session with status {status}: {body}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Raw response text kept for diagnostics.
		body: String,
	},
	/// Refresh endpoint succeeded but omitted the `access` field.
	#[error("Refresh response is missing the access token.")]
	MissingAccessToken,
	/// Refresh endpoint returned a body that is not the expected JSON shape.
	#[error("Refresh response is malformed at `{path}`: {message}.")]
	MalformedResponse {
		/// JSON path where decoding failed.
		path: String,
		/// Decoder message.
		message: String,
	},
	/// The refresh call failed before a response arrived.
	#[error("Refresh request failed: {message}.")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// The refreshed pair could not be persisted.
	#[error("Refreshed tokens could not be stored: {message}.")]
	Storage {
		/// Rendered storage failure.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_error_prefers_body_message() {
		let body = ResponseBody::Json(serde_json::json!({ "detail": "Out of stock." }));
		let err = RequestError::new(409, body, "http://shop.test/bag/");

		assert_eq!(err.message, "Out of stock.");
		assert_eq!(Error::from(err).status(), Some(409));
	}

	#[test]
	fn request_error_falls_back_to_status_summary() {
		let err = RequestError::new(500, ResponseBody::Empty, "http://shop.test/bag/");

		assert_eq!(err.message, "Request to http://shop.test/bag/ failed with status 500.");
		assert!(err.field("email").is_none());
	}

	#[test]
	fn request_error_exposes_field_errors() {
		let body = ResponseBody::Json(serde_json::json!({ "email": ["Already registered."] }));
		let err = RequestError::new(400, body, "http://shop.test/register/");

		assert_eq!(err.field("email"), Some(&serde_json::json!(["Already registered."])));
	}
}
