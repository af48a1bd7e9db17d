//! Outgoing request descriptions and body encoding.

// crates.io
use reqwest::multipart::{Form, Part};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Field name used when the refresh token travels in a request body.
pub const REFRESH_FIELD: &str = "refresh";

/// Body encoding requested by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
	/// `application/json`.
	#[default]
	Json,
	/// `multipart/form-data`; the boundary is chosen by the multipart encoder.
	Multipart,
}
impl ContentType {
	/// MIME label for the content type.
	pub const fn as_str(self) -> &'static str {
		match self {
			ContentType::Json => "application/json",
			ContentType::Multipart => "multipart/form-data",
		}
	}
}

/// One multipart field.
#[derive(Clone, PartialEq, Eq)]
pub enum FormPart {
	/// Plain text value.
	Text(String),
	/// File upload (e.g. a profile photo).
	File {
		/// Raw file contents.
		bytes: Vec<u8>,
		/// File name reported to the server.
		file_name: Option<String>,
		/// MIME type, e.g. `image/png`.
		mime: Option<String>,
	},
}
impl Debug for FormPart {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
			Self::File { bytes, file_name, mime } => f
				.debug_struct("File")
				.field("len", &bytes.len())
				.field("file_name", file_name)
				.field("mime", mime)
				.finish(),
		}
	}
}

/// Multipart container that can be encoded more than once, so a request can be resent after a
/// token refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormData {
	parts: Vec<(String, FormPart)>,
}
impl FormData {
	/// Creates an empty container.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.append_text(name, value);

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
		file_name: Option<String>,
		mime: Option<String>,
	) -> Self {
		self.parts
			.push((name.into(), FormPart::File { bytes: bytes.into(), file_name, mime }));

		self
	}

	/// Appends a text field in place.
	pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.parts.push((name.into(), FormPart::Text(value.into())));
	}

	/// Returns the first part named `name`.
	pub fn get(&self, name: &str) -> Option<&FormPart> {
		self.parts.iter().find(|(key, _)| key == name).map(|(_, part)| part)
	}

	/// Number of parts.
	pub fn len(&self) -> usize {
		self.parts.len()
	}

	/// Returns `true` when the container has no parts.
	pub fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}

	/// Builds a fresh reqwest multipart form.
	pub fn to_form(&self) -> Result<Form, ConfigError> {
		let mut form = Form::new();

		for (name, part) in &self.parts {
			form = match part {
				FormPart::Text(value) => form.text(name.clone(), value.clone()),
				FormPart::File { bytes, file_name, mime } => {
					let mut file = Part::bytes(bytes.clone());

					if let Some(file_name) = file_name {
						file = file.file_name(file_name.clone());
					}
					if let Some(mime) = mime {
						file = file.mime_str(mime).map_err(|e| ConfigError::InvalidFormPart {
							name: name.clone(),
							source: Box::new(e),
						})?;
					}

					form.part(name.clone(), file)
				},
			};
		}

		Ok(form)
	}
}

/// Caller-supplied request body.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestData {
	/// JSON document.
	Json(JsonValue),
	/// Multipart form.
	Form(FormData),
}
impl From<JsonValue> for RequestData {
	fn from(value: JsonValue) -> Self {
		Self::Json(value)
	}
}
impl From<FormData> for RequestData {
	fn from(value: FormData) -> Self {
		Self::Form(value)
	}
}

/// Per-call configuration.
///
/// `access_required` and `refresh_required` are independent: the first attaches the
/// `Authorization` header, the second embeds the refresh token in the body for endpoints that
/// invalidate it server-side.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
	/// Body sent with non-GET requests.
	pub data: Option<RequestData>,
	/// Attach `Authorization: Bearer <access>`.
	pub access_required: bool,
	/// Embed the refresh token in the body.
	pub refresh_required: bool,
	/// Body encoding.
	pub content_type: ContentType,
}
impl RequestOptions {
	/// Options for a body-less anonymous call.
	pub fn new() -> Self {
		Self::default()
	}

	/// Options carrying a JSON body.
	pub fn json(value: JsonValue) -> Self {
		Self { data: Some(RequestData::Json(value)), ..Self::default() }
	}

	/// Options carrying a multipart body.
	pub fn form(form: FormData) -> Self {
		Self {
			data: Some(RequestData::Form(form)),
			content_type: ContentType::Multipart,
			..Self::default()
		}
	}

	/// Replaces the body.
	pub fn data(mut self, data: impl Into<RequestData>) -> Self {
		self.data = Some(data.into());

		self
	}

	/// Attaches the access token.
	pub fn require_access(mut self) -> Self {
		self.access_required = true;

		self
	}

	/// Embeds the refresh token in the body.
	pub fn require_refresh(mut self) -> Self {
		self.refresh_required = true;

		self
	}

	/// Overrides the content type.
	pub fn content_type(mut self, content_type: ContentType) -> Self {
		self.content_type = content_type;

		self
	}
}

/// Body ready to attach to a reqwest builder; cloneable for the single retry.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum EncodedBody {
	None,
	Json(String),
	Form(FormData),
}

/// Validates and serializes the body for `method`. GET requests never carry one.
pub(crate) fn encode_body(
	method: &Method,
	options: &RequestOptions,
	refresh: Option<&TokenSecret>,
) -> Result<EncodedBody, ConfigError> {
	if *method == Method::GET {
		return Ok(EncodedBody::None);
	}

	let refresh = refresh.filter(|_| options.refresh_required);

	match options.content_type {
		ContentType::Multipart => {
			let Some(RequestData::Form(form)) = &options.data else {
				return Err(ConfigError::MultipartBodyRequired);
			};
			let mut form = form.clone();

			if let Some(refresh) = refresh {
				form.append_text(REFRESH_FIELD, refresh.expose());
			}

			Ok(EncodedBody::Form(form))
		},
		ContentType::Json => {
			let value = match &options.data {
				Some(RequestData::Form(_)) => return Err(ConfigError::JsonBodyRequired),
				Some(RequestData::Json(value)) => Some(value.clone()),
				None => None,
			};
			let value = match (value, refresh) {
				(value, Some(refresh)) => {
					let mut object = match value {
						None | Some(JsonValue::Null) => JsonMap::new(),
						Some(JsonValue::Object(object)) => object,
						Some(_) => return Err(ConfigError::JsonBodyNotObject),
					};

					object.insert(REFRESH_FIELD.into(), JsonValue::String(refresh.expose().into()));

					Some(JsonValue::Object(object))
				},
				(value, None) => value,
			};

			Ok(match value {
				Some(value) => EncodedBody::Json(value.to_string()),
				None => EncodedBody::None,
			})
		},
	}
}
