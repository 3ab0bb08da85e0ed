//! RFC 9457 Problem Details for HTTP APIs (pure data model, no HTTP framework dependencies)

use http::StatusCode;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{SerializationError, ValidationError};

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Problem type meaning "no semantics beyond the HTTP status code".
pub const ABOUT_BLANK: &str = "about:blank";

/// Member names owned by the standard fields; extensions may not reuse them.
pub const RESERVED_MEMBERS: [&str; 5] = ["type", "status", "title", "detail", "instance"];

const STATUS_RANGE: std::ops::RangeInclusive<i64> = 100..=599;

/// Ordered extension members of a problem payload.
///
/// Iteration follows insertion order, which is also the order members are
/// written on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(Map<String, Value>);

impl Extensions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a JSON value, replacing any previous value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Encode an arbitrary serializable value and insert it.
    ///
    /// # Errors
    /// Returns `SerializationError` when serde cannot represent `value` as JSON
    /// (for example a map with non-string keys).
    pub fn try_insert<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Option<Value>, SerializationError> {
        let value = serde_json::to_value(value)?;
        Ok(self.0.insert(key.into(), value))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn reserved_key(&self) -> Option<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .find(|key| RESERVED_MEMBERS.contains(key))
    }
}

impl From<Map<String, Value>> for Extensions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Extensions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Extensions {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// RFC 9457 Problem Details for HTTP APIs.
///
/// Immutable once built. Absent optional members serialize as `null`, and the
/// reserved members are always written first in the order
/// `type, status, title, detail, instance`, followed by extensions in
/// insertion order. Clients rely on that order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawErrorResponse")]
pub struct ErrorResponse {
    status: StatusCode,
    type_url: String,
    title: Option<String>,
    detail: Option<String>,
    instance: Option<String>,
    extensions: Extensions,
}

impl ErrorResponse {
    /// Validate the given members and build a response.
    ///
    /// `type_url = None` selects [`ABOUT_BLANK`].
    ///
    /// # Errors
    /// - `ValidationError::InvalidStatus` if `status` is outside `100..=599`
    /// - `ValidationError::ReservedExtensionKey` if an extension reuses a reserved name
    pub fn create(
        status: i64,
        title: Option<String>,
        detail: Option<String>,
        instance: Option<String>,
        type_url: Option<String>,
        extensions: Extensions,
    ) -> Result<Self, ValidationError> {
        if !STATUS_RANGE.contains(&status) {
            return Err(ValidationError::InvalidStatus(status));
        }
        let status = u16::try_from(status)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or(ValidationError::InvalidStatus(status))?;

        if let Some(key) = extensions.reserved_key() {
            return Err(ValidationError::ReservedExtensionKey(key.to_owned()));
        }

        Ok(Self {
            status,
            type_url: type_url.unwrap_or_else(|| ABOUT_BLANK.to_owned()),
            title,
            detail,
            instance,
            extensions,
        })
    }

    /// `500 Internal Server Error` with the given title. Diagnostic extension
    /// names never clash with reserved members, so no validation is needed.
    pub(crate) fn internal_error(title: String, extensions: Extensions) -> Self {
        debug_assert!(extensions.reserved_key().is_none());
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            type_url: ABOUT_BLANK.to_owned(),
            title: Some(title),
            detail: None,
            instance: None,
            extensions,
        }
    }

    /// Response carrying only a status code.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidStatus` if `status` is outside `100..=599`.
    pub fn new(status: i64) -> Result<Self, ValidationError> {
        Self::create(status, None, None, None, None, Extensions::new())
    }

    pub fn builder(status: i64) -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(status)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Two responses are of the same type when their `type` URIs are equal.
    #[must_use]
    pub fn is_same_type(&self, other: &Self) -> bool {
        self.type_url == other.type_url
    }

    /// Ordered record of all members, reserved members first.
    #[must_use]
    pub fn to_structured_record(&self) -> Map<String, Value> {
        let mut record = Map::with_capacity(RESERVED_MEMBERS.len() + self.extensions.len());
        record.insert("type".to_owned(), Value::from(self.type_url.as_str()));
        record.insert("status".to_owned(), Value::from(self.status.as_u16()));
        record.insert("title".to_owned(), Value::from(self.title.clone()));
        record.insert("detail".to_owned(), Value::from(self.detail.clone()));
        record.insert("instance".to_owned(), Value::from(self.instance.clone()));
        for (key, value) in &self.extensions {
            record.insert(key.clone(), value.clone());
        }
        record
    }

    /// Compact JSON wire representation.
    ///
    /// # Errors
    /// Returns `SerializationError` if the encoder fails.
    pub fn to_json(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for ErrorResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = RESERVED_MEMBERS.len() + self.extensions.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", &self.type_url)?;
        map.serialize_entry("status", &self.status.as_u16())?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("detail", &self.detail)?;
        map.serialize_entry("instance", &self.instance)?;
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Axum integration: make `ErrorResponse` directly usable as a response
///
/// The body is rendered from [`ErrorResponse::to_structured_record`]; a map of
/// JSON values always renders, so this conversion has no failure path. Use
/// `to_json` when the encoding result must be observed.
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        use axum::http::{HeaderValue, header};

        let body = Value::Object(self.to_structured_record()).to_string();
        let mut resp = (self.status, body).into_response();
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

/// Wire shape accepted when parsing a payload; unknown members are extensions.
#[derive(Deserialize)]
struct RawErrorResponse {
    #[serde(rename = "type", default)]
    type_url: Option<String>,
    status: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    instance: Option<String>,
    #[serde(flatten)]
    extensions: Map<String, Value>,
}

impl TryFrom<RawErrorResponse> for ErrorResponse {
    type Error = ValidationError;

    fn try_from(raw: RawErrorResponse) -> Result<Self, Self::Error> {
        Self::create(
            raw.status,
            raw.title,
            raw.detail,
            raw.instance,
            raw.type_url,
            raw.extensions.into(),
        )
    }
}

/// Fluent construction of an [`ErrorResponse`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
#[must_use]
pub struct ErrorResponseBuilder {
    status: i64,
    title: Option<String>,
    detail: Option<String>,
    instance: Option<String>,
    type_url: Option<String>,
    extensions: Extensions,
}

impl ErrorResponseBuilder {
    pub fn new(status: i64) -> Self {
        Self {
            status,
            title: None,
            detail: None,
            instance: None,
            type_url: None,
            extensions: Extensions::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    pub fn type_url(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = Some(type_url.into());
        self
    }

    pub fn extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key, value);
        self
    }

    pub fn extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// # Errors
    /// See [`ErrorResponse::create`].
    pub fn build(self) -> Result<ErrorResponse, ValidationError> {
        ErrorResponse::create(
            self.status,
            self.title,
            self.detail,
            self.instance,
            self.type_url,
            self.extensions,
        )
    }
}
