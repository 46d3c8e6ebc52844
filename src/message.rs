//! HTTP request/response model used throughout the pipeline.
//!
//! Headers keep their wire order and match names case-insensitively. Field
//! names are stored as received so that renames (see
//! [`Header::apply_session_header`]) stay visible to anyone inspecting the
//! message afterwards.

use std::borrow::Cow;

use http::{Method, StatusCode};

use crate::session::SessionHeader;

/// Well-known header names.
pub mod names {
    /// `Content-Type`
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// `Content-Length`
    pub const CONTENT_LENGTH: &str = "Content-Length";
    /// `Accept`
    pub const ACCEPT: &str = "Accept";
    /// `Location`
    pub const LOCATION: &str = "Location";
    /// `Cookie`
    pub const COOKIE: &str = "Cookie";
    /// `Set-Cookie`
    pub const SET_COOKIE: &str = "Set-Cookie";
    /// `WWW-Authenticate`
    pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";
    /// `Cache-Control`
    pub const CACHE_CONTROL: &str = "Cache-Control";
    /// `Pragma`
    pub const PRAGMA: &str = "Pragma";
    /// `Expires`
    pub const EXPIRES: &str = "Expires";
}

/// Media types the gateway emits.
pub mod mime {
    /// JSON, UTF-8.
    pub const APPLICATION_JSON_UTF8: &str = "application/json;charset=UTF-8";
    /// XML, UTF-8.
    pub const TEXT_XML_UTF8: &str = "text/xml;charset=UTF-8";
    /// HTML, UTF-8.
    pub const TEXT_HTML_UTF8: &str = "text/html;charset=UTF-8";
    /// Form-encoded bodies.
    pub const APPLICATION_X_WWW_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
}

/// A single header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: String,
}

impl HeaderField {
    /// Creates a header field.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the field name as stored.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this field has the given name, ignoring ASCII case.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Ordered header block with case-insensitive lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    fields: Vec<HeaderField>,
}

impl Header {
    /// Creates an empty header block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping any existing fields of the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(HeaderField::new(name, value));
    }

    /// Replaces every field named `name` with a single field.
    ///
    /// The replacement takes the position of the first existing field, or is
    /// appended if none exists.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(index) => {
                self.fields[index].value = value;
                let mut seen = 0usize;
                self.fields.retain(|f| {
                    if f.is(name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.add(name, value),
        }
    }

    /// Removes every field named `name`.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|f| !f.is(name));
    }

    /// Returns the value of the first field named `name`.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.is(name)).map(HeaderField::value)
    }

    /// Returns all values of fields named `name`, in order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.is(name))
            .map(HeaderField::value)
    }

    /// Returns true if at least one field is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns the index of the first field named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.is(name))
    }

    /// Renames the field at `index`, keeping its value and position.
    ///
    /// Returns false if `index` is out of range.
    pub fn rename_field(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.fields.get_mut(index) {
            Some(field) => {
                field.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Performs the rename requested by a session-header lookup.
    ///
    /// A `Cookie` field found by [`crate::session::extract_session_header`] is
    /// renamed to `Set-Cookie` in place. Lookups that found a `Set-Cookie`
    /// field leave the header untouched.
    pub fn apply_session_header(&mut self, found: &SessionHeader) {
        if found.needs_rename() {
            self.rename_field(found.index(), names::SET_COOKIE);
        }
    }

    /// Returns all fields in wire order.
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the block has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the `Content-Type` value, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.first_value(names::CONTENT_TYPE)
    }
}

/// Shared view over requests and responses.
pub trait Message {
    /// Returns the header block.
    fn header(&self) -> &Header;
    /// Returns the header block for modification.
    fn header_mut(&mut self) -> &mut Header;
    /// Returns the raw body.
    fn body(&self) -> &[u8];

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }
}

/// An inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: String,
    header: Header,
    body: Vec<u8>,
}

impl Request {
    /// Creates a request without headers or body.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            header: Header::new(),
            body: Vec::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Creates a POST request.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Adds a header field and returns the request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.add(name, value);
        self
    }

    /// Sets the body and returns the request.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request target as received.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the path component, without query or fragment.
    pub fn path(&self) -> &str {
        let end = self.uri.find(['?', '#']).unwrap_or(self.uri.len());
        &self.uri[..end]
    }

    /// Returns the raw query string, if the target has one.
    pub fn query(&self) -> Option<&str> {
        let target = match self.uri.find('#') {
            Some(end) => &self.uri[..end],
            None => &self.uri,
        };
        target.split_once('?').map(|(_, query)| query)
    }
}

impl Message for Request {
    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// An outbound HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    header: Header,
    body: Vec<u8>,
    cacheable: bool,
}

impl Response {
    /// Starts a response with an arbitrary status.
    pub fn builder(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Starts a `200 OK` response.
    pub fn ok() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::OK)
    }

    /// Starts a `400 Bad Request` response.
    pub fn bad_request() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::BAD_REQUEST)
    }

    /// Starts a `401 Unauthorized` response.
    pub fn unauthorized() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::UNAUTHORIZED)
    }

    /// Starts a `500 Internal Server Error` response.
    pub fn internal_server_error() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Starts a redirect to `location`: `301` when permanent, `302` otherwise.
    pub fn redirect(location: impl Into<String>, permanent: bool) -> ResponseBuilder {
        let status = if permanent {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::FOUND
        };
        ResponseBuilder::new(status).header(names::LOCATION, location)
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the `Location` header, if set.
    pub fn location(&self) -> Option<&str> {
        self.header.first_value(names::LOCATION)
    }

    /// Returns false once the response was marked as not cacheable.
    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

impl Message for Response {
    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Builder for [`Response`].
///
/// # Examples
///
/// ```
/// use gateway_core::{Message, Response};
///
/// let response = Response::bad_request()
///     .content_type("application/json")
///     .body(r#"{"error":"invalid_request"}"#)
///     .dont_cache()
///     .build();
///
/// assert_eq!(response.status().as_u16(), 400);
/// assert!(!response.is_cacheable());
/// assert_eq!(response.header().first_value("content-length"), Some("27"));
/// ```
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: StatusCode,
    header: Header,
    body: Vec<u8>,
    cacheable: bool,
}

impl ResponseBuilder {
    fn new(status: StatusCode) -> Self {
        Self {
            status,
            header: Header::new(),
            body: Vec::new(),
            cacheable: true,
        }
    }

    /// Overrides the status code.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Appends a header field.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.add(name, value);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.header.set(names::CONTENT_TYPE, value);
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Clears the body.
    pub fn body_empty(mut self) -> Self {
        self.body.clear();
        self
    }

    /// Marks the response as not cacheable and adds the matching headers.
    pub fn dont_cache(mut self) -> Self {
        self.cacheable = false;
        self.header
            .set(names::CACHE_CONTROL, "no-cache, no-store, must-revalidate");
        self.header.set(names::PRAGMA, "no-cache");
        self.header.set(names::EXPIRES, "0");
        self
    }

    /// Finishes the response, setting `Content-Length` from the body.
    pub fn build(mut self) -> Response {
        self.header
            .set(names::CONTENT_LENGTH, self.body.len().to_string());
        Response {
            status: self.status,
            header: self.header,
            body: self.body,
            cacheable: self.cacheable,
        }
    }
}
