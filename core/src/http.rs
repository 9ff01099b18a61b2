//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe the single POST call as plain data. The client builds
//! `HttpRequest` values and parses `HttpResponse` values; executing the round
//! trip is either done by `transport` (the blocking `execute*` methods) or by
//! the host itself, e.g. across the C FFI boundary.
//!
//! The body is raw bytes because multipart uploads carry binary file content.
//! All fields use owned types so values can cross FFI boundaries without
//! lifetime concerns.

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// An HTTP POST request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `content-type` header, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// An HTTP response described as plain data.
///
/// Constructed by the transport (or the host) after executing an
/// `HttpRequest`, then passed to `WebPConverterClient::parse_response`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
