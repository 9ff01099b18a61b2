//! Request builder, response parser and blocking executor for the WebP
//! Converter endpoint.
//!
//! # Design
//! Every call variant is split into a `build_*` method that produces an
//! `HttpRequest` and `parse_response`, which consumes an `HttpResponse`. The
//! `execute*` methods glue the two together over `transport`; hosts that do
//! their own I/O (the FFI crate) use the halves directly.
//!
//! The API key is checked on every call rather than at construction, so a
//! client built with an empty key fails each call before touching the
//! network.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use ureq::Agent;

use crate::config::{self, ClientConfig};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, API_KEY_HEADER};
use crate::multipart::{self, MultipartForm};
use crate::transport;
use crate::types::{ErrorResponse, Request, Response};

/// Form field carrying the uploaded file.
pub const IMAGE_FIELD: &str = "image";

/// Shortest key accepted by `check_api_key`, not counting hyphens.
const MIN_API_KEY_CHARS: usize = 32;

/// Synchronous client for the WebP Converter API.
///
/// Holds only immutable configuration and a `ureq::Agent`; cloning is cheap
/// and clones may be used from several threads.
#[derive(Clone)]
pub struct WebPConverterClient {
    api_key: String,
    config: ClientConfig,
    agent: Agent,
}

impl fmt::Debug for WebPConverterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebPConverterClient")
            .field("api_key", &"<redacted>")
            .field("config", &self.config)
            .finish()
    }
}

impl WebPConverterClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_config(api_key, ClientConfig::default())
    }

    pub fn with_config(api_key: &str, config: ClientConfig) -> Self {
        let agent = transport::agent(config.timeout);
        Self {
            api_key: api_key.to_string(),
            config,
            agent,
        }
    }

    /// Key from `APIVERVE_API_KEY`, endpoint and timeout from
    /// `ClientConfig::from_env`.
    pub fn from_env() -> Self {
        Self::with_config(&config::api_key_from_env(), ClientConfig::from_env())
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
        self.agent = transport::agent(timeout);
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    // -----------------------------------------------------------------------
    // Blocking calls
    // -----------------------------------------------------------------------

    /// Validate `request` and send it as a JSON body.
    ///
    /// Validation failures are returned without making a network request.
    pub fn execute(&self, request: &Request) -> Result<Response, ApiError> {
        let http = self.build_execute(request)?;
        self.dispatch(http)
    }

    /// Send an arbitrary parameter map as a JSON body, unvalidated.
    pub fn execute_raw(&self, params: &Map<String, Value>) -> Result<Response, ApiError> {
        let http = self.build_execute_raw(params)?;
        self.dispatch(http)
    }

    /// Upload the file at `path` as the `image` part, with `fields` as extra
    /// form fields. Accepted types: .webp, .png, .jpg, .jpeg, .gif; 10MB max.
    pub fn execute_with_file(
        &self,
        path: &Path,
        fields: &BTreeMap<String, String>,
    ) -> Result<Response, ApiError> {
        let http = self.build_execute_with_file(path, fields)?;
        self.dispatch(http)
    }

    /// Like `execute_with_file`, for content already in memory.
    pub fn execute_with_bytes(
        &self,
        file_name: &str,
        data: &[u8],
        fields: &BTreeMap<String, String>,
    ) -> Result<Response, ApiError> {
        let http = self.build_execute_with_bytes(file_name, data, fields)?;
        self.dispatch(http)
    }

    fn dispatch(&self, request: HttpRequest) -> Result<Response, ApiError> {
        debug!(url = %request.url, bytes = request.body.len(), "sending conversion request");
        let response = transport::send(&self.agent, request)
            .inspect_err(|e| warn!(error = %e, "conversion request failed"))?;
        debug!(status = response.status, "received conversion response");
        self.parse_response(response)
            .inspect_err(|e| warn!(status = ?e.status(), error = %e, "conversion rejected"))
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    pub fn build_execute(&self, request: &Request) -> Result<HttpRequest, ApiError> {
        self.require_api_key()?;
        request.validate()?;
        self.json_request(request)
    }

    pub fn build_execute_raw(&self, params: &Map<String, Value>) -> Result<HttpRequest, ApiError> {
        self.require_api_key()?;
        self.json_request(params)
    }

    pub fn build_execute_with_file(
        &self,
        path: &Path,
        fields: &BTreeMap<String, String>,
    ) -> Result<HttpRequest, ApiError> {
        self.require_api_key()?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let file_error = |source| ApiError::File {
            path: path.to_path_buf(),
            source,
        };
        let len = fs::metadata(path).map_err(file_error)?.len();
        multipart::check_upload(file_name, usize::try_from(len).unwrap_or(usize::MAX))?;
        let data = fs::read(path).map_err(file_error)?;
        self.build_execute_with_bytes(file_name, &data, fields)
    }

    pub fn build_execute_with_bytes(
        &self,
        file_name: &str,
        data: &[u8],
        fields: &BTreeMap<String, String>,
    ) -> Result<HttpRequest, ApiError> {
        self.require_api_key()?;
        multipart::check_upload(file_name, data.len())?;

        let mut form = MultipartForm::new();
        for (name, value) in fields.iter().filter(|(name, _)| *name != IMAGE_FIELD) {
            form.text(name, value);
        }
        form.file(IMAGE_FIELD, file_name, data);
        let (content_type, body) = form.finish();

        Ok(HttpRequest {
            url: self.config.base_url.clone(),
            headers: vec![
                (API_KEY_HEADER.to_string(), self.api_key.clone()),
                ("content-type".to_string(), content_type),
            ],
            body,
        })
    }

    fn json_request<T: Serialize + ?Sized>(&self, payload: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            url: self.config.base_url.clone(),
            headers: vec![
                (API_KEY_HEADER.to_string(), self.api_key.clone()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body,
        })
    }

    /// Check the key's shape: ASCII letters, digits and hyphens, with at
    /// least 32 characters once hyphens are removed. Calls run this only when
    /// `ClientConfig::strict_api_key` is set.
    pub fn check_api_key(&self) -> Result<(), ApiError> {
        if self.api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        if !self
            .api_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ApiError::InvalidApiKey(
                "Invalid API key format. API key must be alphanumeric and may contain hyphens",
            ));
        }
        if self.api_key.chars().filter(|c| *c != '-').count() < MIN_API_KEY_CHARS {
            return Err(ApiError::InvalidApiKey(
                "Invalid API key. API key appears to be too short",
            ));
        }
        Ok(())
    }

    fn require_api_key(&self) -> Result<(), ApiError> {
        if self.config.strict_api_key {
            return self.check_api_key();
        }
        if self.api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    /// Decode a 2xx body into `Response`; map anything else to an error,
    /// keeping the server's message verbatim when the body carries one.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Response, ApiError> {
        if response.is_success() {
            return serde_json::from_str(&response.body)
                .map_err(|e| ApiError::Deserialization(e.to_string()));
        }
        match serde_json::from_str::<ErrorResponse>(&response.body) {
            Ok(error) if !error.error.is_empty() => Err(ApiError::Api {
                status: response.status,
                message: error.error,
            }),
            _ => Err(ApiError::HttpError {
                status: response.status,
                body: response.body,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE_URL: &str = "http://localhost:3000/v1/webpconverter";

    fn client() -> WebPConverterClient {
        WebPConverterClient::with_config("test-key", ClientConfig::default().with_base_url(BASE_URL))
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_execute_produces_json_post() {
        let request = Request::new("https://example.com/cat.webp", "png").with_quality(90);
        let req = client().build_execute(&request).unwrap();
        assert_eq!(req.url, BASE_URL);
        assert_eq!(req.header("x-api-key"), Some("test-key"));
        assert_eq!(req.content_type(), Some("application/json"));
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body, json!({"image": "https://example.com/cat.webp", "outputFormat": "png", "quality": 90}));
    }

    #[test]
    fn build_execute_rejects_invalid_request() {
        let request = Request::new("", "png").with_quality(101);
        let err = client().build_execute(&request).unwrap_err();
        match err {
            ApiError::Validation(v) => assert_eq!(
                v.errors,
                vec![
                    "Required parameter [image] is missing",
                    "Parameter [quality] must be at most 100",
                ]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_api_key_fails_every_variant() {
        let client = WebPConverterClient::with_config("", ClientConfig::default().with_base_url("http://127.0.0.1:9"));
        let request = Request::new("cat.webp", "png");
        assert!(matches!(client.execute(&request), Err(ApiError::MissingApiKey)));
        assert!(matches!(client.execute_raw(&Map::new()), Err(ApiError::MissingApiKey)));
        assert!(matches!(
            client.execute_with_bytes("cat.webp", b"RIFF", &BTreeMap::new()),
            Err(ApiError::MissingApiKey)
        ));
        assert!(matches!(
            client.execute_with_file(Path::new("/nonexistent/cat.webp"), &BTreeMap::new()),
            Err(ApiError::MissingApiKey)
        ));
    }

    #[test]
    fn missing_key_is_reported_before_validation() {
        let client = WebPConverterClient::new("   ");
        let err = client.build_execute(&Request::default()).unwrap_err();
        assert!(matches!(err, ApiError::MissingApiKey));
    }

    #[test]
    fn build_execute_raw_sends_map_unvalidated() {
        let params = json!({"outputFormat": "gif", "quality": 500});
        let req = client().build_execute_raw(params.as_object().unwrap()).unwrap();
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body, params);
    }

    #[test]
    fn build_execute_with_bytes_produces_multipart() {
        let mut fields = BTreeMap::new();
        fields.insert("outputFormat".to_string(), "png".to_string());
        fields.insert("image".to_string(), "ignored".to_string());
        let req = client()
            .build_execute_with_bytes("cat.webp", b"RIFF....WEBP", &fields)
            .unwrap();
        let content_type = req.content_type().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary=----"));
        let body = String::from_utf8(req.body.clone()).unwrap();
        assert!(body.contains("name=\"outputFormat\"\r\n\r\npng\r\n"));
        assert!(body.contains("name=\"image\"; filename=\"cat.webp\"\r\nContent-Type: image/webp\r\n\r\nRIFF....WEBP\r\n"));
        assert!(!body.contains("ignored"));
    }

    #[test]
    fn build_execute_with_file_reports_missing_file() {
        let err = client()
            .build_execute_with_file(Path::new("/nonexistent/cat.webp"), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::File { .. }));
    }

    #[test]
    fn build_execute_with_bytes_rejects_unsupported_type() {
        let err = client()
            .build_execute_with_bytes("notes.txt", b"hello", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidFile(_)));
    }

    #[test]
    fn parse_response_success() {
        let body = r#"{"status":"ok","error":null,"data":{"id":"x1","inputFormat":"webp","outputFormat":"png","inputSize":10,"outputSize":20,"mimeType":"image/png","expires":1700000000,"downloadURL":"https://dl.example.com/x1.png"}}"#;
        let resp = client().parse_response(response(200, body)).unwrap();
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.data.id, "x1");
        assert_eq!(resp.data.mime_type, "image/png");
    }

    #[test]
    fn parse_response_surfaces_error_message_verbatim() {
        for status in [400, 401, 500, 503] {
            let body = r#"{"status":"error","error":"Image could not be decoded: truncated header"}"#;
            let err = client().parse_response(response(status, body)).unwrap_err();
            match err {
                ApiError::Api { status: s, message } => {
                    assert_eq!(s, status);
                    assert_eq!(message, "Image could not be decoded: truncated header");
                }
                other => panic!("expected Api error, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_response_undecodable_error_body() {
        let err = client()
            .parse_response(response(502, "<html>Bad Gateway</html>"))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 502, .. }));
        assert_eq!(err.to_string(), "API error: status 502");
    }

    #[test]
    fn parse_response_bad_json() {
        let err = client().parse_response(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn set_timeout_updates_config() {
        let mut client = client();
        client.set_timeout(Duration::from_secs(5));
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.base_url(), BASE_URL);
    }

    #[test]
    fn debug_output_hides_api_key() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn key_shape_check_is_opt_in() {
        let request = Request::new("https://example.com/cat.webp", "png");
        assert!(client().build_execute(&request).is_ok());

        let strict = |key: &str| {
            WebPConverterClient::with_config(
                key,
                ClientConfig::default()
                    .with_base_url(BASE_URL)
                    .with_strict_api_key(true),
            )
        };

        let err = strict("test-key").build_execute(&request).unwrap_err();
        assert_eq!(err.to_string(), "Invalid API key. API key appears to be too short");

        let err = strict("key with spaces and more than thirty two chars")
            .build_execute_raw(&Map::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid API key format. API key must be alphanumeric and may contain hyphens"
        );

        assert!(matches!(strict("").check_api_key(), Err(ApiError::MissingApiKey)));

        let guid = "3f2c9a4e-8b1d-4c7a-9e2f-5d6b7a8c9d0e";
        assert!(strict(guid).check_api_key().is_ok());
        assert!(strict(guid).build_execute(&request).is_ok());
    }
}
