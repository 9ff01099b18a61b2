//! `multipart/form-data` encoding for file uploads.

use std::path::Path;

use uuid::Uuid;

use crate::error::ApiError;

/// Largest upload the endpoint accepts.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Extensions the endpoint accepts as input images.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["webp", "png", "jpg", "jpeg", "gif"];

/// Content type for a file name, guessed from its extension.
pub fn mime_for(file_name: &str) -> &'static str {
    match extension_of(file_name).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Reject uploads the server would refuse anyway.
pub fn check_upload(file_name: &str, len: usize) -> Result<(), ApiError> {
    let accepted = extension_of(file_name)
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()));
    if !accepted {
        return Err(ApiError::InvalidFile(format!(
            "{file_name}: accepted file types are .{}",
            ACCEPTED_EXTENSIONS.join(", .")
        )));
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(ApiError::InvalidFile(format!(
            "{file_name}: {len} bytes exceeds the 10MB upload limit"
        )));
    }
    Ok(())
}

/// Incrementally written multipart body.
#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("----{}", Uuid::new_v4()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `content-type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.open_part();
        self.push(&format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape(name)));
        self.push(value);
        self.push("\r\n");
        self
    }

    pub fn file(&mut self, name: &str, file_name: &str, data: &[u8]) -> &mut Self {
        self.open_part();
        self.push(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape(name),
            escape(file_name)
        ));
        self.push(&format!("Content-Type: {}\r\n\r\n", mime_for(file_name)));
        self.body.extend_from_slice(data);
        self.push("\r\n");
        self
    }

    /// Close the body and hand back `(content_type, bytes)`.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        let closing = format!("--{}--\r\n", self.boundary);
        self.push(&closing);
        (self.content_type(), self.body)
    }

    fn open_part(&mut self) {
        let delimiter = format!("--{}\r\n", self.boundary);
        self.push(&delimiter);
    }

    fn push(&mut self, s: &str) {
        self.body.extend_from_slice(s.as_bytes());
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace(['\r', '\n'], " ")
}
