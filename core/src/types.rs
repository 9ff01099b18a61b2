//! Request and response DTOs for the WebP Converter API.
//!
//! # Design
//! These types mirror the endpoint's JSON schema but are defined
//! independently from the mock-server crate; integration tests catch any
//! schema drift. Response types default every missing field so a sparse
//! server payload still decodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::validation::{self, FieldValue, ValidationError};

/// Parameters for one conversion.
///
/// - `image` (required): the image to convert (WebP, PNG, JPG or GIF).
/// - `output_format` (required): target format.
/// - `quality`: output quality for jpg/webp, 1-100.
/// - `max_width` / `max_height`: bounding box in pixels, 1-10000; the
///   aspect ratio is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub image: String,
    pub output_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

impl Request {
    pub fn new(image: impl Into<String>, output_format: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            output_format: output_format.into(),
            ..Self::default()
        }
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn with_max_height(mut self, max_height: u32) -> Self {
        self.max_height = Some(max_height);
        self
    }

    /// Every parameter under its JSON name, in declaration order.
    pub fn fields(&self) -> [(&'static str, FieldValue<'_>); 5] {
        [
            ("image", FieldValue::text(&self.image)),
            ("outputFormat", FieldValue::text(&self.output_format)),
            ("quality", FieldValue::number(self.quality)),
            ("maxWidth", FieldValue::number(self.max_width)),
            ("maxHeight", FieldValue::number(self.max_height)),
        ]
    }

    /// Check all parameters locally, reporting every violation at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_fields(self.fields())
    }

    /// Parameters as string pairs keyed by JSON name. Unset, empty and zero
    /// values are left out.
    pub fn to_query_params(&self) -> BTreeMap<String, String> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| !value.is_zero())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}

/// Body of a successful (or at least 2xx) API response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Response {
    pub status: String,
    pub error: Option<serde_json::Value>,
    pub data: ResponseData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

/// Metadata about the converted file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseData {
    pub id: String,
    pub input_format: String,
    pub output_format: String,
    pub input_size: u64,
    pub output_size: u64,
    pub mime_type: String,
    pub expires: i64,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
}

/// Body of a non-2xx API response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}
