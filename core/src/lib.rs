//! Synchronous client for the WebP Converter API.
//!
//! # Overview
//! One endpoint, one POST per call: a typed `Request` (validated locally), a
//! raw JSON map, or a multipart file upload goes out with the `x-api-key`
//! header, and the JSON reply comes back as a `Response` or an `ApiError`.
//!
//! ```no_run
//! use webpconverter_core::{Request, WebPConverterClient};
//!
//! let client = WebPConverterClient::new("your-api-key");
//! let request = Request::new("https://example.com/cat.webp", "png").with_quality(90);
//! let response = client.execute(&request)?;
//! println!("{}", response.data.download_url);
//! # Ok::<(), webpconverter_core::ApiError>(())
//! ```
//!
//! # Design
//! - Each call is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_response` (consumes an `HttpResponse`); `execute*` runs the
//!   round trip over `ureq`. Hosts doing their own I/O use the halves.
//! - Validation accumulates every violation before failing.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
mod transport;
pub mod types;
pub mod validation;

pub use client::WebPConverterClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse};
pub use multipart::MultipartForm;
pub use types::{ErrorResponse, Request, Response, ResponseData};
pub use validation::{validate_params, ValidationError, ValidationRule};
