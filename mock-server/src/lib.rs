use std::{
    path::Path,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};
use uuid::Uuid;

pub const ENDPOINT: &str = "/v1/webpconverter";
pub const DEFAULT_API_KEY: &str = "test-api-key";
pub const OUTPUT_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];
pub const INPUT_FORMATS: &[&str] = &["webp", "png", "jpg", "jpeg", "gif"];
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const LINK_TTL_SECS: i64 = 3600;
// Room for an upload at the limit plus multipart framing.
const BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 64 * 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionData {
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

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub status: String,
    pub error: Option<String>,
    pub data: ConversionData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub error: String,
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub api_key: String,
    /// Artificial latency before each response.
    pub delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            delay: Duration::ZERO,
        }
    }
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    Router::new()
        .route(ENDPOINT, post(convert))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(Arc::new(config))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

/// Parameters gathered from either a JSON or a multipart body.
#[derive(Debug, Default)]
pub struct Submission {
    pub params: Map<String, Value>,
    pub upload: Option<Upload>,
}

#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub size: u64,
}

async fn convert(State(config): State<Arc<MockConfig>>, request: Request) -> Response {
    if !config.delay.is_zero() {
        tokio::time::sleep(config.delay).await;
    }

    let api_key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    if api_key != Some(config.api_key.as_str()) {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }

    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));
    let submission = if is_multipart {
        read_multipart(request).await
    } else {
        read_json(request).await
    };
    let submission = match submission {
        Ok(submission) => submission,
        Err(response) => return response,
    };

    if let Err(message) = check(&submission) {
        debug!(%message, "rejected conversion");
        return error(StatusCode::BAD_REQUEST, &message);
    }

    let data = conversion_for(&submission);
    info!(id = %data.id, output_format = %data.output_format, "converted image");
    let body = ConversionResponse {
        status: "ok".to_string(),
        error: None,
        data,
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn read_json(request: Request) -> Result<Submission, Response> {
    let Json(value) = Json::<Value>::from_request(request, &())
        .await
        .map_err(|rejection| error(rejection.status(), &rejection.body_text()))?;
    match value {
        Value::Object(params) => Ok(Submission {
            params,
            upload: None,
        }),
        _ => Err(error(
            StatusCode::BAD_REQUEST,
            "Request body must be a JSON object",
        )),
    }
}

async fn read_multipart(request: Request) -> Result<Submission, Response> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| error(rejection.status(), &rejection.body_text()))?;

    let mut submission = Submission::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(e.status(), &e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) if name == "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| error(e.status(), &e.body_text()))?;
                submission.upload = Some(Upload {
                    file_name,
                    size: bytes.len() as u64,
                });
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| error(e.status(), &e.body_text()))?;
                submission.params.insert(name, Value::String(text));
            }
        }
    }
    Ok(submission)
}

/// Apply the endpoint's parameter rules.
pub fn check(submission: &Submission) -> Result<(), String> {
    match &submission.upload {
        Some(upload) => {
            let format = extension(&upload.file_name);
            if !INPUT_FORMATS.contains(&format.as_str()) {
                return Err(format!("Unsupported input format: {}", upload.file_name));
            }
            if upload.size > MAX_UPLOAD_BYTES {
                return Err("File exceeds the 10MB limit".to_string());
            }
        }
        None => {
            let image = submission.params.get("image").and_then(Value::as_str);
            if image.is_none_or(str::is_empty) {
                return Err("Required parameter [image] is missing".to_string());
            }
        }
    }

    let output_format = submission
        .params
        .get("outputFormat")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if output_format.is_empty() {
        return Err("Required parameter [outputFormat] is missing".to_string());
    }
    if !OUTPUT_FORMATS.contains(&output_format.to_ascii_lowercase().as_str()) {
        return Err(format!("Unsupported output format: {output_format}"));
    }

    for (name, min, max) in [("quality", 1, 100), ("maxWidth", 1, 10_000), ("maxHeight", 1, 10_000)] {
        match number_param(&submission.params, name) {
            Ok(Some(n)) if n < min || n > max => {
                return Err(format!("Parameter [{name}] must be between {min} and {max}"));
            }
            Ok(_) => {}
            Err(()) => return Err(format!("Parameter [{name}] must be a valid integer")),
        }
    }
    Ok(())
}

fn number_param(params: &Map<String, Value>, name: &str) -> Result<Option<i64>, ()> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or(()),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| ()),
        Some(_) => Err(()),
    }
}

fn conversion_for(submission: &Submission) -> ConversionData {
    let (input_format, input_size) = match &submission.upload {
        Some(upload) => (extension(&upload.file_name), upload.size),
        None => {
            let image = submission
                .params
                .get("image")
                .and_then(Value::as_str)
                .unwrap_or_default();
            (extension(image), image.len() as u64)
        }
    };
    let output_format = submission
        .params
        .get("outputFormat")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let quality = number_param(&submission.params, "quality")
        .ok()
        .flatten()
        .unwrap_or(80) as u64;
    let id = Uuid::new_v4().to_string();
    let expires = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
        + LINK_TTL_SECS;

    ConversionData {
        download_url: format!("https://storage.example.com/converted/{id}.{output_format}"),
        mime_type: mime_type(&output_format).to_string(),
        id,
        input_format,
        output_format,
        input_size,
        output_size: (input_size * quality / 100).max(1),
        expires,
    }
}

fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

fn mime_type(format: &str) -> &'static str {
    match format {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        status: "error".to_string(),
        error: message.to_string(),
    };
    (status, Json(body)).into_response()
}
