//! Blocking execution of `HttpRequest` values over `ureq`.
//!
//! The agent is configured with `http_status_as_error(false)` so 4xx/5xx
//! responses come back as data and the client decides how to interpret them.

use std::time::Duration;

use ureq::Agent;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

pub(crate) fn agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

/// POST `request` and read the whole response body, decoding it lossily.
pub(crate) fn send(agent: &Agent, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let mut builder = agent.post(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let mut response = builder
        .send(&request.body[..])
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    // Bodies that are not UTF-8 (proxy error pages) still reach the caller
    // with their status.
    let body = response
        .body_mut()
        .read_to_vec()
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    let body = String::from_utf8_lossy(&body).into_owned();

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
