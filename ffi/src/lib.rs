//! C-ABI wrapper around `webpconverter-core`.
//!
//! # Overview
//! Exposes request building, local validation and response parsing through
//! `extern "C"` functions so any language with a C FFI can talk to the WebP
//! Converter API with its own HTTP stack, without linking Rust's networking.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Build, validate and parse functions all return one `FfiResult`
//!   envelope with `FfiDataTag` + `void* data`.
//! - The C caller owns every returned pointer and must release it with
//!   `webp_free_result` / `webp_client_free`.

pub mod types;

use std::collections::BTreeMap;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{Map, Value};
use webpconverter_core::{ClientConfig, HttpResponse, Request, WebPConverterClient};

use types::*;

/// Borrow a C string as `&str`; null and invalid UTF-8 read as empty.
unsafe fn str_arg<'a>(s: *const c_char) -> &'a str {
    if s.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(s) }.to_str().unwrap_or("")
}

/// Parse a C string holding a JSON object.
unsafe fn json_object_arg(s: *const c_char, what: &str) -> Result<Map<String, Value>, *mut FfiResult> {
    let raw = unsafe { str_arg(s) };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FfiResult::invalid_arg(format!("{what} must be a JSON object"))),
        Err(e) => Err(FfiResult::invalid_arg(format!("{what} is not valid JSON: {e}"))),
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for the production endpoint.
///
/// Returns null if `api_key` is null. An empty key is accepted here and
/// reported as `MissingApiKey` by every build call.
/// The caller must free the returned pointer with `webp_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn webp_client_new(api_key: *const c_char) -> *mut FfiWebPClient {
    webp_client_new_with_base_url(api_key, std::ptr::null())
}

/// Create a client for a custom endpoint. A null `base_url` selects the
/// production endpoint.
#[unsafe(no_mangle)]
pub extern "C" fn webp_client_new_with_base_url(
    api_key: *const c_char,
    base_url: *const c_char,
) -> *mut FfiWebPClient {
    catch_unwind(|| {
        if api_key.is_null() {
            return std::ptr::null_mut();
        }
        let key = unsafe { str_arg(api_key) };
        let mut config = ClientConfig::default();
        if !base_url.is_null() {
            config = config.with_base_url(unsafe { str_arg(base_url) });
        }
        let client = WebPConverterClient::with_config(key, config);
        Box::into_raw(Box::new(FfiWebPClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `webp_client_new*`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn webp_client_free(client: *mut FfiWebPClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

/// Check the client's API key shape (letters, digits, hyphens; at least 32
/// characters without hyphens). Returns `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn webp_client_check_api_key(client: *const FfiWebPClient) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        match client.inner.check_api_key() {
            Ok(()) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in webp_client_check_api_key"))
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build a validated JSON request from typed parameters.
///
/// Negative `quality`, `max_width` or `max_height` leave that parameter
/// unset. Null strings read as empty and fail validation as missing.
/// Returns a result with `data_tag = Request` on success.
#[unsafe(no_mangle)]
pub extern "C" fn webp_build_execute(
    client: *const FfiWebPClient,
    image: *const c_char,
    output_format: *const c_char,
    quality: i32,
    max_width: i32,
    max_height: i32,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let request = Request {
            image: unsafe { str_arg(image) }.to_string(),
            output_format: unsafe { str_arg(output_format) }.to_string(),
            quality: u32::try_from(quality).ok(),
            max_width: u32::try_from(max_width).ok(),
            max_height: u32::try_from(max_height).ok(),
        };
        match client.inner.build_execute(&request) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in webp_build_execute"))
}

/// Build an unvalidated JSON request from a JSON object string.
#[unsafe(no_mangle)]
pub extern "C" fn webp_build_execute_raw(
    client: *const FfiWebPClient,
    params_json: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if params_json.is_null() {
            return FfiResult::null_arg("params_json");
        }
        let client = unsafe { &*client };
        let params = match unsafe { json_object_arg(params_json, "params_json") } {
            Ok(params) => params,
            Err(result) => return result,
        };
        match client.inner.build_execute_raw(&params) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in webp_build_execute_raw"))
}

/// Build a multipart upload of `data_len` bytes at `data`.
///
/// `fields_json` is an optional JSON object of extra form fields; non-string
/// values are sent in their JSON form.
#[unsafe(no_mangle)]
pub extern "C" fn webp_build_execute_with_bytes(
    client: *const FfiWebPClient,
    file_name: *const c_char,
    data: *const u8,
    data_len: usize,
    fields_json: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if file_name.is_null() {
            return FfiResult::null_arg("file_name");
        }
        if data.is_null() && data_len > 0 {
            return FfiResult::null_arg("data");
        }
        let client = unsafe { &*client };
        let bytes: &[u8] = if data_len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(data, data_len) }
        };
        let fields: BTreeMap<String, String> = if fields_json.is_null() {
            BTreeMap::new()
        } else {
            match unsafe { json_object_arg(fields_json, "fields_json") } {
                Ok(map) => map
                    .into_iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => (k, s),
                        other => (k, other.to_string()),
                    })
                    .collect(),
                Err(result) => return result,
            }
        };
        let name = unsafe { str_arg(file_name) };
        match client.inner.build_execute_with_bytes(name, bytes, &fields) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in webp_build_execute_with_bytes"))
}

/// Check a JSON object of parameters against the client-side rules without
/// building a request. Returns `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn webp_validate_params(params_json: *const c_char) -> *mut FfiResult {
    catch_unwind(|| {
        if params_json.is_null() {
            return FfiResult::null_arg("params_json");
        }
        let params = match unsafe { json_object_arg(params_json, "params_json") } {
            Ok(params) => params,
            Err(result) => return result,
        };
        match webpconverter_core::validate_params(&params) {
            Ok(()) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_error(e.into()),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in webp_validate_params"))
}

// ---------------------------------------------------------------------------
// Parse response function
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body reads
/// as an empty string.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body: unsafe { str_arg(resp.body) }.to_string(),
    }
}

/// Parse the reply to any built request.
///
/// Returns a result with `data_tag = Response` on success.
#[unsafe(no_mangle)]
pub extern "C" fn webp_parse_response(
    client: *const FfiWebPClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match client.inner.parse_response(ffi_response_to_core(resp)) {
            Ok(parsed) => FfiResult::ok_response(parsed),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in webp_parse_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by any `webp_build_*`, `webp_validate_params`
/// or `webp_parse_response` call. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn webp_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| unsafe { FfiResult::free(result) }));
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
