//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion and release helpers
//! live here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use webpconverter_core::{ApiError, HttpRequest, Response, WebPConverterClient};

/// Opaque handle to a `WebPConverterClient`. C callers receive a pointer to
/// this and pass it back into every FFI function.
pub struct FfiWebPClient {
    pub(crate) inner: WebPConverterClient,
}

/// Move `s` into a heap C string. Interior NUL bytes are dropped.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|e| {
            let mut bytes = e.into_vec();
            bytes.retain(|b| *b != 0);
            CString::new(bytes).unwrap_or_default()
        })
        .into_raw()
}

/// Release a string produced by `into_c_string`. Null is ignored.
pub(crate) unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Request output
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP POST request described as C-compatible plain data.
///
/// The C caller sends `body_len` bytes from `body` to `url` with every
/// header attached, then passes the reply back through `webp_parse_response`.
/// `body` is null when `body_len` is 0.
#[repr(C)]
pub struct FfiHttpRequest {
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiHttpRequest {
    fn from_core(req: HttpRequest) -> Box<Self> {
        let headers: Box<[FfiHeader]> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: into_c_string(k),
                value: into_c_string(v),
            })
            .collect();
        let headers_len = headers.len() as u32;
        let headers = if headers.is_empty() {
            std::ptr::null_mut()
        } else {
            Box::into_raw(headers) as *mut FfiHeader
        };

        let body_len = req.body.len();
        let body = if body_len == 0 {
            std::ptr::null_mut()
        } else {
            Box::into_raw(req.body.into_boxed_slice()) as *mut u8
        };

        Box::new(FfiHttpRequest {
            url: into_c_string(req.url),
            headers,
            headers_len,
            body,
            body_len,
        })
    }

    /// Release every allocation owned by this request.
    unsafe fn free_fields(&self) {
        unsafe {
            free_c_string(self.url);
            if !self.headers.is_null() {
                let headers = Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    self.headers,
                    self.headers_len as usize,
                ));
                for h in headers.iter() {
                    free_c_string(h.key);
                    free_c_string(h.value);
                }
            }
            if !self.body.is_null() {
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    self.body,
                    self.body_len,
                )));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing the request,
/// then passes a pointer to `webp_parse_response`. The FFI layer reads but
/// does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    MissingApiKey = 1,
    Validation = 2,
    InvalidFile = 3,
    File = 4,
    Transport = 5,
    Api = 6,
    Http = 7,
    Deserialization = 8,
    Serialization = 9,
    InvalidArg = 10,
    NullArg = 11,
    Panic = 12,
    InvalidApiKey = 13,
}

/// Tag that tells `webp_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Request = 1,
    Response = 2,
}

/// A decoded conversion response exposed to C.
#[repr(C)]
pub struct FfiResponse {
    pub status: *mut c_char,
    pub id: *mut c_char,
    pub input_format: *mut c_char,
    pub output_format: *mut c_char,
    pub input_size: u64,
    pub output_size: u64,
    pub mime_type: *mut c_char,
    pub expires: i64,
    pub download_url: *mut c_char,
}

impl FfiResponse {
    fn from_core(resp: Response) -> Box<Self> {
        let data = resp.data;
        Box::new(FfiResponse {
            status: into_c_string(resp.status),
            id: into_c_string(data.id),
            input_format: into_c_string(data.input_format),
            output_format: into_c_string(data.output_format),
            input_size: data.input_size,
            output_size: data.output_size,
            mime_type: into_c_string(data.mime_type),
            expires: data.expires,
            download_url: into_c_string(data.download_url),
        })
    }

    unsafe fn free_fields(&self) {
        unsafe {
            free_c_string(self.status);
            free_c_string(self.id);
            free_c_string(self.input_format);
            free_c_string(self.output_format);
            free_c_string(self.mime_type);
            free_c_string(self.download_url);
        }
    }
}

/// Result envelope for every build, validate and parse operation.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload tagged by `data_tag` (or is null for `None`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null. For `Api` and `Http` errors
/// `http_status` carries the server's status code.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn error(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: into_c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Success carrying an `FfiHttpRequest`.
    pub(crate) fn ok_request(req: HttpRequest) -> *mut Self {
        let data = Box::into_raw(FfiHttpRequest::from_core(req)) as *mut c_void;
        Self::ok(FfiDataTag::Request, data)
    }

    /// Success carrying an `FfiResponse`.
    pub(crate) fn ok_response(resp: Response) -> *mut Self {
        let data = Box::into_raw(FfiResponse::from_core(resp)) as *mut c_void;
        Self::ok(FfiDataTag::Response, data)
    }

    /// Success with no payload (e.g. validation passed).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(FfiDataTag::None, std::ptr::null_mut())
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (code, status) = match &err {
            ApiError::MissingApiKey => (FfiErrorCode::MissingApiKey, 0),
            ApiError::InvalidApiKey(_) => (FfiErrorCode::InvalidApiKey, 0),
            ApiError::Validation(_) => (FfiErrorCode::Validation, 0),
            ApiError::InvalidFile(_) => (FfiErrorCode::InvalidFile, 0),
            ApiError::File { .. } => (FfiErrorCode::File, 0),
            ApiError::Transport(_) => (FfiErrorCode::Transport, 0),
            ApiError::Api { status, .. } => (FfiErrorCode::Api, *status),
            ApiError::HttpError { status, .. } => (FfiErrorCode::Http, *status),
            ApiError::Deserialization(_) => (FfiErrorCode::Deserialization, 0),
            ApiError::Serialization(_) => (FfiErrorCode::Serialization, 0),
        };
        Self::error(code, status, err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(msg: String) -> *mut Self {
        Self::error(FfiErrorCode::InvalidArg, 0, msg)
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, 0, msg.to_string())
    }

    /// Release the envelope, its message and its tagged payload.
    pub(crate) unsafe fn free(ptr: *mut Self) {
        let result = unsafe { Box::from_raw(ptr) };
        unsafe { free_c_string(result.error_message) };
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Request => {
                let req = unsafe { Box::from_raw(result.data as *mut FfiHttpRequest) };
                unsafe { req.free_fields() };
            }
            FfiDataTag::Response => {
                let resp = unsafe { Box::from_raw(result.data as *mut FfiResponse) };
                unsafe { resp.free_fields() };
            }
            FfiDataTag::None => {}
        }
    }
}
