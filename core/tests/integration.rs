//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client call
//! variant over real HTTP through the blocking `execute*` methods. Validates
//! that request building, transport and response parsing agree with the
//! server's schema.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use mock_server::{MockConfig, DEFAULT_API_KEY, ENDPOINT};
use serde_json::json;
use webpconverter_core::{ApiError, ClientConfig, Request, WebPConverterClient};

/// Run the mock server on its own runtime thread and return its address.
fn start_server(config: MockConfig) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, config).await
        })
        .unwrap();
    });

    addr
}

/// Accept one connection, drain the request and answer with `response` bytes.
fn respond_once(response: Vec<u8>) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        stream.write_all(&response).unwrap();
    });

    addr
}

fn client_for(addr: SocketAddr, api_key: &str) -> WebPConverterClient {
    let config = ClientConfig::default()
        .with_base_url(&format!("http://{addr}{ENDPOINT}"))
        .with_timeout(Duration::from_secs(5));
    WebPConverterClient::with_config(api_key, config)
}

#[test]
fn typed_execute_round_trip() {
    let addr = start_server(MockConfig::default());
    let client = client_for(addr, DEFAULT_API_KEY);

    let request = Request::new("https://example.com/images/cat.webp", "png")
        .with_quality(90)
        .with_max_width(1920)
        .with_max_height(1080);
    let response = client.execute(&request).unwrap();

    assert_eq!(response.status, "ok");
    assert!(response.error.is_none());
    assert_eq!(response.data.input_format, "webp");
    assert_eq!(response.data.output_format, "png");
    assert_eq!(response.data.mime_type, "image/png");
    assert!(!response.data.id.is_empty());
    assert!(response.data.expires > 0);
    assert!(response.data.download_url.ends_with(".png"));
}

#[test]
fn raw_execute_surfaces_server_validation_verbatim() {
    let addr = start_server(MockConfig::default());
    let client = client_for(addr, DEFAULT_API_KEY);

    let params = json!({"image": "https://example.com/cat.webp", "outputFormat": "bmp"});
    let err = client.execute_raw(params.as_object().unwrap()).unwrap_err();

    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Unsupported output format: bmp");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[test]
fn raw_execute_skips_client_validation() {
    let addr = start_server(MockConfig::default());
    let client = client_for(addr, DEFAULT_API_KEY);

    // quality 0 would fail locally on the typed path; here the server decides.
    let params = json!({"image": "cat.webp", "outputFormat": "jpg", "quality": 0});
    let err = client.execute_raw(params.as_object().unwrap()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "API error: Parameter [quality] must be between 1 and 100"
    );
}

#[test]
fn wrong_api_key_is_reported_by_server() {
    let addr = start_server(MockConfig::default());
    let client = client_for(addr, "not-the-key");

    let err = client.execute(&Request::new("cat.webp", "png")).unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 401, ref message } if message == "Invalid API key"));
}

#[test]
fn typed_validation_fails_before_network() {
    // Nothing listens here; reaching the network would be a transport error.
    let client = client_for("127.0.0.1:9".parse().unwrap(), DEFAULT_API_KEY);

    let err = client
        .execute(&Request::new("", "png").with_quality(0))
        .unwrap_err();
    match err {
        ApiError::Validation(v) => assert_eq!(
            v.errors,
            vec![
                "Required parameter [image] is missing",
                "Parameter [quality] must be at least 1",
            ]
        ),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn empty_api_key_fails_before_network() {
    let client = client_for("127.0.0.1:9".parse().unwrap(), "");

    let err = client.execute_raw(&serde_json::Map::new()).unwrap_err();
    assert!(matches!(err, ApiError::MissingApiKey));
}

#[test]
fn file_upload_round_trip() {
    let addr = start_server(MockConfig::default());
    let client = client_for(addr, DEFAULT_API_KEY);

    let path = std::env::temp_dir().join(format!("upload-{}.webp", uuid::Uuid::new_v4()));
    std::fs::write(&path, vec![7u8; 2048]).unwrap();

    let request = Request::new("ignored-for-uploads", "jpg").with_quality(50);
    let result = client.execute_with_file(&path, &request.to_query_params());
    std::fs::remove_file(&path).unwrap();

    let response = result.unwrap();
    assert_eq!(response.data.input_format, "webp");
    assert_eq!(response.data.output_format, "jpg");
    assert_eq!(response.data.input_size, 2048);
    assert_eq!(response.data.output_size, 1024);
    assert_eq!(response.data.mime_type, "image/jpeg");
}

#[test]
fn in_memory_upload_round_trip() {
    let addr = start_server(MockConfig::default());
    let client = client_for(addr, DEFAULT_API_KEY);

    let mut fields = BTreeMap::new();
    fields.insert("outputFormat".to_string(), "gif".to_string());
    let response = client
        .execute_with_bytes("frame.PNG", &[0u8; 300], &fields)
        .unwrap();
    assert_eq!(response.data.input_format, "png");
    assert_eq!(response.data.output_format, "gif");
    assert_eq!(response.data.input_size, 300);
}

#[test]
fn upload_missing_output_format_is_rejected_by_server() {
    let addr = start_server(MockConfig::default());
    let client = client_for(addr, DEFAULT_API_KEY);

    let err = client
        .execute_with_bytes("frame.gif", b"GIF89a", &BTreeMap::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "API error: Required parameter [outputFormat] is missing"
    );
}

#[test]
fn slow_server_hits_client_timeout() {
    let addr = start_server(MockConfig {
        delay: Duration::from_secs(3),
        ..MockConfig::default()
    });
    let mut client = client_for(addr, DEFAULT_API_KEY);
    client.set_timeout(Duration::from_millis(200));

    let err = client.execute(&Request::new("cat.webp", "png")).unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
}

#[test]
fn unreachable_server_is_transport_error() {
    let client = client_for("127.0.0.1:9".parse().unwrap(), DEFAULT_API_KEY);

    let err = client.execute(&Request::new("cat.webp", "png")).unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
}

#[test]
fn non_utf8_error_body_keeps_status() {
    let body: &[u8] = b"\xff\xfe\x00bad gateway";
    let mut response = format!(
        "HTTP/1.1 502 Bad Gateway\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    let addr = respond_once(response);
    let client = client_for(addr, DEFAULT_API_KEY);

    let err = client.execute(&Request::new("cat.webp", "png")).unwrap_err();
    assert_eq!(err.status(), Some(502));
    match err {
        ApiError::HttpError { status, body } => {
            assert_eq!(status, 502);
            assert!(body.ends_with("bad gateway"), "body = {body:?}");
        }
        other => panic!("expected HttpError, got {other:?}"),
    }
}
