//! Tests for proxy upstream request handling

use console_bff::http::request::{Method, RequestBuilder};
use console_bff::proxy::upstream::{BodyFraming, ProxyHandler, parse_response_head};
use std::time::Duration;

fn handler(backend: &str) -> ProxyHandler {
    ProxyHandler::new(
        url::Url::parse(backend).unwrap(),
        Duration::from_secs(5),
        Duration::from_secs(30),
    )
}

#[test]
fn test_build_http_request() {
    let request = RequestBuilder::new()
        .method(Method::GET)
        .target("/api/public/providers")
        .header("User-Agent", "Test")
        .header("auth-token", "bk-tok")
        .build()
        .unwrap();

    let request_bytes = handler("http://localhost:7071").build_http_request(&request);
    let request_str = String::from_utf8_lossy(&request_bytes);

    assert!(request_str.starts_with("GET /api/public/providers HTTP/1.1\r\n"));
    assert!(request_str.contains("Host: localhost:7071\r\n"));
    assert!(request_str.contains("User-Agent: Test\r\n"));
    assert!(request_str.contains("auth-token: bk-tok\r\n"));
    assert!(request_str.contains("Connection: close\r\n"));
    assert!(!request_str.contains("Content-Length"));
}

#[test]
fn test_build_http_request_replaces_host_and_sets_body_length() {
    let request = RequestBuilder::new()
        .method(Method::POST)
        .target("/api/public/domains")
        .header("host", "console.example.com")
        .header("Content-Type", "application/json")
        .header("Content-Length", "13")
        .body(br#"{"d":"a.com"}"#.to_vec())
        .build()
        .unwrap();

    let request_bytes = handler("http://10.0.0.5:8080").build_http_request(&request);
    let request_str = String::from_utf8_lossy(&request_bytes);

    assert!(request_str.starts_with("POST /api/public/domains HTTP/1.1\r\n"));
    assert!(request_str.contains("Host: 10.0.0.5:8080\r\n"));
    assert!(!request_str.contains("console.example.com"));
    assert!(request_str.contains("Content-Length: 13\r\n"));
    assert!(request_str.ends_with("\r\n\r\n{\"d\":\"a.com\"}"));
}

#[test]
fn test_build_http_request_removes_hop_by_hop_headers() {
    let request = RequestBuilder::new()
        .method(Method::GET)
        .target("/")
        .header("Connection", "keep-alive, X-Session-Hint")
        .header("X-Session-Hint", "drop-me")
        .header("Upgrade", "websocket")
        .header("Keep-Alive", "timeout=5")
        .header("Expect", "100-continue")
        .header("User-Agent", "Test")
        .build()
        .unwrap();

    let request_bytes = handler("http://localhost:3000").build_http_request(&request);
    let request_str = String::from_utf8_lossy(&request_bytes);

    assert!(request_str.contains("Connection: close"));
    assert!(!request_str.contains("keep-alive"));
    assert!(!request_str.contains("X-Session-Hint"));
    assert!(!request_str.contains("Upgrade"));
    assert!(!request_str.contains("Keep-Alive"));
    assert!(!request_str.contains("Expect"));
    assert!(request_str.contains("User-Agent: Test"));
}

#[test]
fn test_build_http_request_default_path() {
    let request = RequestBuilder::new()
        .method(Method::GET)
        .target("")
        .build()
        .unwrap();

    let request_bytes = handler("http://localhost:3000").build_http_request(&request);
    let request_str = String::from_utf8_lossy(&request_bytes);

    assert!(request_str.starts_with("GET / HTTP/1.1"));
}

#[test]
fn test_parse_response_head() {
    let head = parse_response_head(
        b"HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n",
    )
    .unwrap();

    assert_eq!(head.status, 503);
    assert_eq!(head.reason, "Service Unavailable");
    assert_eq!(head.headers.get("content-type"), Some("text/plain"));
    assert_eq!(head.headers.get_all("set-cookie").count(), 2);
}

#[test]
fn test_parse_response_head_rejects_garbage() {
    assert!(parse_response_head(b"\r\n\r\n").is_err());
    assert!(parse_response_head(b"SSH-2.0-OpenSSH\r\n\r\n").is_err());
    assert!(parse_response_head(b"HTTP/1.1 abc Weird\r\n\r\n").is_err());
}

#[test]
fn test_body_framing() {
    let head = |raw: &str| parse_response_head(raw.as_bytes()).unwrap();

    assert_eq!(
        BodyFraming::for_response(&head("HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n"), &Method::GET),
        BodyFraming::Length(12)
    );
    assert_eq!(
        BodyFraming::for_response(&head("HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n"), &Method::HEAD),
        BodyFraming::Empty
    );
    assert_eq!(
        BodyFraming::for_response(&head("HTTP/1.1 204 No Content\r\n\r\n"), &Method::DELETE),
        BodyFraming::Empty
    );
    assert_eq!(
        BodyFraming::for_response(
            &head("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"),
            &Method::GET
        ),
        BodyFraming::Chunked
    );

    let until_close = BodyFraming::for_response(&head("HTTP/1.0 200 OK\r\n\r\n"), &Method::GET);
    assert_eq!(until_close, BodyFraming::UntilClose);
    assert!(!until_close.is_self_delimiting());
}

#[test]
fn test_interim_heads() {
    let head = |raw: &str| parse_response_head(raw.as_bytes()).unwrap();

    assert!(head("HTTP/1.1 100 Continue\r\n\r\n").is_interim());
    assert!(head("HTTP/1.1 103 Early Hints\r\nLink: </a.css>\r\n\r\n").is_interim());
    assert!(!head("HTTP/1.1 101 Switching Protocols\r\n\r\n").is_interim());
    assert!(!head("HTTP/1.1 200 OK\r\n\r\n").is_interim());
    assert!(!head("HTTP/1.1 204 No Content\r\n\r\n").is_interim());
}
