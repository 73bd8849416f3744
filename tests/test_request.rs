use console_bff::http::headers::HeaderMap;
use console_bff::http::request::{Method, Request, RequestBuilder};

fn request(version: &str, headers: &[(&str, &str)]) -> Request {
    Request {
        method: Method::GET,
        target: "/".to_string(),
        version: version.to_string(),
        headers: headers.iter().copied().collect(),
        body: vec![],
    }
}

#[test]
fn test_request_header_retrieval() {
    let req = request(
        "HTTP/1.1",
        &[("Host", "example.com"), ("Content-Type", "application/json")],
    );

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_keep_alive_http11_default() {
    assert!(request("HTTP/1.1", &[]).keep_alive());
    assert!(!request("HTTP/1.1", &[("Connection", "close")]).keep_alive());
    assert!(!request("HTTP/1.1", &[("connection", "Close")]).keep_alive());
}

#[test]
fn test_request_keep_alive_http10_requires_opt_in() {
    assert!(!request("HTTP/1.0", &[]).keep_alive());
    assert!(request("HTTP/1.0", &[("Connection", "keep-alive")]).keep_alive());
}

#[test]
fn test_request_path_and_query_split() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("/bff/scopes?kind=domain&q=a?b")
        .build()
        .unwrap();

    assert_eq!(req.path(), "/bff/scopes");
    assert_eq!(req.query(), Some("kind=domain&q=a?b"));

    let bare = RequestBuilder::new()
        .method(Method::GET)
        .target("/health")
        .build()
        .unwrap();
    assert_eq!(bare.path(), "/health");
    assert_eq!(bare.query(), None);
}

#[test]
fn test_request_builder_requires_method_and_target() {
    assert!(RequestBuilder::new().target("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());

    let req = RequestBuilder::new()
        .method(Method::DELETE)
        .target("/bff/domains/example.com")
        .header("auth-token", "t")
        .body(b"x".to_vec())
        .build()
        .unwrap();
    assert_eq!(req.version, "HTTP/1.1");
    assert_eq!(req.header("Auth-Token"), Some("t"));
    assert_eq!(req.body, b"x".to_vec());
}

#[test]
fn test_header_map_multi_values_and_remove() {
    let mut headers = HeaderMap::new();
    headers.append("Set-Cookie", "a=1");
    headers.append("set-cookie", "b=2");
    headers.append("Accept", "*/*");

    assert_eq!(
        headers.get_all("SET-COOKIE").collect::<Vec<_>>(),
        vec!["a=1", "b=2"]
    );
    assert_eq!(headers.len(), 3);

    assert_eq!(headers.remove("Set-Cookie"), Some("a=1".to_string()));
    assert!(!headers.contains("set-cookie"));
    assert_eq!(headers.len(), 1);
    assert_eq!(headers.remove("missing"), None);
}
