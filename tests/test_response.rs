use httpwire::http::response::{Response, ResponseBuilder, StatusCode, default_headers};

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    assert_eq!(StatusCode::BAD_REQUEST.reason_phrase(), "Bad Request");
    assert_eq!(
        StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode::GATEWAY_TIMEOUT.reason_phrase(), "Gateway Timeout");
    assert_eq!(StatusCode(418).reason_phrase(), "");
}

#[test]
fn test_status_code_from_u16() {
    assert_eq!(StatusCode::from(404), StatusCode::NOT_FOUND);
    assert_eq!(StatusCode::from(500).as_u16(), 500);
}

#[test]
fn test_default_headers() {
    let headers = default_headers(42);

    assert_eq!(headers.get("Content-Length"), Some("42"));
    assert_eq!(headers.get("Content-Type"), Some("text/plain"));
    assert_eq!(headers.get("Connection"), Some("close"));
    assert_eq!(headers.len(), 3);
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::OK).body(body.clone()).build();

    assert_eq!(
        response.headers.get("content-length"),
        Some(body.len().to_string().as_str())
    );
}

#[test]
fn test_response_builder_overrides_defaults() {
    let response = ResponseBuilder::new(StatusCode::OK)
        .header("Content-Type", "text/html")
        .header("X-Custom", "value")
        .body("<p>hi</p>")
        .build();

    assert_eq!(response.headers.get("content-type"), Some("text/html"));
    assert_eq!(response.headers.get("x-custom"), Some("value"));
    assert_eq!(response.headers.len(), 4);
}

#[test]
fn test_response_builder_empty_body() {
    let response = ResponseBuilder::new(StatusCode::NO_CONTENT).build();

    assert!(response.body.is_empty());
    assert_eq!(response.headers.get("content-length"), Some("0"));
}

#[test]
fn test_response_helpers() {
    assert_eq!(Response::ok("x").status, StatusCode::OK);
    assert_eq!(Response::bad_request("x").status, StatusCode::BAD_REQUEST);
    assert_eq!(
        Response::internal_error("x").status,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(Response::ok("test content").body, b"test content".to_vec());
}
