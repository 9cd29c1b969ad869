use httpwire::http::error::HttpError;
use httpwire::http::parser::{RequestParser, read_request};
use httpwire::http::request::{ParseState, Request};
use tokio::io::AsyncWriteExt;

fn parse_in_chunks(data: &[u8], chunk_size: usize) -> Result<Request, HttpError> {
    let mut parser = RequestParser::new();
    for piece in data.chunks(chunk_size) {
        parser.feed(piece)?;
    }
    parser.finish()
}

#[test]
fn test_parse_good_get_request_line() {
    let req = parse_in_chunks(b"GET / HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", 3).unwrap();

    assert_eq!(req.method(), "GET");
    assert_eq!(req.target(), "/");
    assert_eq!(req.version(), "HTTP/1.1");
    assert_eq!(req.header("host"), Some("localhost:42069"));
    assert_eq!(req.headers.len(), 1);
    assert!(req.body.is_empty());
    assert_eq!(req.state, ParseState::Complete);
}

#[test]
fn test_parse_request_with_path_and_query_string() {
    let req = parse_in_chunks(b"GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n", 64).unwrap();

    assert_eq!(req.target(), "/search?q=rust");
}

#[test]
fn test_parse_post_request_with_body() {
    let data = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let req = parse_in_chunks(data, data.len()).unwrap();

    assert_eq!(req.method(), "POST");
    assert_eq!(req.body, b"hello".to_vec());
    assert_eq!(req.content_length().unwrap(), Some(5));
}

#[test]
fn test_partial_body_needs_more_data() {
    let mut parser = RequestParser::new();

    let state = parser
        .feed(b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel")
        .unwrap();

    assert_eq!(state, ParseState::AwaitingBody);
    assert_eq!(parser.buffered(), b"hel");
    assert!(parser.request().body.is_empty());

    assert_eq!(parser.feed(b"lo").unwrap(), ParseState::Complete);
    assert_eq!(parser.finish().unwrap().body, b"hello".to_vec());
}

#[test]
fn test_parse_window_with_partial_body_consumes_nothing_more() {
    let mut parser = RequestParser::new();
    let head = b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\n";
    let mut data = head.to_vec();
    data.extend_from_slice(b"hel");

    let consumed = parser.parse(&data).unwrap();

    assert_eq!(consumed, head.len());
    assert_eq!(parser.state(), ParseState::AwaitingBody);
    assert_eq!(parser.parse(b"hel").unwrap(), 0);
}

#[test]
fn test_every_chunk_size_yields_the_same_request() {
    let data = b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\nAccept: text/html\r\nContent-Length: 13\r\n\r\nhello, world!";
    let whole = parse_in_chunks(data, data.len()).unwrap();

    for chunk_size in 1..=data.len() {
        let req = parse_in_chunks(data, chunk_size).unwrap();
        assert_eq!(req, whole, "chunk size {chunk_size}");
    }

    assert_eq!(whole.header("accept"), Some("*/*, text/html"));
    assert_eq!(whole.body, b"hello, world!".to_vec());
}

#[test]
fn test_binary_body() {
    let data = b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\x02\x03";
    let req = parse_in_chunks(data, 1).unwrap();

    assert_eq!(req.body, vec![0, 1, 2, 3]);
}

#[test]
fn test_zero_content_length() {
    let req = parse_in_chunks(b"POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n", 5).unwrap();

    assert!(req.body.is_empty());
    assert!(req.is_complete());
}

#[test]
fn test_body_longer_than_content_length_is_rejected() {
    let mut parser = RequestParser::new();
    let err = parser
        .feed(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\r\nhello")
        .unwrap_err();

    assert!(matches!(
        err,
        HttpError::BodyLengthMismatch {
            declared: 3,
            buffered: 5
        }
    ));
}

#[test]
fn test_invalid_content_length_is_rejected() {
    for value in ["abc", "-1", "1.5"] {
        let data = format!("POST / HTTP/1.1\r\nContent-Length: {value}\r\n\r\n");
        let err = parse_in_chunks(data.as_bytes(), data.len()).unwrap_err();
        assert!(matches!(err, HttpError::InvalidContentLength(_)), "{value}");
    }
}

#[test]
fn test_missing_content_length_leaves_trailing_bytes_unconsumed() {
    let mut parser = RequestParser::new();
    let state = parser.feed(b"GET / HTTP/1.1\r\n\r\nextra").unwrap();

    assert_eq!(state, ParseState::Complete);
    assert_eq!(parser.buffered(), b"extra");
    assert!(parser.request().body.is_empty());
}

#[test]
fn test_invalid_method_casing() {
    let err = parse_in_chunks(b"get / HTTP/1.1\r\n\r\n", 64).unwrap_err();

    assert!(matches!(err, HttpError::MalformedRequestLine(_)));
}

#[test]
fn test_invalid_number_of_parts() {
    let err = parse_in_chunks(b"/coffee HTTP/1.1\r\nHost: localhost\r\n\r\n", 64).unwrap_err();

    assert!(matches!(err, HttpError::MalformedRequestLine(_)));
}

#[test]
fn test_unsupported_version() {
    let err = parse_in_chunks(b"GET / HTTP/1.0\r\n\r\n", 64).unwrap_err();

    assert!(matches!(err, HttpError::MalformedRequestLine(_)));
}

#[test]
fn test_malformed_header() {
    let err = parse_in_chunks(b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n", 64).unwrap_err();

    assert!(matches!(err, HttpError::MalformedHeaderLine { .. }));
}

#[test]
fn test_duplicate_identical_header_is_rejected() {
    let err = parse_in_chunks(
        b"GET / HTTP/1.1\r\nAccept: */*\r\nAccept: */*\r\n\r\n",
        64,
    )
    .unwrap_err();

    assert!(matches!(err, HttpError::MalformedHeaderLine { .. }));
}

#[test]
fn test_duplicate_header_with_new_value_is_merged() {
    let req = parse_in_chunks(b"GET / HTTP/1.1\r\nAccept: v1\r\nACCEPT: v2\r\n\r\n", 64).unwrap();

    assert_eq!(req.header("Accept"), Some("v1, v2"));
}

#[test]
fn test_header_names_are_case_folded() {
    for name in ["Host", "host", "hOsT"] {
        let data = format!("GET / HTTP/1.1\r\n{name}: localhost\r\n\r\n");
        let req = parse_in_chunks(data.as_bytes(), 64).unwrap();
        let keys: Vec<&str> = req.headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["host"]);
    }
}

#[test]
fn test_obs_text_in_target_and_value_is_accepted() {
    let data = b"GET /caf\xe9 HTTP/1.1\r\nX-Name: caf\xe9\r\n\r\n";
    for chunk_size in 1..=data.len() {
        let req = parse_in_chunks(data, chunk_size).unwrap();

        assert_eq!(req.target(), "/caf\u{fffd}");
        assert_eq!(req.header("x-name"), Some("caf\u{fffd}"));
    }
}

#[test]
fn test_truncated_stream() {
    let err = parse_in_chunks(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel", 4).unwrap_err();

    assert!(matches!(
        err,
        HttpError::TruncatedStream {
            state: ParseState::AwaitingBody
        }
    ));
}

#[tokio::test]
async fn test_read_request_from_slice() {
    let mut reader: &[u8] = b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n";
    let req = read_request(&mut reader, RequestParser::new()).await.unwrap();

    assert_eq!(req.target(), "/coffee");
}

#[tokio::test]
async fn test_read_request_one_byte_at_a_time() {
    let data = b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\n\r\nping";
    let (mut client, mut server) = tokio::io::duplex(1);

    let writer = tokio::spawn(async move {
        client.write_all(data).await.unwrap();
        client
    });

    let req = read_request(&mut server, RequestParser::new()).await.unwrap();
    let _client = writer.await.unwrap();

    assert_eq!(req.target(), "/echo");
    assert_eq!(req.body, b"ping".to_vec());
}

#[tokio::test]
async fn test_read_request_reports_truncation() {
    let mut reader: &[u8] = b"GET / HTTP/1.1\r\nHost: local";
    let err = read_request(&mut reader, RequestParser::new()).await.unwrap_err();

    assert!(matches!(
        err,
        HttpError::TruncatedStream {
            state: ParseState::AwaitingHeaders
        }
    ));
}
