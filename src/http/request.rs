use crate::http::error::HttpError;
use crate::http::headers::Headers;

/// The only protocol version accepted on the request line.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Where a [`Request`] is in its parse.
///
/// States only ever advance; `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ParseState {
    /// Waiting for a CRLF-terminated request line
    #[default]
    AwaitingRequestLine,
    /// Consuming field-lines until the bare CRLF
    AwaitingHeaders,
    /// Waiting for `Content-Length` bytes of body
    AwaitingBody,
    /// Request fully parsed
    Complete,
}

/// `METHOD SP TARGET SP VERSION`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    /// One or more uppercase ASCII letters (e.g. "GET")
    pub method: String,
    /// The request target exactly as sent (e.g. "/search?q=rust")
    pub target: String,
    /// Always "HTTP/1.1"
    pub version: String,
}

/// A request read off one connection.
///
/// Created empty and filled in by the request parser; once `state` is
/// [`ParseState::Complete`] it is handed to the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    /// Request headers keyed by lowercase name
    pub headers: Headers,
    /// Exactly `Content-Length` bytes, or empty
    pub body: Vec<u8>,
    pub state: ParseState,
}

impl RequestLine {
    /// Parses a request line without its trailing CRLF.
    ///
    /// Non-UTF-8 bytes in the target are kept as U+FFFD; the method and
    /// version checks reject them anywhere else.
    pub fn parse(line: &[u8]) -> Result<Self, HttpError> {
        let line = String::from_utf8_lossy(line);

        let parts: Vec<&str> = line.split(' ').collect();
        let [method, target, version] = parts[..] else {
            return Err(HttpError::MalformedRequestLine(format!(
                "expected 3 parts, got {}: {line:?}",
                parts.len()
            )));
        };

        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(HttpError::MalformedRequestLine(format!(
                "invalid method {method:?}, must contain only capital letters"
            )));
        }

        if target.is_empty() {
            return Err(HttpError::MalformedRequestLine("empty request target".into()));
        }

        if version != HTTP_VERSION {
            return Err(HttpError::MalformedRequestLine(format!(
                "unsupported version {version:?}, only {HTTP_VERSION} is supported"
            )));
        }

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
        })
    }
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    pub fn version(&self) -> &str {
        &self.request_line.version
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The declared body length.
    ///
    /// `Ok(None)` when the header is absent; a present but non-numeric value
    /// is an [`HttpError::InvalidContentLength`].
    pub fn content_length(&self) -> Result<Option<usize>, HttpError> {
        self.header("content-length")
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| HttpError::InvalidContentLength(v.to_string()))
            })
            .transpose()
    }

    pub fn is_complete(&self) -> bool {
        self.state == ParseState::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_line() {
        let line = RequestLine::parse(b"GET /coffee HTTP/1.1").unwrap();

        assert_eq!(line.method, "GET");
        assert_eq!(line.target, "/coffee");
        assert_eq!(line.version, "HTTP/1.1");
    }

    #[test]
    fn rejects_lowercase_method() {
        assert!(matches!(
            RequestLine::parse(b"get / HTTP/1.1"),
            Err(HttpError::MalformedRequestLine(_))
        ));
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert!(RequestLine::parse(b"/coffee HTTP/1.1").is_err());
        assert!(RequestLine::parse(b"GET / HTTP/1.1 extra").is_err());
        assert!(RequestLine::parse(b"GET  / HTTP/1.1").is_err());
    }

    #[test]
    fn rejects_other_versions() {
        assert!(RequestLine::parse(b"GET / HTTP/1.0").is_err());
        assert!(RequestLine::parse(b"GET / HTTP/2").is_err());
    }

    #[test]
    fn non_utf8_target_is_kept_lossily() {
        let line = RequestLine::parse(b"GET /caf\xe9 HTTP/1.1").unwrap();

        assert_eq!(line.target, "/caf\u{fffd}");
        assert!(RequestLine::parse(b"G\xc9T / HTTP/1.1").is_err());
    }

    #[test]
    fn parse_states_are_ordered() {
        assert!(ParseState::AwaitingRequestLine < ParseState::AwaitingHeaders);
        assert!(ParseState::AwaitingBody < ParseState::Complete);
    }
}
