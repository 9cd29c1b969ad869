use thiserror::Error;

use crate::http::request::ParseState;
use crate::http::writer::WriterState;

/// Errors raised while parsing a request or serializing a response.
///
/// Every variant is fatal to the connection that produced it and to nothing
/// else: the caller logs it and closes that connection.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad method casing, wrong token count, or unsupported version.
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),

    /// Illegal colon placement, whitespace, character, empty name or value,
    /// or a repeated field with an identical value.
    #[error("malformed header line ({reason}): {line:?}")]
    MalformedHeaderLine { reason: &'static str, line: String },

    /// `Content-Length` is not a non-negative integer.
    #[error("invalid content-length value: {0:?}")]
    InvalidContentLength(String),

    /// More bytes were buffered than `Content-Length` declared.
    #[error("body is {buffered} bytes but content-length declares {declared}")]
    BodyLengthMismatch { declared: usize, buffered: usize },

    /// The byte source ended before the request was complete.
    #[error("stream ended while {state:?}")]
    TruncatedStream { state: ParseState },

    /// The parser was driven again after producing a complete request.
    #[error("request is already complete")]
    AlreadyComplete,

    /// The buffered request grew past the configured limit.
    #[error("request exceeds {limit} bytes")]
    RequestTooLarge { limit: usize },

    /// A writer operation was called out of order.
    #[error("writer is {actual:?}, operation requires {expected:?}")]
    WriterStateViolation {
        expected: WriterState,
        actual: WriterState,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpError {
    /// Whether the peer sent something we can answer with `400 Bad Request`.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HttpError::MalformedRequestLine(_)
                | HttpError::MalformedHeaderLine { .. }
                | HttpError::InvalidContentLength(_)
                | HttpError::BodyLengthMismatch { .. }
                | HttpError::RequestTooLarge { .. }
        )
    }

    pub(crate) fn header_line(reason: &'static str, line: &[u8]) -> Self {
        HttpError::MalformedHeaderLine {
            reason,
            line: String::from_utf8_lossy(line).into_owned(),
        }
    }
}
