use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::error::HttpError;
use crate::http::headers::{CRLF, find_crlf};
use crate::http::request::{ParseState, Request, RequestLine};

/// Initial capacity of the parse buffer; it grows as needed.
const BUFFER_SIZE: usize = 4096;

/// Default cap on buffered, not yet consumed request bytes.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Incremental HTTP/1.1 request parser.
///
/// Bytes may arrive split at any point. The parser only consumes complete
/// tokens (a terminated request line, a terminated field-line, or the whole
/// declared body) and keeps everything else buffered until more arrives.
///
/// ```text
///  AwaitingRequestLine ──request line──▶ AwaitingHeaders
///                                              │ bare CRLF
///                                              ▼
///                  Complete ◀──body──── AwaitingBody
/// ```
#[derive(Debug)]
pub struct RequestParser {
    request: Request,
    buffer: BytesMut,
    max_request_bytes: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_REQUEST_BYTES)
    }

    /// A parser that refuses to buffer more than `max_request_bytes`.
    pub fn with_limit(max_request_bytes: usize) -> Self {
        Self {
            request: Request::new(),
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
            max_request_bytes,
        }
    }

    pub fn state(&self) -> ParseState {
        self.request.state
    }

    /// The request parsed so far.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Parses as much of `data` as forms complete tokens.
    ///
    /// Returns the number of bytes consumed; the caller keeps the rest and
    /// presents it again, followed by newly read bytes, on the next call.
    /// Zero consumed with an unchanged state means "need more data".
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, HttpError> {
        if self.request.state == ParseState::Complete {
            return Err(HttpError::AlreadyComplete);
        }

        let mut total = 0;
        while self.request.state != ParseState::Complete {
            let before = self.request.state;
            let consumed = self.parse_single(&data[total..])?;
            total += consumed;
            if consumed == 0 && self.request.state == before {
                break;
            }
        }
        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, HttpError> {
        match self.request.state {
            ParseState::AwaitingRequestLine => {
                let Some(line_end) = find_crlf(data) else {
                    return Ok(0);
                };
                self.request.request_line = RequestLine::parse(&data[..line_end])?;
                self.request.state = ParseState::AwaitingHeaders;
                Ok(line_end + CRLF.len())
            }

            ParseState::AwaitingHeaders => {
                let (consumed, done) = self.request.headers.parse(data)?;
                if done {
                    self.request.state = ParseState::AwaitingBody;
                }
                Ok(consumed)
            }

            ParseState::AwaitingBody => {
                let Some(declared) = self.request.content_length()? else {
                    self.request.state = ParseState::Complete;
                    return Ok(0);
                };

                if data.len() < declared {
                    return Ok(0);
                }
                if data.len() > declared {
                    return Err(HttpError::BodyLengthMismatch {
                        declared,
                        buffered: data.len(),
                    });
                }

                self.request.body = data.to_vec();
                self.request.state = ParseState::Complete;
                Ok(declared)
            }

            ParseState::Complete => Err(HttpError::AlreadyComplete),
        }
    }

    /// Appends newly read bytes and parses what is now available.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<ParseState, HttpError> {
        if self.buffer.len() + bytes.len() > self.max_request_bytes {
            return Err(HttpError::RequestTooLarge {
                limit: self.max_request_bytes,
            });
        }
        self.buffer.extend_from_slice(bytes);

        let buffer = std::mem::take(&mut self.buffer);
        let result = self.parse(&buffer);
        self.buffer = buffer;

        let consumed = result?;
        self.buffer.advance(consumed);
        Ok(self.request.state)
    }

    /// Called when the byte source reports end-of-stream.
    pub fn finish(self) -> Result<Request, HttpError> {
        match self.request.state {
            ParseState::Complete => Ok(self.request),
            state => Err(HttpError::TruncatedStream { state }),
        }
    }

    /// Takes the request if parsing has completed.
    pub fn into_request(self) -> Option<Request> {
        self.request.is_complete().then_some(self.request)
    }
}

/// Reads one request from `reader`.
///
/// Reads until the parser reports [`ParseState::Complete`]; end-of-stream
/// before that is a [`HttpError::TruncatedStream`].
pub async fn read_request<R>(reader: &mut R, mut parser: RequestParser) -> Result<Request, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        chunk.clear();
        let n = reader.read_buf(&mut chunk).await?;
        if n == 0 {
            return parser.finish();
        }

        if parser.feed(&chunk)? == ParseState::Complete {
            tracing::trace!(
                leftover = parser.buffered().len(),
                "request complete"
            );
            return parser.finish();
        }
    }
}
