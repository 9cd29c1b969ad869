use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpError;
use crate::http::headers::{CRLF, Headers};
use crate::http::request::HTTP_VERSION;
use crate::http::response::{Response, StatusCode};

/// What the writer will accept next.
///
/// A plain body or the trailers finish a message and return the writer to
/// `AwaitingStatusLine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterState {
    #[default]
    AwaitingStatusLine,
    AwaitingHeaders,
    AwaitingBody,
    AwaitingTrailers,
}

/// Serializes a response onto a byte sink in protocol order.
///
/// ```text
/// status line ─▶ headers ─▶ body ──────────────────────────────┐
///                           └▶ chunk* ─▶ last chunk ─▶ trailers ┴▶ status line
/// ```
///
/// An operation called out of order fails with
/// [`HttpError::WriterStateViolation`] before writing anything.
pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::AwaitingStatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn expect_state(&self, expected: WriterState) -> Result<(), HttpError> {
        if self.state != expected {
            return Err(HttpError::WriterStateViolation {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Writes `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), HttpError> {
        self.expect_state(WriterState::AwaitingStatusLine)?;

        let line = format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        );
        self.sink.write_all(line.as_bytes()).await?;

        self.state = WriterState::AwaitingHeaders;
        Ok(())
    }

    /// Writes each field as `name: value\r\n`, then the blank line.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), HttpError> {
        self.expect_state(WriterState::AwaitingHeaders)?;

        self.write_fields(headers).await?;

        self.state = WriterState::AwaitingBody;
        Ok(())
    }

    /// Writes a complete fixed-length body.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<(), HttpError> {
        self.expect_state(WriterState::AwaitingBody)?;

        self.sink.write_all(body).await?;

        self.state = WriterState::AwaitingStatusLine;
        Ok(())
    }

    /// Writes one chunk as `<hex len>\r\n<bytes>\r\n`.
    ///
    /// May be called repeatedly. An empty chunk would read as the last-chunk
    /// marker, so it is skipped.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<usize, HttpError> {
        self.expect_state(WriterState::AwaitingBody)?;

        if chunk.is_empty() {
            return Ok(0);
        }

        let size_line = format!("{:x}\r\n", chunk.len());
        self.sink.write_all(size_line.as_bytes()).await?;
        self.sink.write_all(chunk).await?;
        self.sink.write_all(CRLF).await?;

        Ok(size_line.len() + chunk.len() + CRLF.len())
    }

    /// Writes the last-chunk marker `0\r\n\r\n`.
    pub async fn write_chunked_body_done(&mut self) -> Result<usize, HttpError> {
        self.expect_state(WriterState::AwaitingBody)?;

        const LAST_CHUNK: &[u8] = b"0\r\n\r\n";
        self.sink.write_all(LAST_CHUNK).await?;

        self.state = WriterState::AwaitingTrailers;
        Ok(LAST_CHUNK.len())
    }

    /// Writes trailer fields in header format, then the blank line.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), HttpError> {
        self.expect_state(WriterState::AwaitingTrailers)?;

        self.write_fields(trailers).await?;

        self.state = WriterState::AwaitingStatusLine;
        Ok(())
    }

    /// Writes status line, headers and body of a fixed-body response.
    pub async fn write_response(&mut self, response: &Response) -> Result<(), HttpError> {
        self.write_status_line(response.status).await?;
        self.write_headers(&response.headers).await?;
        self.write_body(&response.body).await
    }

    pub async fn flush(&mut self) -> Result<(), HttpError> {
        self.sink.flush().await?;
        Ok(())
    }

    async fn write_fields(&mut self, fields: &Headers) -> Result<(), HttpError> {
        let mut buf = Vec::new();
        for (k, v) in fields.iter() {
            buf.extend_from_slice(k.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(v.as_bytes());
            buf.extend_from_slice(CRLF);
        }
        buf.extend_from_slice(CRLF);

        self.sink.write_all(&buf).await?;
        Ok(())
    }
}
