//! Chunked relay of an upstream resource
//!
//! Fetches a path from the configured upstream over a fresh TCP connection
//! and streams the body back to the client with chunked transfer-encoding.
//! Each upstream read becomes one chunk; once the body is done the trailers
//! carry its SHA-256 digest and length.

use crate::config::UpstreamConfig;
use crate::http::error::HttpError;
use crate::http::headers::{Headers, find_crlf};
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use anyhow::{Context, Result};
use bytes::BytesMut;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::error::Elapsed;
use tokio::time::timeout;

/// Default buffer size for reading the response head
const BUFFER_SIZE: usize = 8192;

/// Upper bound on the upstream status line and headers
const MAX_HEAD_BYTES: usize = 64 * 1024;

pub const TRAILER_SHA256: &str = "X-Content-SHA256";
pub const TRAILER_LENGTH: &str = "X-Content-Length";

/// Status line and headers of an upstream response
#[derive(Debug)]
pub struct UpstreamHead {
    pub status: StatusCode,
    pub headers: Headers,
    pub content_length: Option<usize>,
}

/// Relays requests to one upstream server
pub struct Upstream {
    base_url: url::Url,

    /// Connection timeout duration
    connect_timeout: Duration,

    /// Timeout for the response head and for each body read
    request_timeout: Duration,

    chunk_size: usize,
}

impl Upstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base_url = url::Url::parse(&config.base_url).context("Invalid upstream URL")?;
        anyhow::ensure!(
            base_url.scheme() == "http",
            "Unsupported upstream scheme {:?}, only http is supported",
            base_url.scheme()
        );
        base_url.host_str().context("Upstream URL missing host")?;

        Ok(Self {
            base_url,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Relays `GET <base_url>/<path>` to `writer` as a chunked response.
    ///
    /// Failures before the status line is written become a 502 (or 504 on
    /// timeout). Once chunks are flowing a failure can only abort the
    /// connection, leaving the body without its last chunk.
    pub async fn relay<W>(&self, path: &str, writer: &mut ResponseWriter<W>) -> Result<(), HttpError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let (head, mut stream, leftover) = match self.open(path).await {
            Ok(opened) => opened,
            Err(e) => {
                tracing::warn!(
                    upstream = %self.base_url,
                    path,
                    error = %e,
                    "Failed to open upstream response"
                );
                return writer.write_response(&Self::error_response(&e)).await;
            }
        };

        tracing::debug!(
            status = head.status.as_u16(),
            content_length = ?head.content_length,
            "Upstream response head received"
        );

        let mut headers = Headers::new();
        headers.set(
            "content-type",
            head.headers
                .get("content-type")
                .unwrap_or("application/octet-stream"),
        );
        headers.set("transfer-encoding", "chunked");
        headers.set("connection", "close");
        headers.set("trailer", format!("{TRAILER_SHA256}, {TRAILER_LENGTH}"));

        writer.write_status_line(head.status).await?;
        writer.write_headers(&headers).await?;

        let mut digest = Sha256::new();
        let mut relayed = 0usize;

        // Body bytes that arrived together with the response head
        let take = head
            .content_length
            .map_or(leftover.len(), |n| n.min(leftover.len()));
        for piece in leftover[..take].chunks(self.chunk_size) {
            digest.update(piece);
            writer.write_chunked_body(piece).await?;
            relayed += piece.len();
        }

        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let want = match head.content_length {
                Some(n) if relayed >= n => break,
                Some(n) => (n - relayed).min(buf.len()),
                None => buf.len(),
            };

            let n = self.read_with_timeout(&mut stream, &mut buf[..want]).await?;
            if n == 0 {
                break;
            }

            tracing::trace!(bytes = n, "Relaying chunk");
            digest.update(&buf[..n]);
            writer.write_chunked_body(&buf[..n]).await?;
            relayed += n;
        }

        if let Some(declared) = head.content_length.filter(|&n| n != relayed) {
            tracing::warn!(declared, relayed, "Upstream closed before its declared length");
        }

        writer.write_chunked_body_done().await?;

        let mut trailers = Headers::new();
        trailers.set(TRAILER_SHA256, format!("{:x}", digest.finalize()));
        trailers.set(TRAILER_LENGTH, relayed.to_string());
        writer.write_trailers(&trailers).await?;

        tracing::info!(path, relayed, "Upstream response relayed");
        Ok(())
    }

    /// Build HTTP request bytes to send upstream
    ///
    /// HTTP/1.0 keeps the upstream from answering with chunked framing, which
    /// would otherwise need decoding before it could be re-chunked.
    pub fn build_http_request(&self, path: &str) -> Result<Vec<u8>> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .context("Invalid upstream path")?;

        let host = url.host_str().context("Upstream URL missing host")?;
        let host_value = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut buffer = Vec::new();
        buffer.extend_from_slice(format!("GET {} HTTP/1.0\r\n", target).as_bytes());
        buffer.extend_from_slice(format!("Host: {}\r\n", host_value).as_bytes());
        buffer.extend_from_slice(b"User-Agent: httpwire\r\n");
        buffer.extend_from_slice(b"Connection: close\r\n");
        buffer.extend_from_slice(b"\r\n");

        Ok(buffer)
    }

    /// Connects, sends the request and reads the response head
    async fn open(&self, path: &str) -> Result<(UpstreamHead, TcpStream, BytesMut)> {
        let host = self.base_url.host_str().context("Upstream URL missing host")?;
        let port = self.base_url.port_or_known_default().unwrap_or(80);
        let addr = format!("{}:{}", host, port);

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("Failed to connect to upstream {}", addr))?;

        tracing::trace!(%addr, "Connected to upstream");

        let request = self.build_http_request(path)?;
        stream.write_all(&request).await?;
        stream.flush().await?;

        let (head, leftover) = timeout(self.request_timeout, read_head(&mut stream))
            .await
            .context("Request timeout")??;

        Ok((head, stream, leftover))
    }

    async fn read_with_timeout(&self, stream: &mut TcpStream, buf: &mut [u8]) -> Result<usize, HttpError> {
        let n = timeout(self.request_timeout, stream.read(buf))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream read timed out"))??;
        Ok(n)
    }

    /// Map an upstream failure to the response the client gets
    fn error_response(error: &anyhow::Error) -> Response {
        if error.is::<Elapsed>() {
            Response::new(
                StatusCode::GATEWAY_TIMEOUT,
                "504 Gateway Timeout\n\nThe upstream server did not respond in time.\n",
            )
        } else {
            Response::new(
                StatusCode::BAD_GATEWAY,
                "502 Bad Gateway\n\nThe upstream server could not be reached.\n",
            )
        }
    }
}

/// Reads until a full response head is buffered.
///
/// Returns the head and whatever body bytes were read past it.
pub async fn read_head<R>(stream: &mut R) -> Result<(UpstreamHead, BytesMut)>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        let n = stream.read_buf(&mut buffer).await?;

        if let Some(head) = parse_head(&mut buffer)? {
            return Ok((head, buffer));
        }

        if n == 0 {
            anyhow::bail!("Connection closed before complete response head received");
        }

        // Prevent unbounded header growth
        if buffer.len() > MAX_HEAD_BYTES {
            anyhow::bail!("Response head too large");
        }
    }
}

/// Splits a complete response head off the front of `buffer`.
///
/// Returns `Ok(None)` and leaves `buffer` untouched while the blank line
/// ending the head has not arrived.
pub fn parse_head(buffer: &mut BytesMut) -> Result<Option<UpstreamHead>> {
    let Some(head_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };
    let head = buffer.split_to(head_end + 4);

    let line_end = find_crlf(&head).context("Empty response")?;
    let status = parse_status_line(&head[..line_end])?;

    let mut headers = Headers::new();
    let mut rest = &head[line_end + 2..];
    loop {
        let (consumed, done) = headers
            .parse_lenient(rest)
            .context("Invalid upstream header")?;
        if done {
            break;
        }
        anyhow::ensure!(consumed > 0, "Unterminated upstream header");
        rest = &rest[consumed..];
    }

    anyhow::ensure!(
        !headers.contains("transfer-encoding"),
        "Upstream used transfer-encoding despite an HTTP/1.0 request"
    );

    let content_length = headers
        .get("content-length")
        .map(|v| v.parse::<usize>())
        .transpose()
        .context("Invalid upstream content-length")?;

    Ok(Some(UpstreamHead {
        status,
        headers,
        content_length,
    }))
}

fn parse_status_line(line: &[u8]) -> Result<StatusCode> {
    let line = std::str::from_utf8(line).context("Invalid UTF-8 in status line")?;
    let parts: Vec<&str> = line.splitn(3, ' ').collect();

    if parts.len() < 2 || !parts[0].starts_with("HTTP/1.") {
        anyhow::bail!("Invalid status line: {}", line);
    }

    let code: u16 = parts[1].parse().context("Invalid status code")?;
    anyhow::ensure!((100..=999).contains(&code), "Invalid status code {}", code);
    Ok(StatusCode(code))
}
