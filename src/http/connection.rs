use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpError;
use crate::http::parser::{DEFAULT_MAX_REQUEST_BYTES, RequestParser, read_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, WriterState};

/// Produces the response for one request by driving the writer.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> impl Future<Output = Result<(), HttpError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// One accepted connection: read a single request, answer it, close.
pub struct Connection<S, H> {
    stream: S,
    handler: Arc<H>,
    max_request_bytes: usize,
    state: ConnectionState,
}

enum ConnectionState {
    Reading,
    Processing(Request),
    Closed,
}

impl<S, H> Connection<S, H>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    H: Handler,
{
    pub fn new(stream: S, handler: Arc<H>) -> Self {
        Self {
            stream,
            handler,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            state: ConnectionState::Reading,
        }
    }

    pub fn with_limit(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }

    pub async fn run(&mut self) -> Result<(), HttpError> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    let parser = RequestParser::with_limit(self.max_request_bytes);
                    match read_request(&mut self.stream, parser).await {
                        Ok(request) => {
                            self.state = ConnectionState::Processing(request);
                        }
                        Err(e) => {
                            if e.is_client_error() {
                                self.reject(&e).await;
                            }
                            return Err(e);
                        }
                    }
                }

                ConnectionState::Processing(request) => {
                    tracing::info!(
                        method = request.method(),
                        target = request.target(),
                        body_len = request.body.len(),
                        "Handling request"
                    );

                    let mut writer = ResponseWriter::new(&mut self.stream);
                    if let Err(e) = self.handler.handle(&request, &mut writer).await {
                        tracing::error!(
                            error = %e,
                            target = request.target(),
                            "Handler failed"
                        );
                        // Nothing sent yet, so the client can still get a 500
                        if writer.state() == WriterState::AwaitingStatusLine {
                            let response = Response::internal_error("Internal Server Error\n");
                            send_best_effort(&mut writer, &response).await;
                        }
                        return Err(e);
                    }
                    if writer.state() != WriterState::AwaitingStatusLine {
                        tracing::warn!(
                            state = ?writer.state(),
                            target = request.target(),
                            "Handler left the response unfinished"
                        );
                    }
                    writer.flush().await?;
                    // one request per connection: state stays Closed
                }

                ConnectionState::Closed => break,
            }
        }

        self.stream.shutdown().await?;
        Ok(())
    }

    /// Best-effort `400 Bad Request` before the connection is dropped.
    async fn reject(&mut self, error: &HttpError) {
        let response = Response::bad_request(format!("{error}\n"));
        let mut writer = ResponseWriter::new(&mut self.stream);
        send_best_effort(&mut writer, &response).await;
    }
}

/// Writes and flushes `response`, logging rather than returning a failure.
async fn send_best_effort<W>(writer: &mut ResponseWriter<W>, response: &Response)
where
    W: AsyncWrite + Unpin,
{
    let sent = match writer.write_response(response).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        tracing::debug!(
            error = %e,
            status = response.status.as_u16(),
            "Could not send error response"
        );
    }
}
