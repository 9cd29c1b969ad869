use tokio::io::AsyncWrite;

use crate::http::connection::Handler;
use crate::http::error::HttpError;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::proxy::Upstream;

/// Prefix of request targets relayed to the upstream.
pub const RELAY_PREFIX: &str = "/httpbin/";

/// Dispatches a request by its target.
///
/// - `/yourproblem` answers 400
/// - `/myproblem` answers 500
/// - `/httpbin/<path>` relays `<path>` from the upstream, chunked
/// - anything else answers 200
pub struct Router {
    upstream: Upstream,
}

impl Router {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }
}

impl Handler for Router {
    async fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), HttpError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = request.target();

        if let Some(path) = target.strip_prefix(RELAY_PREFIX) {
            return self.upstream.relay(path, writer).await;
        }

        let response = match target {
            "/yourproblem" => Response::bad_request("Your request honestly kinda sucked.\n"),
            "/myproblem" => Response::internal_error("Okay, you know what? This one is on me.\n"),
            _ => Response::ok("Your request was an absolute banger.\n"),
        };
        writer.write_response(&response).await
    }
}
