//! HTTP/1.1 over raw byte streams.
//!
//! No HTTP stack is involved: requests are reassembled from whatever chunks
//! the socket hands us and responses are written byte for byte.
//!
//! # Architecture
//!
//! - **`headers`**: one field-line at a time, lowercase-keyed storage
//! - **`request`**: request line, request and parse state types
//! - **`parser`**: the incremental request parser and its buffer
//! - **`response`**: status codes and fixed-body responses
//! - **`writer`**: the ordered response serializer (plain, chunked, trailers)
//! - **`connection`**: drives one socket through parse, handle, write
//! - **`error`**: the error taxonomy shared by all of the above
//!
//! # Connection State Machine
//!
//! Each connection serves exactly one request:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Feed socket bytes to the parser
//!        └──────┬──────┘
//!               │ Request complete
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Handler drives the ResponseWriter
//!        └──────┬───────────┘
//!               │ Response written
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//! ```
//!
//! A malformed request is answered with `400 Bad Request` and the
//! connection is closed. Errors never leave the connection they occur on.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use httpwire::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! let listener = TcpListener::bind("127.0.0.1:42069").await?;
//! loop {
//!     let (socket, _addr) = listener.accept().await?;
//!     let handler = Arc::clone(&handler);
//!     tokio::spawn(async move {
//!         let mut conn = Connection::new(socket, handler);
//!         if let Err(e) = conn.run().await {
//!             eprintln!("Connection error: {}", e);
//!         }
//!     });
//! }
//! ```

pub mod connection;
pub mod error;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use connection::{Connection, Handler};
pub use error::HttpError;
pub use headers::Headers;
pub use parser::{RequestParser, read_request};
pub use request::{ParseState, Request, RequestLine};
pub use response::{Response, ResponseBuilder, StatusCode};
pub use writer::{ResponseWriter, WriterState};
