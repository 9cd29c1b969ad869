//! Upstream relaying
//!
//! This module fetches resources from a configured upstream server and
//! streams them back to the client as chunked responses with trailers.

pub mod upstream;

pub use upstream::Upstream;
