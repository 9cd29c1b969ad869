//! httpwire - HTTP/1.1 over raw TCP
//!
//! Request parsing and response serialization written directly against
//! byte streams, plus the small server that exercises them.

pub mod config;
pub mod http;
pub mod proxy;
pub mod server;
