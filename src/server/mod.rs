//! Accept loop and request routing.

pub mod listener;
pub mod routes;
