//! Integration tests: in-process echo transport and a mock HTTP server

pub mod batching;
pub mod http_transport;
