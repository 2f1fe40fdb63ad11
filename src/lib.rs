//! # http-batch-rs
//!
//! Transparent HTTP request batching over `multipart/mixed`.
//!
//! Requests sent through a [`BatchClient`] are collected into short windows.
//! A window closes when it reaches its size limit or when its time span
//! elapses since the first entry, whichever comes first. A window holding one
//! request is sent as that plain request; larger windows are encoded into a
//! single multipart body, posted to the batch endpoint, and the multipart
//! reply is split back so that every caller receives exactly its own
//! response, or the shared failure of the combined call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use http_batch_rs::{BatchClient, HttpTransportConfig, LogicalRequest};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> http_batch_rs::Result<()> {
//!     let client = BatchClient::builder()
//!         .http(HttpTransportConfig::new("https://api.example.com/api/$batch"))
//!         .max_time_span(Duration::from_millis(50))
//!         .max_size(10)
//!         .build()?;
//!
//!     let (a, b) = tokio::join!(
//!         client.send(LogicalRequest::get("https://api.example.com/users/1")?),
//!         client.send(LogicalRequest::get("https://api.example.com/users/2")?),
//!     );
//!     println!("{} {}", a?.status, b?.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Logical requests, responses and ordered header multimaps |
//! | [`codec`] | `multipart/mixed` batch encoder and decoder |
//! | [`batch`] | Window state machine, dispatch and demultiplexing |
//! | [`transport`] | Transport seam and the reqwest-backed HTTP transport |
//! | [`client`] | [`BatchClient`] front door, builder and batching predicates |
//! | [`config`] | YAML and environment configuration loading |
//! | [`error`] | Error taxonomy shared by all modules |

pub mod batch;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use batch::{BatchConfig, BatchStats};
pub use client::{BatchClient, BatchClientBuilder, BatchPredicate};
pub use config::ClientConfig;
pub use error::{Error, ErrorContext};
pub use transport::{HttpTransport, HttpTransportConfig, Transport, TransportError};
pub use types::{Body, Headers, HttpResponse, LogicalRequest};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
