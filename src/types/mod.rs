//! # Types Module
//!
//! Core value types that flow through the batching pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Headers`] | Case-preserving header multimap with case-insensitive lookup |
//! | [`LogicalRequest`] | One caller-level HTTP request, before batching |
//! | [`Body`] | Request body shapes used for content-type inference |
//! | [`HttpResponse`] | Status, headers and body of a single HTTP reply |
//!
//! ## Example
//!
//! ```rust
//! use http_batch_rs::types::{Body, LogicalRequest};
//!
//! let req = LogicalRequest::post("https://api.example.com/v1/items?draft=true")
//!     .unwrap()
//!     .with_header("X-Trace", "abc")
//!     .unwrap()
//!     .with_body(Body::Json(serde_json::json!({"name": "widget"})));
//!
//! assert_eq!(req.path_and_query(), "/v1/items?draft=true");
//! assert_eq!(req.inferred_content_type(), Some("application/json"));
//! ```

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::{Body, LogicalRequest};
pub use response::HttpResponse;
