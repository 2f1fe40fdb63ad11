//! Batching client.
//!
//! Keep the public surface small: build a [`BatchClient`], call
//! [`BatchClient::send`]. Implementation details live under `src/client/`.

pub mod builder;
pub mod core;
pub mod predicate;

pub use builder::BatchClientBuilder;
pub use core::BatchClient;
pub use predicate::{is_already_batched, BatchAll, BatchPredicate};
