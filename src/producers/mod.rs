//! Producers that start a pipeline.

/// Fetches one batch per request from a number source.
pub mod batch_fetch;

pub use batch_fetch::batch_fetch_producer::{
  BatchFetchProducer, DEFAULT_FETCH_TIMEOUT, FetchOutcome, FetchRequest, forward_failures,
};
