//! Batch fetch producer module.
//!
//! Turns a list of fetch requests into a stream of fetch outcomes.

/// The batch fetch producer implementation.
pub mod batch_fetch_producer;
/// Output types for the batch fetch producer.
pub mod output;
/// Producer trait implementation for batch fetch.
pub mod producer;
