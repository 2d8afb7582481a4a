//! Transformers that sit between a producer and a consumer.

/// Folds fetch outcomes into a sliding window.
pub mod window_average;

pub use window_average::window_average_transformer::{Report, WindowAverageTransformer};
