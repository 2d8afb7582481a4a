//! Window average transformer module.
//!
//! Folds fetch outcomes into a sliding window and reports a snapshot for
//! each one.

/// Input types for the window average transformer.
pub mod input;
/// Output types for the window average transformer.
pub mod output;
/// Transformer trait implementation for window average.
pub mod transformer;
/// The window average transformer implementation.
pub mod window_average_transformer;
