//! # windowavg
//!
//! Sliding-window average over batches of numbers fetched from a remote
//! service.
//!
//! Each trigger fetches one batch for a number category (primes, Fibonacci,
//! even or random), drops anything that is not a number, and folds the
//! rest into a bounded window of distinct values. Every step reports the
//! window before and after, the batch itself, and the window average
//! rounded to two decimals.
//!
//! ## Layout
//!
//! - [`window`]: the pure state transition and the owning [`window::WindowAverager`]
//! - [`sources`]: where batches come from (remote HTTP service or local mock)
//! - [`producers`], [`transformers`], [`consumers`], [`pipeline`]: the
//!   fetch → average → report pipeline
//! - [`server`]: the same window served over HTTP
//! - [`config`]: `WINDOWAVG_*` configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use windowavg::window::{WindowAverager, WindowSize};
//!
//! let mut averager = WindowAverager::new();
//! let snapshot = averager.ingest(&[json!(3), json!("x"), json!(5), json!(5)], WindowSize::default());
//!
//! assert_eq!(snapshot.avg, Some(4.0));
//! assert_eq!(snapshot.numbers.len(), 2);
//! ```

#![deny(missing_docs)]

/// Service configuration read from the environment.
pub mod config;
/// Consumers that end a pipeline.
pub mod consumers;
/// Consumer trait and configuration.
pub mod consumer;
/// Domain errors and the component error model.
pub mod error;
/// Input side of pipeline components.
pub mod input;
/// Observations and number categories.
pub mod number;
/// Output side of pipeline components.
pub mod output;
/// Typestate pipeline builder.
pub mod pipeline;
/// Producer trait and configuration.
pub mod producer;
/// Producers that start a pipeline.
pub mod producers;
/// HTTP service over a shared window.
pub mod server;
/// Number sources.
pub mod sources;
/// Transformer trait and configuration.
pub mod transformer;
/// Transformers that sit between producer and consumer.
pub mod transformers;
/// Sliding window state and transitions.
pub mod window;

#[cfg(test)]
mod server_test;

pub use config::{ServiceConfig, SourceKind};
pub use consumers::SnapshotConsumer;
pub use error::{AverageError, ConfigError, SourceError};
pub use number::{NumberType, Observation};
pub use pipeline::Pipeline;
pub use producers::{BatchFetchProducer, FetchOutcome, FetchRequest};
pub use server::AverageService;
pub use sources::{HttpNumberSource, MockNumberSource, NumberSource};
pub use transformers::{Report, WindowAverageTransformer};
pub use window::{Snapshot, WindowAverager, WindowSize, WindowState, ingest, round2};
