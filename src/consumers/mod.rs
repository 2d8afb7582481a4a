//! Consumers that end a pipeline.

/// Collects reports and mirrors them as JSON lines.
pub mod snapshot;

pub use snapshot::snapshot_consumer::{ReportSink, SnapshotConsumer};
