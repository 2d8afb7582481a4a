//! Snapshot consumer module.
//!
//! This module provides the `SnapshotConsumer` which collects reports and
//! optionally prints them as JSON lines.

/// Consumer trait implementation for snapshots.
pub mod consumer;
/// Input type definitions for the snapshot consumer.
pub mod input;
/// The snapshot consumer implementation.
pub mod snapshot_consumer;
