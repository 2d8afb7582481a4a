//! Number sources: where batches come from.
//!
//! A [`NumberSource`] answers one request for one [`NumberType`] with a raw
//! batch of JSON values. It does not filter or deduplicate; that belongs to
//! [`crate::window::ingest`]. It must fail with a [`SourceError`] rather than
//! hand back a partial batch.
//!
//! - [`HttpNumberSource`]: the remote evaluation service
//! - [`MockNumberSource`]: fixed local tables with simulated latency

use crate::error::SourceError;
use crate::number::NumberType;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// The remote number service.
pub mod http_source;
/// Local generator for offline runs and tests.
pub mod mock_source;

pub use http_source::{HttpNumberSource, HttpSourceConfig};
pub use mock_source::MockNumberSource;

/// Something that can be asked for a batch of numbers.
#[async_trait]
pub trait NumberSource: Send + Sync {
  /// Fetches one batch for `number_type`.
  async fn fetch(&self, number_type: NumberType) -> Result<Vec<Value>, SourceError>;

  /// Short name used in logs.
  fn name(&self) -> &str;
}

#[async_trait]
impl<S> NumberSource for Arc<S>
where
  S: NumberSource + ?Sized,
{
  async fn fetch(&self, number_type: NumberType) -> Result<Vec<Value>, SourceError> {
    self.as_ref().fetch(number_type).await
  }

  fn name(&self) -> &str {
    self.as_ref().name()
  }
}

/// Fetches from `source`, giving up after `timeout`.
///
/// Dropping the source future on timeout is safe: sources never touch window
/// state.
pub async fn fetch_with_timeout(
  source: &dyn NumberSource,
  number_type: NumberType,
  timeout: Duration,
) -> Result<Vec<Value>, SourceError> {
  match tokio::time::timeout(timeout, source.fetch(number_type)).await {
    Ok(result) => result,
    Err(_) => {
      warn!(
        source = source.name(),
        number_type = %number_type,
        timeout_ms = timeout.as_millis() as u64,
        "fetch timed out"
      );
      Err(SourceError::Timeout(timeout))
    }
  }
}
