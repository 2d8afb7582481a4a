use crate::error::{ErrorAction, ErrorStrategy, SourceError};
use crate::number::NumberType;
use crate::producer::ProducerConfig;
use crate::sources::NumberSource;
use crate::window::WindowSize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(500);

/// Default strategy of [`BatchFetchProducer`]: every failed fetch is
/// passed downstream so the transformer can report it.
pub fn forward_failures() -> ErrorStrategy<FetchOutcome> {
  ErrorStrategy::new_custom(|_| ErrorAction::Retry)
}

/// One trigger: fetch a batch of `number_type` and fold it into a window of
/// at most `window_size` members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
  /// Category to fetch.
  pub number_type: NumberType,
  /// Window capacity to apply when the batch is ingested.
  pub window_size: WindowSize,
}

impl FetchRequest {
  /// Creates a request.
  pub fn new(number_type: NumberType, window_size: WindowSize) -> Self {
    Self {
      number_type,
      window_size,
    }
  }
}

/// What came back for one [`FetchRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
  /// The request this answers.
  pub request: FetchRequest,
  /// The raw batch, or why there is none.
  pub result: Result<Vec<Value>, SourceError>,
}

/// A producer that fetches one batch per request from a [`NumberSource`].
///
/// Requests are served strictly in order and the next fetch only starts
/// once the previous one has finished or timed out, so at most one call to
/// the source is in flight.
///
/// A failed fetch goes through the error strategy: `Skip` drops it, `Stop`
/// emits it and ends the stream, anything else emits it and moves on.
#[derive(Clone)]
pub struct BatchFetchProducer {
  /// Where batches come from.
  pub source: Arc<dyn NumberSource>,
  /// Requests to serve, in order.
  pub requests: Vec<FetchRequest>,
  /// Bound applied to every fetch.
  pub timeout: Duration,
  /// Configuration for the producer, including error handling strategy.
  pub config: ProducerConfig<FetchOutcome>,
}

impl BatchFetchProducer {
  /// Creates a producer over `source` serving `requests`.
  pub fn new(source: Arc<dyn NumberSource>, requests: Vec<FetchRequest>) -> Self {
    Self {
      source,
      requests,
      timeout: DEFAULT_FETCH_TIMEOUT,
      config: ProducerConfig::default().with_error_strategy(forward_failures()),
    }
  }

  /// Creates a producer that issues the same request `count` times.
  pub fn repeated(source: Arc<dyn NumberSource>, request: FetchRequest, count: usize) -> Self {
    Self::new(source, vec![request; count])
  }

  /// Sets the per-fetch timeout.
  #[must_use]
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Sets the error handling strategy for this producer.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy<FetchOutcome>) -> Self {
    self.config.error_strategy = strategy;
    self
  }

  /// Sets the name for this producer.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.config.name = Some(name);
    self
  }
}

impl std::fmt::Debug for BatchFetchProducer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BatchFetchProducer")
      .field("source", &self.source.name())
      .field("requests", &self.requests)
      .field("timeout", &self.timeout)
      .finish()
  }
}
