use crate::error::{ErrorStrategy, FETCH_FAILED_STATUS};
use crate::producers::FetchOutcome;
use crate::transformer::TransformerConfig;
use crate::window::{Snapshot, WindowAverager};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// What the pipeline reports for one fetch outcome.
///
/// Serialises as the bare snapshot on success and as
/// `{"error": <status>, "snapshot": <unchanged snapshot>}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
  /// The batch was ingested.
  Snapshot(Snapshot),
  /// The fetch failed; the window was left as it was.
  Failed {
    /// User-visible status line.
    #[serde(rename = "error")]
    status: String,
    /// Snapshot of the untouched state.
    snapshot: Snapshot,
  },
}

impl Report {
  /// A failure report carrying the standard status line.
  pub fn failed(snapshot: Snapshot) -> Self {
    Report::Failed {
      status: FETCH_FAILED_STATUS.to_string(),
      snapshot,
    }
  }

  /// The snapshot carried by either variant.
  pub fn snapshot(&self) -> &Snapshot {
    match self {
      Report::Snapshot(snapshot) => snapshot,
      Report::Failed { snapshot, .. } => snapshot,
    }
  }

  /// Whether this report describes a failed fetch.
  pub fn is_failure(&self) -> bool {
    matches!(self, Report::Failed { .. })
  }
}

/// A stateful transformer folding fetch outcomes into one sliding window.
///
/// Clones share the same window, so the state survives across
/// `transform` calls and across clones handed to a pipeline.
///
/// On a failed fetch the configured error strategy decides what happens:
/// `Skip` drops the failure silently, `Stop` reports it and ends the
/// stream, anything else reports it and carries on.
#[derive(Debug, Clone)]
pub struct WindowAverageTransformer {
  averager: Arc<Mutex<WindowAverager>>,
  /// Configuration for the transformer, including error handling strategy.
  pub config: TransformerConfig<FetchOutcome>,
}

impl Default for WindowAverageTransformer {
  fn default() -> Self {
    Self::new()
  }
}

impl WindowAverageTransformer {
  /// Creates a transformer with an empty window.
  pub fn new() -> Self {
    Self::with_averager(WindowAverager::new())
  }

  /// Creates a transformer resuming from `averager`.
  pub fn with_averager(averager: WindowAverager) -> Self {
    Self {
      averager: Arc::new(Mutex::new(averager)),
      config: TransformerConfig::default(),
    }
  }

  /// Sets the error handling strategy for this transformer.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy<FetchOutcome>) -> Self {
    self.config = self.config.with_error_strategy(strategy);
    self
  }

  /// Sets the name for this transformer.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.config = self.config.with_name(name);
    self
  }

  /// Snapshot of the current window.
  pub fn snapshot(&self) -> Snapshot {
    self.lock().snapshot()
  }

  pub(crate) fn lock(&self) -> MutexGuard<'_, WindowAverager> {
    self
      .averager
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
