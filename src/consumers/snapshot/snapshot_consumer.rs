use crate::consumer::ConsumerConfig;
use crate::error::ErrorStrategy;
use crate::transformers::Report;
use tokio::io::AsyncWrite;

/// Sink the consumer mirrors reports to.
pub type ReportSink = Box<dyn AsyncWrite + Send + Unpin>;

/// A consumer that collects every report and can mirror each one as a JSON
/// line to an async writer.
pub struct SnapshotConsumer {
  /// Reports received so far, in arrival order.
  pub reports: Vec<Report>,
  pub(crate) sink: Option<ReportSink>,
  /// Configuration for the consumer, including error handling strategy.
  pub config: ConsumerConfig<Report>,
}

impl Default for SnapshotConsumer {
  fn default() -> Self {
    Self::new()
  }
}

impl SnapshotConsumer {
  /// Creates a consumer that only collects.
  pub fn new() -> Self {
    Self {
      reports: Vec::new(),
      sink: None,
      config: ConsumerConfig::default(),
    }
  }

  /// Also writes each report as one line of JSON to `sink`.
  #[must_use]
  pub fn with_sink<W>(mut self, sink: W) -> Self
  where
    W: AsyncWrite + Send + Unpin + 'static,
  {
    self.sink = Some(Box::new(sink));
    self
  }

  /// Sets the error handling strategy for this consumer.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy<Report>) -> Self {
    self.config.error_strategy = strategy;
    self
  }

  /// Sets the name for this consumer.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.config.name = name;
    self
  }

  /// The collected reports.
  pub fn reports(&self) -> &[Report] {
    &self.reports
  }

  /// Takes the collected reports, leaving the consumer empty.
  pub fn into_reports(self) -> Vec<Report> {
    self.reports
  }
}

impl std::fmt::Debug for SnapshotConsumer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SnapshotConsumer")
      .field("reports", &self.reports)
      .field("sink", &self.sink.is_some())
      .field("config", &self.config)
      .finish()
  }
}
