//! # Producer Trait
//!
//! Producers start a pipeline. In this crate the only real producer is
//! [`crate::producers::BatchFetchProducer`], which turns fetch requests into
//! fetch outcomes, but the trait is generic so tests can feed canned
//! outcomes through the same pipeline.

use crate::error::{ComponentInfo, ErrorAction, ErrorContext, ErrorStrategy, StreamError};
use crate::output::Output;

/// Configuration for a producer: error strategy and component name.
#[derive(Debug, Clone)]
pub struct ProducerConfig<M: std::fmt::Debug + Clone + Send + Sync> {
  /// The error handling strategy to use when producing items.
  pub error_strategy: ErrorStrategy<M>,
  /// Optional name for identifying this producer in logs.
  pub name: Option<String>,
}

impl<M: std::fmt::Debug + Clone + Send + Sync> Default for ProducerConfig<M> {
  fn default() -> Self {
    Self {
      error_strategy: ErrorStrategy::Stop,
      name: None,
    }
  }
}

impl<M: std::fmt::Debug + Clone + Send + Sync> ProducerConfig<M> {
  /// Sets the error handling strategy.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy<M>) -> Self {
    self.error_strategy = strategy;
    self
  }

  /// Sets the name.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.name = Some(name);
    self
  }

  /// Returns the current error handling strategy.
  pub fn error_strategy(&self) -> ErrorStrategy<M> {
    self.error_strategy.clone()
  }

  /// Returns the current name, if set.
  pub fn name(&self) -> Option<String> {
    self.name.clone()
  }
}

/// Trait for components that produce data streams.
pub trait Producer: Output
where
  Self::Output: std::fmt::Debug + Clone + Send + Sync,
{
  /// Produces the stream of items.
  ///
  /// Calling `produce` again starts a fresh stream over the same inputs.
  fn produce(&mut self) -> Self::OutputStream;

  /// Clones the producer and applies `config` to the clone.
  #[must_use]
  fn with_config(&self, config: ProducerConfig<Self::Output>) -> Self
  where
    Self: Sized + Clone,
  {
    let mut this = self.clone();
    this.set_config(config);
    this
  }

  /// Replaces the configuration.
  fn set_config(&mut self, config: ProducerConfig<Self::Output>) {
    self.set_config_impl(config);
  }

  /// Returns the configuration.
  fn config(&self) -> &ProducerConfig<Self::Output> {
    self.get_config_impl()
  }

  /// Returns the configuration mutably.
  fn config_mut(&mut self) -> &mut ProducerConfig<Self::Output> {
    self.get_config_mut_impl()
  }

  /// Maps an error to the action the configured strategy prescribes.
  fn handle_error(&self, error: &StreamError<Self::Output>) -> ErrorAction {
    match self.config().error_strategy() {
      ErrorStrategy::Stop => ErrorAction::Stop,
      ErrorStrategy::Skip => ErrorAction::Skip,
      ErrorStrategy::Retry(n) if error.retries < n => ErrorAction::Retry,
      ErrorStrategy::Custom(ref handler) => handler(error),
      _ => ErrorAction::Stop,
    }
  }

  /// Builds an error context stamped with the current time and this component.
  fn create_error_context(&self, item: Option<Self::Output>) -> ErrorContext<Self::Output> {
    let info = self.component_info();
    ErrorContext {
      timestamp: chrono::Utc::now(),
      item,
      component_name: info.name,
      component_type: info.type_name,
    }
  }

  /// Name and type of this producer.
  fn component_info(&self) -> ComponentInfo {
    ComponentInfo {
      name: self
        .config()
        .name()
        .unwrap_or_else(|| "producer".to_string()),
      type_name: std::any::type_name::<Self>().to_string(),
    }
  }

  /// Stores the configuration.
  fn set_config_impl(&mut self, config: ProducerConfig<Self::Output>);

  /// Returns the stored configuration.
  fn get_config_impl(&self) -> &ProducerConfig<Self::Output>;

  /// Returns the stored configuration mutably.
  fn get_config_mut_impl(&mut self) -> &mut ProducerConfig<Self::Output>;
}
