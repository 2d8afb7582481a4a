//! # Consumer Trait
//!
//! Consumers end a pipeline. [`crate::consumers::SnapshotConsumer`] collects
//! reports and can mirror them as JSON lines to any async writer.

use crate::error::{ComponentInfo, ErrorAction, ErrorContext, ErrorStrategy, StreamError};
use crate::input::Input;
use async_trait::async_trait;

/// Configuration for a consumer: error strategy and component name.
#[derive(Debug, Clone)]
pub struct ConsumerConfig<M: std::fmt::Debug + Clone + Send + Sync + 'static> {
  /// The error handling strategy to use when an item cannot be consumed.
  pub error_strategy: ErrorStrategy<M>,
  /// The name of this consumer.
  pub name: String,
}

impl<M: std::fmt::Debug + Clone + Send + Sync + 'static> Default for ConsumerConfig<M> {
  fn default() -> Self {
    Self {
      error_strategy: ErrorStrategy::Stop,
      name: String::new(),
    }
  }
}

impl<M: std::fmt::Debug + Clone + Send + Sync + 'static> ConsumerConfig<M> {
  /// Sets the error handling strategy.
  #[must_use]
  pub fn with_error_strategy(mut self, strategy: ErrorStrategy<M>) -> Self {
    self.error_strategy = strategy;
    self
  }

  /// Sets the name.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.name = name;
    self
  }

  /// Returns the current error handling strategy.
  pub fn error_strategy(&self) -> ErrorStrategy<M> {
    self.error_strategy.clone()
  }

  /// Returns the current name.
  pub fn name(&self) -> &str {
    &self.name
  }
}

/// Trait for components that consume data streams.
#[async_trait]
pub trait Consumer: Input
where
  Self::Input: std::fmt::Debug + Clone + Send + Sync,
{
  /// Drains the stream.
  async fn consume(&mut self, stream: Self::InputStream);

  /// Clones the consumer and applies `config` to the clone.
  #[must_use]
  fn with_config(&self, config: ConsumerConfig<Self::Input>) -> Self
  where
    Self: Sized + Clone,
  {
    let mut this = self.clone();
    this.set_config(config);
    this
  }

  /// Replaces the configuration.
  fn set_config(&mut self, config: ConsumerConfig<Self::Input>) {
    self.set_config_impl(config);
  }

  /// Returns the configuration.
  fn config(&self) -> &ConsumerConfig<Self::Input> {
    self.get_config_impl()
  }

  /// Returns the configuration mutably.
  fn config_mut(&mut self) -> &mut ConsumerConfig<Self::Input> {
    self.get_config_mut_impl()
  }

  /// Maps an error to the action the configured strategy prescribes.
  fn handle_error(&self, error: &StreamError<Self::Input>) -> ErrorAction {
    match &self.config().error_strategy {
      ErrorStrategy::Stop => ErrorAction::Stop,
      ErrorStrategy::Skip => ErrorAction::Skip,
      ErrorStrategy::Retry(n) if error.retries < *n => ErrorAction::Retry,
      ErrorStrategy::Custom(handler) => handler(error),
      _ => ErrorAction::Stop,
    }
  }

  /// Name and type of this consumer.
  fn component_info(&self) -> ComponentInfo {
    ComponentInfo {
      name: self.config().name.clone(),
      type_name: std::any::type_name::<Self>().to_string(),
    }
  }

  /// Builds an error context stamped with the current time and this component.
  fn create_error_context(&self, item: Option<Self::Input>) -> ErrorContext<Self::Input> {
    let info = self.component_info();
    ErrorContext {
      timestamp: chrono::Utc::now(),
      item,
      component_name: info.name,
      component_type: info.type_name,
    }
  }

  /// Stores the configuration.
  fn set_config_impl(&mut self, config: ConsumerConfig<Self::Input>);
  /// Returns the stored configuration.
  fn get_config_impl(&self) -> &ConsumerConfig<Self::Input>;
  /// Returns the stored configuration mutably.
  fn get_config_mut_impl(&mut self) -> &mut ConsumerConfig<Self::Input>;
}
