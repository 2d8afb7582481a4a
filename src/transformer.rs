//! # Transformer Trait
//!
//! Transformers sit between a producer and a consumer and may carry state
//! across items. [`crate::transformers::WindowAverageTransformer`] is the
//! stateful one here: it owns a [`crate::window::WindowAverager`] and turns
//! fetch outcomes into reports.
//!
//! ## Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use futures::{Stream, StreamExt};
//! use std::pin::Pin;
//! use windowavg::input::Input;
//! use windowavg::output::Output;
//! use windowavg::transformer::{Transformer, TransformerConfig};
//!
//! struct Double {
//!   config: TransformerConfig<i32>,
//! }
//!
//! impl Input for Double {
//!   type Input = i32;
//!   type InputStream = Pin<Box<dyn Stream<Item = i32> + Send>>;
//! }
//!
//! impl Output for Double {
//!   type Output = i32;
//!   type OutputStream = Pin<Box<dyn Stream<Item = i32> + Send>>;
//! }
//!
//! #[async_trait]
//! impl Transformer for Double {
//!   async fn transform(&mut self, input: Self::InputStream) -> Self::OutputStream {
//!     Box::pin(input.map(|x| x * 2))
//!   }
//!
//!   fn set_config_impl(&mut self, config: TransformerConfig<i32>) {
//!     self.config = config;
//!   }
//!
//!   fn get_config_impl(&self) -> &TransformerConfig<i32> {
//!     &self.config
//!   }
//!
//!   fn get_config_mut_impl(&mut self) -> &mut TransformerConfig<i32> {
//!     &mut self.config
//!   }
//! }
//! ```

use crate::error::{ComponentInfo, ErrorAction, ErrorContext, ErrorStrategy, StreamError};
use crate::{input::Input, output::Output};
use async_trait::async_trait;

/// Configuration for a transformer: error strategy and component name.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerConfig<M: std::fmt::Debug + Clone + Send + Sync> {
  /// The error handling strategy to use when an item fails.
  pub error_strategy: ErrorStrategy<M>,
  /// Optional name for identifying this transformer in logs.
  pub name: Option<String>,
}

impl<M: std::fmt::Debug + Clone + Send + Sync> Default for TransformerConfig<M> {
  fn default() -> Self {
    Self {
      error_strategy: ErrorStrategy::Stop,
      name: None,
    }
  }
}

impl<M: std::fmt::Debug + Clone + Send + Sync> TransformerConfig<M> {
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

/// Trait for components that transform data streams.
#[async_trait]
pub trait Transformer: Input + Output
where
  Self::Input: std::fmt::Debug + Clone + Send + Sync,
{
  /// Transforms the input stream into the output stream.
  ///
  /// State the transformer keeps across items survives the call, so a
  /// second `transform` continues where the first stream left off.
  async fn transform(&mut self, input: Self::InputStream) -> Self::OutputStream;

  /// Clones the transformer and applies `config` to the clone.
  #[must_use]
  fn with_config(&self, config: TransformerConfig<Self::Input>) -> Self
  where
    Self: Sized + Clone,
  {
    let mut this = self.clone();
    this.set_config(config);
    this
  }

  /// Replaces the configuration.
  fn set_config(&mut self, config: TransformerConfig<Self::Input>) {
    self.set_config_impl(config);
  }

  /// Returns the configuration.
  fn config(&self) -> &TransformerConfig<Self::Input> {
    self.get_config_impl()
  }

  /// Returns the configuration mutably.
  fn config_mut(&mut self) -> &mut TransformerConfig<Self::Input> {
    self.get_config_mut_impl()
  }

  /// Maps an error to the action the configured strategy prescribes.
  fn handle_error(&self, error: &StreamError<Self::Input>) -> ErrorAction {
    match self.config().error_strategy() {
      ErrorStrategy::Stop => ErrorAction::Stop,
      ErrorStrategy::Skip => ErrorAction::Skip,
      ErrorStrategy::Retry(n) if error.retries < n => ErrorAction::Retry,
      ErrorStrategy::Custom(ref handler) => handler(error),
      _ => ErrorAction::Stop,
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

  /// Name and type of this transformer.
  fn component_info(&self) -> ComponentInfo {
    ComponentInfo {
      name: self
        .config()
        .name()
        .unwrap_or_else(|| "transformer".to_string()),
      type_name: std::any::type_name::<Self>().to_string(),
    }
  }

  /// Stores the configuration.
  fn set_config_impl(&mut self, config: TransformerConfig<Self::Input>);

  /// Returns the stored configuration.
  fn get_config_impl(&self) -> &TransformerConfig<Self::Input>;

  /// Returns the stored configuration mutably.
  fn get_config_mut_impl(&mut self) -> &mut TransformerConfig<Self::Input>;
}
