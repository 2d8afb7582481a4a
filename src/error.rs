//! # Error Handling
//!
//! Two layers of errors live here.
//!
//! The domain layer classifies everything that can go wrong around a window:
//!
//! - [`SourceError`]: the number source failed or timed out. The window is
//!   never touched when a fetch fails.
//! - [`ConfigError`]: a window size, number type or service setting was
//!   rejected at the boundary, before anything reaches the core.
//! - [`AverageError`]: the top-level error used by the binary and the HTTP
//!   service.
//!
//! Non-numeric entries in a fetched batch are not errors at all: they are
//! dropped silently by [`crate::window::ingest`].
//!
//! The component layer decides what a pipeline component does when an item
//! fails:
//!
//! - [`ErrorAction`]: Stop, Skip, or Retry
//! - [`ErrorStrategy`]: the configured policy (Stop, Skip, Retry(n), Custom)
//! - [`StreamError`]: the failure with its [`ErrorContext`] and [`ComponentInfo`]
//!
//! ## Example
//!
//! ```rust
//! use windowavg::error::{ComponentInfo, ErrorAction, ErrorContext, ErrorStrategy, StreamError};
//!
//! let strategy: ErrorStrategy<i32> = ErrorStrategy::new_custom(|error| {
//!   if error.retries < 2 {
//!     ErrorAction::Retry
//!   } else {
//!     ErrorAction::Stop
//!   }
//! });
//!
//! let error: StreamError<i32> = StreamError::new(
//!   Box::new(std::io::Error::other("boom")),
//!   ErrorContext::default(),
//!   ComponentInfo::new("fetch".to_string(), "BatchFetchProducer".to_string()),
//! );
//! assert!(matches!(strategy, ErrorStrategy::Custom(_)));
//! assert_eq!(error.retries, 0);
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Status line surfaced to users whenever a fetch fails for any reason.
pub const FETCH_FAILED_STATUS: &str = "Error fetching numbers or request timed out.";

/// Failure of a number source. Any of these leaves the window untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
  /// The fetch did not complete within the configured bound.
  #[error("request timed out after {}ms", .0.as_millis())]
  Timeout(Duration),
  /// Connecting, sending, or reading the response failed.
  #[error("transport error: {0}")]
  Transport(String),
  /// The source answered with a non-success status code.
  #[error("source responded with status {0}")]
  Status(u16),
  /// The response body was not a JSON object with a `numbers` array.
  #[error("malformed response body: {0}")]
  MalformedBody(String),
  /// The request URL could not be built.
  #[error("invalid source url: {0}")]
  InvalidUrl(String),
}

/// A rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
  /// Window size outside `1..=100`.
  #[error("window size {0} is outside the range 1..=100")]
  WindowSizeOutOfRange(i64),
  /// Window size that is not an integer at all.
  #[error("window size {0:?} is not an integer")]
  InvalidWindowSize(String),
  /// Number type token not in `p`, `f`, `e`, `r` (or their long names).
  #[error("unknown number type {0:?}")]
  UnknownNumberType(String),
  /// Timeout that is not a non-negative number of milliseconds.
  #[error("invalid timeout {0:?}")]
  InvalidTimeout(String),
  /// Bind address that does not parse as a socket address.
  #[error("invalid bind address {0:?}")]
  InvalidAddress(String),
  /// Source kind other than `mock` or `http`.
  #[error("unknown source kind {0:?}, expected \"mock\" or \"http\"")]
  UnknownSourceKind(String),
  /// Log level that `tracing` does not know.
  #[error("invalid log level {0:?}")]
  InvalidLogLevel(String),
  /// Command line that could not be understood.
  #[error("usage: {0}")]
  Usage(String),
}

/// Top-level error for the service and the binary.
#[derive(Debug, thiserror::Error)]
pub enum AverageError {
  /// The number source is unavailable.
  #[error(transparent)]
  SourceUnavailable(#[from] SourceError),
  /// A configuration value was rejected.
  #[error(transparent)]
  InvalidConfiguration(#[from] ConfigError),
  /// Socket or stdout failure.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Action to take when an error occurs in a pipeline component.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorAction {
  /// Stop processing immediately.
  Stop,
  /// Skip the item that caused the error and continue processing.
  Skip,
  /// Retry the operation that caused the error.
  Retry,
}

type CustomErrorHandler<T> = Arc<dyn Fn(&StreamError<T>) -> ErrorAction + Send + Sync>;

/// Strategy for handling errors in pipeline components.
///
/// Strategies are set per component through its config and consulted via
/// `handle_error`.
pub enum ErrorStrategy<T> {
  /// Stop processing immediately when an error occurs.
  ///
  /// This is the default strategy.
  Stop,
  /// Skip items that cause errors and continue processing.
  Skip,
  /// Retry failed operations up to the specified number of times.
  Retry(usize),
  /// Custom error handling logic.
  Custom(CustomErrorHandler<T>),
}

impl<T: fmt::Debug + Clone + Send + Sync> Clone for ErrorStrategy<T> {
  fn clone(&self) -> Self {
    match self {
      ErrorStrategy::Stop => ErrorStrategy::Stop,
      ErrorStrategy::Skip => ErrorStrategy::Skip,
      ErrorStrategy::Retry(n) => ErrorStrategy::Retry(*n),
      ErrorStrategy::Custom(handler) => ErrorStrategy::Custom(handler.clone()),
    }
  }
}

impl<T: fmt::Debug + Clone + Send + Sync> fmt::Debug for ErrorStrategy<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorStrategy::Stop => write!(f, "ErrorStrategy::Stop"),
      ErrorStrategy::Skip => write!(f, "ErrorStrategy::Skip"),
      ErrorStrategy::Retry(n) => write!(f, "ErrorStrategy::Retry({})", n),
      ErrorStrategy::Custom(_) => write!(f, "ErrorStrategy::Custom"),
    }
  }
}

impl<T: fmt::Debug + Clone + Send + Sync> PartialEq for ErrorStrategy<T> {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (ErrorStrategy::Stop, ErrorStrategy::Stop) => true,
      (ErrorStrategy::Skip, ErrorStrategy::Skip) => true,
      (ErrorStrategy::Retry(n1), ErrorStrategy::Retry(n2)) => n1 == n2,
      (ErrorStrategy::Custom(_), ErrorStrategy::Custom(_)) => true,
      _ => false,
    }
  }
}

impl<T: fmt::Debug + Clone + Send + Sync> ErrorStrategy<T> {
  /// Creates a custom error handling strategy with a user-defined handler function.
  pub fn new_custom<F>(f: F) -> Self
  where
    F: Fn(&StreamError<T>) -> ErrorAction + Send + Sync + 'static,
  {
    Self::Custom(Arc::new(f))
  }
}

/// Error that occurred while a component was processing an item.
#[derive(Debug)]
pub struct StreamError<T> {
  /// The original error that occurred.
  pub source: Box<dyn Error + Send + Sync>,
  /// Context about when and where the error occurred.
  pub context: ErrorContext<T>,
  /// Information about the component that encountered the error.
  pub component: ComponentInfo,
  /// Number of times this error has been retried.
  pub retries: usize,
}

impl<T: fmt::Debug + Clone + Send + Sync> Clone for StreamError<T> {
  fn clone(&self) -> Self {
    Self {
      source: Box::new(StringError(self.source.to_string())),
      context: self.context.clone(),
      component: self.component.clone(),
      retries: self.retries,
    }
  }
}

/// A simple error type that wraps a string message.
#[derive(Debug)]
pub struct StringError(pub String);

impl fmt::Display for StringError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Error for StringError {}

impl<T: fmt::Debug + Clone + Send + Sync> StreamError<T> {
  /// Creates a new `StreamError` with `retries` set to 0.
  pub fn new(
    source: Box<dyn Error + Send + Sync>,
    context: ErrorContext<T>,
    component: ComponentInfo,
  ) -> Self {
    Self {
      source,
      context,
      component,
      retries: 0,
    }
  }
}

impl<T: fmt::Debug + Clone + Send + Sync> fmt::Display for StreamError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Error in {} ({}): {}",
      self.component.name, self.component.type_name, self.source
    )
  }
}

impl<T: fmt::Debug + Clone + Send + Sync> Error for StreamError<T> {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    Some(self.source.as_ref())
  }
}

/// Context information about when and where an error occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext<T> {
  /// The timestamp when the error occurred.
  pub timestamp: chrono::DateTime<chrono::Utc>,
  /// The item being processed when the error occurred, if available.
  pub item: Option<T>,
  /// The name of the component that encountered the error.
  pub component_name: String,
  /// The type of the component that encountered the error.
  pub component_type: String,
}

impl<T: fmt::Debug + Clone + Send + Sync> Default for ErrorContext<T> {
  fn default() -> Self {
    Self {
      timestamp: chrono::Utc::now(),
      item: None,
      component_name: "default".to_string(),
      component_type: "default".to_string(),
    }
  }
}

/// Name and type of a pipeline component, for logs and error reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInfo {
  /// The name of the component.
  pub name: String,
  /// The type name of the component.
  pub type_name: String,
}

impl Default for ComponentInfo {
  fn default() -> Self {
    Self {
      name: "default".to_string(),
      type_name: "default".to_string(),
    }
  }
}

impl ComponentInfo {
  /// Creates a new `ComponentInfo` with the given name and type name.
  pub fn new(name: String, type_name: String) -> Self {
    Self { name, type_name }
  }
}
