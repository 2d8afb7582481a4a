//! Service configuration.
//!
//! [`ServiceConfig`] is built with `with_*` methods or read from
//! `WINDOWAVG_*` environment variables. Every value is validated here, so
//! nothing downstream has to check window sizes or number types again.

use crate::error::ConfigError;
use crate::number::NumberType;
use crate::sources::http_source::DEFAULT_BASE_URL;
use crate::sources::mock_source::DEFAULT_MOCK_DELAY;
use crate::sources::{HttpNumberSource, HttpSourceConfig, MockNumberSource, NumberSource};
use crate::window::WindowSize;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Environment variable holding the HTTP bind address.
pub const ENV_BIND: &str = "WINDOWAVG_BIND";
/// Environment variable selecting the number source.
pub const ENV_SOURCE: &str = "WINDOWAVG_SOURCE";
/// Environment variable holding the remote base URL.
pub const ENV_SOURCE_URL: &str = "WINDOWAVG_SOURCE_URL";
/// Environment variable holding the fetch timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "WINDOWAVG_TIMEOUT_MS";
/// Environment variable holding the mock latency in milliseconds.
pub const ENV_MOCK_DELAY_MS: &str = "WINDOWAVG_MOCK_DELAY_MS";
/// Environment variable holding the default window size.
pub const ENV_WINDOW_SIZE: &str = "WINDOWAVG_WINDOW_SIZE";
/// Environment variable holding the default number type.
pub const ENV_NUMBER_TYPE: &str = "WINDOWAVG_NUMBER_TYPE";
/// Environment variable holding an optional bearer token.
pub const ENV_TOKEN: &str = "WINDOWAVG_TOKEN";
/// Environment variable holding the log level.
pub const ENV_LOG: &str = "WINDOWAVG_LOG";

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:9876";
/// Default fetch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Which number source to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
  /// Local fixed tables.
  #[default]
  Mock,
  /// The remote evaluation service.
  Http,
}

impl FromStr for SourceKind {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "mock" => Ok(SourceKind::Mock),
      "http" => Ok(SourceKind::Http),
      _ => Err(ConfigError::UnknownSourceKind(s.to_string())),
    }
  }
}

impl fmt::Display for SourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SourceKind::Mock => write!(f, "mock"),
      SourceKind::Http => write!(f, "http"),
    }
  }
}

/// Everything the binary and the HTTP service need to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
  /// Address the HTTP service listens on.
  pub bind: SocketAddr,
  /// Number source.
  pub source: SourceKind,
  /// Base URL of the remote service.
  pub source_url: String,
  /// Bound on one fetch.
  pub timeout: Duration,
  /// Latency the mock source simulates.
  pub mock_delay: Duration,
  /// Window size used when a request does not name one.
  pub window_size: WindowSize,
  /// Number type used by the command line runner.
  pub number_type: NumberType,
  /// Bearer token sent to the remote service.
  pub token: Option<String>,
  /// Maximum log level.
  pub log_level: Level,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      bind: SocketAddr::from(([127, 0, 0, 1], 9876)),
      source: SourceKind::Mock,
      source_url: DEFAULT_BASE_URL.to_string(),
      timeout: DEFAULT_TIMEOUT,
      mock_delay: DEFAULT_MOCK_DELAY,
      window_size: WindowSize::default(),
      number_type: NumberType::Prime,
      token: None,
      log_level: Level::INFO,
    }
  }
}

impl ServiceConfig {
  /// Reads the configuration from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Reads the configuration through `lookup`; unset keys keep their defaults.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(bind) = get(ENV_BIND) {
      config.bind = parse_bind(&bind)?;
    }
    if let Some(source) = get(ENV_SOURCE) {
      config.source = source.parse()?;
    }
    if let Some(url) = get(ENV_SOURCE_URL) {
      config.source_url = url;
    }
    if let Some(timeout) = get(ENV_TIMEOUT_MS) {
      config.timeout = parse_millis(&timeout)?;
    }
    if let Some(delay) = get(ENV_MOCK_DELAY_MS) {
      config.mock_delay = parse_millis(&delay)?;
    }
    if let Some(size) = get(ENV_WINDOW_SIZE) {
      config.window_size = size.parse()?;
    }
    if let Some(number_type) = get(ENV_NUMBER_TYPE) {
      config.number_type = number_type.parse()?;
    }
    config.token = get(ENV_TOKEN);
    if let Some(level) = get(ENV_LOG) {
      config.log_level = parse_level(&level)?;
    }
    Ok(config)
  }

  /// Sets the bind address.
  #[must_use]
  pub fn with_bind(mut self, bind: SocketAddr) -> Self {
    self.bind = bind;
    self
  }

  /// Sets the source kind.
  #[must_use]
  pub fn with_source(mut self, source: SourceKind) -> Self {
    self.source = source;
    self
  }

  /// Sets the remote base URL.
  #[must_use]
  pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
    self.source_url = url.into();
    self
  }

  /// Sets the fetch timeout.
  #[must_use]
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Sets the mock latency.
  #[must_use]
  pub fn with_mock_delay(mut self, delay: Duration) -> Self {
    self.mock_delay = delay;
    self
  }

  /// Sets the default window size.
  #[must_use]
  pub fn with_window_size(mut self, size: WindowSize) -> Self {
    self.window_size = size;
    self
  }

  /// Sets the default number type.
  #[must_use]
  pub fn with_number_type(mut self, number_type: NumberType) -> Self {
    self.number_type = number_type;
    self
  }

  /// Sets the bearer token.
  #[must_use]
  pub fn with_token(mut self, token: impl Into<String>) -> Self {
    self.token = Some(token.into());
    self
  }

  /// Sets the log level.
  #[must_use]
  pub fn with_log_level(mut self, level: Level) -> Self {
    self.log_level = level;
    self
  }

  /// Builds the configured number source.
  pub fn build_source(&self) -> Result<Arc<dyn NumberSource>, ConfigError> {
    match self.source {
      SourceKind::Mock => Ok(Arc::new(
        MockNumberSource::new().with_delay(self.mock_delay),
      )),
      SourceKind::Http => {
        let mut http = HttpSourceConfig::default()
          .with_base_url(self.source_url.clone())
          .with_timeout(self.timeout);
        if let Some(token) = &self.token {
          http = http.with_bearer_token(token)?;
        }
        Ok(Arc::new(HttpNumberSource::new(http)))
      }
    }
  }
}

fn parse_bind(value: &str) -> Result<SocketAddr, ConfigError> {
  value
    .trim()
    .parse()
    .map_err(|_| ConfigError::InvalidAddress(value.to_string()))
}

fn parse_millis(value: &str) -> Result<Duration, ConfigError> {
  value
    .trim()
    .parse::<u64>()
    .map(Duration::from_millis)
    .map_err(|_| ConfigError::InvalidTimeout(value.to_string()))
}

fn parse_level(value: &str) -> Result<Level, ConfigError> {
  value
    .trim()
    .parse()
    .map_err(|_| ConfigError::InvalidLogLevel(value.to_string()))
}
