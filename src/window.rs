//! Bounded sliding window of unique observations with a running average.
//!
//! # Overview
//!
//! A window is an ordered sequence of distinct [`Observation`]s, oldest
//! first, holding at most [`WindowSize`] members. Each ingestion:
//!
//! 1. keeps only numeric entries of the raw batch (anything else is dropped
//!    without error),
//! 2. deduplicates the batch in first-occurrence order,
//! 3. appends the batch to the window, keeping the existing position of any
//!    value already present,
//! 4. evicts from the front until the window fits the size supplied with
//!    this call,
//! 5. recomputes the average, rounded to two decimals.
//!
//! Eviction is FIFO over distinct values, not over raw arrivals: a value
//! that is already in the window does not move to the back when it is seen
//! again.
//!
//! # Core Types
//!
//! - [`WindowState`]: the four pieces of state (window, previous window,
//!   last batch, average), owned by the caller
//! - [`ingest`] / [`ingest_observations`]: pure state transitions
//! - [`WindowAverager`]: owning wrapper that keeps one state and hands out
//!   [`Snapshot`]s
//! - [`Snapshot`]: the externally visible result, serialised as
//!   `{"windowPrevState", "windowCurrState", "numbers", "avg"}`
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use windowavg::window::{WindowAverager, WindowSize};
//!
//! let mut averager = WindowAverager::new();
//! let size = WindowSize::new(3)?;
//!
//! averager.ingest(&[json!(1), json!(2), json!(3)], size);
//! let snapshot = averager.ingest(&[json!(4)], size);
//!
//! assert_eq!(serde_json::to_value(&snapshot)?, json!({
//!   "windowPrevState": [1, 2, 3],
//!   "windowCurrState": [2, 3, 4],
//!   "numbers": [4],
//!   "avg": 3.0
//! }));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::ConfigError;
use crate::number::Observation;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Smallest accepted window capacity.
pub const MIN_WINDOW_SIZE: usize = 1;
/// Largest accepted window capacity.
pub const MAX_WINDOW_SIZE: usize = 100;
/// Capacity used when none is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Validated window capacity in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WindowSize(usize);

impl WindowSize {
  /// Validates `size` against `1..=100`.
  pub fn new(size: i64) -> Result<Self, ConfigError> {
    if size < MIN_WINDOW_SIZE as i64 || size > MAX_WINDOW_SIZE as i64 {
      return Err(ConfigError::WindowSizeOutOfRange(size));
    }
    Ok(Self(size as usize))
  }

  /// The capacity.
  pub fn get(self) -> usize {
    self.0
  }
}

impl Default for WindowSize {
  fn default() -> Self {
    Self(DEFAULT_WINDOW_SIZE)
  }
}

impl fmt::Display for WindowSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for WindowSize {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let size = s
      .trim()
      .parse::<i64>()
      .map_err(|_| ConfigError::InvalidWindowSize(s.to_string()))?;
    Self::new(size)
  }
}

impl TryFrom<usize> for WindowSize {
  type Error = ConfigError;

  fn try_from(size: usize) -> Result<Self, Self::Error> {
    Self::new(i64::try_from(size).unwrap_or(i64::MAX))
  }
}

impl<'de> Deserialize<'de> for WindowSize {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let size = i64::deserialize(deserializer)?;
    Self::new(size).map_err(serde::de::Error::custom)
  }
}

/// Externally visible result of one ingestion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
  /// Window before the ingestion.
  #[serde(rename = "windowPrevState")]
  pub window_prev_state: Vec<Observation>,
  /// Window after the ingestion.
  #[serde(rename = "windowCurrState")]
  pub window_curr_state: Vec<Observation>,
  /// Deduplicated numeric entries of the ingested batch.
  pub numbers: Vec<Observation>,
  /// Average of the current window rounded to two decimals, `null` when empty.
  pub avg: Option<f64>,
}

/// The full state of one window.
///
/// Every field is replaced wholesale on each transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowState {
  window: Vec<Observation>,
  previous_window: Vec<Observation>,
  last_batch: Vec<Observation>,
  average: Option<f64>,
}

impl WindowState {
  /// An empty window with no history.
  pub fn new() -> Self {
    Self::default()
  }

  /// Current window members, oldest first.
  pub fn window(&self) -> &[Observation] {
    &self.window
  }

  /// Window as it was before the most recent ingestion.
  pub fn previous_window(&self) -> &[Observation] {
    &self.previous_window
  }

  /// Deduplicated numeric entries of the most recent batch.
  pub fn last_batch(&self) -> &[Observation] {
    &self.last_batch
  }

  /// Rounded average of the current window.
  pub fn average(&self) -> Option<f64> {
    self.average
  }

  /// Copies the state into its serialisable form.
  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      window_prev_state: self.previous_window.clone(),
      window_curr_state: self.window.clone(),
      numbers: self.last_batch.clone(),
      avg: self.average,
    }
  }
}

/// Rounds to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

fn dedupe<I>(values: I) -> Vec<Observation>
where
  I: IntoIterator<Item = Observation>,
{
  let mut seen = HashSet::new();
  values.into_iter().filter(|o| seen.insert(*o)).collect()
}

fn mean(values: &[Observation]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  let sum: f64 = values.iter().map(|o| o.value()).sum();
  Some(sum / values.len() as f64)
}

/// Applies one raw batch to `state` and returns the next state.
///
/// Entries that are not JSON numbers are dropped. `state` itself is not
/// modified, so a caller that abandons the result leaves no trace.
pub fn ingest(state: &WindowState, raw: &[Value], max_size: WindowSize) -> WindowState {
  let batch: Vec<Observation> = raw
    .iter()
    .filter_map(|value| {
      let observation = Observation::from_json(value);
      if observation.is_none() {
        trace!(value = %value, "dropping non-numeric entry");
      }
      observation
    })
    .collect();
  ingest_observations(state, &batch, max_size)
}

/// Applies one batch of already-typed observations to `state`.
pub fn ingest_observations(
  state: &WindowState,
  batch: &[Observation],
  max_size: WindowSize,
) -> WindowState {
  let last_batch = dedupe(batch.iter().copied());
  let mut window = dedupe(state.window.iter().chain(last_batch.iter()).copied());

  let excess = window.len().saturating_sub(max_size.get());
  window.drain(..excess);

  let average = mean(&window).map(round2);

  debug!(
    batch = last_batch.len(),
    evicted = excess,
    window = window.len(),
    max_size = max_size.get(),
    average = ?average,
    "window updated"
  );

  WindowState {
    window,
    previous_window: state.window.clone(),
    last_batch,
    average,
  }
}

/// Owns one [`WindowState`] and advances it batch by batch.
///
/// Callers must not interleave two `ingest` calls on the same averager;
/// the HTTP service guarantees this by holding a mutex across fetch and
/// ingest.
#[derive(Debug, Clone, Default)]
pub struct WindowAverager {
  state: WindowState,
}

impl WindowAverager {
  /// Creates an averager with an empty window.
  pub fn new() -> Self {
    Self::default()
  }

  /// Resumes from an existing state.
  pub fn from_state(state: WindowState) -> Self {
    Self { state }
  }

  /// Ingests a raw batch and returns the resulting snapshot.
  pub fn ingest(&mut self, raw: &[Value], max_size: WindowSize) -> Snapshot {
    self.state = ingest(&self.state, raw, max_size);
    self.state.snapshot()
  }

  /// Ingests a typed batch and returns the resulting snapshot.
  pub fn ingest_observations(&mut self, batch: &[Observation], max_size: WindowSize) -> Snapshot {
    self.state = ingest_observations(&self.state, batch, max_size);
    self.state.snapshot()
  }

  /// Snapshot of the current state without changing it.
  pub fn snapshot(&self) -> Snapshot {
    self.state.snapshot()
  }

  /// The current state.
  pub fn state(&self) -> &WindowState {
    &self.state
  }

  /// Forgets everything, as at construction.
  pub fn reset(&mut self) {
    self.state = WindowState::default();
  }
}
