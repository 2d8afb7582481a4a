use crate::error::SourceError;
use crate::number::NumberType;
use crate::sources::NumberSource;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// First ten primes.
pub const PRIMES: [i64; 10] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29];
/// First ten Fibonacci numbers, including the repeated 1.
pub const FIBONACCI: [i64; 10] = [1, 1, 2, 3, 5, 8, 13, 21, 34, 55];
/// First ten positive even numbers.
pub const EVENS: [i64; 10] = [2, 4, 6, 8, 10, 12, 14, 16, 18, 20];
/// Fixed "random" table.
pub const RANDOMS: [i64; 10] = [7, 14, 2, 9, 21, 3, 11, 6, 19, 8];

/// Latency the mock simulates by default.
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(300);

/// Serves a random-length prefix of a fixed table per category.
///
/// Each fetch returns between 1 and 9 leading entries of the table, after
/// sleeping for the configured delay.
#[derive(Debug)]
pub struct MockNumberSource {
  delay: Duration,
  rng: Mutex<StdRng>,
}

impl Default for MockNumberSource {
  fn default() -> Self {
    Self::new()
  }
}

impl MockNumberSource {
  /// Creates a mock with the default delay and an entropy-seeded generator.
  pub fn new() -> Self {
    Self {
      delay: DEFAULT_MOCK_DELAY,
      rng: Mutex::new(StdRng::from_entropy()),
    }
  }

  /// Uses a fixed seed so prefix lengths are reproducible.
  #[must_use]
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.rng = Mutex::new(StdRng::seed_from_u64(seed));
    self
  }

  /// Sets the simulated latency.
  #[must_use]
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// The simulated latency.
  pub fn delay(&self) -> Duration {
    self.delay
  }

  /// The full table backing `number_type`.
  pub fn table(number_type: NumberType) -> &'static [i64; 10] {
    match number_type {
      NumberType::Prime => &PRIMES,
      NumberType::Fibonacci => &FIBONACCI,
      NumberType::Even => &EVENS,
      NumberType::Random => &RANDOMS,
    }
  }

  fn prefix_len(&self) -> usize {
    let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    rng.gen_range(0..10usize).max(1)
  }
}

#[async_trait]
impl NumberSource for MockNumberSource {
  async fn fetch(&self, number_type: NumberType) -> Result<Vec<Value>, SourceError> {
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    let len = self.prefix_len();
    let batch: Vec<Value> = Self::table(number_type)[..len]
      .iter()
      .map(|&n| Value::from(n))
      .collect();
    debug!(number_type = %number_type, len, "mock batch generated");
    Ok(batch)
  }

  fn name(&self) -> &str {
    "mock"
  }
}
