//! Numeric observations and the number categories they are drawn from.
//!
//! An [`Observation`] is a finite `f64` compared by numeric value, so `5` and
//! `5.0` arriving in different batches are the same window member. It
//! serialises back as a JSON integer whenever it is integral, which keeps
//! `[2, 3, 5]` looking like the source sent it.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Largest magnitude at which every integer is exactly representable in `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A single finite number seen on a stream.
#[derive(Debug, Clone, Copy)]
pub struct Observation(f64);

impl Observation {
  /// Wraps `value`, rejecting NaN and infinities.
  ///
  /// Negative zero is folded into positive zero so the two never coexist in
  /// a window.
  pub fn new(value: f64) -> Option<Self> {
    if !value.is_finite() {
      return None;
    }
    Some(Self(if value == 0.0 { 0.0 } else { value }))
  }

  /// Extracts an observation from a raw JSON value.
  ///
  /// Only JSON numbers qualify: strings, `null`, booleans, arrays and objects
  /// yield `None`, even when a string would parse as a number.
  pub fn from_json(value: &Value) -> Option<Self> {
    match value {
      Value::Number(n) => n.as_f64().and_then(Self::new),
      _ => None,
    }
  }

  /// The numeric value.
  pub fn value(self) -> f64 {
    self.0
  }

  fn as_exact_integer(self) -> Option<i64> {
    (self.0.fract() == 0.0 && self.0.abs() <= MAX_EXACT_INTEGER).then_some(self.0 as i64)
  }
}

impl PartialEq for Observation {
  fn eq(&self, other: &Self) -> bool {
    self.0 == other.0
  }
}

impl Eq for Observation {}

impl Hash for Observation {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.to_bits().hash(state);
  }
}

impl From<i32> for Observation {
  fn from(value: i32) -> Self {
    Self(f64::from(value))
  }
}

impl TryFrom<f64> for Observation {
  type Error = f64;

  fn try_from(value: f64) -> Result<Self, Self::Error> {
    Self::new(value).ok_or(value)
  }
}

impl fmt::Display for Observation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.as_exact_integer() {
      Some(i) => write!(f, "{}", i),
      None => write!(f, "{}", self.0),
    }
  }
}

impl Serialize for Observation {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self.as_exact_integer() {
      Some(i) => serializer.serialize_i64(i),
      None => serializer.serialize_f64(self.0),
    }
  }
}

impl<'de> Deserialize<'de> for Observation {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Self::new(value).ok_or_else(|| serde::de::Error::custom("observation must be finite"))
  }
}

/// The category of numbers a batch is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberType {
  /// Prime numbers.
  #[serde(rename = "p", alias = "prime", alias = "primes")]
  Prime,
  /// Fibonacci numbers.
  #[serde(rename = "f", alias = "fibonacci", alias = "fibo")]
  Fibonacci,
  /// Even numbers.
  #[serde(rename = "e", alias = "even")]
  Even,
  /// Random numbers.
  #[serde(rename = "r", alias = "random", alias = "rand")]
  Random,
}

impl NumberType {
  /// Every category, in selector order.
  pub const ALL: [NumberType; 4] = [
    NumberType::Prime,
    NumberType::Fibonacci,
    NumberType::Even,
    NumberType::Random,
  ];

  /// Single-letter token used in routes and configuration.
  pub fn token(self) -> &'static str {
    match self {
      NumberType::Prime => "p",
      NumberType::Fibonacci => "f",
      NumberType::Even => "e",
      NumberType::Random => "r",
    }
  }

  /// Path segment of the remote endpoint serving this category.
  pub fn endpoint(self) -> &'static str {
    match self {
      NumberType::Prime => "primes",
      NumberType::Fibonacci => "fibo",
      NumberType::Even => "even",
      NumberType::Random => "rand",
    }
  }

  /// Human-readable label.
  pub fn label(self) -> &'static str {
    match self {
      NumberType::Prime => "Prime",
      NumberType::Fibonacci => "Fibonacci",
      NumberType::Even => "Even",
      NumberType::Random => "Random",
    }
  }
}

impl fmt::Display for NumberType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for NumberType {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "p" | "prime" | "primes" => Ok(NumberType::Prime),
      "f" | "fibonacci" | "fibo" => Ok(NumberType::Fibonacci),
      "e" | "even" => Ok(NumberType::Even),
      "r" | "random" | "rand" => Ok(NumberType::Random),
      _ => Err(ConfigError::UnknownNumberType(s.to_string())),
    }
  }
}
