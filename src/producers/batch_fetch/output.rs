use super::batch_fetch_producer::{BatchFetchProducer, FetchOutcome};
use crate::output::Output;
use futures::Stream;
use std::pin::Pin;

impl Output for BatchFetchProducer {
  type Output = FetchOutcome;
  type OutputStream = Pin<Box<dyn Stream<Item = FetchOutcome> + Send>>;
}
