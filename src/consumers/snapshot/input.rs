use super::snapshot_consumer::SnapshotConsumer;
use crate::input::Input;
use crate::transformers::Report;
use futures::Stream;
use std::pin::Pin;

impl Input for SnapshotConsumer {
  type Input = Report;
  type InputStream = Pin<Box<dyn Stream<Item = Report> + Send>>;
}
