use crate::input::Input;
use crate::producers::FetchOutcome;
use crate::transformers::window_average::window_average_transformer::WindowAverageTransformer;
use futures::Stream;
use std::pin::Pin;

impl Input for WindowAverageTransformer {
  type Input = FetchOutcome;
  type InputStream = Pin<Box<dyn Stream<Item = FetchOutcome> + Send>>;
}
