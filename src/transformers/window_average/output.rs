use crate::output::Output;
use crate::transformers::window_average::window_average_transformer::{
  Report, WindowAverageTransformer,
};
use futures::Stream;
use std::pin::Pin;

impl Output for WindowAverageTransformer {
  type Output = Report;
  type OutputStream = Pin<Box<dyn Stream<Item = Report> + Send>>;
}
