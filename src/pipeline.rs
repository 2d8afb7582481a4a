//! # Pipeline
//!
//! Wires one producer, one transformer and one consumer together. The
//! builder is a small state machine, so a pipeline without a producer or
//! with mismatched item types does not compile:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use windowavg::consumers::SnapshotConsumer;
//! use windowavg::number::NumberType;
//! use windowavg::pipeline::Pipeline;
//! use windowavg::producers::{BatchFetchProducer, FetchRequest};
//! use windowavg::sources::MockNumberSource;
//! use windowavg::transformers::WindowAverageTransformer;
//! use windowavg::window::WindowSize;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let request = FetchRequest::new(NumberType::Prime, WindowSize::new(5)?);
//! let producer = BatchFetchProducer::repeated(Arc::new(MockNumberSource::new()), request, 3);
//!
//! let consumer = Pipeline::builder()
//!   .producer(producer)
//!   .transformer(WindowAverageTransformer::new())
//!   .consumer(SnapshotConsumer::new())
//!   .run()
//!   .await;
//!
//! assert_eq!(consumer.reports().len(), 3);
//! # Ok(())
//! # }
//! ```

use crate::{consumer::Consumer, producer::Producer, transformer::Transformer};
use tracing::debug;

/// Builder state: nothing added yet.
pub struct Empty;
/// Builder state: a producer has been added.
pub struct HasProducer<P>(P);
/// Builder state: a producer and a transformer have been added.
pub struct HasTransformer<P, T>(P, T);

/// Pipeline builder; `State` tracks which stages are present.
pub struct PipelineBuilder<State> {
  state: State,
}

/// A complete pipeline, ready to run.
pub struct Pipeline<P, T, C> {
  producer: P,
  transformer: T,
  consumer: C,
}

impl Pipeline<(), (), ()> {
  /// Starts building a pipeline.
  pub fn builder() -> PipelineBuilder<Empty> {
    PipelineBuilder::new()
  }
}

impl PipelineBuilder<Empty> {
  /// Creates an empty builder.
  pub fn new() -> Self {
    PipelineBuilder { state: Empty }
  }

  /// Adds the producer.
  pub fn producer<P>(self, producer: P) -> PipelineBuilder<HasProducer<P>>
  where
    P: Producer + 'static,
    P::Output: std::fmt::Debug + Clone + Send + Sync + 'static,
  {
    PipelineBuilder {
      state: HasProducer(producer),
    }
  }
}

impl Default for PipelineBuilder<Empty> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P> PipelineBuilder<HasProducer<P>>
where
  P: Producer + 'static,
  P::Output: std::fmt::Debug + Clone + Send + Sync + 'static,
{
  /// Adds the transformer; its input stream must accept the producer's output.
  pub fn transformer<T>(self, transformer: T) -> PipelineBuilder<HasTransformer<P, T>>
  where
    T: Transformer + Send + 'static,
    T::Input: std::fmt::Debug + Clone + Send + Sync + 'static,
    T::InputStream: From<P::OutputStream>,
  {
    let HasProducer(producer) = self.state;
    PipelineBuilder {
      state: HasTransformer(producer, transformer),
    }
  }
}

impl<P, T> PipelineBuilder<HasTransformer<P, T>>
where
  P: Producer + 'static,
  T: Transformer + Send + 'static,
  P::Output: std::fmt::Debug + Clone + Send + Sync + 'static,
  T::Input: std::fmt::Debug + Clone + Send + Sync + 'static,
{
  /// Adds the consumer; its input stream must accept the transformer's output.
  pub fn consumer<C>(self, consumer: C) -> Pipeline<P, T, C>
  where
    C: Consumer + Send + 'static,
    C::Input: std::fmt::Debug + Clone + Send + Sync + 'static,
    C::InputStream: From<T::OutputStream>,
  {
    let HasTransformer(producer, transformer) = self.state;
    Pipeline {
      producer,
      transformer,
      consumer,
    }
  }
}

impl<P, T, C> Pipeline<P, T, C>
where
  P: Producer + 'static,
  T: Transformer + Send + 'static,
  C: Consumer + Send + 'static,
  P::Output: std::fmt::Debug + Clone + Send + Sync + 'static,
  T::Input: std::fmt::Debug + Clone + Send + Sync + 'static,
  C::Input: std::fmt::Debug + Clone + Send + Sync + 'static,
  T::InputStream: From<P::OutputStream>,
  C::InputStream: From<T::OutputStream>,
{
  /// Runs the pipeline to completion and hands back the consumer.
  pub async fn run(self) -> C {
    let Pipeline {
      mut producer,
      mut transformer,
      mut consumer,
    } = self;

    debug!(
      producer = %producer.component_info().name,
      transformer = %transformer.component_info().name,
      consumer = %consumer.component_info().name,
      "running pipeline"
    );

    let produced = producer.produce();
    let transformed = transformer.transform(produced.into()).await;
    consumer.consume(transformed.into()).await;
    consumer
  }
}
