use crate::error::{ErrorAction, StreamError};
use crate::producers::FetchOutcome;
use crate::transformer::{Transformer, TransformerConfig};
use crate::transformers::window_average::window_average_transformer::{
  Report, WindowAverageTransformer,
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{info, warn};

#[async_trait]
impl Transformer for WindowAverageTransformer {
  async fn transform(&mut self, input: Self::InputStream) -> Self::OutputStream {
    let this = self.clone();
    let mut input = input;

    Box::pin(stream! {
      while let Some(outcome) = input.next().await {
        let request = outcome.request;
        match &outcome.result {
          Ok(batch) => {
            let snapshot = this.lock().ingest(batch, request.window_size);
            info!(
              number_type = %request.number_type,
              window_size = %request.window_size,
              avg = ?snapshot.avg,
              "batch ingested"
            );
            yield Report::Snapshot(snapshot);
          }
          Err(e) => {
            let error = StreamError::new(
              Box::new(e.clone()),
              this.create_error_context(Some(outcome.clone())),
              this.component_info(),
            );
            let snapshot = this.snapshot();
            match this.handle_error(&error) {
              ErrorAction::Skip => {
                warn!(error = %error, "skipping failed fetch");
              }
              ErrorAction::Stop => {
                warn!(error = %error, "stopping after failed fetch");
                yield Report::failed(snapshot);
                break;
              }
              ErrorAction::Retry => {
                warn!(error = %error, "fetch failed, window unchanged");
                yield Report::failed(snapshot);
              }
            }
          }
        }
      }
    })
  }

  fn set_config_impl(&mut self, config: TransformerConfig<FetchOutcome>) {
    self.config = config;
  }

  fn get_config_impl(&self) -> &TransformerConfig<FetchOutcome> {
    &self.config
  }

  fn get_config_mut_impl(&mut self) -> &mut TransformerConfig<FetchOutcome> {
    &mut self.config
  }
}
