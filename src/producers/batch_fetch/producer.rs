use super::batch_fetch_producer::{BatchFetchProducer, FetchOutcome};
use crate::error::{ErrorAction, StreamError};
use crate::producer::{Producer, ProducerConfig};
use crate::sources::fetch_with_timeout;
use async_stream::stream;
use tracing::{debug, warn};

impl Producer for BatchFetchProducer {
  fn produce(&mut self) -> Self::OutputStream {
    let this = self.clone();
    let component_name = self.component_info().name;

    Box::pin(stream! {
      for request in this.requests.iter().copied() {
        let result =
          fetch_with_timeout(this.source.as_ref(), request.number_type, this.timeout).await;
        let outcome = match result {
          Ok(batch) => {
            debug!(
              component = %component_name,
              number_type = %request.number_type,
              len = batch.len(),
              "batch fetched"
            );
            FetchOutcome { request, result: Ok(batch) }
          }
          Err(e) => {
            let outcome = FetchOutcome { request, result: Err(e.clone()) };
            let error = StreamError::new(
              Box::new(e),
              this.create_error_context(Some(outcome.clone())),
              this.component_info(),
            );
            match this.handle_error(&error) {
              ErrorAction::Skip => {
                warn!(
                  component = %component_name,
                  number_type = %request.number_type,
                  error = %error,
                  "dropping failed fetch"
                );
                continue;
              }
              ErrorAction::Stop => {
                warn!(
                  component = %component_name,
                  number_type = %request.number_type,
                  error = %error,
                  "stopping after failed fetch"
                );
                yield outcome;
                break;
              }
              ErrorAction::Retry => {
                warn!(
                  component = %component_name,
                  number_type = %request.number_type,
                  error = %error,
                  "fetch failed"
                );
                outcome
              }
            }
          }
        };
        yield outcome;
      }
    })
  }

  fn set_config_impl(&mut self, config: ProducerConfig<FetchOutcome>) {
    self.config = config;
  }

  fn get_config_impl(&self) -> &ProducerConfig<FetchOutcome> {
    &self.config
  }

  fn get_config_mut_impl(&mut self) -> &mut ProducerConfig<FetchOutcome> {
    &mut self.config
  }
}
