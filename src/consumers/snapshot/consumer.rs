use super::snapshot_consumer::SnapshotConsumer;
use crate::consumer::{Consumer, ConsumerConfig};
use crate::error::{ErrorAction, StreamError};
use crate::transformers::Report;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

impl SnapshotConsumer {
  async fn write_line(&mut self, report: &Report) -> Result<(), std::io::Error> {
    let Some(sink) = self.sink.as_mut() else {
      return Ok(());
    };
    let mut line = serde_json::to_vec(report).map_err(std::io::Error::other)?;
    line.push(b'\n');
    sink.write_all(&line).await?;
    sink.flush().await
  }
}

#[async_trait]
impl Consumer for SnapshotConsumer {
  async fn consume(&mut self, mut stream: Self::InputStream) {
    while let Some(report) = stream.next().await {
      if let Err(e) = self.write_line(&report).await {
        let stream_error = StreamError::new(
          Box::new(e),
          self.create_error_context(Some(report.clone())),
          self.component_info(),
        );
        match self.handle_error(&stream_error) {
          ErrorAction::Stop => {
            error!(error = %stream_error, "stopping: could not write report");
            self.reports.push(report);
            break;
          }
          ErrorAction::Skip | ErrorAction::Retry => {
            warn!(error = %stream_error, "could not write report");
          }
        }
      }
      self.reports.push(report);
    }
  }

  fn set_config_impl(&mut self, config: ConsumerConfig<Report>) {
    self.config = config;
  }

  fn get_config_impl(&self) -> &ConsumerConfig<Report> {
    &self.config
  }

  fn get_config_mut_impl(&mut self) -> &mut ConsumerConfig<Report> {
    &mut self.config
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::{ErrorStrategy, FETCH_FAILED_STATUS};
  use crate::number::Observation;
  use crate::window::Snapshot;
  use futures::stream;
  use proptest::prelude::*;
  use std::pin::Pin;
  use std::task::{Context, Poll};
  use tokio::io::AsyncWrite;

  fn snapshot_of(values: &[i32]) -> Snapshot {
    let window: Vec<Observation> = values.iter().copied().map(Observation::from).collect();
    let avg = if values.is_empty() {
      None
    } else {
      Some(values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64)
    };
    Snapshot {
      window_prev_state: Vec::new(),
      window_curr_state: window.clone(),
      numbers: window,
      avg,
    }
  }

  struct BrokenPipe;

  impl AsyncWrite for BrokenPipe {
    fn poll_write(
      self: Pin<&mut Self>,
      _cx: &mut Context<'_>,
      _buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
      Poll::Ready(Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
      Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
      self: Pin<&mut Self>,
      _cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
      Poll::Ready(Ok(()))
    }
  }

  #[tokio::test]
  async fn test_snapshot_consumer_collects_in_order() {
    let reports = vec![
      Report::Snapshot(snapshot_of(&[1])),
      Report::failed(snapshot_of(&[1])),
      Report::Snapshot(snapshot_of(&[1, 2])),
    ];
    let mut consumer = SnapshotConsumer::new();
    consumer.consume(Box::pin(stream::iter(reports.clone()))).await;
    assert_eq!(consumer.reports(), reports.as_slice());
  }

  #[tokio::test]
  async fn test_snapshot_consumer_writes_json_lines() {
    let (writer, mut reader) = tokio::io::duplex(4096);
    let mut consumer = SnapshotConsumer::new().with_sink(writer);
    consumer
      .consume(Box::pin(stream::iter(vec![
        Report::Snapshot(snapshot_of(&[2, 4])),
        Report::failed(snapshot_of(&[2, 4])),
      ])))
      .await;
    drop(consumer);

    let mut output = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut output)
      .await
      .unwrap();
    let lines: Vec<serde_json::Value> = output
      .lines()
      .map(|line| serde_json::from_str(line).unwrap())
      .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["windowCurrState"], serde_json::json!([2, 4]));
    assert_eq!(lines[0]["avg"], serde_json::json!(3.0));
    assert_eq!(lines[1]["error"], serde_json::json!(FETCH_FAILED_STATUS));
    assert_eq!(lines[1]["snapshot"]["numbers"], serde_json::json!([2, 4]));
  }

  #[tokio::test]
  async fn test_snapshot_consumer_stop_on_write_failure() {
    let mut consumer = SnapshotConsumer::new().with_sink(BrokenPipe);
    consumer
      .consume(Box::pin(stream::iter(vec![
        Report::Snapshot(snapshot_of(&[1])),
        Report::Snapshot(snapshot_of(&[2])),
      ])))
      .await;
    assert_eq!(consumer.reports().len(), 1);
  }

  #[tokio::test]
  async fn test_snapshot_consumer_skip_on_write_failure() {
    let mut consumer = SnapshotConsumer::new()
      .with_sink(BrokenPipe)
      .with_error_strategy(ErrorStrategy::Skip);
    consumer
      .consume(Box::pin(stream::iter(vec![
        Report::Snapshot(snapshot_of(&[1])),
        Report::Snapshot(snapshot_of(&[2])),
      ])))
      .await;
    assert_eq!(consumer.into_reports().len(), 2);
  }

  #[test]
  fn test_snapshot_consumer_config() {
    let consumer = SnapshotConsumer::new().with_name("sink".to_string());
    assert_eq!(consumer.config().name(), "sink");
    assert_eq!(consumer.component_info().name, "sink");
    let context = consumer.create_error_context(None);
    assert_eq!(context.component_name, "sink");
    assert!(format!("{:?}", consumer).contains("SnapshotConsumer"));
  }

  proptest! {
    #[test]
    fn test_snapshot_consumer_keeps_every_report(
      windows in prop::collection::vec(prop::collection::vec(-1000..1000i32, 0..10), 0..20)
    ) {
      let reports: Vec<Report> = windows
        .iter()
        .map(|w| Report::Snapshot(snapshot_of(w)))
        .collect();
      let collected = tokio_test::block_on(async {
        let mut consumer = SnapshotConsumer::new();
        consumer.consume(Box::pin(stream::iter(reports.clone()))).await;
        consumer.into_reports()
      });
      prop_assert_eq!(collected, reports);
    }
  }
}
