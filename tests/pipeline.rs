use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use windowavg::error::{ErrorAction, ErrorStrategy, FETCH_FAILED_STATUS};
use windowavg::sources::NumberSource;
use windowavg::{
  BatchFetchProducer, FetchRequest, MockNumberSource, NumberType, Pipeline, Report,
  SnapshotConsumer, SourceError, WindowAverageTransformer, WindowSize,
};

// A source that answers from a fixed script, one entry per fetch
struct ScriptedSource {
  script: Mutex<VecDeque<Result<Vec<Value>, SourceError>>>,
}

impl ScriptedSource {
  fn new(script: Vec<Result<Vec<Value>, SourceError>>) -> Arc<Self> {
    Arc::new(Self {
      script: Mutex::new(script.into()),
    })
  }
}

#[async_trait]
impl NumberSource for ScriptedSource {
  async fn fetch(&self, _number_type: NumberType) -> Result<Vec<Value>, SourceError> {
    self
      .script
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(SourceError::Transport("script exhausted".to_string())))
  }

  fn name(&self) -> &str {
    "scripted"
  }
}

fn continue_on_failure() -> ErrorStrategy<windowavg::FetchOutcome> {
  ErrorStrategy::new_custom(|_| ErrorAction::Retry)
}

async fn run_pipeline(
  source: Arc<dyn NumberSource>,
  size: i64,
  count: usize,
  transformer: WindowAverageTransformer,
) -> Vec<Report> {
  let request = FetchRequest::new(NumberType::Prime, WindowSize::new(size).unwrap());
  Pipeline::builder()
    .producer(BatchFetchProducer::repeated(source, request, count))
    .transformer(transformer)
    .consumer(SnapshotConsumer::new())
    .run()
    .await
    .into_reports()
}

#[tokio::test]
async fn test_end_to_end_fifo_eviction_and_failure() {
  let source = ScriptedSource::new(vec![
    Ok(vec![json!(1), json!(2), json!(3)]),
    Ok(vec![json!(4)]),
    Err(SourceError::Status(502)),
    Ok(vec![json!(3), json!(4)]),
    Ok(vec![json!("x"), Value::Null, json!(5.0)]),
  ]);
  let reports = run_pipeline(
    source,
    3,
    5,
    WindowAverageTransformer::new().with_error_strategy(continue_on_failure()),
  )
  .await;

  let bodies: Vec<Value> = reports
    .iter()
    .map(|r| serde_json::to_value(r).unwrap())
    .collect();

  assert_eq!(bodies[0], json!({
    "windowPrevState": [],
    "windowCurrState": [1, 2, 3],
    "numbers": [1, 2, 3],
    "avg": 2.0
  }));
  assert_eq!(bodies[1]["windowCurrState"], json!([2, 3, 4]));
  assert_eq!(bodies[2], json!({ "error": FETCH_FAILED_STATUS, "snapshot": bodies[1] }));
  // Re-ingesting values already present leaves the window alone.
  assert_eq!(bodies[3], json!({
    "windowPrevState": [2, 3, 4],
    "windowCurrState": [2, 3, 4],
    "numbers": [3, 4],
    "avg": 3.0
  }));
  assert_eq!(bodies[4], json!({
    "windowPrevState": [2, 3, 4],
    "windowCurrState": [3, 4, 5],
    "numbers": [5],
    "avg": 4.0
  }));
}

#[tokio::test]
async fn test_end_to_end_stop_strategy_halts_on_first_failure() {
  let source = ScriptedSource::new(vec![
    Ok(vec![json!(10)]),
    Err(SourceError::Timeout(Duration::from_millis(500))),
    Ok(vec![json!(20)]),
  ]);
  let reports = run_pipeline(source, 10, 3, WindowAverageTransformer::new()).await;

  assert_eq!(reports.len(), 2);
  assert!(reports[1].is_failure());
  assert_eq!(reports[1].snapshot().avg, Some(10.0));
}

#[tokio::test]
async fn test_end_to_end_with_mock_source() {
  let source = Arc::new(MockNumberSource::new().with_seed(11).with_delay(Duration::ZERO));
  let transformer = WindowAverageTransformer::new();
  let handle = transformer.clone();
  let reports = run_pipeline(source, 4, 8, transformer).await;

  assert_eq!(reports.len(), 8);
  for report in &reports {
    let snapshot = report.snapshot();
    assert!(snapshot.window_curr_state.len() <= 4);
    let mut seen = std::collections::HashSet::new();
    assert!(snapshot.window_curr_state.iter().all(|o| seen.insert(*o)));
    assert!(snapshot.avg.is_some());
  }
  assert_eq!(&handle.snapshot(), reports[7].snapshot());
}
