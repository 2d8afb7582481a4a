use crate::error::{FETCH_FAILED_STATUS, SourceError};
use crate::number::NumberType;
use crate::server::AverageService;
use crate::sources::{MockNumberSource, NumberSource};
use crate::window::WindowSize;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

/// Replays scripted results, one per call, and tracks concurrency.
struct ScriptedSource {
  script: StdMutex<VecDeque<Result<Vec<Value>, SourceError>>>,
  delay: Duration,
  in_flight: AtomicUsize,
  max_in_flight: AtomicUsize,
}

impl ScriptedSource {
  fn new(script: Vec<Result<Vec<Value>, SourceError>>) -> Self {
    Self {
      script: StdMutex::new(script.into()),
      delay: Duration::ZERO,
      in_flight: AtomicUsize::new(0),
      max_in_flight: AtomicUsize::new(0),
    }
  }

  fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

#[async_trait]
impl NumberSource for ScriptedSource {
  async fn fetch(&self, _number_type: NumberType) -> Result<Vec<Value>, SourceError> {
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.in_flight.fetch_sub(1, Ordering::SeqCst);
    let next = self.script.lock().unwrap().pop_front();
    next.unwrap_or_else(|| Ok(Vec::new()))
  }

  fn name(&self) -> &str {
    "scripted"
  }
}

fn service(script: Vec<Result<Vec<Value>, SourceError>>) -> AverageService {
  AverageService::new(
    Arc::new(ScriptedSource::new(script)),
    WindowSize::new(3).unwrap(),
  )
}

fn get(uri: &str) -> Request<Empty<Bytes>> {
  Request::builder()
    .method(Method::GET)
    .uri(uri)
    .body(Empty::new())
    .unwrap()
}

async fn call(service: &AverageService, request: Request<Empty<Bytes>>) -> (StatusCode, Value) {
  let response = service.handle(request).await;
  let status = response.status();
  assert_eq!(
    response.headers().get(http::header::CONTENT_TYPE).unwrap(),
    "application/json"
  );
  let body = response.into_body().collect().await.unwrap().to_bytes();
  (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_numbers_returns_snapshot() {
  let service = service(vec![
    Ok(vec![json!(1), json!(2), json!(3)]),
    Ok(vec![json!(4)]),
  ]);

  let (status, body) = call(&service, get("/numbers/e")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["avg"], json!(2.0));

  let (status, body) = call(&service, get("/numbers/e")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({
    "windowPrevState": [1, 2, 3],
    "windowCurrState": [2, 3, 4],
    "numbers": [4],
    "avg": 3.0
  }));
}

#[tokio::test]
async fn test_numbers_honours_window_size_query() {
  let service = service(vec![Ok(vec![json!(1), json!(2), json!(3), json!(4)])]);
  let (status, body) = call(&service, get("/numbers/prime?windowSize=2")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["windowCurrState"], json!([3, 4]));
  assert_eq!(body["avg"], json!(3.5));
}

#[tokio::test]
async fn test_numbers_default_window_size() {
  let service = service(vec![Ok((1..=5).map(|n| json!(n)).collect())]);
  assert_eq!(service.default_window_size().get(), 3);
  let (_, body) = call(&service, get("/numbers/r")).await;
  assert_eq!(body["windowCurrState"], json!([3, 4, 5]));
}

#[tokio::test]
async fn test_failure_returns_unchanged_snapshot() {
  let service = service(vec![
    Ok(vec![json!(2), json!(4)]),
    Err(SourceError::Status(500)),
  ]);
  call(&service, get("/numbers/e")).await;
  let before = service.snapshot().await;

  let (status, body) = call(&service, get("/numbers/e")).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["error"], json!(FETCH_FAILED_STATUS));
  assert_eq!(body["snapshot"], serde_json::to_value(&before).unwrap());
  assert_eq!(service.snapshot().await, before);
}

#[tokio::test]
async fn test_timeout_returns_unavailable() {
  let source = Arc::new(MockNumberSource::new().with_delay(Duration::from_secs(5)));
  let service = AverageService::new(source, WindowSize::default())
    .with_timeout(Duration::from_millis(30));
  let (status, body) = call(&service, get("/numbers/f")).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["snapshot"]["avg"], Value::Null);
}

#[tokio::test]
async fn test_bad_requests() {
  let service = service(Vec::new());
  for uri in [
    "/numbers/x",
    "/numbers/p?windowSize=0",
    "/numbers/p?windowSize=101",
    "/numbers/p?windowSize=abc",
  ] {
    let (status, body) = call(&service, get(uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    assert!(body["error"].is_string(), "{}", uri);
  }
  assert_eq!(service.snapshot().await.avg, None);
}

#[tokio::test]
async fn test_unknown_path_and_method() {
  let service = service(Vec::new());
  let (status, _) = call(&service, get("/averages")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call(&service, get("/numbers/")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call(&service, get("/numbers/p/extra")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let post = Request::builder()
    .method(Method::POST)
    .uri("/numbers/p")
    .body(Empty::new())
    .unwrap();
  let (status, _) = call(&service, post).await;
  assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_concurrent_requests_are_serialised() {
  let source = Arc::new(
    ScriptedSource::new(vec![Ok(vec![json!(1)]), Ok(vec![json!(2)]), Ok(vec![json!(3)])])
      .with_delay(Duration::from_millis(20)),
  );
  let service = AverageService::new(source.clone(), WindowSize::default());

  let calls = (0..3).map(|_| {
    let service = service.clone();
    tokio::spawn(async move { service.refresh(NumberType::Even, WindowSize::default()).await })
  });
  for handle in calls.collect::<Vec<_>>() {
    assert!(!handle.await.unwrap().is_failure());
  }

  assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
  assert_eq!(service.snapshot().await.window_curr_state.len(), 3);
}

#[tokio::test]
async fn test_serve_over_tcp() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let service = service(vec![Ok(vec![json!(10), json!(20)])]);
  let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
  let server = tokio::spawn(service.serve(listener, async {
    let _ = stop_rx.await;
  }));

  let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
  let uri = format!("http://{}/numbers/e?windowSize=5", addr);
  let response = client.request(get(&uri)).await.unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let body = response.into_body().collect().await.unwrap().to_bytes();
  let body: Value = serde_json::from_slice(&body).unwrap();
  assert_eq!(body["avg"], json!(15.0));

  stop_tx.send(()).unwrap();
  server.await.unwrap().unwrap();
}

#[test]
fn test_service_debug_names_source() {
  let service = AverageService::new(Arc::new(MockNumberSource::new()), WindowSize::default());
  assert!(format!("{:?}", service).contains("mock"));
}
