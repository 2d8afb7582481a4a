use crate::error::{ConfigError, SourceError};
use crate::number::NumberType;
use crate::sources::NumberSource;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use http::{Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL of the evaluation service the numbers come from.
pub const DEFAULT_BASE_URL: &str = "http://20.244.56.144/evaluation-service";
/// How long one fetch may take before it counts as failed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration for the remote number service.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
  /// Base URL; the category endpoint is appended as a path segment.
  pub base_url: String,
  /// Bound on the whole request, body included.
  pub timeout: Duration,
  /// Extra headers sent with every request.
  pub headers: HeaderMap,
}

impl Default for HttpSourceConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout: DEFAULT_TIMEOUT,
      headers: HeaderMap::new(),
    }
  }
}

impl HttpSourceConfig {
  /// Sets the base URL.
  #[must_use]
  pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
    self.base_url = url.into();
    self
  }

  /// Sets the request timeout.
  #[must_use]
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Sends `Authorization: Bearer <token>` with every request.
  pub fn with_bearer_token(self, token: &str) -> Result<Self, ConfigError> {
    let value = format!("Bearer {}", token);
    self.with_header(AUTHORIZATION, &value)
  }

  /// Adds one header.
  pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, ConfigError> {
    let value = HeaderValue::from_str(value)
      .map_err(|_| ConfigError::Usage(format!("invalid value for header {}", name)))?;
    self.headers.insert(name, value);
    Ok(self)
  }

  /// Full URI of the endpoint serving `number_type`.
  pub fn endpoint_uri(&self, number_type: NumberType) -> Result<Uri, SourceError> {
    let url = format!(
      "{}/{}",
      self.base_url.trim_end_matches('/'),
      number_type.endpoint()
    );
    url
      .parse::<Uri>()
      .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", url, e)))
  }
}

/// Fetches batches from the remote evaluation service over plain HTTP.
///
/// The response body must be a JSON object whose `numbers` field is an
/// array. Entries of that array are passed on untouched.
pub struct HttpNumberSource {
  config: HttpSourceConfig,
  client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpNumberSource {
  /// Creates a source with its own pooled client.
  pub fn new(config: HttpSourceConfig) -> Self {
    let client = Client::builder(TokioExecutor::new()).build_http();
    Self { config, client }
  }

  /// The configuration.
  pub fn config(&self) -> &HttpSourceConfig {
    &self.config
  }

  async fn request(&self, uri: Uri) -> Result<Vec<Value>, SourceError> {
    let mut builder = Request::get(uri).header(ACCEPT, mime::APPLICATION_JSON.as_ref());
    for (name, value) in &self.config.headers {
      builder = builder.header(name, value);
    }
    let request = builder
      .body(Empty::<Bytes>::new())
      .map_err(|e| SourceError::InvalidUrl(e.to_string()))?;

    let response = self
      .client
      .request(request)
      .await
      .map_err(|e| SourceError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(SourceError::Status(status.as_u16()));
    }

    let body = response
      .into_body()
      .collect()
      .await
      .map_err(|e| SourceError::Transport(e.to_string()))?
      .to_bytes();

    parse_numbers(&body)
  }
}

/// Extracts the `numbers` array from a response body.
pub fn parse_numbers(body: &[u8]) -> Result<Vec<Value>, SourceError> {
  let document: Value =
    serde_json::from_slice(body).map_err(|e| SourceError::MalformedBody(e.to_string()))?;
  match document.get("numbers") {
    Some(Value::Array(items)) => Ok(items.clone()),
    Some(_) => Err(SourceError::MalformedBody(
      "`numbers` is not an array".to_string(),
    )),
    None => Err(SourceError::MalformedBody(
      "missing `numbers` field".to_string(),
    )),
  }
}

#[async_trait]
impl NumberSource for HttpNumberSource {
  async fn fetch(&self, number_type: NumberType) -> Result<Vec<Value>, SourceError> {
    let uri = self.config.endpoint_uri(number_type)?;
    debug!(uri = %uri, "fetching numbers");

    let timeout = self.config.timeout;
    let result = match tokio::time::timeout(timeout, self.request(uri)).await {
      Ok(result) => result,
      Err(_) => Err(SourceError::Timeout(timeout)),
    };

    if let Err(e) = &result {
      warn!(number_type = %number_type, error = %e, "number source failed");
    }
    result
  }

  fn name(&self) -> &str {
    "http"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use http::{Response, StatusCode};
  use http_body_util::Full;
  use hyper::body::Incoming;
  use hyper::server::conn::http1;
  use hyper::service::service_fn;
  use hyper_util::rt::TokioIo;
  use serde_json::json;
  use std::convert::Infallible;
  use std::net::SocketAddr;
  use tokio::net::TcpListener;

  #[derive(Clone, Copy)]
  enum Behaviour {
    Ok,
    Echo,
    ServerError,
    Malformed,
    Slow,
  }

  async fn respond(
    request: Request<Incoming>,
    behaviour: Behaviour,
  ) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = request.uri().path().to_string();
    let auth = request
      .headers()
      .get(AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .unwrap_or("")
      .to_string();
    let (status, body) = match behaviour {
      Behaviour::Ok => (
        StatusCode::OK,
        json!({ "numbers": [2, 3, "x", 5] }).to_string(),
      ),
      Behaviour::Echo => (StatusCode::OK, json!({ "numbers": [path, auth] }).to_string()),
      Behaviour::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "{}".to_string()),
      Behaviour::Malformed => (StatusCode::OK, "not json".to_string()),
      Behaviour::Slow => {
        tokio::time::sleep(Duration::from_secs(2)).await;
        (StatusCode::OK, json!({ "numbers": [1] }).to_string())
      }
    };
    let response = Response::builder()
      .status(status)
      .body(Full::new(Bytes::from(body)))
      .unwrap();
    Ok(response)
  }

  async fn spawn_server(behaviour: Behaviour) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      loop {
        let Ok((stream, _)) = listener.accept().await else {
          break;
        };
        tokio::spawn(async move {
          let service = service_fn(move |request| respond(request, behaviour));
          let _ = http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service)
            .await;
        });
      }
    });
    addr
  }

  fn source_for(addr: SocketAddr) -> HttpNumberSource {
    HttpNumberSource::new(
      HttpSourceConfig::default()
        .with_base_url(format!("http://{}/evaluation-service/", addr))
        .with_timeout(Duration::from_millis(500)),
    )
  }

  #[test]
  fn test_endpoint_uri() {
    let config = HttpSourceConfig::default().with_base_url("http://localhost:1/api/");
    assert_eq!(
      config.endpoint_uri(NumberType::Fibonacci).unwrap().to_string(),
      "http://localhost:1/api/fibo"
    );
    let bad = HttpSourceConfig::default().with_base_url("http://exa mple.com");
    assert!(matches!(
      bad.endpoint_uri(NumberType::Prime),
      Err(SourceError::InvalidUrl(_))
    ));
  }

  #[test]
  fn test_parse_numbers() {
    assert_eq!(
      parse_numbers(br#"{"numbers": [1, "a", null]}"#),
      Ok(vec![json!(1), json!("a"), Value::Null])
    );
    assert!(matches!(
      parse_numbers(br#"{"numbers": 5}"#),
      Err(SourceError::MalformedBody(_))
    ));
    assert!(matches!(
      parse_numbers(br#"{"values": []}"#),
      Err(SourceError::MalformedBody(_))
    ));
    assert!(matches!(
      parse_numbers(b"<html>"),
      Err(SourceError::MalformedBody(_))
    ));
  }

  #[test]
  fn test_bearer_token_header() {
    let config = HttpSourceConfig::default().with_bearer_token("abc").unwrap();
    assert_eq!(config.headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
    assert!(HttpSourceConfig::default().with_bearer_token("a\nb").is_err());
  }

  #[tokio::test]
  async fn test_fetch_success_returns_raw_numbers() {
    let addr = spawn_server(Behaviour::Ok).await;
    let batch = source_for(addr).fetch(NumberType::Prime).await.unwrap();
    assert_eq!(batch, vec![json!(2), json!(3), json!("x"), json!(5)]);
  }

  #[tokio::test]
  async fn test_fetch_hits_category_endpoint() {
    let addr = spawn_server(Behaviour::Echo).await;
    let source = source_for(addr);
    for (number_type, path) in [
      (NumberType::Prime, "/evaluation-service/primes"),
      (NumberType::Fibonacci, "/evaluation-service/fibo"),
      (NumberType::Even, "/evaluation-service/even"),
      (NumberType::Random, "/evaluation-service/rand"),
    ] {
      let echoed = source.fetch(number_type).await.unwrap();
      assert_eq!(echoed, vec![json!(path), json!("")]);
    }
  }

  #[tokio::test]
  async fn test_fetch_sends_bearer_token() {
    let addr = spawn_server(Behaviour::Echo).await;
    let source = HttpNumberSource::new(
      HttpSourceConfig::default()
        .with_base_url(format!("http://{}", addr))
        .with_bearer_token("abc")
        .unwrap(),
    );
    let echoed = source.fetch(NumberType::Even).await.unwrap();
    assert_eq!(echoed, vec![json!("/even"), json!("Bearer abc")]);
  }

  #[tokio::test]
  async fn test_fetch_sends_configured_token() {
    let addr = spawn_server(Behaviour::Echo).await;
    let source = crate::config::ServiceConfig::default()
      .with_source(crate::config::SourceKind::Http)
      .with_source_url(format!("http://{}/evaluation-service", addr))
      .with_token("s3cret")
      .build_source()
      .unwrap();
    let echoed = source.fetch(NumberType::Random).await.unwrap();
    assert_eq!(
      echoed,
      vec![json!("/evaluation-service/rand"), json!("Bearer s3cret")]
    );
  }

  #[tokio::test]
  async fn test_fetch_non_success_status() {
    let addr = spawn_server(Behaviour::ServerError).await;
    let result = source_for(addr).fetch(NumberType::Even).await;
    assert_eq!(result, Err(SourceError::Status(500)));
  }

  #[tokio::test]
  async fn test_fetch_malformed_body() {
    let addr = spawn_server(Behaviour::Malformed).await;
    let result = source_for(addr).fetch(NumberType::Random).await;
    assert!(matches!(result, Err(SourceError::MalformedBody(_))));
  }

  #[tokio::test]
  async fn test_fetch_times_out() {
    let addr = spawn_server(Behaviour::Slow).await;
    let source = HttpNumberSource::new(
      HttpSourceConfig::default()
        .with_base_url(format!("http://{}", addr))
        .with_timeout(Duration::from_millis(100)),
    );
    let result = source.fetch(NumberType::Fibonacci).await;
    assert_eq!(result, Err(SourceError::Timeout(Duration::from_millis(100))));
  }

  #[tokio::test]
  async fn test_fetch_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let result = source_for(addr).fetch(NumberType::Prime).await;
    assert!(matches!(result, Err(SourceError::Transport(_))));
  }
}
