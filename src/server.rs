//! # HTTP Service
//!
//! Serves one shared window over HTTP:
//!
//! ```text
//! GET /numbers/{numberType}?windowSize=N
//! ```
//!
//! | outcome | status | body |
//! |---|---|---|
//! | batch ingested | 200 | snapshot |
//! | bad `numberType` or `windowSize` | 400 | `{"error": ...}` |
//! | fetch failed or timed out | 503 | `{"error": ..., "snapshot": ...}` |
//! | unknown path | 404 | `{"error": ...}` |
//! | method other than GET | 405 | `{"error": ...}` |
//!
//! Requests are served one at a time: the window lock is held across the
//! fetch and the ingestion, so a second request waits for the first.

use crate::config::ServiceConfig;
use crate::error::{AverageError, ConfigError};
use crate::number::NumberType;
use crate::sources::{NumberSource, fetch_with_timeout};
use crate::transformers::Report;
use crate::window::{Snapshot, WindowAverager, WindowSize};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Path prefix of the numbers endpoint.
pub const NUMBERS_PATH: &str = "/numbers/";

/// Shared state of the HTTP service. Clones share the same window.
#[derive(Clone)]
pub struct AverageService {
  averager: Arc<Mutex<WindowAverager>>,
  source: Arc<dyn NumberSource>,
  window_size: WindowSize,
  timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct NumbersQuery {
  #[serde(rename = "windowSize")]
  window_size: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
  error: String,
}

#[derive(Debug, PartialEq)]
enum Route {
  Numbers {
    number_type: NumberType,
    window_size: WindowSize,
  },
  BadRequest(ConfigError),
  NotFound,
  MethodNotAllowed,
}

impl AverageService {
  /// Creates a service over `source` with an empty window.
  pub fn new(source: Arc<dyn NumberSource>, window_size: WindowSize) -> Self {
    Self {
      averager: Arc::new(Mutex::new(WindowAverager::new())),
      source,
      window_size,
      timeout: crate::config::DEFAULT_TIMEOUT,
    }
  }

  /// Builds the service described by `config`.
  pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
    let source = config.build_source()?;
    Ok(Self::new(source, config.window_size).with_timeout(config.timeout))
  }

  /// Sets the bound on one fetch.
  #[must_use]
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Window size used when a request does not name one.
  pub fn default_window_size(&self) -> WindowSize {
    self.window_size
  }

  /// Snapshot of the current window.
  pub async fn snapshot(&self) -> Snapshot {
    self.averager.lock().await.snapshot()
  }

  /// Fetches one batch and folds it into the window.
  ///
  /// On failure the window is left as it was and the report carries the
  /// unchanged snapshot.
  pub async fn refresh(&self, number_type: NumberType, window_size: WindowSize) -> Report {
    let mut averager = self.averager.lock().await;
    match fetch_with_timeout(self.source.as_ref(), number_type, self.timeout).await {
      Ok(batch) => {
        let snapshot = averager.ingest(&batch, window_size);
        info!(
          number_type = %number_type,
          window_size = %window_size,
          avg = ?snapshot.avg,
          "batch ingested"
        );
        Report::Snapshot(snapshot)
      }
      Err(e) => {
        warn!(number_type = %number_type, error = %e, "fetch failed, window unchanged");
        Report::failed(averager.snapshot())
      }
    }
  }

  /// Answers one HTTP request.
  pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>> {
    let route = self.route(request.method(), request.uri().path(), request.uri().query());
    debug!(method = %request.method(), uri = %request.uri(), route = ?route, "request");

    match route {
      Route::Numbers {
        number_type,
        window_size,
      } => {
        let report = self.refresh(number_type, window_size).await;
        let status = if report.is_failure() {
          StatusCode::SERVICE_UNAVAILABLE
        } else {
          StatusCode::OK
        };
        json_response(status, &report)
      }
      Route::BadRequest(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
      Route::NotFound => error_response(StatusCode::NOT_FOUND, "not found".to_string()),
      Route::MethodNotAllowed => error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "method not allowed".to_string(),
      ),
    }
  }

  fn route(&self, method: &Method, path: &str, query: Option<&str>) -> Route {
    let Some(token) = path.strip_prefix(NUMBERS_PATH) else {
      return Route::NotFound;
    };
    if token.is_empty() || token.contains('/') {
      return Route::NotFound;
    }
    if *method != Method::GET {
      return Route::MethodNotAllowed;
    }

    let number_type = match token.parse::<NumberType>() {
      Ok(number_type) => number_type,
      Err(e) => return Route::BadRequest(e),
    };

    let query: NumbersQuery = match serde_urlencoded::from_str(query.unwrap_or("")) {
      Ok(query) => query,
      Err(e) => return Route::BadRequest(ConfigError::Usage(e.to_string())),
    };
    let window_size = match query.window_size {
      Some(raw) => match raw.parse::<WindowSize>() {
        Ok(size) => size,
        Err(e) => return Route::BadRequest(e),
      },
      None => self.window_size,
    };

    Route::Numbers {
      number_type,
      window_size,
    }
  }

  /// Accepts connections on `listener` until `shutdown` completes.
  ///
  /// Each connection is handled on its own task; connections already
  /// accepted are left to finish on their own.
  pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), AverageError>
  where
    F: Future<Output = ()> + Send,
  {
    let addr = listener.local_addr()?;
    info!(address = %addr, "average service listening");

    tokio::pin!(shutdown);
    loop {
      let accepted = tokio::select! {
        accepted = listener.accept() => accepted,
        () = &mut shutdown => {
          info!(address = %addr, "average service shutting down");
          return Ok(());
        }
      };

      match accepted {
        Ok((stream, peer)) => {
          debug!(peer = %peer, "accepted connection");
          let service = self.clone();
          tokio::spawn(async move {
            let handler = service_fn(move |request| {
              let service = service.clone();
              async move { Ok::<_, Infallible>(service.handle(request).await) }
            });
            if let Err(e) = http1::Builder::new()
              .serve_connection(TokioIo::new(stream), handler)
              .await
            {
              error!(peer = %peer, error = %e, "error serving connection");
            }
          });
        }
        Err(e) => {
          warn!(error = %e, "error accepting connection");
        }
      }
    }
  }
}

impl std::fmt::Debug for AverageService {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AverageService")
      .field("source", &self.source.name())
      .field("window_size", &self.window_size)
      .field("timeout", &self.timeout)
      .finish()
  }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
  match serde_json::to_vec(body) {
    Ok(bytes) => {
      let mut response = Response::new(Full::new(Bytes::from(bytes)));
      *response.status_mut() = status;
      response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
      );
      response
    }
    Err(e) => {
      error!(error = %e, "could not serialise response");
      let mut response = Response::new(Full::new(Bytes::new()));
      *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
      response
    }
  }
}

fn error_response(status: StatusCode, message: String) -> Response<Full<Bytes>> {
  json_response(status, &ErrorBody { error: message })
}
