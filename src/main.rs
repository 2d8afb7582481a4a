//! `windowavg` command line.
//!
//! ```text
//! windowavg serve                      serve GET /numbers/{type} over HTTP
//! windowavg run [type] [size] [count]  fetch `count` batches, print one JSON report per line
//! ```
//!
//! Settings come from `WINDOWAVG_*` environment variables; see
//! [`windowavg::config`].

use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use windowavg::config::ServiceConfig;
use windowavg::consumers::SnapshotConsumer;
use windowavg::error::{AverageError, ConfigError, ErrorAction, ErrorStrategy};
use windowavg::number::NumberType;
use windowavg::pipeline::Pipeline;
use windowavg::producers::{BatchFetchProducer, FetchRequest};
use windowavg::server::AverageService;
use windowavg::transformers::WindowAverageTransformer;
use windowavg::window::WindowSize;

const USAGE: &str = "windowavg serve | windowavg run [type] [size] [count]";

#[derive(Debug, PartialEq)]
enum Command {
  Serve,
  Run {
    number_type: NumberType,
    window_size: WindowSize,
    count: usize,
  },
  Help,
}

fn parse_args(args: &[String], config: &ServiceConfig) -> Result<Command, ConfigError> {
  let mut args = args.iter().map(String::as_str);
  match args.next() {
    None | Some("serve") => Ok(Command::Serve),
    Some("help" | "-h" | "--help") => Ok(Command::Help),
    Some("run") => {
      let number_type = match args.next() {
        Some(token) => token.parse()?,
        None => config.number_type,
      };
      let window_size = match args.next() {
        Some(size) => size.parse()?,
        None => config.window_size,
      };
      let count = match args.next() {
        Some(count) => count
          .parse()
          .map_err(|_| ConfigError::Usage(format!("count {:?} is not a number", count)))?,
        None => 1,
      };
      if let Some(extra) = args.next() {
        return Err(ConfigError::Usage(format!("unexpected argument {:?}", extra)));
      }
      Ok(Command::Run {
        number_type,
        window_size,
        count,
      })
    }
    Some(other) => Err(ConfigError::Usage(format!("unknown command {:?}", other))),
  }
}

async fn serve(config: &ServiceConfig) -> Result<(), AverageError> {
  let service = AverageService::from_config(config)?;
  let listener = TcpListener::bind(config.bind).await?;
  info!(source = %config.source, window_size = %config.window_size, "starting service");
  service
    .serve(listener, async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run(
  config: &ServiceConfig,
  number_type: NumberType,
  window_size: WindowSize,
  count: usize,
) -> Result<(), AverageError> {
  let source = config.build_source()?;
  let request = FetchRequest::new(number_type, window_size);
  let producer = BatchFetchProducer::repeated(Arc::clone(&source), request, count)
    .with_timeout(config.timeout)
    .with_name("fetch".to_string());
  let transformer = WindowAverageTransformer::new()
    .with_name("average".to_string())
    .with_error_strategy(ErrorStrategy::new_custom(|_| ErrorAction::Retry));
  let consumer = SnapshotConsumer::new()
    .with_name("stdout".to_string())
    .with_sink(tokio::io::stdout());

  let consumer = Pipeline::builder()
    .producer(producer)
    .transformer(transformer)
    .consumer(consumer)
    .run()
    .await;

  let failures = consumer.reports().iter().filter(|r| r.is_failure()).count();
  info!(
    source = source.name(),
    reports = consumer.reports().len(),
    failures,
    "run finished"
  );
  Ok(())
}

async fn start() -> Result<(), AverageError> {
  let config = ServiceConfig::from_env()?;
  tracing_subscriber::fmt()
    .with_max_level(config.log_level)
    .with_writer(std::io::stderr)
    .init();

  let args: Vec<String> = std::env::args().skip(1).collect();
  match parse_args(&args, &config)? {
    Command::Serve => serve(&config).await,
    Command::Run {
      number_type,
      window_size,
      count,
    } => run(&config, number_type, window_size, count).await,
    Command::Help => {
      println!("{}", USAGE);
      Ok(())
    }
  }
}

#[tokio::main]
async fn main() -> ExitCode {
  match start().await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("windowavg: {}", e);
      if matches!(e, AverageError::InvalidConfiguration(ConfigError::Usage(_))) {
        eprintln!("usage: {}", USAGE);
      }
      ExitCode::FAILURE
    }
  }
}
