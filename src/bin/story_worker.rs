//! Runs a review worker against a task coordination service.
//!
//! Usage:
//!
//! ```text
//! story_worker <config-path>
//! ```
//!
//! The JSON file at `config-path` must deserialize into
//! [`storyloom::config::AppConfig`]. On start the worker initializes the
//! `SQLite` schema, pings the coordinator, and then claims `story_review`
//! tasks until interrupted with Ctrl-C. An interrupt lets the in-flight task
//! finish before the process exits.

use camino::{Utf8Path, Utf8PathBuf};
use mockable::DefaultClock;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{info, warn};

use storyloom::config::{AppConfig, ConfigError};
use storyloom::storage::{
    InitializationError, StorageError, build_pool, establish, try_initialize_application_database,
};
use storyloom::story::adapters::evaluator::RemoteEvaluator;
use storyloom::story::adapters::sqlite::SqliteStoryRepository;
use storyloom::story::ports::EvaluatorError;
use storyloom::story::services::StoryWorkflowService;
use storyloom::worker::adapters::http::HttpTaskCoordinator;
use storyloom::worker::engine::{Worker, WorkerError};
use storyloom::worker::ports::CoordinatorError;
use storyloom::worker::review::ReviewProcessor;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the binary.
#[derive(Debug, Error)]
enum AppError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database setup failed: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Initialization(#[from] InitializationError),
    #[error("evaluator client setup failed: {0}")]
    Evaluator(#[from] EvaluatorError),
    #[error("coordinator client setup failed: {0}")]
    Coordinator(#[from] CoordinatorError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt().with_target(false).try_init()?;
    let config_path = parse_args(collect_args()?.into_iter())?;
    run(&config_path).map_err(Into::into)
}

fn collect_args() -> Result<Vec<Utf8PathBuf>, AppError> {
    env::args_os()
        .map(|arg_os| {
            let arg = arg_os
                .into_string()
                .map_err(|_| AppError::InvalidArgs("argument is not valid UTF-8".into()))?;
            Ok(Utf8PathBuf::from(arg))
        })
        .collect()
}

fn parse_args(mut args: impl Iterator<Item = Utf8PathBuf>) -> Result<Utf8PathBuf, AppError> {
    let _program = args.next();
    let config_path = args
        .next()
        .ok_or_else(|| AppError::InvalidArgs("missing config path argument".into()))?;
    if let Some(extra) = args.next() {
        let extra_arg = extra.as_str();
        return Err(AppError::InvalidArgs(format!(
            "unexpected extra argument: {extra_arg}"
        )));
    }
    Ok(config_path)
}

fn run(config_path: &Utf8Path) -> Result<(), AppError> {
    let config = AppConfig::load(config_path)?;
    let worker_config = config.worker_config()?;

    let mut connection = establish(&config.database_url)?;
    try_initialize_application_database(&mut connection, true)?;
    drop(connection);

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::RuntimeInit)?;
    runtime.block_on(async move {
        let pool = build_pool(&config.database_url, config.pool_size)?;
        let service = StoryWorkflowService::with_thresholds(
            Arc::new(SqliteStoryRepository::new(pool)),
            Arc::new(DefaultClock),
            config.thresholds,
        );
        let evaluator = Arc::new(RemoteEvaluator::new(
            config.evaluator_url.as_str(),
            config.evaluator_timeout(),
        )?);
        let coordinator = Arc::new(HttpTaskCoordinator::new(
            config.coordinator_url.as_str(),
            config.coordinator_timeout(),
        )?);
        let processor = Arc::new(ReviewProcessor::new(service, evaluator));

        let mut worker = Worker::connect(worker_config, coordinator, processor).await?;
        let stop = worker.stop_handle();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received, finishing the current task");
                    stop.stop();
                }
                Err(err) => warn!(error = %err, "failed to listen for interrupts"),
            }
        });

        let stats = worker.run(None).await?;
        info!(
            tasks_processed = stats.tasks_processed,
            tasks_failed = stats.tasks_failed,
            "story worker exited"
        );
        Ok(())
    })
}
