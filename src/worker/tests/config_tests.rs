//! Worker configuration parsing and validation tests.

use std::time::Duration;

use crate::worker::config::{
    DEFAULT_BACKOFF_MULTIPLIER, WorkerConfig, WorkerConfigError, WorkerSettings,
};
use crate::worker::task::ClaimStrategy;
use eyre::ensure;
use rstest::{fixture, rstest};

#[fixture]
fn settings() -> WorkerSettings {
    WorkerSettings::new("worker-1", vec!["score_content".to_owned()])
}

#[rstest]
fn omitted_fields_take_documented_defaults() -> eyre::Result<()> {
    let settings: WorkerSettings =
        serde_json::from_str(r#"{"worker_id": "worker-1", "task_types": ["score_content"]}"#)?;
    let config = WorkerConfig::try_from(settings)?;

    ensure!(config.worker_id().as_str() == "worker-1");
    ensure!(config.strategy() == ClaimStrategy::Fifo);
    ensure!(config.poll_interval() == Duration::from_secs(1));
    ensure!(config.max_backoff() == Duration::from_secs(60));
    ensure!(config.backoff_multiplier().to_bits() == DEFAULT_BACKOFF_MULTIPLIER.to_bits());
    ensure!(config.autoscore_batch_size() == 10);
    Ok(())
}

#[rstest]
fn explicit_fields_are_kept_in_order() -> eyre::Result<()> {
    let settings: WorkerSettings = serde_json::from_str(
        r#"{
            "worker_id": "worker-2",
            "task_types": ["story_review", "score_content"],
            "strategy": "priority",
            "poll_interval_ms": 250,
            "max_backoff_ms": 4000,
            "backoff_multiplier": 2.0,
            "autoscore_batch_size": 3
        }"#,
    )?;
    let config = WorkerConfig::try_from(settings)?;

    let types: Vec<&str> = config.task_types().iter().map(|t| t.as_str()).collect();
    ensure!(types == ["story_review", "score_content"]);
    ensure!(config.strategy() == ClaimStrategy::Priority);
    ensure!(config.poll_interval() == Duration::from_millis(250));
    ensure!(config.max_backoff() == Duration::from_secs(4));
    ensure!(config.autoscore_batch_size() == 3);
    Ok(())
}

#[rstest]
fn missing_worker_id_is_a_parse_error() {
    let parsed = serde_json::from_str::<WorkerSettings>(r#"{"task_types": ["a"]}"#);
    assert!(parsed.is_err());
}

fn rejection(mut settings: WorkerSettings, tweak: fn(&mut WorkerSettings)) -> WorkerConfigError {
    tweak(&mut settings);
    match WorkerConfig::try_from(settings) {
        Ok(config) => panic!("expected rejection, got {config:?}"),
        Err(err) => err,
    }
}

#[rstest]
fn blank_worker_id_is_rejected(settings: WorkerSettings) -> eyre::Result<()> {
    let err = rejection(settings, |s| s.worker_id = "  ".to_owned());
    ensure!(
        matches!(err, WorkerConfigError::EmptyIdentifier(_)),
        "unexpected error {err:?}"
    );
    Ok(())
}

#[rstest]
fn empty_task_types_are_rejected(settings: WorkerSettings) {
    let err = rejection(settings, |s| s.task_types.clear());
    assert_eq!(err, WorkerConfigError::NoTaskTypes);
}

#[rstest]
fn duplicate_task_types_are_rejected(settings: WorkerSettings) {
    let err = rejection(settings, |s| s.task_types.push("score_content".to_owned()));
    assert_eq!(
        err,
        WorkerConfigError::DuplicateTaskType("score_content".to_owned())
    );
}

#[rstest]
fn zero_poll_interval_is_rejected(settings: WorkerSettings) {
    let err = rejection(settings, |s| s.poll_interval_ms = 0);
    assert_eq!(err, WorkerConfigError::ZeroPollInterval);
}

#[rstest]
fn max_backoff_below_poll_interval_is_rejected(settings: WorkerSettings) {
    let err = rejection(settings, |s| {
        s.poll_interval_ms = 2_000;
        s.max_backoff_ms = 1_000;
    });
    assert_eq!(
        err,
        WorkerConfigError::MaxBelowPollInterval {
            max_ms: 1_000,
            poll_ms: 2_000,
        }
    );
}

#[rstest]
#[case(0.5)]
#[case(f64::INFINITY)]
#[case(f64::NAN)]
fn invalid_multipliers_are_rejected(settings: WorkerSettings, #[case] multiplier: f64) {
    let mut tweaked = settings;
    tweaked.backoff_multiplier = multiplier;
    let result = WorkerConfig::try_from(tweaked);
    assert!(matches!(result, Err(WorkerConfigError::InvalidMultiplier(_))));
}

#[rstest]
fn zero_batch_size_is_rejected(settings: WorkerSettings) {
    let err = rejection(settings, |s| s.autoscore_batch_size = 0);
    assert_eq!(err, WorkerConfigError::ZeroBatchSize);
}
