//! Shared fixtures for worker tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::worker::config::{WorkerConfig, WorkerSettings};
use crate::worker::engine::Sleeper;
use crate::worker::task::{Task, TaskId, TaskStatus, TaskType};

/// Sleeper that records requested delays instead of waiting.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|delays| delays.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

pub fn worker_config(worker_id: &str, task_types: &[&str]) -> eyre::Result<WorkerConfig> {
    let settings = WorkerSettings::new(
        worker_id,
        task_types.iter().map(|name| (*name).to_owned()).collect(),
    );
    Ok(WorkerConfig::try_from(settings)?)
}

pub fn claimed_task(id: &str, task_type: &str, params: Value) -> eyre::Result<Task> {
    Ok(Task {
        id: TaskId::new(id)?,
        task_type: TaskType::new(task_type)?,
        params,
        priority: 0,
        status: TaskStatus::Claimed,
        retry_count: 0,
        max_retries: 3,
        created_at: Utc::now(),
        claimed_at: Some(Utc::now()),
    })
}
