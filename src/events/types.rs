//! # Job Event Types
//!
//! Records posted while a job runs. Round-level records follow the lifecycle
//! of a round (staging, running, finished, error); shard item records carry the
//! item, its start and completion time and the failure cause when it failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What started a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionSource {
    NormalTrigger,
    Misfire,
}

impl ExecutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionSource::NormalTrigger => "NORMAL_TRIGGER",
            ExecutionSource::Misfire => "MISFIRE",
        }
    }
}

impl fmt::Display for ExecutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state carried by a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobEventState {
    #[serde(rename = "TASK_STAGING")]
    Staging,
    #[serde(rename = "TASK_RUNNING")]
    Running,
    #[serde(rename = "TASK_FINISHED")]
    Finished,
    #[serde(rename = "TASK_ERROR")]
    Error,
}

impl JobEventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEventState::Staging => "TASK_STAGING",
            JobEventState::Running => "TASK_RUNNING",
            JobEventState::Finished => "TASK_FINISHED",
            JobEventState::Error => "TASK_ERROR",
        }
    }

    /// Finished and error end a round
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEventState::Finished | JobEventState::Error)
    }
}

impl fmt::Display for JobEventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of one lifecycle transition of a job round or of one shard item.
///
/// Shard item records set `sharding_item`. The start record and the completion
/// record of an item share the same `id`, so a backend keyed on `id` ends up
/// with one row per item execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecutionEvent {
    pub id: Uuid,
    pub task_id: String,
    pub job_name: String,
    pub execution_source: ExecutionSource,
    pub state: JobEventState,
    pub message: String,
    /// Shard items the round covers
    pub sharding_items: Vec<u32>,
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub sharding_item: Option<u32>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub failure_cause: Option<String>,
    #[serde(default)]
    pub complete_time: Option<DateTime<Utc>>,
}

impl JobExecutionEvent {
    pub fn new(
        task_id: impl Into<String>,
        job_name: impl Into<String>,
        execution_source: ExecutionSource,
        state: JobEventState,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            job_name: job_name.into(),
            execution_source,
            state,
            message: message.into(),
            sharding_items: Vec::new(),
            creation_time: Utc::now(),
            sharding_item: None,
            success: false,
            failure_cause: None,
            complete_time: None,
        }
    }

    /// Start record of one shard item
    pub fn item_started(
        task_id: impl Into<String>,
        job_name: impl Into<String>,
        execution_source: ExecutionSource,
        item: u32,
    ) -> Self {
        let mut event = Self::new(
            task_id,
            job_name,
            execution_source,
            JobEventState::Running,
            String::new(),
        )
        .with_sharding_items([item]);
        event.sharding_item = Some(item);
        event
    }

    /// Completion record for a shard item that succeeded
    pub fn execution_success(&self, complete_time: DateTime<Utc>) -> Self {
        Self {
            state: JobEventState::Finished,
            success: true,
            failure_cause: None,
            complete_time: Some(complete_time),
            ..self.clone()
        }
    }

    /// Completion record for a shard item that failed with `cause`
    pub fn execution_failure(
        &self,
        complete_time: DateTime<Utc>,
        cause: impl Into<String>,
    ) -> Self {
        let cause = cause.into();
        Self {
            state: JobEventState::Error,
            message: cause.clone(),
            success: false,
            failure_cause: Some(cause),
            complete_time: Some(complete_time),
            ..self.clone()
        }
    }

    pub fn is_item_record(&self) -> bool {
        self.sharding_item.is_some()
    }

    pub fn with_sharding_items(mut self, items: impl IntoIterator<Item = u32>) -> Self {
        self.sharding_items = items.into_iter().collect();
        self
    }
}
