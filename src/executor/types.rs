//! # Execution Types
//!
//! Sharding contexts handed in by the coordination layer and the outcomes the
//! executor reports back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::events::{ExecutionSource, JobEventState};

/// Failure message per shard item of one round
pub type RoundErrorMap = BTreeMap<u32, String>;

/// Shard assignment of this instance for one triggered execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingContexts {
    pub task_id: String,
    pub job_name: String,
    pub sharding_total_count: u32,
    pub job_parameter: String,
    /// Assigned shard items and their parameter ("" when none is configured)
    pub sharding_item_parameters: BTreeMap<u32, String>,
    /// Whether trace events are posted for this execution
    pub allow_send_job_event: bool,
}

impl ShardingContexts {
    pub fn new(
        task_id: impl Into<String>,
        job_name: impl Into<String>,
        sharding_total_count: u32,
        sharding_item_parameters: BTreeMap<u32, String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            job_name: job_name.into(),
            sharding_total_count,
            job_parameter: String::new(),
            sharding_item_parameters,
            allow_send_job_event: true,
        }
    }

    /// Task id in the `<job>@-@<uuid>` form used when the coordinator has no id of its own
    pub fn generate_task_id(job_name: &str) -> String {
        format!("{job_name}@-@{}", Uuid::new_v4())
    }

    pub fn with_job_parameter(mut self, job_parameter: impl Into<String>) -> Self {
        self.job_parameter = job_parameter.into();
        self
    }

    pub fn with_allow_send_job_event(mut self, allow: bool) -> Self {
        self.allow_send_job_event = allow;
        self
    }

    /// Assigned shard items in ascending order
    pub fn items(&self) -> Vec<u32> {
        self.sharding_item_parameters.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sharding_item_parameters.is_empty()
    }

    /// Same execution narrowed to `items`. Items not assigned here are dropped.
    pub fn restricted_to(&self, items: &[u32]) -> Self {
        let sharding_item_parameters = self
            .sharding_item_parameters
            .iter()
            .filter(|(item, _)| items.contains(*item))
            .map(|(item, parameter)| (*item, parameter.clone()))
            .collect();
        Self {
            sharding_item_parameters,
            ..self.clone()
        }
    }

    /// Context handed to the job for a single shard item
    pub fn context_for(&self, item: u32) -> ShardingContext {
        ShardingContext {
            job_name: self.job_name.clone(),
            task_id: self.task_id.clone(),
            sharding_total_count: self.sharding_total_count,
            job_parameter: self.job_parameter.clone(),
            sharding_item: item,
            sharding_parameter: self
                .sharding_item_parameters
                .get(&item)
                .filter(|p| !p.is_empty())
                .cloned(),
        }
    }
}

/// What one shard item of a round sees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingContext {
    pub job_name: String,
    pub task_id: String,
    pub sharding_total_count: u32,
    pub job_parameter: String,
    pub sharding_item: u32,
    pub sharding_parameter: Option<String>,
}

/// Result of one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub task_id: String,
    pub execution_source: ExecutionSource,
    /// Items the round dispatched
    pub sharding_items: Vec<u32>,
    pub item_errors: RoundErrorMap,
    /// Terminal trace state of the round
    pub state: JobEventState,
}

impl RoundOutcome {
    pub fn is_success(&self) -> bool {
        self.item_errors.is_empty()
    }
}

/// Result of one triggered execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub task_id: String,
    /// True when a previous execution still held the shard items and nothing ran
    pub misfired: bool,
    /// Normal round first, then any misfire rounds
    pub rounds: Vec<RoundOutcome>,
}

impl ExecutionReport {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            misfired: false,
            rounds: Vec::new(),
        }
    }

    /// Terminal state of the last round, if any round ran
    pub fn final_state(&self) -> Option<JobEventState> {
        self.rounds.last().map(|round| round.state)
    }

    pub fn dispatched_items(&self) -> usize {
        self.rounds.iter().map(|round| round.sharding_items.len()).sum()
    }
}
