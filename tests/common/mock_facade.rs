//! Scriptable in-memory coordination facade

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};

use tasker_jobs::config::JobConfiguration;
use tasker_jobs::events::{JobEventBus, JobEventState, JobExecutionEvent};
use tasker_jobs::executor::{JobFacade, ShardingContexts};
use tasker_jobs::{TaskerError, TaskerResult};

#[derive(Debug)]
pub struct MockJobFacade {
    configuration: JobConfiguration,
    contexts: ShardingContexts,
    previous_still_running: bool,
    misfire_rounds: Mutex<VecDeque<Vec<u32>>>,
    environment_error: Option<String>,
    before_hook_error: Option<String>,
    event_bus: Option<JobEventBus>,
    events: Mutex<Vec<JobExecutionEvent>>,
    calls: Mutex<Vec<String>>,
}

impl MockJobFacade {
    /// Facade assigning every shard item of `configuration` to this instance
    pub fn new(configuration: JobConfiguration) -> Self {
        let parameters = configuration
            .parsed_sharding_item_parameters()
            .unwrap_or_default();
        let items: BTreeMap<u32, String> = (0..configuration.sharding_total_count)
            .map(|item| (item, parameters.get(&item).cloned().unwrap_or_default()))
            .collect();
        let contexts = ShardingContexts::new(
            ShardingContexts::generate_task_id(&configuration.job_name),
            configuration.job_name.clone(),
            configuration.sharding_total_count,
            items,
        )
        .with_job_parameter(configuration.job_parameter.clone());

        Self {
            configuration,
            contexts,
            previous_still_running: false,
            misfire_rounds: Mutex::new(VecDeque::new()),
            environment_error: None,
            before_hook_error: None,
            event_bus: None,
            events: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Restrict the assignment to `items`
    pub fn with_items(mut self, items: &[u32]) -> Self {
        self.contexts = self.contexts.restricted_to(items);
        self
    }

    pub fn with_previous_still_running(mut self) -> Self {
        self.previous_still_running = true;
        self
    }

    /// Each entry is reported as misfired once, after the preceding round
    pub fn with_misfire_rounds(self, rounds: Vec<Vec<u32>>) -> Self {
        *self.misfire_rounds.lock() = rounds.into();
        self
    }

    pub fn with_environment_error(mut self, message: &str) -> Self {
        self.environment_error = Some(message.to_string());
        self
    }

    pub fn with_before_hook_error(mut self, message: &str) -> Self {
        self.before_hook_error = Some(message.to_string());
        self
    }

    pub fn with_event_bus(mut self, bus: JobEventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn without_job_events(mut self) -> Self {
        self.contexts = self.contexts.with_allow_send_job_event(false);
        self
    }

    pub fn task_id(&self) -> String {
        self.contexts.task_id.clone()
    }

    /// Every posted record, round and shard item alike, in posting order
    pub fn all_events(&self) -> Vec<JobExecutionEvent> {
        self.events.lock().clone()
    }

    /// Round records only
    pub fn events(&self) -> Vec<JobExecutionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| !e.is_item_record())
            .cloned()
            .collect()
    }

    pub fn item_events(&self) -> Vec<JobExecutionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is_item_record())
            .cloned()
            .collect()
    }

    pub fn states(&self) -> Vec<JobEventState> {
        self.events().iter().map(|e| e.state).collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }
}

#[async_trait]
impl JobFacade for MockJobFacade {
    async fn load_job_configuration(&self) -> TaskerResult<JobConfiguration> {
        self.record("load_job_configuration");
        Ok(self.configuration.clone())
    }

    async fn sharding_contexts(&self) -> TaskerResult<ShardingContexts> {
        self.record("sharding_contexts");
        Ok(self.contexts.clone())
    }

    async fn misfire_if_running(&self, _items: &[u32]) -> TaskerResult<bool> {
        self.record("misfire_if_running");
        Ok(self.previous_still_running)
    }

    async fn post_trace_event(&self, event: JobExecutionEvent) {
        if let Some(bus) = &self.event_bus {
            bus.post(&event).await;
        }
        self.events.lock().push(event);
    }

    async fn check_job_execution_environment(&self) -> TaskerResult<()> {
        self.record("check_job_execution_environment");
        match &self.environment_error {
            Some(message) => Err(TaskerError::CoordinationError(message.clone())),
            None => Ok(()),
        }
    }

    async fn clean_previous_execution_info(&self) -> TaskerResult<()> {
        self.record("clean_previous_execution_info");
        Ok(())
    }

    async fn before_job_executed(&self, _contexts: &ShardingContexts) -> anyhow::Result<()> {
        self.record("before_job_executed");
        match &self.before_hook_error {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(()),
        }
    }

    async fn after_job_executed(&self, _contexts: &ShardingContexts) -> anyhow::Result<()> {
        self.record("after_job_executed");
        Ok(())
    }

    async fn register_job_begin(&self, _contexts: &ShardingContexts) -> TaskerResult<()> {
        self.record("register_job_begin");
        Ok(())
    }

    async fn register_job_completed(&self, _contexts: &ShardingContexts) -> TaskerResult<()> {
        self.record("register_job_completed");
        Ok(())
    }

    async fn misfired_items(&self, _items: &[u32]) -> TaskerResult<Vec<u32>> {
        self.record("misfired_items");
        Ok(self.misfire_rounds.lock().pop_front().unwrap_or_default())
    }

    async fn clear_misfire(&self, _items: &[u32]) -> TaskerResult<()> {
        self.record("clear_misfire");
        Ok(())
    }

    async fn failover_if_necessary(&self) -> TaskerResult<()> {
        self.record("failover_if_necessary");
        Ok(())
    }
}
