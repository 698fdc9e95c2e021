//! # Job Executor
//!
//! Runs the rounds of one sharded job.
//!
//! ## Construction
//!
//! The job configuration is loaded once through the [`JobFacade`]; the executor
//! service handler and the job exception handler are resolved once through the
//! [`HandlerResolver`] and kept for the executor's lifetime; the worker pool is
//! taken from the shared [`ExecutorServiceRegistry`].
//!
//! ## Execution
//!
//! ```text
//! STAGING ─► previous still running? ── yes ─► FINISHED (misfire), stop
//!               │ no
//!               ▼
//!           RUNNING ─► every shard item on the pool ─► join ─► FINISHED | ERROR
//!               ▲                                                   │
//!               └──────────── misfired items left? ◄────────────────┘
//! ```
//!
//! A failing shard item never cancels its siblings. Each failure is rendered by
//! the exception handler and reported in the round's error map once every item
//! of the round has finished. Every shard item also gets its own start and
//! completion trace records next to the round records.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::facade::JobFacade;
use super::handlers::{ExecutorServiceHandler, JobExceptionHandler};
use super::job::ShardingJob;
use super::types::{ExecutionReport, RoundErrorMap, RoundOutcome, ShardingContexts};
use super::worker_pool::WorkerPool;
use crate::config::JobConfiguration;
use crate::constants::messages;
use crate::error::TaskerResult;
use crate::events::{ExecutionSource, JobEventState, JobExecutionEvent};
use crate::logging::log_round_operation;
use crate::registry::{ExecutorServiceRegistry, HandlerResolver};

pub struct JobExecutor {
    facade: Arc<dyn JobFacade>,
    job: Arc<dyn ShardingJob>,
    configuration: JobConfiguration,
    executor_service_handler: Arc<dyn ExecutorServiceHandler>,
    job_exception_handler: Arc<dyn JobExceptionHandler>,
    worker_pool: Arc<WorkerPool>,
    pools: Arc<ExecutorServiceRegistry>,
}

impl JobExecutor {
    /// Load the job definition, resolve its handlers and obtain its worker pool.
    ///
    /// Fails when the configuration is invalid, when a default handler cannot be
    /// instantiated or when the worker pool cannot be created.
    pub async fn new(
        facade: Arc<dyn JobFacade>,
        job: Arc<dyn ShardingJob>,
        resolver: &HandlerResolver,
        pools: Arc<ExecutorServiceRegistry>,
    ) -> TaskerResult<Self> {
        let configuration = facade.load_job_configuration().await?;
        configuration.validate()?;

        let executor_service_handler =
            resolver.resolve_executor_service_handler(&configuration.job_properties)?;
        let job_exception_handler =
            resolver.resolve_job_exception_handler(&configuration.job_properties)?;
        let worker_pool =
            pools.get_or_create(&configuration.job_name, executor_service_handler.as_ref())?;

        info!(
            job_name = %configuration.job_name,
            executor_service_handler = %executor_service_handler.name(),
            job_exception_handler = %job_exception_handler.name(),
            max_workers = worker_pool.max_workers(),
            "🚀 EXECUTOR: Job executor ready"
        );

        Ok(Self {
            facade,
            job,
            configuration,
            executor_service_handler,
            job_exception_handler,
            worker_pool,
            pools,
        })
    }

    /// Run one triggered execution: the normal round plus any misfire rounds.
    ///
    /// Shard item failures are reported in the returned rounds; an `Err` here
    /// means the coordination layer itself failed.
    #[instrument(skip(self), fields(job_name = %self.configuration.job_name))]
    pub async fn execute(&self) -> TaskerResult<ExecutionReport> {
        if let Err(e) = self.facade.check_job_execution_environment().await {
            self.handle_exception(&anyhow::Error::new(e));
        }

        let contexts = self.facade.sharding_contexts().await?;
        let items = contexts.items();
        let mut report = ExecutionReport::new(contexts.task_id.clone());

        self.post_trace_event(
            &contexts,
            ExecutionSource::NormalTrigger,
            JobEventState::Staging,
            messages::execute_begin(self.job_name()),
        )
        .await;

        if self.facade.misfire_if_running(&items).await? {
            info!(items = ?items, "⏭️ EXECUTOR: Previous execution still running, marked misfired");
            self.post_trace_event(
                &contexts,
                ExecutionSource::NormalTrigger,
                JobEventState::Finished,
                messages::previous_still_running(self.job_name(), &items),
            )
            .await;
            report.misfired = true;
            return Ok(report);
        }

        self.facade.clean_previous_execution_info().await?;
        if let Err(cause) = self.facade.before_job_executed(&contexts).await {
            self.handle_exception(&cause);
        }

        report
            .rounds
            .push(self.execute_round(&contexts, ExecutionSource::NormalTrigger).await?);

        loop {
            let misfired = self.facade.misfired_items(&items).await?;
            if misfired.is_empty() {
                break;
            }
            debug!(items = ?misfired, "Re-running misfired shard items");
            self.facade.clear_misfire(&misfired).await?;
            let misfire_contexts = contexts.restricted_to(&misfired);
            report
                .rounds
                .push(self.execute_round(&misfire_contexts, ExecutionSource::Misfire).await?);
        }

        self.facade.failover_if_necessary().await?;
        if let Err(cause) = self.facade.after_job_executed(&contexts).await {
            self.handle_exception(&cause);
        }

        Ok(report)
    }

    /// Drop this job's pool from the shared registry and shut it down
    pub fn shutdown(&self) {
        info!(job_name = %self.job_name(), "🛑 EXECUTOR: Shutting down job executor");
        if self.pools.remove(self.job_name()).is_none() {
            self.worker_pool.shutdown();
        }
    }

    pub fn job_name(&self) -> &str {
        &self.configuration.job_name
    }

    pub fn configuration(&self) -> &JobConfiguration {
        &self.configuration
    }

    pub fn worker_pool(&self) -> &Arc<WorkerPool> {
        &self.worker_pool
    }

    pub fn executor_service_handler(&self) -> &Arc<dyn ExecutorServiceHandler> {
        &self.executor_service_handler
    }

    pub fn job_exception_handler(&self) -> &Arc<dyn JobExceptionHandler> {
        &self.job_exception_handler
    }

    async fn execute_round(
        &self,
        contexts: &ShardingContexts,
        source: ExecutionSource,
    ) -> TaskerResult<RoundOutcome> {
        let items = contexts.items();
        if items.is_empty() {
            self.post_trace_event(
                contexts,
                source,
                JobEventState::Finished,
                messages::sharding_items_empty(self.job_name()),
            )
            .await;
            return Ok(RoundOutcome {
                task_id: contexts.task_id.clone(),
                execution_source: source,
                sharding_items: items,
                item_errors: RoundErrorMap::new(),
                state: JobEventState::Finished,
            });
        }

        self.facade.register_job_begin(contexts).await?;
        self.post_trace_event(contexts, source, JobEventState::Running, String::new())
            .await;

        let item_errors = self.process_items(contexts, source).await;

        self.facade.register_job_completed(contexts).await?;
        let (state, message) = if item_errors.is_empty() {
            (JobEventState::Finished, String::new())
        } else {
            (JobEventState::Error, serde_json::to_string(&item_errors)?)
        };
        self.post_trace_event(contexts, source, state, message).await;

        log_round_operation(
            self.job_name(),
            &contexts.task_id,
            source,
            state,
            items.len(),
            item_errors.len(),
        );

        Ok(RoundOutcome {
            task_id: contexts.task_id.clone(),
            execution_source: source,
            sharding_items: items,
            item_errors,
            state,
        })
    }

    /// Dispatch every item onto the pool, wait for all of them and collect failures.
    ///
    /// When job events are allowed every item gets a start record before it is
    /// dispatched and a success or failure record once it has completed.
    async fn process_items(
        &self,
        contexts: &ShardingContexts,
        source: ExecutionSource,
    ) -> RoundErrorMap {
        let mut item_errors = RoundErrorMap::new();
        let mut dispatched = Vec::new();
        let mut handles = Vec::new();

        for item in contexts.items() {
            let started = self.post_item_started(contexts, source, item).await;
            let job = Arc::clone(&self.job);
            let context = contexts.context_for(item);
            let spawned = self.worker_pool.spawn(async move {
                let result = job.process(context).await;
                (result, Utc::now())
            });
            match spawned {
                Ok(handle) => {
                    dispatched.push((item, started));
                    handles.push(handle);
                }
                Err(e) => {
                    let cause = anyhow::Error::new(e);
                    self.post_item_completed(started, Utc::now(), Some(&cause))
                        .await;
                    item_errors.insert(item, self.handle_exception(&cause));
                }
            }
        }

        let results = join_all(handles).await;

        for ((item, started), result) in dispatched.into_iter().zip(results) {
            let (cause, complete_time) = match result {
                Ok(Ok((Ok(()), complete_time))) => {
                    self.post_item_completed(started, complete_time, None).await;
                    continue;
                }
                Ok(Ok((Err(cause), complete_time))) => (cause, complete_time),
                Ok(Err(pool_error)) => (anyhow::Error::new(pool_error), Utc::now()),
                Err(join_error) => (
                    anyhow::anyhow!("shard item {item} did not complete: {join_error}"),
                    Utc::now(),
                ),
            };
            self.post_item_completed(started, complete_time, Some(&cause))
                .await;
            item_errors.insert(item, self.handle_exception(&cause));
        }

        item_errors
    }

    async fn post_item_started(
        &self,
        contexts: &ShardingContexts,
        source: ExecutionSource,
        item: u32,
    ) -> Option<JobExecutionEvent> {
        if !contexts.allow_send_job_event {
            return None;
        }
        let event = JobExecutionEvent::item_started(
            contexts.task_id.clone(),
            self.job_name(),
            source,
            item,
        );
        self.facade.post_trace_event(event.clone()).await;
        Some(event)
    }

    /// `failure` is the cause when the item failed
    async fn post_item_completed(
        &self,
        started: Option<JobExecutionEvent>,
        complete_time: DateTime<Utc>,
        failure: Option<&anyhow::Error>,
    ) {
        let Some(started) = started else {
            return;
        };
        let event = match failure {
            Some(cause) => started.execution_failure(complete_time, format!("{cause:#}")),
            None => started.execution_success(complete_time),
        };
        self.facade.post_trace_event(event).await;
    }

    async fn post_trace_event(
        &self,
        contexts: &ShardingContexts,
        source: ExecutionSource,
        state: JobEventState,
        message: String,
    ) {
        if !contexts.allow_send_job_event {
            return;
        }
        let event = JobExecutionEvent::new(
            contexts.task_id.clone(),
            self.job_name(),
            source,
            state,
            message,
        )
        .with_sharding_items(contexts.items());
        self.facade.post_trace_event(event).await;
    }

    fn handle_exception(&self, cause: &anyhow::Error) -> String {
        self.job_exception_handler
            .handle_exception(self.job_name(), cause)
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("job_name", &self.configuration.job_name)
            .field("executor_service_handler", &self.executor_service_handler.name())
            .field("job_exception_handler", &self.job_exception_handler.name())
            .field("max_workers", &self.worker_pool.max_workers())
            .finish()
    }
}
