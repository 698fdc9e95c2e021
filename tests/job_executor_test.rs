mod common;

use common::{MockJobFacade, ScriptedJob};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tasker_jobs::config::JobConfiguration;
use tasker_jobs::constants::{handlers, messages};
use tasker_jobs::events::{
    EventProcessorBinder, EventTraceConfiguration, ExecutionSource, JobEventBus, JobEventState,
    MemoryEventStorage,
};
use tasker_jobs::executor::{JobExceptionHandler, JobExecutor};
use tasker_jobs::registry::{
    ExecutorServiceRegistry, HandlerCatalog, HandlerInstance, HandlerResolver, JobProperties,
    JobPropertyKey,
};
use tasker_jobs::TaskerError;

/// Exception handler that remembers every message it rendered
#[derive(Debug, Default)]
struct CollectingExceptionHandler {
    messages: Mutex<Vec<String>>,
}

impl JobExceptionHandler for CollectingExceptionHandler {
    fn name(&self) -> &str {
        "CollectingExceptionHandler"
    }

    fn handle_exception(&self, _job_name: &str, cause: &anyhow::Error) -> String {
        let message = format!("collected: {cause}");
        self.messages.lock().push(message.clone());
        message
    }
}

fn configuration(total: u32) -> JobConfiguration {
    JobConfiguration::new("settlement", total)
}

async fn build_executor(facade: &Arc<MockJobFacade>, job: &Arc<ScriptedJob>) -> JobExecutor {
    JobExecutor::new(
        facade.clone(),
        job.clone(),
        &HandlerResolver::default(),
        Arc::new(ExecutorServiceRegistry::new()),
    )
    .await
    .unwrap()
}

fn resolver_with_collector(collector: Arc<CollectingExceptionHandler>) -> HandlerResolver {
    let mut catalog = HandlerCatalog::with_builtins();
    catalog.register("com.example.Collecting", move || {
        Ok(HandlerInstance::JobException(collector.clone()))
    });
    HandlerResolver::new(Arc::new(catalog))
}

#[tokio::test]
async fn test_failing_shard_is_recorded_and_siblings_complete() {
    let facade = Arc::new(MockJobFacade::new(configuration(3)));
    let job = Arc::new(ScriptedJob::new().failing_on(&[1]));
    let executor = build_executor(&facade, &job).await;

    let report = executor.execute().await.unwrap();

    assert!(!report.misfired);
    assert_eq!(report.rounds.len(), 1);
    let round = &report.rounds[0];
    assert_eq!(round.state, JobEventState::Error);
    assert_eq!(round.item_errors.keys().copied().collect::<Vec<_>>(), vec![1]);
    assert!(round.item_errors[&1].contains("shard 1 failed"));
    assert_eq!(job.attempted(), vec![0, 1, 2]);
    assert_eq!(job.completed(), vec![0, 2]);

    assert_eq!(
        facade.states(),
        vec![JobEventState::Staging, JobEventState::Running, JobEventState::Error]
    );
    let events = facade.events();
    let error_event = events.last().unwrap();
    let reported: BTreeMap<u32, String> = serde_json::from_str(&error_event.message).unwrap();
    assert_eq!(reported, round.item_errors);
    assert_eq!(report.final_state(), Some(JobEventState::Error));
}

#[tokio::test]
async fn test_successful_round_finishes_with_empty_error_map() {
    let facade = Arc::new(MockJobFacade::new(
        configuration(3).with_sharding_item_parameters("0=Beijing,2=Guangzhou"),
    ));
    let job = Arc::new(ScriptedJob::new());
    let executor = build_executor(&facade, &job).await;

    let report = executor.execute().await.unwrap();

    let round = &report.rounds[0];
    assert_eq!(round.state, JobEventState::Finished);
    assert!(round.is_success());
    assert_eq!(round.sharding_items, vec![0, 1, 2]);
    assert_eq!(job.completed(), vec![0, 1, 2]);
    assert_eq!(
        facade.states(),
        vec![JobEventState::Staging, JobEventState::Running, JobEventState::Finished]
    );

    let events = facade.events();
    assert_eq!(events[0].message, messages::execute_begin("settlement"));
    assert!(events.iter().all(|e| e.task_id == facade.task_id()));

    let parameters: Vec<Option<String>> = job
        .contexts()
        .into_iter()
        .map(|c| c.sharding_parameter)
        .collect();
    assert_eq!(
        parameters,
        vec![Some("Beijing".to_string()), None, Some("Guangzhou".to_string())]
    );
    assert_eq!(
        facade.calls(),
        vec![
            "load_job_configuration",
            "check_job_execution_environment",
            "sharding_contexts",
            "misfire_if_running",
            "clean_previous_execution_info",
            "before_job_executed",
            "register_job_begin",
            "register_job_completed",
            "misfired_items",
            "failover_if_necessary",
            "after_job_executed",
        ]
    );
}

#[tokio::test]
async fn test_previous_execution_running_posts_one_misfire_event_and_dispatches_nothing() {
    let facade = Arc::new(MockJobFacade::new(configuration(3)).with_previous_still_running());
    let job = Arc::new(ScriptedJob::new());
    let executor = build_executor(&facade, &job).await;

    let report = executor.execute().await.unwrap();

    assert!(report.misfired);
    assert!(report.rounds.is_empty());
    assert_eq!(report.dispatched_items(), 0);
    assert!(job.attempted().is_empty());
    assert_eq!(
        facade.states(),
        vec![JobEventState::Staging, JobEventState::Finished]
    );
    let finished = &facade.events()[1];
    assert_eq!(
        finished.message,
        messages::previous_still_running("settlement", &[0, 1, 2])
    );
    assert_eq!(facade.call_count("register_job_begin"), 0);
    assert_eq!(facade.call_count("before_job_executed"), 0);
}

#[tokio::test]
async fn test_misfired_items_rerun_with_misfire_source() {
    let facade = Arc::new(
        MockJobFacade::new(configuration(3)).with_misfire_rounds(vec![vec![1, 2], vec![2]]),
    );
    let job = Arc::new(ScriptedJob::new());
    let executor = build_executor(&facade, &job).await;

    let report = executor.execute().await.unwrap();

    assert_eq!(report.rounds.len(), 3);
    assert_eq!(report.rounds[0].execution_source, ExecutionSource::NormalTrigger);
    assert_eq!(report.rounds[1].execution_source, ExecutionSource::Misfire);
    assert_eq!(report.rounds[1].sharding_items, vec![1, 2]);
    assert_eq!(report.rounds[2].sharding_items, vec![2]);
    assert_eq!(job.attempted(), vec![0, 1, 1, 2, 2, 2]);
    assert_eq!(facade.call_count("clear_misfire"), 2);
    assert_eq!(report.dispatched_items(), 6);

    let misfire_events: Vec<_> = facade
        .events()
        .into_iter()
        .filter(|e| e.execution_source == ExecutionSource::Misfire)
        .collect();
    assert_eq!(misfire_events.len(), 4);
    assert_eq!(misfire_events[0].state, JobEventState::Running);
    assert_eq!(misfire_events[0].sharding_items, vec![1, 2]);
}

#[tokio::test]
async fn test_panicking_shard_is_recorded_like_an_error() {
    let facade = Arc::new(MockJobFacade::new(configuration(3)));
    let job = Arc::new(ScriptedJob::new().panicking_on(&[2]));
    let executor = build_executor(&facade, &job).await;

    let report = executor.execute().await.unwrap();

    let round = &report.rounds[0];
    assert_eq!(round.state, JobEventState::Error);
    assert_eq!(round.item_errors.keys().copied().collect::<Vec<_>>(), vec![2]);
    assert!(round.item_errors[&2].contains("did not complete"));
    assert_eq!(job.completed(), vec![0, 1]);
}

#[tokio::test]
async fn test_empty_assignment_finishes_without_dispatch() {
    let facade = Arc::new(MockJobFacade::new(configuration(3)).with_items(&[]));
    let job = Arc::new(ScriptedJob::new());
    let executor = build_executor(&facade, &job).await;

    let report = executor.execute().await.unwrap();

    assert_eq!(report.rounds.len(), 1);
    assert_eq!(report.rounds[0].state, JobEventState::Finished);
    assert!(job.attempted().is_empty());
    let events = facade.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].message, messages::sharding_items_empty("settlement"));
    assert_eq!(facade.call_count("register_job_begin"), 0);
}

#[tokio::test]
async fn test_disabled_job_events_are_not_posted() {
    let facade = Arc::new(MockJobFacade::new(configuration(2)).without_job_events());
    let job = Arc::new(ScriptedJob::new().failing_on(&[0]));
    let executor = build_executor(&facade, &job).await;

    let report = executor.execute().await.unwrap();

    assert!(facade.all_events().is_empty());
    assert_eq!(report.rounds[0].state, JobEventState::Error);
}

#[tokio::test]
async fn test_environment_and_hook_failures_go_to_exception_handler() {
    let collector = Arc::new(CollectingExceptionHandler::default());
    let resolver = resolver_with_collector(collector.clone());
    let properties =
        JobProperties::new().with(JobPropertyKey::JobExceptionHandler, "com.example.Collecting");
    let facade = Arc::new(
        MockJobFacade::new(configuration(2).with_job_properties(properties))
            .with_environment_error("clock skew 90s")
            .with_before_hook_error("before hook refused"),
    );
    let job = Arc::new(ScriptedJob::new().failing_on(&[1]));

    let executor = JobExecutor::new(
        facade.clone(),
        job.clone(),
        &resolver,
        Arc::new(ExecutorServiceRegistry::new()),
    )
    .await
    .unwrap();
    assert_eq!(executor.job_exception_handler().name(), "CollectingExceptionHandler");

    let report = executor.execute().await.unwrap();

    assert_eq!(report.rounds.len(), 1);
    assert_eq!(report.rounds[0].item_errors[&1], "collected: shard 1 failed");
    let messages = collector.messages.lock().clone();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].contains("clock skew 90s"));
    assert!(messages[1].contains("before hook refused"));
}

#[tokio::test]
async fn test_unusable_configured_handlers_fall_back_to_defaults() {
    let properties = JobProperties::new()
        .with(JobPropertyKey::ExecutorServiceHandler, "com.example.Gone")
        .with(
            JobPropertyKey::JobExceptionHandler,
            handlers::SINGLE_THREAD_EXECUTOR_SERVICE_HANDLER,
        );
    let facade = Arc::new(MockJobFacade::new(configuration(1).with_job_properties(properties)));
    let job = Arc::new(ScriptedJob::new());
    let resolver = HandlerResolver::default();

    let executor = JobExecutor::new(
        facade.clone(),
        job.clone(),
        &resolver,
        Arc::new(ExecutorServiceRegistry::new()),
    )
    .await
    .unwrap();

    assert_eq!(
        executor.executor_service_handler().name(),
        handlers::DEFAULT_EXECUTOR_SERVICE_HANDLER
    );
    assert_eq!(
        executor.job_exception_handler().name(),
        handlers::DEFAULT_JOB_EXCEPTION_HANDLER
    );
    assert_eq!(resolver.fallback_count(), 2);
    assert!(executor.execute().await.unwrap().rounds[0].is_success());
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let facade = Arc::new(MockJobFacade::new(configuration(0)));
    let job = Arc::new(ScriptedJob::new());

    let result = JobExecutor::new(
        facade,
        job,
        &HandlerResolver::default(),
        Arc::new(ExecutorServiceRegistry::new()),
    )
    .await;

    assert!(matches!(result, Err(TaskerError::ConfigurationError(_))));
}

#[tokio::test]
async fn test_single_thread_handler_serializes_shard_items() {
    let properties = JobProperties::new().with(
        JobPropertyKey::ExecutorServiceHandler,
        handlers::SINGLE_THREAD_EXECUTOR_SERVICE_HANDLER,
    );
    let facade = Arc::new(MockJobFacade::new(configuration(4).with_job_properties(properties)));
    let job = Arc::new(ScriptedJob::new().with_delay(Duration::from_millis(10)));
    let executor = build_executor(&facade, &job).await;

    executor.execute().await.unwrap();

    assert_eq!(job.completed(), vec![0, 1, 2, 3]);
    assert_eq!(job.max_running(), 1);
}

#[tokio::test]
async fn test_default_handler_runs_shard_items_concurrently() {
    let facade = Arc::new(MockJobFacade::new(configuration(2)));
    let job = Arc::new(ScriptedJob::new().with_delay(Duration::from_millis(50)));
    let executor = build_executor(&facade, &job).await;

    executor.execute().await.unwrap();

    assert_eq!(job.max_running(), 2);
}

#[tokio::test]
async fn test_executors_of_same_job_share_pool_until_shutdown() {
    let pools = Arc::new(ExecutorServiceRegistry::new());
    let resolver = HandlerResolver::default();
    let job = Arc::new(ScriptedJob::new());

    let first = JobExecutor::new(
        Arc::new(MockJobFacade::new(configuration(1))),
        job.clone(),
        &resolver,
        pools.clone(),
    )
    .await
    .unwrap();
    let second = JobExecutor::new(
        Arc::new(MockJobFacade::new(configuration(1))),
        job.clone(),
        &resolver,
        pools.clone(),
    )
    .await
    .unwrap();
    assert!(Arc::ptr_eq(first.worker_pool(), second.worker_pool()));

    first.shutdown();
    assert!(!pools.contains("settlement"));
    assert!(second.worker_pool().is_shutdown());
}

#[tokio::test]
async fn test_trace_events_reach_storage_through_event_bus() {
    let storage = Arc::new(MemoryEventStorage::new());
    let bus = JobEventBus::from_configurations(
        &[EventTraceConfiguration::new(storage.clone(), "")],
        &EventProcessorBinder::default(),
    )
    .unwrap();
    let facade = Arc::new(MockJobFacade::new(configuration(2)).with_event_bus(bus));
    let job = Arc::new(ScriptedJob::new());
    let executor = build_executor(&facade, &job).await;

    executor.execute().await.unwrap();

    let stored = storage.events_for_task(&facade.task_id());
    assert_eq!(stored, facade.all_events());
    assert_eq!(stored.last().map(|e| e.state), Some(JobEventState::Finished));
    assert!(stored
        .iter()
        .filter(|e| !e.is_item_record())
        .all(|e| e.sharding_items == vec![0, 1]));
}

#[tokio::test]
async fn test_failing_shard_persists_one_failure_record_for_that_item() {
    let storage = Arc::new(MemoryEventStorage::new());
    let bus = JobEventBus::from_configurations(
        &[EventTraceConfiguration::new(storage.clone(), "")],
        &EventProcessorBinder::default(),
    )
    .unwrap();
    let facade = Arc::new(MockJobFacade::new(configuration(3)).with_event_bus(bus));
    let job = Arc::new(ScriptedJob::new().failing_on(&[1]));
    let executor = build_executor(&facade, &job).await;

    executor.execute().await.unwrap();

    let item_records: Vec<_> = storage
        .events_for_task(&facade.task_id())
        .into_iter()
        .filter(|e| e.is_item_record())
        .collect();
    assert_eq!(item_records.len(), 6);

    for item in [0, 1, 2] {
        let records: Vec<_> = item_records
            .iter()
            .filter(|e| e.sharding_item == Some(item))
            .collect();
        assert_eq!(records.len(), 2, "item {item} should have a start and a completion record");
        let (started, completed) = (records[0], records[1]);
        assert_eq!(started.state, JobEventState::Running);
        assert!(started.complete_time.is_none());
        assert_eq!(completed.id, started.id);
        assert!(completed.complete_time.is_some());
        assert_eq!(completed.execution_source, ExecutionSource::NormalTrigger);
    }

    let failures: Vec<_> = item_records
        .iter()
        .filter(|e| e.complete_time.is_some() && !e.success)
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].sharding_item, Some(1));
    assert_eq!(failures[0].state, JobEventState::Error);
    assert!(failures[0]
        .failure_cause
        .as_deref()
        .is_some_and(|cause| cause.contains("shard 1 failed")));

    let successes: Vec<_> = item_records
        .iter()
        .filter(|e| e.success)
        .filter_map(|e| e.sharding_item)
        .collect();
    assert_eq!(successes, vec![0, 2]);
}

#[tokio::test]
async fn test_panicking_shard_gets_failure_record() {
    let facade = Arc::new(MockJobFacade::new(configuration(2)));
    let job = Arc::new(ScriptedJob::new().panicking_on(&[0]));
    let executor = build_executor(&facade, &job).await;

    executor.execute().await.unwrap();

    let completed: Vec<_> = facade
        .item_events()
        .into_iter()
        .filter(|e| e.complete_time.is_some())
        .collect();
    assert_eq!(completed.len(), 2);
    let failed = completed
        .iter()
        .find(|e| e.sharding_item == Some(0))
        .unwrap();
    assert!(!failed.success);
    assert!(failed
        .failure_cause
        .as_deref()
        .is_some_and(|cause| cause.contains("did not complete")));
    assert!(completed
        .iter()
        .any(|e| e.sharding_item == Some(1) && e.success));
}

#[tokio::test]
async fn test_misfire_round_item_records_carry_misfire_source() {
    let facade = Arc::new(
        MockJobFacade::new(configuration(2)).with_misfire_rounds(vec![vec![1]]),
    );
    let job = Arc::new(ScriptedJob::new());
    let executor = build_executor(&facade, &job).await;

    executor.execute().await.unwrap();

    let misfire_items: Vec<_> = facade
        .item_events()
        .into_iter()
        .filter(|e| e.execution_source == ExecutionSource::Misfire)
        .collect();
    assert_eq!(misfire_items.len(), 2);
    assert!(misfire_items.iter().all(|e| e.sharding_item == Some(1)));
    assert!(misfire_items[1].success);
}
