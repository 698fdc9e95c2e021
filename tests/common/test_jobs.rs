//! Sharding jobs with scripted outcomes

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tasker_jobs::executor::{ShardingContext, ShardingJob};

#[derive(Debug, Default)]
pub struct ScriptedJob {
    failing: HashSet<u32>,
    panicking: HashSet<u32>,
    delay: Option<Duration>,
    attempted: Mutex<Vec<u32>>,
    completed: Mutex<Vec<u32>>,
    contexts: Mutex<Vec<ShardingContext>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl ScriptedJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, items: &[u32]) -> Self {
        self.failing.extend(items);
        self
    }

    pub fn panicking_on(mut self, items: &[u32]) -> Self {
        self.panicking.extend(items);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn attempted(&self) -> Vec<u32> {
        let mut items = self.attempted.lock().clone();
        items.sort_unstable();
        items
    }

    pub fn completed(&self) -> Vec<u32> {
        let mut items = self.completed.lock().clone();
        items.sort_unstable();
        items
    }

    pub fn contexts(&self) -> Vec<ShardingContext> {
        let mut contexts = self.contexts.lock().clone();
        contexts.sort_by_key(|c| c.sharding_item);
        contexts
    }

    /// Highest number of items observed running at the same time
    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShardingJob for ScriptedJob {
    async fn process(&self, context: ShardingContext) -> anyhow::Result<()> {
        let item = context.sharding_item;
        self.attempted.lock().push(item);
        self.contexts.lock().push(context);

        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&item) {
            panic!("shard {item} exploded");
        }
        if self.failing.contains(&item) {
            anyhow::bail!("shard {item} failed");
        }
        self.completed.lock().push(item);
        Ok(())
    }
}
