//! # Sharding Job
//!
//! The hook a concrete job implements.

use async_trait::async_trait;

use super::types::ShardingContext;

/// Business logic of a sharded job
///
/// Called once per shard item per round, concurrently for the items of a
/// round. Any error (or panic) is recorded against the item and does not
/// affect the other items.
#[async_trait]
pub trait ShardingJob: Send + Sync + 'static {
    async fn process(&self, context: ShardingContext) -> anyhow::Result<()>;
}
