use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use super::{Job, JobContext, TaskSpec};
use crate::Result;

/// Watches the chain head and logs the transaction count of each new block.
#[derive(Debug, Default)]
pub struct BlockWatcherJob {
    last_block: u64,
    transactions_seen: usize,
}

impl BlockWatcherJob {
    pub const NAME: &'static str = "block_watcher";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_block(&self) -> u64 {
        self.last_block
    }

    pub fn transactions_seen(&self) -> usize {
        self.transactions_seen
    }
}

#[async_trait]
impl Job for BlockWatcherJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn tasks(&self) -> Vec<TaskSpec> {
        vec![TaskSpec::new("get_block", 1)]
    }

    // start from the current head, history is not interesting
    async fn before_start(&mut self, ctx: &JobContext) -> Result<()> {
        self.last_block = ctx
            .client
            .block_number()
            .await
            .context("failed to read chain head")?;
        Ok(())
    }

    async fn run_task(&mut self, _task: &str, ctx: &JobContext) -> Result<()> {
        let head = ctx.client.block_number().await?;

        for number in self.last_block + 1..=head {
            // block not served yet, retry next iteration
            let Some(tx_count) = ctx.client.block_transaction_count(number).await? else {
                break;
            };
            info!(block = number, tx_count, "new block");
            self.last_block = number;
            self.transactions_seen += tx_count;
        }

        Ok(())
    }
}
