use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::{Context, anyhow};
use async_trait::async_trait;

use super::{Job, JobContext, TaskSpec};
use crate::Result;
use crate::account::Account;
use crate::common::ONE_ETHER;
use crate::transaction::{TransactionSender, TxFormat};

/// Plain value transfers in all three formats, no contracts.
pub struct TransferJob {
    account: Option<Arc<Account>>,
    sender: Option<TransactionSender>,
    value: U256,
}

impl TransferJob {
    pub const NAME: &'static str = "transfer";

    pub fn new() -> Self {
        Self {
            account: None,
            sender: None,
            // 0.1 ether
            value: U256::from(ONE_ETHER / 10),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

impl Default for TransferJob {
    fn default() -> Self {
        Self::new()
    }
}

fn task_format(task: &str) -> Option<TxFormat> {
    TxFormat::ALL.into_iter().find(|format| format.name() == task)
}

#[async_trait]
impl Job for TransferJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn tasks(&self) -> Vec<TaskSpec> {
        TxFormat::ALL
            .into_iter()
            .map(|format| TaskSpec::new(format.name(), 1))
            .collect()
    }

    async fn before_start(&mut self, ctx: &JobContext) -> Result<()> {
        let account = ctx
            .new_account()
            .await
            .context("failed to fund transfer account")?;
        self.account = Some(account);
        self.sender = Some(ctx.sender());
        Ok(())
    }

    async fn run_task(&mut self, task: &str, _ctx: &JobContext) -> Result<()> {
        let (Some(account), Some(sender)) = (&self.account, &self.sender) else {
            return Err(anyhow!("transfer job used before setup"));
        };
        let format = task_format(task).ok_or_else(|| anyhow!("unknown task `{task}`"))?;

        // fresh recipient every time
        let to: Address = Account::generate().address();
        sender.transfer(account, to, self.value, format).await?;
        Ok(())
    }
}
