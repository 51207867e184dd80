use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::account::{Account, AccountPool, FundingError};
use crate::chain::ChainClient;
use crate::config::JobSettings;
use crate::contracts::{Compiler, ContractRegistry};
use crate::transaction::TransactionSender;

/// A named action of a job and its selection weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub weight: u32,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Created,
    BeforeStart,
    OnStart,
    Running,
    Stopped,
    Failed,
}

impl JobState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => JobState::BeforeStart,
            2 => JobState::OnStart,
            3 => JobState::Running,
            4 => JobState::Stopped,
            5 => JobState::Failed,
            _ => JobState::Created,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            JobState::Created => 0,
            JobState::BeforeStart => 1,
            JobState::OnStart => 2,
            JobState::Running => 3,
            JobState::Stopped => 4,
            JobState::Failed => 5,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Stopped | JobState::Failed)
    }
}

/// Live counters of one job instance, shared with the controller.
#[derive(Debug, Default)]
pub struct JobStatus {
    state: AtomicU8,
    iterations: AtomicU64,
    failed_iterations: AtomicU64,
}

impl JobStatus {
    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: JobState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn failed_iterations(&self) -> u64 {
        self.failed_iterations.load(Ordering::Relaxed)
    }

    pub(crate) fn record_iteration(&self, ok: bool) {
        if ok {
            self.iterations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_iterations.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Everything one simulated user gets from the controller.
#[derive(Clone)]
pub struct JobContext {
    pub client: Arc<dyn ChainClient>,
    pub pool: Arc<AccountPool>,
    pub compiler: Arc<dyn Compiler>,
    pub settings: Arc<JobSettings>,
    pub user_index: usize,
}

impl JobContext {
    /// Fresh account funded from genesis with the configured amount.
    pub async fn new_account(&self) -> std::result::Result<Arc<Account>, FundingError> {
        let genesis = self.pool.genesis();
        let account = self
            .pool
            .new_funded(&genesis, self.settings.funding_amount)
            .await?;
        Ok(Arc::new(account))
    }

    pub fn sender(&self) -> TransactionSender {
        self.pool.sender()
    }

    pub fn registry_for(&self, account: Arc<Account>) -> ContractRegistry {
        ContractRegistry::new(account, self.sender(), self.compiler.clone())
            .with_timeouts(self.settings.deploy_timeout, self.settings.receipt_timeout)
    }
}

/// Behavior of one simulated user.
///
/// Each instance is owned by exactly one runner. `before_start` and
/// `on_start` run once; an error there fails this instance only. `run_task`
/// is then called repeatedly with names from `tasks`; its errors are logged
/// and the loop goes on.
#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &str;

    fn tasks(&self) -> Vec<TaskSpec>;

    async fn before_start(&mut self, _ctx: &JobContext) -> Result<()> {
        Ok(())
    }

    async fn on_start(&mut self, _ctx: &JobContext) -> Result<()> {
        Ok(())
    }

    async fn run_task(&mut self, task: &str, ctx: &JobContext) -> Result<()>;

    async fn on_stop(&mut self, _ctx: &JobContext) -> Result<()> {
        Ok(())
    }
}
