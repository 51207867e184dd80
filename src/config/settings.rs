use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::common::{GENESIS_PRIVATE_KEY, ONE_ETHER};
use crate::transaction::FeePolicy;

/// How a runner picks the next task of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSelection {
    /// Random pick, proportional to task weight.
    #[default]
    Weighted,
    /// Fixed cycle, each task repeated `weight` times.
    RoundRobin,
}

// knobs handed to every job instance; the scheduler itself ignores them
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub funding_amount: U256,
    pub funding_timeout: Duration,
    pub receipt_timeout: Duration,
    pub deploy_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause between two task iterations of one user.
    pub task_interval: Duration,
    pub fee_policy: FeePolicy,
    pub task_selection: TaskSelection,
    pub contracts_dir: PathBuf,
    pub genesis_key: String,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            funding_amount: U256::from(1_000 * ONE_ETHER),
            funding_timeout: Duration::from_secs(120),
            receipt_timeout: Duration::from_secs(100),
            deploy_timeout: Duration::from_secs(100),
            poll_interval: Duration::from_millis(500),
            task_interval: Duration::from_millis(100),
            fee_policy: FeePolicy::Live,
            task_selection: TaskSelection::Weighted,
            contracts_dir: PathBuf::from("contracts"),
            genesis_key: GENESIS_PRIVATE_KEY.to_string(),
        }
    }
}
