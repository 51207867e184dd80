use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the controller and its population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStatus {
    pub is_started: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub target_users: usize,
    pub spawned: usize,
    pub running: usize,
    pub failed: usize,
    pub stopped: usize,
    pub iterations: u64,
    pub failed_iterations: u64,
}
