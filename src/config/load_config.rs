use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One job class and how many simulated users run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobClassConfig {
    pub name: String,
    #[serde(default = "default_users")]
    pub users: usize,
}

fn default_users() -> usize {
    1
}

impl JobClassConfig {
    pub fn new(name: impl Into<String>, users: usize) -> Self {
        Self {
            name: name.into(),
            users,
        }
    }
}

/// What to run, where, and how fast to ramp up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(alias = "jobClasses")]
    pub job_classes: Vec<JobClassConfig>,
    pub host: String,
    /// Users started per second while ramping up.
    #[serde(alias = "spawnRate")]
    pub spawn_rate: u32,
}

impl LoadConfig {
    pub fn new(host: impl Into<String>, spawn_rate: u32) -> Self {
        Self {
            job_classes: Vec::new(),
            host: host.into(),
            spawn_rate,
        }
    }

    pub fn with_job(mut self, name: impl Into<String>, users: usize) -> Self {
        self.job_classes.push(JobClassConfig::new(name, users));
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(serde_json::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.spawn_rate == 0 {
            return Err(ConfigError::ZeroSpawnRate);
        }
        if self.job_classes.is_empty() {
            return Err(ConfigError::NoJobClasses);
        }
        if let Some(class) = self.job_classes.iter().find(|c| c.users == 0) {
            return Err(ConfigError::ZeroUsers(class.name.clone()));
        }
        Ok(())
    }

    pub fn total_users(&self) -> usize {
        self.job_classes.iter().map(|c| c.users).sum()
    }

    // class name for every user slot, in spawn order
    pub fn user_slots(&self) -> Vec<String> {
        self.job_classes
            .iter()
            .flat_map(|c| std::iter::repeat_n(c.name.clone(), c.users))
            .collect()
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_secs(1) / self.spawn_rate.max(1)
    }
}
