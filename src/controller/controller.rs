use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{ControllerError, LoadStatus};
use crate::account::AccountPool;
use crate::chain::{ChainClient, RpcChainClient};
use crate::config::{ConfigError, JobSettings, LoadConfig};
use crate::contracts::Compiler;
use crate::jobs::{JobContext, JobRegistry, JobRunner, JobState, JobStatus};

// counters of the current or last population
#[derive(Debug)]
struct PopulationStats {
    started_at: DateTime<Utc>,
    target_users: usize,
    statuses: Mutex<Vec<Arc<JobStatus>>>,
}

impl PopulationStats {
    fn statuses(&self) -> Vec<Arc<JobStatus>> {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, status: Arc<JobStatus>) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(status);
    }
}

struct Population {
    cancel: CancellationToken,
    ramp: JoinHandle<()>,
}

impl Drop for Population {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts, runs and stops a population of simulated users.
///
/// `start` returns as soon as the ramp is scheduled: one user is spawned every
/// `1 / spawn_rate` seconds until every configured slot runs. `stop` signals
/// all users, waits for them and is a no-op when nothing runs.
pub struct LoadController {
    config: LoadConfig,
    registry: Arc<JobRegistry>,
    settings: Arc<JobSettings>,
    compiler: Arc<dyn Compiler>,
    client: Option<Arc<dyn ChainClient>>,
    is_started: AtomicBool,
    population: AsyncMutex<Option<Population>>,
    stats: Mutex<Option<Arc<PopulationStats>>>,
}

impl LoadController {
    pub fn new(
        config: LoadConfig,
        registry: JobRegistry,
        settings: JobSettings,
        compiler: Arc<dyn Compiler>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            settings: Arc::new(settings),
            compiler,
            client: None,
            is_started: AtomicBool::new(false),
            population: AsyncMutex::new(None),
            stats: Mutex::new(None),
        }
    }

    /// Use `client` instead of connecting to the configured host.
    pub fn with_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()?;
        match self
            .config
            .job_classes
            .iter()
            .find(|class| !self.registry.contains(&class.name))
        {
            Some(class) => Err(ConfigError::UnknownJobClass(class.name.clone())),
            None => Ok(()),
        }
    }

    fn connect(&self) -> Result<Arc<dyn ChainClient>, ControllerError> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Ok(Arc::new(RpcChainClient::connect(&self.config.host)?)),
        }
    }

    pub async fn start(&self) -> Result<(), ControllerError> {
        let mut population = self.population.lock().await;
        if population.is_some() {
            return Err(ControllerError::AlreadyStarted);
        }

        self.validate()?;

        let client = self.connect()?;
        let pool = AccountPool::bootstrap(client.clone(), &self.settings.genesis_key)
            .await?
            .with_settings(&self.settings);
        let pool = Arc::new(pool);

        let stats = Arc::new(PopulationStats {
            started_at: Utc::now(),
            target_users: self.config.total_users(),
            statuses: Mutex::new(Vec::new()),
        });
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = Some(stats.clone());

        let cancel = CancellationToken::new();
        let ramp = Ramp {
            slots: self.config.user_slots(),
            period: self.config.spawn_interval(),
            registry: self.registry.clone(),
            client,
            pool,
            compiler: self.compiler.clone(),
            settings: self.settings.clone(),
            stats,
            cancel: cancel.clone(),
        };

        info!(
            host = %self.config.host,
            users = self.config.total_users(),
            spawn_rate = self.config.spawn_rate,
            "starting load"
        );

        *population = Some(Population {
            cancel,
            ramp: tokio::spawn(ramp.run()),
        });
        self.is_started.store(true, Ordering::SeqCst);

        Ok(())
    }

    pub async fn stop(&self) {
        let mut population = self.population.lock().await;

        let Some(mut current) = population.take() else {
            debug!("stop requested but load is not running");
            return;
        };

        info!("stopping load");
        current.cancel.cancel();
        if let Err(e) = (&mut current.ramp).await {
            error!(error = %e, "ramp task failed");
        }

        self.is_started.store(false, Ordering::SeqCst);
        info!("load stopped");
    }

    pub fn status(&self) -> bool {
        self.is_started()
    }

    pub fn is_started(&self) -> bool {
        self.is_started.load(Ordering::SeqCst)
    }

    pub fn report(&self) -> LoadStatus {
        let stats = self
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut status = LoadStatus {
            is_started: self.is_started(),
            target_users: self.config.total_users(),
            ..Default::default()
        };

        let Some(stats) = stats else {
            return status;
        };

        status.started_at = Some(stats.started_at);
        status.target_users = stats.target_users;

        for job in stats.statuses() {
            status.spawned += 1;
            match job.state() {
                JobState::Running => status.running += 1,
                JobState::Failed => status.failed += 1,
                JobState::Stopped => status.stopped += 1,
                _ => {}
            }
            status.iterations += job.iterations();
            status.failed_iterations += job.failed_iterations();
        }

        status
    }
}

// spawns users at a fixed period, then reaps them once cancelled
struct Ramp {
    slots: Vec<String>,
    period: Duration,
    registry: Arc<JobRegistry>,
    client: Arc<dyn ChainClient>,
    pool: Arc<AccountPool>,
    compiler: Arc<dyn Compiler>,
    settings: Arc<JobSettings>,
    stats: Arc<PopulationStats>,
    cancel: CancellationToken,
}

impl Ramp {
    async fn run(self) {
        let mut runners = JoinSet::new();
        let mut ticker = interval_at(Instant::now() + self.period, self.period);

        for (user_index, class) in self.slots.iter().enumerate() {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(job) = self.registry.create(class, user_index) else {
                error!(class = %class, "job class disappeared from registry");
                continue;
            };

            let ctx = JobContext {
                client: self.client.clone(),
                pool: self.pool.clone(),
                compiler: self.compiler.clone(),
                settings: self.settings.clone(),
                user_index,
            };

            let runner = JobRunner::new(job, ctx, self.cancel.child_token());
            self.stats.push(runner.status());
            runners.spawn(runner.run());
            debug!(class = %class, user_index, "user spawned");
        }

        if !self.cancel.is_cancelled() {
            info!(users = runners.len(), "ramp complete");
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                Some(result) = runners.join_next() => log_exit(result),
            }
        }

        while let Some(result) = runners.join_next().await {
            log_exit(result);
        }
    }
}

fn log_exit(result: Result<JobState, tokio::task::JoinError>) {
    match result {
        Ok(state) => debug!(?state, "user exited"),
        Err(e) => error!(error = %e, "user task panicked"),
    }
}
