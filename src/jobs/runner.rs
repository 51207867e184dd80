use std::sync::Arc;

use rand::{
    SeedableRng,
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::{Job, JobContext, JobState, JobStatus, TaskSpec};
use crate::config::TaskSelection;

/// Picks the next task of a job.
pub enum TaskSelector {
    Weighted {
        names: Vec<String>,
        index: WeightedIndex<u64>,
        rng: StdRng,
    },
    // serves each task `weight` times in a row, then moves on
    RoundRobin {
        tasks: Vec<TaskSpec>,
        cursor: usize,
        served: u32,
    },
    Empty,
}

impl TaskSelector {
    pub fn new(tasks: Vec<TaskSpec>, selection: TaskSelection) -> Self {
        let tasks: Vec<TaskSpec> = tasks.into_iter().filter(|t| t.weight > 0).collect();
        if tasks.is_empty() {
            return TaskSelector::Empty;
        }

        match selection {
            TaskSelection::Weighted => {
                let total = tasks
                    .iter()
                    .try_fold(0u64, |sum, t| sum.checked_add(u64::from(t.weight)));
                if total.is_none() {
                    warn!("task weights overflow, job will idle");
                    return TaskSelector::Empty;
                }

                let weights = tasks.iter().map(|t| u64::from(t.weight));
                match WeightedIndex::new(weights) {
                    Ok(index) => TaskSelector::Weighted {
                        names: tasks.into_iter().map(|t| t.name).collect(),
                        index,
                        rng: StdRng::from_entropy(),
                    },
                    Err(e) => {
                        warn!(error = %e, "invalid task weights, job will idle");
                        TaskSelector::Empty
                    }
                }
            }
            TaskSelection::RoundRobin => TaskSelector::RoundRobin {
                tasks,
                cursor: 0,
                served: 0,
            },
        }
    }

    pub fn next_task(&mut self) -> Option<&str> {
        match self {
            TaskSelector::Weighted { names, index, rng } => {
                let i = index.sample(rng);
                names.get(i).map(String::as_str)
            }
            TaskSelector::RoundRobin {
                tasks,
                cursor,
                served,
            } => {
                let task = tasks.get(*cursor)?;
                *served += 1;
                if *served >= task.weight {
                    *served = 0;
                    *cursor = (*cursor + 1) % tasks.len();
                }
                Some(task.name.as_str())
            }
            TaskSelector::Empty => None,
        }
    }
}

/// Drives one job instance through its lifecycle.
pub struct JobRunner {
    job: Box<dyn Job>,
    ctx: JobContext,
    status: Arc<JobStatus>,
    cancel: CancellationToken,
}

impl JobRunner {
    pub fn new(job: Box<dyn Job>, ctx: JobContext, cancel: CancellationToken) -> Self {
        Self {
            job,
            ctx,
            status: Arc::new(JobStatus::default()),
            cancel,
        }
    }

    pub fn status(&self) -> Arc<JobStatus> {
        self.status.clone()
    }

    pub async fn run(self) -> JobState {
        let span = info_span!("job", class = %self.job.name(), user = self.ctx.user_index);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> JobState {
        let JobRunner {
            mut job,
            ctx,
            status,
            cancel,
        } = self;

        // setup hooks are abandoned on stop, they may block on funding for minutes
        status.set_state(JobState::BeforeStart);
        let setup = tokio::select! {
            _ = cancel.cancelled() => None,
            result = job.before_start(&ctx) => Some(result),
        };
        match setup {
            None => return finish(&status, JobState::Stopped),
            Some(Err(e)) => {
                error!(error = ?e, "before_start failed");
                return finish(&status, JobState::Failed);
            }
            Some(Ok(())) => {}
        }

        status.set_state(JobState::OnStart);
        let setup = tokio::select! {
            _ = cancel.cancelled() => None,
            result = job.on_start(&ctx) => Some(result),
        };
        match setup {
            None => return finish(&status, JobState::Stopped),
            Some(Err(e)) => {
                error!(error = ?e, "on_start failed");
                return finish(&status, JobState::Failed);
            }
            Some(Ok(())) => {}
        }

        let mut selector = TaskSelector::new(job.tasks(), ctx.settings.task_selection);
        status.set_state(JobState::Running);
        info!("job running");

        while !cancel.is_cancelled() {
            let Some(task) = selector.next_task() else {
                warn!("job has no tasks, idling until stopped");
                cancel.cancelled().await;
                break;
            };

            // a task in flight always completes, stop is checked between iterations
            match job.run_task(task, &ctx).await {
                Ok(()) => {
                    status.record_iteration(true);
                    debug!(task, "task completed");
                }
                Err(e) => {
                    status.record_iteration(false);
                    warn!(task, error = ?e, "task failed, skipping iteration");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(ctx.settings.task_interval) => {}
            }
        }

        if let Err(e) = job.on_stop(&ctx).await {
            warn!(error = ?e, "on_stop failed");
        }

        info!(
            iterations = status.iterations(),
            failed = status.failed_iterations(),
            "job stopped"
        );
        finish(&status, JobState::Stopped)
    }
}

fn finish(status: &JobStatus, state: JobState) -> JobState {
    status.set_state(state);
    state
}
