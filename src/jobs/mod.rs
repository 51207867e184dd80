pub mod block_job;
pub mod job;
pub mod registry;
pub mod runner;
pub mod transfer_job;
pub mod tx_mix_job;

pub use block_job::BlockWatcherJob;
pub use job::{Job, JobContext, JobState, JobStatus, TaskSpec};
pub use registry::{JobFactory, JobRegistry};
pub use runner::{JobRunner, TaskSelector};
pub use transfer_job::TransferJob;
pub use tx_mix_job::TxMixJob;
