use std::collections::HashMap;
use std::sync::Arc;

use super::{BlockWatcherJob, Job, TransferJob, TxMixJob};

/// Builds a fresh job instance for the given user index.
pub type JobFactory = Arc<dyn Fn(usize) -> Box<dyn Job> + Send + Sync>;

/// Job classes by name. Every spawned user gets its own instance.
#[derive(Clone, Default)]
pub struct JobRegistry {
    factories: HashMap<String, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(BlockWatcherJob::NAME, |_| Box::new(BlockWatcherJob::new()) as Box<dyn Job>);
        registry.register(TransferJob::NAME, |_| Box::new(TransferJob::new()) as Box<dyn Job>);
        registry.register(TxMixJob::NAME, |_| Box::new(TxMixJob::new()) as Box<dyn Job>);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(usize) -> Box<dyn Job> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str, user_index: usize) -> Option<Box<dyn Job>> {
        self.factories.get(name).map(|factory| factory(user_index))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
