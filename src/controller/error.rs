use crate::account::AccountError;
use crate::chain::ChainError;
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Load is already running")]
    AlreadyStarted,
    #[error("Invalid load config: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to reach chain: {0}")]
    Chain(#[from] ChainError),
    #[error("Failed to bootstrap genesis account: {0}")]
    Account(#[from] AccountError),
}
