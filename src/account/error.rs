use std::time::Duration;

use alloy::primitives::{Address, TxHash};

use crate::chain::ChainError;
use crate::transaction::SendError;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid private key format: {0}")]
    InvalidPrivateKey(String),
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Failed to bootstrap account: {0}")]
    Chain(#[from] ChainError),
}

#[derive(Debug, thiserror::Error)]
pub enum FundingError {
    #[error("Funding transaction to {address} could not be sent: {source}")]
    Send {
        address: Address,
        #[source]
        source: SendError,
    },
    #[error("Funding transaction {tx_hash} to {address} reverted")]
    Reverted { address: Address, tx_hash: TxHash },
    #[error("Funding of {address} not confirmed within {timeout:?}")]
    Timeout { address: Address, timeout: Duration },
}
