use std::time::Duration;

use alloy::primitives::TxHash;

use super::TxFormat;
use crate::account::AccountError;
use crate::chain::ChainError;

/// The intent cannot describe a valid transaction. A caller bug, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedIntentError {
    #[error("Transaction has no recipient and is not a deployment")]
    MissingRecipient,
    #[error("Deployment transaction must not have a recipient")]
    RecipientOnDeployment,
    #[error("Field `{field}` is not allowed on a {format} transaction")]
    FieldConflict {
        field: &'static str,
        format: TxFormat,
    },
    #[error("Intent sender does not match the signing account")]
    SenderMismatch,
    #[error("maxFeePerGas {max_fee} is below maxPriorityFeePerGas {tip}")]
    FeeCapBelowTip { max_fee: u128, tip: u128 },
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Malformed transaction intent: {0}")]
    MalformedIntent(#[from] MalformedIntentError),
    #[error("Chain lookup failed while building: {0}")]
    Chain(#[from] ChainError),
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("Failed to sign transaction: {0}")]
    Signing(#[from] AccountError),
    #[error("Failed to submit transaction: {0}")]
    Submit(#[from] ChainError),
    #[error("No receipt for {tx_hash} within {timeout:?}")]
    ReceiptTimeout { tx_hash: TxHash, timeout: Duration },
    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
}

impl SendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SendError::ReceiptTimeout { .. })
    }
}
