use std::path::PathBuf;

use alloy::primitives::TxHash;

use crate::chain::ChainError;
use crate::transaction::SendError;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to run solc: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("solc exited with {status}: {stderr}")]
    SolcFailed { status: String, stderr: String },
    #[error("Contract `{name}` not found in {path}")]
    ContractNotFound { name: String, path: PathBuf },
    #[error("Invalid compiler output: {0}")]
    InvalidOutput(String),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid bytecode hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Unknown contract `{0}`")]
    UnknownContract(String),
    #[error("Contract `{contract}` has no function `{function}` taking {arity} arguments")]
    UnknownFunction {
        contract: String,
        function: String,
        arity: usize,
    },
    #[error("Failed to encode call: {0}")]
    Encode(String),
    #[error("Failed to decode output: {0}")]
    Decode(String),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("Contract query failed: {0}")]
    Query(#[from] ChainError),
}

#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("Failed to compile `{id}`: {source}")]
    Compile {
        id: String,
        #[source]
        source: CompileError,
    },
    #[error("Failed to encode constructor of `{id}`: {reason}")]
    Encode { id: String, reason: String },
    #[error("Deployment of `{id}` failed: {source}")]
    Send {
        id: String,
        #[source]
        source: SendError,
    },
    #[error("Deployment of `{id}` reverted in {tx_hash}")]
    Reverted { id: String, tx_hash: TxHash },
    #[error("Deployment receipt {tx_hash} of `{id}` has no contract address")]
    MissingAddress { id: String, tx_hash: TxHash },
}
