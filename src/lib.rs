pub mod account;
pub mod chain;
pub mod common;
pub mod config;
pub mod contracts;
pub mod controller;
pub mod jobs;
pub mod rpc;
pub mod server;
pub mod transaction;

// Re-export commonly used types for convenience
pub use account::{Account, AccountPool};
pub use chain::{ChainClient, InMemoryChain, Receipt, RpcChainClient};
pub use config::{JobSettings, LoadConfig};
pub use contracts::{ArtifactCompiler, Compiler, ContractRegistry, SolcCompiler};
pub use controller::{LoadController, LoadStatus};
pub use jobs::{Job, JobContext, JobRegistry};
pub use server::LoadGenServer;
pub use transaction::{TransactionBuilder, TransactionSender, TxFormat, TxIntent};

// Export anyhow::Result for convenience
pub use anyhow::Result;
