pub mod client;
pub mod error;
pub mod memory;
pub mod receipt;
pub mod rpc_client;

pub use client::*;
pub use error::*;
pub use memory::{InMemoryChain, MinedTransaction};
pub use receipt::Receipt;
pub use rpc_client::RpcChainClient;
