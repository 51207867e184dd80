use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use super::{ChainError, Receipt};

/// Read-only call or gas estimation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    /// `None` means contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl CallRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            to: Some(to),
            data,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// The slice of an execution-layer JSON-RPC endpoint the load generator needs.
///
/// Implementations are shared by every job instance, so they must be
/// stateless request/response wrappers (or internally synchronized).
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, ChainError>;

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError>;

    /// Only used to bootstrap nonce counters, never per send.
    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError>;

    async fn gas_price(&self) -> Result<u128, ChainError>;

    async fn chain_id(&self) -> Result<u64, ChainError>;

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ChainError>;

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ChainError>;

    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Number of transactions in block `number`, `None` if the block is unknown.
    async fn block_transaction_count(&self, number: u64) -> Result<Option<usize>, ChainError>;
}
