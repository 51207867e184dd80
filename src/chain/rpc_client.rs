use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, ReceiptResponse},
    primitives::{Address, Bytes, TxHash, TxKind, U256},
    providers::{Provider, RootProvider},
    rpc::types::{TransactionInput, TransactionRequest},
    transports::{TransportError, http::reqwest::Url},
};
use async_trait::async_trait;

use super::{CallRequest, ChainClient, ChainError, Receipt};

/// `ChainClient` backed by an alloy HTTP provider.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    provider: RootProvider<Ethereum>,
    url: String,
}

impl RpcChainClient {
    // connect to the JSON-RPC endpoint at `host`
    pub fn connect(host: &str) -> Result<Self, ChainError> {
        let url: Url = host
            .parse()
            .map_err(|e| ChainError::InvalidEndpoint(format!("{host}: {e}")))?;

        Ok(Self {
            provider: RootProvider::<Ethereum>::new_http(url),
            url: host.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

// node error responses are rejections, everything else is a transport problem
fn map_rpc_error(err: TransportError) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => ChainError::Rejected(payload.message.to_string()),
        None => ChainError::Transport(err.to_string()),
    }
}

fn to_request(request: &CallRequest) -> TransactionRequest {
    TransactionRequest {
        from: request.from,
        to: Some(request.to.map(TxKind::Call).unwrap_or(TxKind::Create)),
        value: Some(request.value),
        input: TransactionInput::new(request.data.clone()),
        ..Default::default()
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, ChainError> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(map_rpc_error)?;

        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(map_rpc_error)?;

        Ok(receipt.map(|r| Receipt {
            transaction_hash: r.transaction_hash(),
            success: r.status(),
            contract_address: r.contract_address(),
            gas_used: r.gas_used(),
            block_number: r.block_number(),
        }))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(map_rpc_error)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.provider.get_gas_price().await.map_err(map_rpc_error)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(map_rpc_error)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ChainError> {
        self.provider
            .estimate_gas(to_request(request))
            .await
            .map_err(map_rpc_error)
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ChainError> {
        self.provider
            .call(to_request(request))
            .await
            .map_err(map_rpc_error)
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(map_rpc_error)
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider.get_block_number().await.map_err(map_rpc_error)
    }

    async fn block_transaction_count(&self, number: u64) -> Result<Option<usize>, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(map_rpc_error)?;

        Ok(block.map(|b| b.transactions.len()))
    }
}
