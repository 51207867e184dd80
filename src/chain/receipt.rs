use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

// confirmation record returned by the chain once a transaction is included

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub success: bool,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

impl Receipt {
    pub fn success(transaction_hash: B256, gas_used: u64, block_number: u64) -> Self {
        Self {
            transaction_hash,
            success: true,
            contract_address: None,
            gas_used,
            block_number: Some(block_number),
        }
    }

    pub fn failed(transaction_hash: B256, gas_used: u64, block_number: u64) -> Self {
        Self {
            transaction_hash,
            success: false,
            contract_address: None,
            gas_used,
            block_number: Some(block_number),
        }
    }

    // attach the address of a contract created by this transaction
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }
}
