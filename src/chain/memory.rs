use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::{
    consensus::{Transaction as _, TxEnvelope, transaction::SignerRecoverable},
    eips::eip2718::{Decodable2718, Typed2718},
    primitives::{Address, Bytes, TxHash, TxKind, U256},
};
use async_trait::async_trait;

use super::{CallRequest, ChainClient, ChainError, Receipt};
use crate::common::{INTRINSIC_GAS, ONE_GWEI};

// extra gas reported by estimate_gas for calls into deployed code
const CONTRACT_CALL_GAS: u64 = 100_000;

/// Summary of a transaction accepted by the in-memory chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedTransaction {
    pub hash: TxHash,
    pub tx_type: u8,
    pub from: Address,
    pub to: TxKind,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub input: Bytes,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Default)]
struct ChainState {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    // future-nonce transactions waiting for the gap below them to fill
    queued: HashMap<Address, BTreeMap<u64, MinedTransaction>>,
    transactions: HashMap<TxHash, MinedTransaction>,
    receipts: HashMap<TxHash, Receipt>,
    code: HashMap<Address, Bytes>,
    call_results: HashMap<[u8; 4], Bytes>,
    // transaction count per block, index is the block number
    blocks: Vec<usize>,
    withhold_receipts: bool,
    revert_all: bool,
}

/// Deterministic chain double implementing `ChainClient`.
///
/// Every ready transaction is mined immediately into its own block. Nonces are
/// enforced the way a node's pool does it: stale nonces are rejected, future
/// nonces are queued until the gap fills. Value moves between balances, no gas
/// is charged and contract code is stored but never executed; `eth_call`
/// answers come from results registered per function selector.
#[derive(Debug)]
pub struct InMemoryChain {
    chain_id: u64,
    gas_price: u128,
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    pub fn new(chain_id: u64) -> Self {
        let state = ChainState {
            blocks: vec![0],
            ..Default::default()
        };

        Self {
            chain_id,
            gas_price: ONE_GWEI,
            state: Mutex::new(state),
        }
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    // credit an address, like a genesis allocation
    pub fn fund(&self, address: Address, amount: U256) {
        *self.state().balances.entry(address).or_default() += amount;
    }

    /// Accept transactions but never report their receipts.
    pub fn set_withhold_receipts(&self, withhold: bool) {
        self.state().withhold_receipts = withhold;
    }

    /// Mine every following transaction with a failed status.
    pub fn set_revert_all(&self, revert: bool) {
        self.state().revert_all = revert;
    }

    pub fn set_call_result(&self, selector: [u8; 4], output: Bytes) {
        self.state().call_results.insert(selector, output);
    }

    pub fn code_at(&self, address: Address) -> Option<Bytes> {
        self.state().code.get(&address).cloned()
    }

    pub fn nonce_of(&self, address: Address) -> u64 {
        self.state().nonces.get(&address).copied().unwrap_or(0)
    }

    pub fn transaction(&self, hash: TxHash) -> Option<MinedTransaction> {
        self.state().transactions.get(&hash).cloned()
    }

    // all mined transactions sent by `address`, in nonce order
    pub fn transactions_from(&self, address: Address) -> Vec<MinedTransaction> {
        let mut txs: Vec<MinedTransaction> = self
            .state()
            .transactions
            .values()
            .filter(|tx| tx.from == address)
            .cloned()
            .collect();
        txs.sort_by_key(|tx| tx.nonce);
        txs
    }

    pub fn mined_count(&self) -> usize {
        self.state().transactions.len()
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn intrinsic_gas(to: TxKind, input: &[u8]) -> u64 {
        let data_gas: u64 = input.iter().map(|b| if *b == 0 { 4 } else { 16 }).sum();
        let create_gas = if to.is_create() { 32_000 } else { 0 };
        INTRINSIC_GAS + data_gas + create_gas
    }
}

impl ChainState {
    // apply a transaction whose nonce matches the sender's next nonce
    fn execute(&mut self, tx: MinedTransaction) {
        self.nonces.insert(tx.from, tx.nonce + 1);

        let block_number = self.blocks.len() as u64;
        self.blocks.push(1);

        let gas_used = InMemoryChain::intrinsic_gas(tx.to, &tx.input);
        let balance = self.balances.get(&tx.from).copied().unwrap_or_default();

        let receipt = if self.revert_all || balance < tx.value {
            Receipt::failed(tx.hash, gas_used, block_number)
        } else {
            self.balances.insert(tx.from, balance - tx.value);

            let mut receipt = Receipt::success(tx.hash, gas_used, block_number);
            let recipient = match tx.to {
                TxKind::Call(to) => to,
                TxKind::Create => {
                    let address = tx.from.create(tx.nonce);
                    self.code.insert(address, tx.input.clone());
                    receipt = receipt.with_contract_address(address);
                    address
                }
            };
            *self.balances.entry(recipient).or_default() += tx.value;
            receipt
        };

        if !self.withhold_receipts {
            self.receipts.insert(tx.hash, receipt);
        }
        self.transactions.insert(tx.hash, tx);
    }

    // execute queued transactions that became ready
    fn drain_queue(&mut self, sender: Address) {
        loop {
            let next = self.nonces.get(&sender).copied().unwrap_or(0);
            let Some(tx) = self.queued.get_mut(&sender).and_then(|q| q.remove(&next)) else {
                break;
            };
            self.execute(tx);
        }
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, ChainError> {
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| ChainError::Decode(e.to_string()))?;

        let from = envelope
            .recover_signer()
            .map_err(|e| ChainError::Rejected(format!("invalid sender: {e}")))?;

        if let Some(chain_id) = envelope.chain_id() {
            if chain_id != self.chain_id {
                return Err(ChainError::Rejected(format!(
                    "invalid chain id: expected {}, got {chain_id}",
                    self.chain_id
                )));
            }
        }

        let tx = MinedTransaction {
            hash: *envelope.tx_hash(),
            tx_type: envelope.ty(),
            from,
            to: envelope.kind(),
            nonce: envelope.nonce(),
            value: envelope.value(),
            gas_limit: envelope.gas_limit(),
            input: envelope.input().clone(),
            chain_id: envelope.chain_id(),
        };

        if tx.gas_limit < Self::intrinsic_gas(tx.to, &tx.input) {
            return Err(ChainError::Rejected("intrinsic gas too low".to_string()));
        }

        let mut state = self.state();

        if state.transactions.contains_key(&tx.hash) {
            return Err(ChainError::Rejected("already known".to_string()));
        }

        let next = state.nonces.get(&from).copied().unwrap_or(0);
        if tx.nonce < next {
            return Err(ChainError::Rejected(format!(
                "nonce too low: next nonce {next}, tx nonce {}",
                tx.nonce
            )));
        }

        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < tx.value {
            return Err(ChainError::Rejected(
                "insufficient funds for transfer".to_string(),
            ));
        }

        let hash = tx.hash;
        if tx.nonce > next {
            state.queued.entry(from).or_default().insert(tx.nonce, tx);
        } else {
            state.execute(tx);
            state.drain_queue(from);
        }

        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ChainError> {
        Ok(self.state().receipts.get(&hash).cloned())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        Ok(self.nonce_of(address))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.gas_price)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ChainError> {
        let to = request.to.map(TxKind::Call).unwrap_or(TxKind::Create);
        let mut gas = Self::intrinsic_gas(to, &request.data);

        if let Some(address) = request.to {
            if self.state().code.contains_key(&address) {
                gas += CONTRACT_CALL_GAS;
            }
        }

        Ok(gas)
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ChainError> {
        let state = self.state();

        let has_code = request
            .to
            .is_some_and(|address| state.code.contains_key(&address));
        if !has_code {
            return Err(ChainError::Rejected(
                "execution reverted: no code at address".to_string(),
            ));
        }

        if request.data.len() < 4 {
            return Ok(Bytes::new());
        }

        let mut selector = [0u8; 4];
        selector.copy_from_slice(&request.data[..4]);

        state.call_results.get(&selector).cloned().ok_or_else(|| {
            ChainError::Rejected("execution reverted: unknown selector".to_string())
        })
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self
            .state()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.state().blocks.len() as u64 - 1)
    }

    async fn block_transaction_count(&self, number: u64) -> Result<Option<usize>, ChainError> {
        Ok(self.state().blocks.get(number as usize).copied())
    }
}
