use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{Account, AccountError, FundingError};
use crate::chain::ChainClient;
use crate::common::FUNDING_GAS_LIMIT;
use crate::config::JobSettings;
use crate::transaction::{FeePolicy, SendError, TransactionSender, TxFormat, TxIntent};

/// Hands out chain identities and their nonces.
///
/// Owns the single prefunded genesis account. Every job funds its own account
/// from it, so the genesis nonce counter is the one piece of state shared by
/// the whole population; `next_nonce` is an atomic read-and-increment.
pub struct AccountPool {
    client: Arc<dyn ChainClient>,
    genesis: Arc<Account>,
    fee_policy: FeePolicy,
    funding_timeout: Duration,
    poll_interval: Duration,
    // one funding submission at a time, so a refused one can return its nonce
    funding_lock: Mutex<()>,
}

impl AccountPool {
    pub fn new(client: Arc<dyn ChainClient>, genesis: Account) -> Self {
        let settings = JobSettings::default();
        Self {
            client,
            genesis: Arc::new(genesis),
            fee_policy: settings.fee_policy,
            funding_timeout: settings.funding_timeout,
            poll_interval: settings.poll_interval,
            funding_lock: Mutex::new(()),
        }
    }

    // seed the genesis counter from the chain, once
    pub async fn bootstrap(
        client: Arc<dyn ChainClient>,
        genesis_key: &str,
    ) -> Result<Self, AccountError> {
        let genesis = Account::from_private_key(genesis_key)?;
        let nonce = client.transaction_count(genesis.address()).await?;

        info!(address = %genesis.address(), nonce, "genesis account bootstrapped");

        Ok(Self::new(client, genesis.with_next_nonce(nonce)))
    }

    pub fn with_settings(mut self, settings: &JobSettings) -> Self {
        self.fee_policy = settings.fee_policy;
        self.funding_timeout = settings.funding_timeout;
        self.poll_interval = settings.poll_interval;
        self
    }

    pub fn genesis(&self) -> Arc<Account> {
        self.genesis.clone()
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    /// Returns the account's next nonce and advances its counter.
    pub fn next_nonce(&self, account: &Account) -> u64 {
        account.reserve_nonce()
    }

    /// Give back a nonce whose transaction the node refused.
    ///
    /// Succeeds only while `nonce` is still the latest reservation; once a
    /// later nonce is out the counter is left alone and `false` is returned.
    pub fn release_nonce(&self, account: &Account, nonce: u64) -> bool {
        account.release_nonce(nonce)
    }

    // unfunded identity, for recipients and tests
    pub fn generate(&self) -> Account {
        Account::generate()
    }

    pub async fn balance(&self, account: &Account) -> Result<U256, AccountError> {
        Ok(self.client.balance(account.address()).await?)
    }

    /// Sender sharing this pool's nonce counters and settings.
    pub fn sender(self: &Arc<Self>) -> TransactionSender {
        TransactionSender::new(self.client.clone(), self.clone())
            .with_fee_policy(self.fee_policy)
            .with_poll_interval(self.poll_interval)
    }

    /// Generate a keypair and fund it from `funding` with `amount`.
    ///
    /// Blocks until the funding receipt is observed. A reverted receipt, a send
    /// failure or a timeout is a `FundingError`.
    pub async fn new_funded(
        self: &Arc<Self>,
        funding: &Account,
        amount: U256,
    ) -> Result<Account, FundingError> {
        let account = Account::generate();
        let address = account.address();

        let intent = TxIntent::transfer(address, amount)
            .with_format(TxFormat::Legacy)
            .with_gas_limit(FUNDING_GAS_LIMIT);

        let sender = self.sender();
        let submitted = {
            let _guard = self.funding_lock.lock().await;
            sender.send_intent(funding, intent).await
        };
        let tx_hash = submitted.map_err(|source| FundingError::Send { address, source })?;

        let receipt = match sender.wait_for_receipt(tx_hash, self.funding_timeout).await {
            Ok(receipt) => receipt,
            Err(SendError::ReceiptTimeout { .. }) => {
                return Err(FundingError::Timeout {
                    address,
                    timeout: self.funding_timeout,
                });
            }
            Err(source) => return Err(FundingError::Send { address, source }),
        };

        if !receipt.success {
            warn!(%address, tx_hash = %receipt.transaction_hash, "funding transaction reverted");
            return Err(FundingError::Reverted {
                address,
                tx_hash: receipt.transaction_hash,
            });
        }

        info!(%address, from = %funding.address(), %amount, "account funded");
        Ok(account)
    }
}
