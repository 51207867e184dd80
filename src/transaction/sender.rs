use std::sync::Arc;
use std::time::Duration;

use alloy::{
    eips::eip2718::Encodable2718,
    primitives::{Address, Bytes, TxHash, U256},
};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::{
    BuildError, FeePolicy, MalformedIntentError, PendingTransaction, SendError,
    TransactionBuilder, TxFormat, TxIntent,
};
use crate::account::{Account, AccountPool};
use crate::chain::{ChainClient, Receipt};
use crate::common::TRANSFER_GAS_LIMIT;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Signs, submits and optionally waits for transactions.
///
/// Failures come back as `SendError` values: routine traffic is expected to
/// fail now and then, so callers in a task loop log and move on, while setup
/// code treats an error as fatal.
#[derive(Clone)]
pub struct TransactionSender {
    client: Arc<dyn ChainClient>,
    builder: Arc<TransactionBuilder>,
    poll_interval: Duration,
}

impl TransactionSender {
    pub fn new(client: Arc<dyn ChainClient>, pool: Arc<AccountPool>) -> Self {
        let builder = TransactionBuilder::new(client.clone(), pool);
        Self::from_builder(client, Arc::new(builder))
    }

    pub fn from_builder(client: Arc<dyn ChainClient>, builder: Arc<TransactionBuilder>) -> Self {
        Self {
            client,
            builder,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_fee_policy(self, fee_policy: FeePolicy) -> Self {
        let builder = TransactionBuilder::new(self.client.clone(), self.builder.pool().clone())
            .with_fee_policy(fee_policy);
        Self {
            builder: Arc::new(builder),
            ..self
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    /// Sign `tx` with `account` and submit it. Returns the hash reported by the node.
    pub async fn send(&self, account: &Account, tx: &PendingTransaction) -> Result<TxHash, SendError> {
        if tx.from != account.address() {
            return Err(BuildError::from(MalformedIntentError::SenderMismatch).into());
        }

        let envelope = tx.sign(account)?;
        let raw = Bytes::from(envelope.encoded_2718());

        debug!(
            from = %tx.from,
            nonce = tx.nonce,
            format = %tx.format(),
            fee = tx.fee_cap(),
            gas_limit = tx.gas_limit,
            "submitting transaction"
        );

        match self.client.send_raw_transaction(raw).await {
            Ok(tx_hash) => {
                debug!(%tx_hash, from = %tx.from, nonce = tx.nonce, "transaction submitted");
                Ok(tx_hash)
            }
            Err(e) => {
                warn!(
                    from = %tx.from,
                    nonce = tx.nonce,
                    rejected = e.is_rejection(),
                    error = %e,
                    "transaction send failed"
                );
                Err(e.into())
            }
        }
    }

    /// `send`, then poll for the receipt until `timeout` elapses.
    ///
    /// A reverted receipt is still returned as `Ok`; check `Receipt::success`
    /// or use `require_success`.
    pub async fn send_and_wait(
        &self,
        account: &Account,
        tx: &PendingTransaction,
        timeout: Duration,
    ) -> Result<Receipt, SendError> {
        let tx_hash = self.send(account, tx).await?;
        self.wait_for_receipt(tx_hash, timeout).await
    }

    pub async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, SendError> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.client.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    debug!(%tx_hash, success = receipt.success, "receipt received");
                    return Ok(receipt);
                }
                Ok(None) => {}
                // the node may not know the tx yet, keep polling
                Err(e) => debug!(%tx_hash, error = %e, "receipt lookup failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(%tx_hash, ?timeout, "timed out waiting for receipt");
                return Err(SendError::ReceiptTimeout { tx_hash, timeout });
            }

            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Build `intent` and send it.
    ///
    /// When the builder allocated the nonce and the node refuses the
    /// transaction, the nonce is handed back so the account's sequence keeps
    /// no gap.
    pub async fn send_intent(&self, account: &Account, intent: TxIntent) -> Result<TxHash, SendError> {
        let allocated = intent.nonce.is_none();
        let tx = self.builder.build(account, intent).await?;

        match self.send(account, &tx).await {
            Err(SendError::Submit(e)) if allocated && e.is_rejection() => {
                if self.builder.pool().release_nonce(account, tx.nonce) {
                    debug!(from = %tx.from, nonce = tx.nonce, "released nonce of refused transaction");
                } else {
                    warn!(from = %tx.from, nonce = tx.nonce, "refused nonce already followed by another, gap left");
                }
                Err(SendError::Submit(e))
            }
            result => result,
        }
    }

    pub async fn send_intent_and_wait(
        &self,
        account: &Account,
        intent: TxIntent,
        timeout: Duration,
    ) -> Result<Receipt, SendError> {
        let tx_hash = self.send_intent(account, intent).await?;
        self.wait_for_receipt(tx_hash, timeout).await
    }

    // plain value transfer with the fixed transfer gas limit
    pub async fn transfer(
        &self,
        account: &Account,
        to: Address,
        value: U256,
        format: TxFormat,
    ) -> Result<TxHash, SendError> {
        let intent = TxIntent::transfer(to, value)
            .with_format(format)
            .with_gas_limit(TRANSFER_GAS_LIMIT);

        let tx_hash = self.send_intent(account, intent).await?;
        info!(%tx_hash, from = %account.address(), %to, %value, %format, "transfer sent");
        Ok(tx_hash)
    }
}

/// Turn a reverted receipt into `SendError::Reverted`.
pub fn require_success(receipt: Receipt) -> Result<Receipt, SendError> {
    if receipt.success {
        Ok(receipt)
    } else {
        Err(SendError::Reverted {
            tx_hash: receipt.transaction_hash,
        })
    }
}
