use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::warn;

use super::{
    BuildError, FeeDefaults, FeeFields, FeePolicy, MalformedIntentError, PendingTransaction,
    TxFormat, TxIntent,
};
use crate::account::{Account, AccountPool};
use crate::chain::{CallRequest, ChainClient};

/// Turns a `TxIntent` into a complete `PendingTransaction`.
///
/// Missing fields are populated per format:
/// - Legacy: gas price (suggested, or the fixed fallback)
/// - AccessList: chain id, empty access list, gas price
/// - FeeMarket: chain id, fallback tip, fee cap of twice the tip
///
/// Every format gets the account's address as sender, a gas estimate when no
/// limit is given, and a nonce from the account pool. The nonce is taken
/// last so a build that fails never consumes one.
pub struct TransactionBuilder {
    client: Arc<dyn ChainClient>,
    pool: Arc<AccountPool>,
    fee_policy: FeePolicy,
    fee_defaults: FeeDefaults,
    chain_id: OnceCell<u64>,
}

impl TransactionBuilder {
    pub fn new(client: Arc<dyn ChainClient>, pool: Arc<AccountPool>) -> Self {
        Self {
            client,
            pool,
            fee_policy: FeePolicy::default(),
            fee_defaults: FeeDefaults::default(),
            chain_id: OnceCell::new(),
        }
    }

    pub fn with_fee_policy(mut self, fee_policy: FeePolicy) -> Self {
        self.fee_policy = fee_policy;
        self
    }

    pub fn with_fee_defaults(mut self, fee_defaults: FeeDefaults) -> Self {
        self.fee_defaults = fee_defaults;
        self
    }

    pub fn pool(&self) -> &Arc<AccountPool> {
        &self.pool
    }

    // chain id is asked once per builder and cached
    pub async fn chain_id(&self) -> Result<u64, BuildError> {
        let id = self
            .chain_id
            .get_or_try_init(|| async { self.client.chain_id().await })
            .await?;
        Ok(*id)
    }

    async fn suggested_gas_price(&self) -> Option<u128> {
        if self.fee_policy == FeePolicy::Fixed {
            return None;
        }

        match self.client.gas_price().await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(error = %e, "gas price lookup failed, using fixed fallback");
                None
            }
        }
    }

    async fn fee_fields(&self, intent: &TxIntent, chain_id: u64) -> Result<FeeFields, BuildError> {
        let fees = match intent.format {
            TxFormat::Legacy => FeeFields::Legacy {
                chain_id,
                gas_price: self.gas_price(intent).await,
            },
            TxFormat::AccessList => FeeFields::AccessList {
                chain_id,
                gas_price: self.gas_price(intent).await,
                access_list: intent.access_list.clone().unwrap_or_default(),
            },
            TxFormat::FeeMarket => {
                let tip = self
                    .fee_defaults
                    .priority_fee(intent.max_priority_fee_per_gas);

                let max_fee = match intent.max_fee_per_gas {
                    Some(max_fee) => max_fee,
                    None => {
                        let suggested = self.suggested_gas_price().await;
                        self.fee_defaults.max_fee(tip, suggested)
                    }
                };

                if max_fee < tip {
                    return Err(MalformedIntentError::FeeCapBelowTip { max_fee, tip }.into());
                }

                FeeFields::FeeMarket {
                    chain_id,
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: tip,
                    access_list: intent.access_list.clone().unwrap_or_default(),
                }
            }
        };

        Ok(fees)
    }

    async fn gas_price(&self, intent: &TxIntent) -> u128 {
        match intent.gas_price {
            Some(price) => price,
            None => self
                .fee_defaults
                .gas_price(self.suggested_gas_price().await),
        }
    }

    pub async fn build(
        &self,
        account: &Account,
        intent: TxIntent,
    ) -> Result<PendingTransaction, BuildError> {
        let from = account.address();
        let to = intent.validate(from)?;

        let chain_id = match intent.chain_id {
            Some(id) => id,
            None => self.chain_id().await?,
        };

        let fees = self.fee_fields(&intent, chain_id).await?;

        let gas_limit = match intent.gas_limit {
            Some(limit) => limit,
            None => {
                let request = CallRequest {
                    from: Some(from),
                    to: to.to().copied(),
                    value: intent.value,
                    data: intent.data.clone(),
                };
                self.client.estimate_gas(&request).await?
            }
        };

        let nonce = match intent.nonce {
            Some(nonce) => nonce,
            None => self.pool.next_nonce(account),
        };

        Ok(PendingTransaction {
            from,
            nonce,
            to,
            value: intent.value,
            gas_limit,
            data: intent.data,
            fees,
        })
    }
}
