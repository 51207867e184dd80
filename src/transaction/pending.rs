use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEip2930, TxEnvelope, TxLegacy},
    eips::eip2930::AccessList,
    primitives::{Address, Bytes, TxKind, U256},
};

use super::{MalformedIntentError, TxFormat};
use crate::account::{Account, AccountError};

/// A partial transaction as job code expresses it. Anything left `None` is
/// filled in by the `TransactionBuilder`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxIntent {
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub format: TxFormat,
    pub deployment: bool,
    pub from: Option<Address>,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub chain_id: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub access_list: Option<AccessList>,
}

impl TxIntent {
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            ..Default::default()
        }
    }

    // contract creation, `data` is bytecode followed by constructor args
    pub fn deploy(init_code: impl Into<Bytes>) -> Self {
        Self {
            data: init_code.into(),
            deployment: true,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: TxFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_max_fee_per_gas(mut self, max_fee: u128) -> Self {
        self.max_fee_per_gas = Some(max_fee);
        self
    }

    pub fn with_max_priority_fee_per_gas(mut self, tip: u128) -> Self {
        self.max_priority_fee_per_gas = Some(tip);
        self
    }

    pub fn with_access_list(mut self, access_list: AccessList) -> Self {
        self.access_list = Some(access_list);
        self
    }

    /// Where the transaction goes: `Create` for deployments.
    pub fn kind(&self) -> Result<TxKind, MalformedIntentError> {
        match (self.deployment, self.to) {
            (true, None) => Ok(TxKind::Create),
            (true, Some(_)) => Err(MalformedIntentError::RecipientOnDeployment),
            (false, Some(to)) => Ok(TxKind::Call(to)),
            (false, None) => Err(MalformedIntentError::MissingRecipient),
        }
    }

    // shape checks that need no chain access
    pub fn validate(&self, signer: Address) -> Result<TxKind, MalformedIntentError> {
        let kind = self.kind()?;

        if self.from.is_some_and(|from| from != signer) {
            return Err(MalformedIntentError::SenderMismatch);
        }

        let conflict = |field| MalformedIntentError::FieldConflict {
            field,
            format: self.format,
        };

        if self.access_list.is_some() && !self.format.accepts_access_list() {
            return Err(conflict("access_list"));
        }

        if self.format.uses_gas_price() {
            if self.max_fee_per_gas.is_some() {
                return Err(conflict("max_fee_per_gas"));
            }
            if self.max_priority_fee_per_gas.is_some() {
                return Err(conflict("max_priority_fee_per_gas"));
            }
        } else if self.gas_price.is_some() {
            return Err(conflict("gas_price"));
        }

        Ok(kind)
    }
}

/// Format-specific fields of a complete transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeFields {
    Legacy {
        chain_id: u64,
        gas_price: u128,
    },
    AccessList {
        chain_id: u64,
        gas_price: u128,
        access_list: AccessList,
    },
    FeeMarket {
        chain_id: u64,
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
        access_list: AccessList,
    },
}

/// A fully populated transaction, ready to be signed once and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub from: Address,
    pub nonce: u64,
    pub to: TxKind,
    pub value: U256,
    pub gas_limit: u64,
    pub data: Bytes,
    pub fees: FeeFields,
}

impl PendingTransaction {
    pub fn format(&self) -> TxFormat {
        match self.fees {
            FeeFields::Legacy { .. } => TxFormat::Legacy,
            FeeFields::AccessList { .. } => TxFormat::AccessList,
            FeeFields::FeeMarket { .. } => TxFormat::FeeMarket,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self.fees {
            FeeFields::Legacy { chain_id, .. }
            | FeeFields::AccessList { chain_id, .. }
            | FeeFields::FeeMarket { chain_id, .. } => chain_id,
        }
    }

    pub fn gas_price(&self) -> Option<u128> {
        match self.fees {
            FeeFields::Legacy { gas_price, .. } | FeeFields::AccessList { gas_price, .. } => {
                Some(gas_price)
            }
            FeeFields::FeeMarket { .. } => None,
        }
    }

    pub fn max_fee_per_gas(&self) -> Option<u128> {
        match self.fees {
            FeeFields::FeeMarket {
                max_fee_per_gas, ..
            } => Some(max_fee_per_gas),
            _ => None,
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<u128> {
        match self.fees {
            FeeFields::FeeMarket {
                max_priority_fee_per_gas,
                ..
            } => Some(max_priority_fee_per_gas),
            _ => None,
        }
    }

    pub fn access_list(&self) -> Option<&AccessList> {
        match &self.fees {
            FeeFields::Legacy { .. } => None,
            FeeFields::AccessList { access_list, .. }
            | FeeFields::FeeMarket { access_list, .. } => Some(access_list),
        }
    }

    // highest price per gas this transaction may pay
    pub fn fee_cap(&self) -> u128 {
        self.gas_price()
            .or_else(|| self.max_fee_per_gas())
            .unwrap_or_default()
    }

    pub fn is_deployment(&self) -> bool {
        self.to.is_create()
    }

    /// Sign with `account` and wrap in the matching EIP-2718 envelope.
    pub fn sign(&self, account: &Account) -> Result<TxEnvelope, AccountError> {
        let envelope = match &self.fees {
            FeeFields::Legacy {
                chain_id,
                gas_price,
            } => {
                let tx = TxLegacy {
                    chain_id: Some(*chain_id),
                    nonce: self.nonce,
                    gas_price: *gas_price,
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    input: self.data.clone(),
                };
                let signature = account.sign_hash(&tx.signature_hash())?;
                TxEnvelope::from(tx.into_signed(signature))
            }
            FeeFields::AccessList {
                chain_id,
                gas_price,
                access_list,
            } => {
                let tx = TxEip2930 {
                    chain_id: *chain_id,
                    nonce: self.nonce,
                    gas_price: *gas_price,
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    access_list: access_list.clone(),
                    input: self.data.clone(),
                };
                let signature = account.sign_hash(&tx.signature_hash())?;
                TxEnvelope::from(tx.into_signed(signature))
            }
            FeeFields::FeeMarket {
                chain_id,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                access_list,
            } => {
                let tx = TxEip1559 {
                    chain_id: *chain_id,
                    nonce: self.nonce,
                    gas_limit: self.gas_limit,
                    max_fee_per_gas: *max_fee_per_gas,
                    max_priority_fee_per_gas: *max_priority_fee_per_gas,
                    to: self.to,
                    value: self.value,
                    access_list: access_list.clone(),
                    input: self.data.clone(),
                };
                let signature = account.sign_hash(&tx.signature_hash())?;
                TxEnvelope::from(tx.into_signed(signature))
            }
        };

        Ok(envelope)
    }
}
