use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::ONE_GWEI;

/// The three transaction encodings the generator produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxFormat {
    /// Pre-typed transaction with a single gas price.
    #[default]
    Legacy,
    /// EIP-2930: gas price plus an access list.
    AccessList,
    /// EIP-1559: priority tip and fee cap.
    FeeMarket,
}

impl TxFormat {
    pub const ALL: [TxFormat; 3] = [TxFormat::Legacy, TxFormat::AccessList, TxFormat::FeeMarket];

    // EIP-2718 type byte
    pub fn type_id(self) -> u8 {
        match self {
            TxFormat::Legacy => 0,
            TxFormat::AccessList => 1,
            TxFormat::FeeMarket => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TxFormat::Legacy => "legacy",
            TxFormat::AccessList => "access_list",
            TxFormat::FeeMarket => "fee_market",
        }
    }

    pub fn accepts_access_list(self) -> bool {
        !matches!(self, TxFormat::Legacy)
    }

    pub fn uses_gas_price(self) -> bool {
        !matches!(self, TxFormat::FeeMarket)
    }
}

impl fmt::Display for TxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where fee defaults come from when an intent leaves them out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeePolicy {
    /// Ask the node for its suggested gas price, fall back to the fixed values.
    #[default]
    Live,
    /// Never query the node, always use the fixed values.
    Fixed,
}

/// Fixed fee fallbacks and the rules that derive missing fee fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDefaults {
    pub gas_price: u128,
    pub priority_fee: u128,
}

impl Default for FeeDefaults {
    fn default() -> Self {
        Self {
            gas_price: ONE_GWEI,
            priority_fee: ONE_GWEI,
        }
    }
}

impl FeeDefaults {
    // gas price for legacy and access-list transactions
    pub fn gas_price(&self, suggested: Option<u128>) -> u128 {
        suggested.filter(|price| *price > 0).unwrap_or(self.gas_price)
    }

    pub fn priority_fee(&self, explicit: Option<u128>) -> u128 {
        explicit.unwrap_or(self.priority_fee)
    }

    /// Fee cap for a fee-market transaction: twice the tip, raised to twice the
    /// node's suggestion when one is known. Never below the tip.
    pub fn max_fee(&self, tip: u128, suggested: Option<u128>) -> u128 {
        let floor = tip.saturating_mul(2);
        match suggested {
            Some(price) => floor.max(price.saturating_mul(2)),
            None => floor,
        }
    }
}
