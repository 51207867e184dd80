use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};

use super::{CallOutcome, ContractError, ContractRegistry};

/// Router calls of the bundled Uniswap-style DEX.
#[derive(Clone)]
pub struct Uniswap {
    registry: Arc<ContractRegistry>,
    router: String,
}

impl Uniswap {
    pub fn new(registry: Arc<ContractRegistry>, router: impl Into<String>) -> Self {
        Self {
            registry,
            router: router.into(),
        }
    }

    pub async fn address(&self) -> Result<Address, ContractError> {
        self.registry.address(&self.router).await
    }

    // router pulls both amounts, so both tokens must be approved first
    pub async fn add_liquidity(
        &self,
        token_a: Address,
        amount_a: U256,
        token_b: Address,
        amount_b: U256,
        wait: bool,
    ) -> Result<CallOutcome, ContractError> {
        let args = [
            DynSolValue::Address(token_a),
            DynSolValue::Uint(amount_a, 256),
            DynSolValue::Address(token_b),
            DynSolValue::Uint(amount_b, 256),
        ];
        self.registry
            .invoke(&self.router, "addLiquidity", &args, wait)
            .await
    }

    pub async fn swap(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        wait: bool,
    ) -> Result<CallOutcome, ContractError> {
        let args = [
            DynSolValue::Address(token_in),
            DynSolValue::Address(token_out),
            DynSolValue::Uint(amount_in, 256),
        ];
        self.registry.invoke(&self.router, "swap", &args, wait).await
    }
}
