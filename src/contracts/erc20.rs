use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};

use super::{CallOutcome, ContractError, ContractRegistry};

/// ERC20 calls against a token deployed in a registry.
#[derive(Clone)]
pub struct Erc20 {
    registry: Arc<ContractRegistry>,
    token: String,
}

impl Erc20 {
    pub fn new(registry: Arc<ContractRegistry>, token: impl Into<String>) -> Self {
        Self {
            registry,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn address(&self) -> Result<Address, ContractError> {
        self.registry.address(&self.token).await
    }

    // mint to the registry's own account
    pub async fn mint(&self, amount: U256, wait: bool) -> Result<CallOutcome, ContractError> {
        let to = self.registry.account().address();
        self.mint_to(to, amount, wait).await
    }

    pub async fn mint_to(
        &self,
        to: Address,
        amount: U256,
        wait: bool,
    ) -> Result<CallOutcome, ContractError> {
        let args = [DynSolValue::Address(to), DynSolValue::Uint(amount, 256)];
        self.registry.invoke(&self.token, "mint", &args, wait).await
    }

    pub async fn approve(
        &self,
        spender: Address,
        amount: U256,
        wait: bool,
    ) -> Result<CallOutcome, ContractError> {
        let args = [DynSolValue::Address(spender), DynSolValue::Uint(amount, 256)];
        self.registry.invoke(&self.token, "approve", &args, wait).await
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, ContractError> {
        let output = self
            .registry
            .query(&self.token, "balanceOf", &[DynSolValue::Address(owner)])
            .await?;

        match output.first() {
            Some(DynSolValue::Uint(balance, _)) => Ok(*balance),
            other => Err(ContractError::Decode(format!(
                "unexpected balanceOf output: {other:?}"
            ))),
        }
    }
}
