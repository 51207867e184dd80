use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    primitives::{Address, Bytes, TxHash},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{Compiler, ContractError, DeploymentError};
use crate::account::Account;
use crate::chain::{CallRequest, Receipt};
use crate::common::{CALL_GAS_LIMIT, DEPLOY_GAS_LIMIT};
use crate::config::JobSettings;
use crate::transaction::{TransactionSender, TxIntent};

/// A contract accepted on-chain, addressed by a caller-chosen id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub id: String,
    pub address: Address,
    pub abi: JsonAbi,
}

impl DeployedContract {
    // first overload of `name` taking `arity` arguments
    fn function(&self, name: &str, arity: usize) -> Result<&Function, ContractError> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
            .ok_or_else(|| ContractError::UnknownFunction {
                contract: self.id.clone(),
                function: name.to_string(),
                arity,
            })
    }
}

/// Result of a contract invocation that may or may not wait for its receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Sent(TxHash),
    Confirmed(Receipt),
}

impl CallOutcome {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            CallOutcome::Sent(hash) => *hash,
            CallOutcome::Confirmed(receipt) => receipt.transaction_hash,
        }
    }
}

/// Deploys contracts for one account and invokes them by id.
///
/// Redeploying an id replaces its entry. The registry imposes no ordering
/// between calls; dependent setup steps chain `call_and_wait`.
pub struct ContractRegistry {
    account: Arc<Account>,
    sender: TransactionSender,
    compiler: Arc<dyn Compiler>,
    contracts: RwLock<HashMap<String, Arc<DeployedContract>>>,
    deploy_timeout: Duration,
    receipt_timeout: Duration,
}

impl ContractRegistry {
    pub fn new(
        account: Arc<Account>,
        sender: TransactionSender,
        compiler: Arc<dyn Compiler>,
    ) -> Self {
        let settings = JobSettings::default();
        Self {
            account,
            sender,
            compiler,
            contracts: RwLock::new(HashMap::new()),
            deploy_timeout: settings.deploy_timeout,
            receipt_timeout: settings.receipt_timeout,
        }
    }

    pub fn with_timeouts(mut self, deploy_timeout: Duration, receipt_timeout: Duration) -> Self {
        self.deploy_timeout = deploy_timeout;
        self.receipt_timeout = receipt_timeout;
        self
    }

    pub fn account(&self) -> &Arc<Account> {
        &self.account
    }

    /// Compile, deploy and record `contract_name` from `source` under `id`.
    pub async fn deploy(
        &self,
        id: &str,
        source: impl AsRef<Path>,
        contract_name: &str,
        ctor_args: &[DynSolValue],
    ) -> Result<(Address, JsonAbi), DeploymentError> {
        let compiled = self
            .compiler
            .compile(source.as_ref(), contract_name)
            .await
            .map_err(|source| DeploymentError::Compile {
                id: id.to_string(),
                source,
            })?;

        let mut init_code = compiled.bytecode.to_vec();
        match compiled.abi.constructor() {
            Some(ctor) => {
                let encoded =
                    ctor.abi_encode_input(ctor_args)
                        .map_err(|e| DeploymentError::Encode {
                            id: id.to_string(),
                            reason: e.to_string(),
                        })?;
                init_code.extend_from_slice(&encoded);
            }
            None if !ctor_args.is_empty() => {
                return Err(DeploymentError::Encode {
                    id: id.to_string(),
                    reason: "contract has no constructor but arguments were given".to_string(),
                });
            }
            None => {}
        }

        let intent = TxIntent::deploy(init_code).with_gas_limit(DEPLOY_GAS_LIMIT);
        let receipt = self
            .sender
            .send_intent_and_wait(&self.account, intent, self.deploy_timeout)
            .await
            .map_err(|source| DeploymentError::Send {
                id: id.to_string(),
                source,
            })?;

        if !receipt.success {
            return Err(DeploymentError::Reverted {
                id: id.to_string(),
                tx_hash: receipt.transaction_hash,
            });
        }

        let address = receipt
            .contract_address
            .ok_or_else(|| DeploymentError::MissingAddress {
                id: id.to_string(),
                tx_hash: receipt.transaction_hash,
            })?;

        self.register(id, address, compiled.abi.clone()).await;
        info!(id, contract = contract_name, %address, "contract deployed");

        Ok((address, compiled.abi))
    }

    /// Record an already deployed contract. Last write wins.
    pub async fn register(&self, id: &str, address: Address, abi: JsonAbi) {
        let contract = DeployedContract {
            id: id.to_string(),
            address,
            abi,
        };
        self.contracts
            .write()
            .await
            .insert(id.to_string(), Arc::new(contract));
    }

    pub async fn contract(&self, id: &str) -> Result<Arc<DeployedContract>, ContractError> {
        self.contracts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ContractError::UnknownContract(id.to_string()))
    }

    pub async fn address(&self, id: &str) -> Result<Address, ContractError> {
        Ok(self.contract(id).await?.address)
    }

    // selector + encoded args, and the target address
    pub async fn encode_call(
        &self,
        id: &str,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<(Address, Bytes), ContractError> {
        let contract = self.contract(id).await?;
        let data = contract
            .function(function, args.len())?
            .abi_encode_input(args)
            .map_err(|e| ContractError::Encode(e.to_string()))?;

        Ok((contract.address, Bytes::from(data)))
    }

    /// Send a call without waiting for it to be mined.
    pub async fn call(
        &self,
        id: &str,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<TxHash, ContractError> {
        let (to, data) = self.encode_call(id, function, args).await?;
        let intent = TxIntent::call(to, data).with_gas_limit(CALL_GAS_LIMIT);

        let tx_hash = self.sender.send_intent(&self.account, intent).await?;
        debug!(id, function, %tx_hash, "contract call sent");
        Ok(tx_hash)
    }

    pub async fn call_and_wait(
        &self,
        id: &str,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<Receipt, ContractError> {
        let (to, data) = self.encode_call(id, function, args).await?;
        let intent = TxIntent::call(to, data).with_gas_limit(CALL_GAS_LIMIT);

        let receipt = self
            .sender
            .send_intent_and_wait(&self.account, intent, self.receipt_timeout)
            .await?;
        debug!(id, function, tx_hash = %receipt.transaction_hash, success = receipt.success, "contract call mined");
        Ok(receipt)
    }

    pub async fn invoke(
        &self,
        id: &str,
        function: &str,
        args: &[DynSolValue],
        wait: bool,
    ) -> Result<CallOutcome, ContractError> {
        if wait {
            Ok(CallOutcome::Confirmed(
                self.call_and_wait(id, function, args).await?,
            ))
        } else {
            Ok(CallOutcome::Sent(self.call(id, function, args).await?))
        }
    }

    /// Read-only `eth_call`, outputs decoded with the stored ABI.
    pub async fn query(
        &self,
        id: &str,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ContractError> {
        let contract = self.contract(id).await?;
        let func = contract.function(function, args.len())?;

        let data = func
            .abi_encode_input(args)
            .map_err(|e| ContractError::Encode(e.to_string()))?;

        let request =
            CallRequest::new(contract.address, Bytes::from(data)).with_from(self.account.address());
        let output = self.sender.client().call(&request).await?;

        func.abi_decode_output(&output)
            .map_err(|e| ContractError::Decode(e.to_string()))
    }
}
