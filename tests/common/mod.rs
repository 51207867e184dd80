#![allow(dead_code)]

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use anyhow::Result;
use evm_loadgen::{
    Account, AccountPool, ArtifactCompiler, InMemoryChain, JobSettings,
    common::{DEV_CHAIN_ID, GENESIS_PRIVATE_KEY, ONE_ETHER},
    jobs::JobContext,
    transaction::FeePolicy,
};
use serde_json::{Value, json};
use tempfile::TempDir;

// Helper functions for realistic amounts
pub fn ether_to_wei(ether: u64) -> U256 {
    U256::from(ether) * U256::from(ONE_ETHER)
}

// In-memory chain with the genesis account holding 1M ether
pub fn funded_chain() -> Arc<InMemoryChain> {
    let chain = InMemoryChain::new(DEV_CHAIN_ID);
    chain.fund(genesis_account().address(), ether_to_wei(1_000_000));
    Arc::new(chain)
}

pub fn genesis_account() -> Account {
    Account::from_private_key(GENESIS_PRIVATE_KEY).unwrap()
}

// Short timeouts so failure paths finish quickly
pub fn fast_settings() -> JobSettings {
    JobSettings {
        funding_timeout: Duration::from_millis(300),
        receipt_timeout: Duration::from_millis(300),
        deploy_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(10),
        task_interval: Duration::from_millis(10),
        fee_policy: FeePolicy::Live,
        ..Default::default()
    }
}

pub async fn create_pool(chain: &Arc<InMemoryChain>) -> Result<Arc<AccountPool>> {
    let pool = AccountPool::bootstrap(chain.clone(), GENESIS_PRIVATE_KEY)
        .await?
        .with_settings(&fast_settings());
    Ok(Arc::new(pool))
}

pub fn create_context(
    chain: &Arc<InMemoryChain>,
    pool: &Arc<AccountPool>,
    artifacts: &Path,
) -> JobContext {
    JobContext {
        client: chain.clone(),
        pool: pool.clone(),
        compiler: Arc::new(ArtifactCompiler::new(artifacts)),
        settings: Arc::new(fast_settings()),
        user_index: 0,
    }
}

// Poll `check` until it holds or `timeout` passes
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}

fn param(name: &str, ty: &str) -> Value {
    json!({ "name": name, "type": ty, "internalType": ty })
}

fn function(name: &str, inputs: Vec<Value>, outputs: Vec<Value>, mutability: &str) -> Value {
    json!({
        "type": "function",
        "name": name,
        "inputs": inputs,
        "outputs": outputs,
        "stateMutability": mutability
    })
}

fn constructor(inputs: Vec<Value>) -> Value {
    json!({ "type": "constructor", "inputs": inputs, "stateMutability": "nonpayable" })
}

fn write_artifact(dir: &Path, name: &str, abi: Vec<Value>, bytecode: Value) -> Result<()> {
    let artifact = json!({ "contractName": name, "abi": abi, "bytecode": bytecode });
    std::fs::write(dir.join(format!("{name}.json")), serde_json::to_string_pretty(&artifact)?)?;
    Ok(())
}

// Precompiled artifacts for every contract the built-in jobs deploy
pub fn write_artifacts() -> Result<TempDir> {
    let dir = TempDir::new()?;
    let path = dir.path();

    write_artifact(
        path,
        "Counter",
        vec![
            function("increment", vec![], vec![], "nonpayable"),
            function("getCount", vec![], vec![param("", "uint256")], "view"),
        ],
        json!("0x6080604052348015600e575f5ffd5b50"),
    )?;

    write_artifact(
        path,
        "ERC20",
        vec![
            constructor(vec![param("_name", "string"), param("_symbol", "string")]),
            function(
                "mint",
                vec![param("to", "address"), param("amount", "uint256")],
                vec![],
                "nonpayable",
            ),
            function(
                "approve",
                vec![param("spender", "address"), param("amount", "uint256")],
                vec![param("", "bool")],
                "nonpayable",
            ),
            function(
                "balanceOf",
                vec![param("owner", "address")],
                vec![param("", "uint256")],
                "view",
            ),
        ],
        json!("0x60806040523480156200001157600080fd5b50"),
    )?;

    write_artifact(
        path,
        "UniswapFactory",
        vec![function(
            "createPair",
            vec![param("tokenA", "address"), param("tokenB", "address")],
            vec![param("pair", "address")],
            "nonpayable",
        )],
        // foundry-style nested bytecode object
        json!({ "object": "0x6080604052348015600f57600080fd5b50" }),
    )?;

    write_artifact(
        path,
        "UniswapRouter",
        vec![
            constructor(vec![param("_factory", "address")]),
            function(
                "addLiquidity",
                vec![
                    param("tokenA", "address"),
                    param("amountA", "uint256"),
                    param("tokenB", "address"),
                    param("amountB", "uint256"),
                ],
                vec![],
                "nonpayable",
            ),
            function(
                "swap",
                vec![
                    param("tokenIn", "address"),
                    param("tokenOut", "address"),
                    param("amountIn", "uint256"),
                ],
                vec![param("", "uint256")],
                "nonpayable",
            ),
        ],
        json!("0x608060405234801561001057600080fd5b50"),
    )?;

    write_artifact(
        path,
        "Constant",
        vec![function("getConstant", vec![], vec![param("", "uint256")], "pure")],
        json!("0x6080604052602a60005260206000f3"),
    )?;

    Ok(dir)
}
