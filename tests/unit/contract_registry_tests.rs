#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::Function,
    primitives::{Address, Bytes, TxKind, U256},
};
use anyhow::Result;
use common::{create_pool, funded_chain, write_artifacts};
use evm_loadgen::{
    AccountPool, ArtifactCompiler, ContractRegistry, InMemoryChain,
    contracts::{CallOutcome, CompileError, ContractError, DeploymentError, Erc20},
};
use tempfile::TempDir;

struct Fixture {
    chain: Arc<InMemoryChain>,
    pool: Arc<AccountPool>,
    registry: ContractRegistry,
    _artifacts: TempDir,
}

async fn create_fixture() -> Result<Fixture> {
    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let artifacts = write_artifacts()?;

    let registry = ContractRegistry::new(
        pool.genesis(),
        pool.sender(),
        Arc::new(ArtifactCompiler::new(artifacts.path())),
    );

    Ok(Fixture {
        chain,
        pool,
        registry,
        _artifacts: artifacts,
    })
}

fn selector(signature: &str) -> [u8; 4] {
    Function::parse(signature).unwrap().selector().0
}

#[tokio::test]
async fn test_deploy_then_query_round_trip() -> Result<()> {
    eprintln!("🧪 Deploying a constant getter and reading it back...");

    let f = create_fixture().await?;
    let (address, abi) = f.registry.deploy("c", "Constant.sol", "Constant", &[]).await?;

    assert!(abi.function("getConstant").is_some());
    assert!(f.chain.code_at(address).is_some());
    assert_eq!(f.registry.address("c").await?, address);

    let encoded = DynSolValue::Uint(U256::from(42), 256).abi_encode();
    f.chain.set_call_result(
        selector("function getConstant() pure returns (uint256)"),
        Bytes::from(encoded),
    );

    let output = f.registry.query("c", "getConstant", &[]).await?;
    assert_eq!(output, vec![DynSolValue::Uint(U256::from(42), 256)]);
    Ok(())
}

#[tokio::test]
async fn test_constructor_args_are_appended_to_bytecode() -> Result<()> {
    let f = create_fixture().await?;
    let args = [
        DynSolValue::String("EndGameMoney".to_string()),
        DynSolValue::String("EGM".to_string()),
    ];

    let (address, _) = f.registry.deploy("EGM", "ERC20.sol", "ERC20", &args).await?;

    let code = f.chain.code_at(address).unwrap();
    let bytecode = hex::decode("60806040523480156200001157600080fd5b50")?;
    assert!(code.starts_with(&bytecode));
    // two dynamic strings: 2 offsets + 2 lengths + 2 padded words
    assert_eq!(code.len(), bytecode.len() + 6 * 32);

    let deploy_tx = f.chain.transactions_from(f.pool.genesis().address());
    assert_eq!(deploy_tx[0].to, TxKind::Create);
    assert_eq!(deploy_tx[0].gas_limit, 5_000_000);
    Ok(())
}

#[tokio::test]
async fn test_redeploy_overwrites_id() -> Result<()> {
    let f = create_fixture().await?;

    let (first, _) = f.registry.deploy("counter", "Counter.sol", "Counter", &[]).await?;
    let (second, _) = f.registry.deploy("counter", "Counter.sol", "Counter", &[]).await?;

    assert_ne!(first, second);
    assert_eq!(f.registry.address("counter").await?, second);
    Ok(())
}

#[tokio::test]
async fn test_call_encodes_selector_and_args() -> Result<()> {
    let f = create_fixture().await?;
    let args = [DynSolValue::String("A".into()), DynSolValue::String("A".into())];
    let (token, _) = f.registry.deploy("A", "ERC20.sol", "ERC20", &args).await?;

    let to = Address::repeat_byte(0x77);
    let tx_hash = f
        .registry
        .call(
            "A",
            "mint",
            &[DynSolValue::Address(to), DynSolValue::Uint(U256::from(5), 256)],
        )
        .await?;

    let mined = f.chain.transaction(tx_hash).unwrap();
    assert_eq!(mined.to, TxKind::Call(token));
    assert_eq!(mined.gas_limit, 1_000_000);
    assert_eq!(&mined.input[..4], &selector("function mint(address,uint256)")[..]);
    assert_eq!(mined.input.len(), 4 + 2 * 32);
    Ok(())
}

#[tokio::test]
async fn test_call_and_wait_returns_receipt() -> Result<()> {
    let f = create_fixture().await?;
    f.registry.deploy("counter", "Counter.sol", "Counter", &[]).await?;

    let receipt = f.registry.call_and_wait("counter", "increment", &[]).await?;
    assert!(receipt.success);

    let outcome = f.registry.invoke("counter", "increment", &[], false).await?;
    assert!(matches!(outcome, CallOutcome::Sent(_)));
    Ok(())
}

#[tokio::test]
async fn test_unknown_contract_and_function() -> Result<()> {
    let f = create_fixture().await?;

    let err = f.registry.call("missing", "increment", &[]).await.unwrap_err();
    assert!(matches!(err, ContractError::UnknownContract(id) if id == "missing"));

    f.registry.deploy("counter", "Counter.sol", "Counter", &[]).await?;
    let err = f
        .registry
        .call("counter", "decrement", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::UnknownFunction { .. }));

    // wrong arity is the same as a missing overload
    let err = f
        .registry
        .call("counter", "increment", &[DynSolValue::Bool(true)])
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::UnknownFunction { arity: 1, .. }));
    Ok(())
}

#[tokio::test]
async fn test_failed_deployments() -> Result<()> {
    let f = create_fixture().await?;

    let err = f
        .registry
        .deploy("nope", "Nope.sol", "Nope", &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeploymentError::Compile {
            source: CompileError::Io { .. },
            ..
        }
    ));

    let err = f
        .registry
        .deploy("bad", "Counter.sol", "Counter", &[DynSolValue::Bool(true)])
        .await
        .unwrap_err();
    assert!(matches!(err, DeploymentError::Encode { .. }));

    f.chain.set_revert_all(true);
    let err = f
        .registry
        .deploy("counter", "Counter.sol", "Counter", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DeploymentError::Reverted { .. }));
    assert!(f.registry.contract("counter").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_erc20_capability() -> Result<()> {
    let f = create_fixture().await?;
    let registry = Arc::new(f.registry);
    let args = [DynSolValue::String("StrataUSD".into()), DynSolValue::String("SUSD".into())];
    registry.deploy("SUSD", "ERC20.sol", "ERC20", &args).await?;

    let susd = Erc20::new(registry.clone(), "SUSD");
    let outcome = susd.mint(U256::from(1_000_000), true).await?;
    match outcome {
        CallOutcome::Confirmed(receipt) => assert!(receipt.success),
        other => panic!("expected confirmed mint, got {other:?}"),
    }

    let spender = Address::repeat_byte(0x99);
    let outcome = susd.approve(spender, U256::from(10), false).await?;
    let approve_tx = f.chain.transaction(outcome.tx_hash()).unwrap();
    assert_eq!(
        &approve_tx.input[..4],
        &selector("function approve(address,uint256)")[..]
    );

    f.chain.set_call_result(
        selector("function balanceOf(address)"),
        Bytes::from(DynSolValue::Uint(U256::from(1_000_000), 256).abi_encode()),
    );
    let balance = susd.balance_of(registry.account().address()).await?;
    assert_eq!(balance, U256::from(1_000_000));
    Ok(())
}
