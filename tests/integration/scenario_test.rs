#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxKind, U256};
use anyhow::Result;
use common::{
    create_context, create_pool, ether_to_wei, fast_settings, funded_chain, wait_until,
    write_artifacts,
};
use evm_loadgen::{
    ArtifactCompiler, ChainClient, Job, JobRegistry, LoadConfig, LoadController,
    jobs::{BlockWatcherJob, TransferJob, TxMixJob},
    transaction::TxFormat,
};
use serial_test::serial;

#[tokio::test]
async fn test_funding_scenario() -> Result<()> {
    eprintln!("💰 Funding a new account with 1000 wei...");

    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let genesis = pool.genesis();
    let genesis_before = chain.balance(genesis.address()).await?;

    let account = pool.new_funded(&genesis, U256::from(1000)).await?;

    assert_eq!(chain.balance(account.address()).await?, U256::from(1000));
    // no gas is charged on the in-memory chain
    assert_eq!(
        chain.balance(genesis.address()).await?,
        genesis_before - U256::from(1000)
    );

    // the funded account can spend right away
    let sender = pool.sender();
    sender
        .transfer(&account, Address::repeat_byte(0x01), U256::from(400), TxFormat::FeeMarket)
        .await?;
    assert_eq!(chain.balance(account.address()).await?, U256::from(600));
    Ok(())
}

#[tokio::test]
async fn test_tx_mix_job_lifecycle() -> Result<()> {
    eprintln!("🧪 Running tx_mix setup and one task iteration...");

    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let artifacts = write_artifacts()?;
    let ctx = create_context(&chain, &pool, artifacts.path());

    let mut job = TxMixJob::new();
    assert_eq!(job.tasks().len(), 1);

    job.before_start(&ctx).await?;
    // one funding transfer
    assert_eq!(chain.mined_count(), 1);

    job.on_start(&ctx).await?;
    // five deployments, two mints, two approvals, liquidity and a swap
    assert_eq!(chain.mined_count(), 1 + 5 + 6);

    // everything after funding comes from the job's own account
    assert_eq!(chain.transactions_from(pool.genesis().address()).len(), 1);

    job.run_task("transactions", &ctx).await?;
    // three transfers, one increment and one mint
    assert_eq!(chain.mined_count(), 1 + 5 + 6 + 5);
    Ok(())
}

#[tokio::test]
async fn test_tx_mix_sends_every_format() -> Result<()> {
    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let artifacts = write_artifacts()?;
    let ctx = create_context(&chain, &pool, artifacts.path());

    let mut job = TxMixJob::new();
    job.before_start(&ctx).await?;
    job.on_start(&ctx).await?;
    job.run_task("transactions", &ctx).await?;

    // the job account is the recipient of the only genesis transaction
    let funding = chain.transactions_from(pool.genesis().address());
    let TxKind::Call(job_account) = funding[0].to else {
        panic!("funding transaction has no recipient");
    };

    let sent = chain.transactions_from(job_account);
    let creations = sent.iter().filter(|tx| tx.to == TxKind::Create).count();
    assert_eq!(creations, 5);

    let transfer_types: Vec<u8> = sent
        .iter()
        .filter(|tx| tx.input.is_empty())
        .map(|tx| tx.tx_type)
        .collect();
    assert_eq!(transfer_types, vec![0, 1, 2]);

    // nonces are gapless from 0
    let nonces: Vec<u64> = sent.iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, (0..sent.len() as u64).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn test_tx_mix_failed_transfers_do_not_skip_contract_calls() -> Result<()> {
    eprintln!("🧪 Transfers above the job balance, contract calls still sent...");

    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let artifacts = write_artifacts()?;
    let ctx = create_context(&chain, &pool, artifacts.path());

    let mut job = TxMixJob::new().with_transfer_value(ether_to_wei(1_000_000));
    job.before_start(&ctx).await?;
    job.on_start(&ctx).await?;
    let before = chain.mined_count();

    let err = job.run_task("transactions", &ctx).await.unwrap_err();
    assert!(err.to_string().contains("3 of 5"));

    // the increment and the mint went out anyway
    assert_eq!(chain.mined_count(), before + 2);

    let funding = chain.transactions_from(pool.genesis().address());
    let TxKind::Call(job_account) = funding[0].to else {
        panic!("funding transaction has no recipient");
    };
    let nonces: Vec<u64> = chain
        .transactions_from(job_account)
        .iter()
        .map(|tx| tx.nonce)
        .collect();
    assert_eq!(nonces, (0..nonces.len() as u64).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn test_tx_mix_setup_fails_on_reverts() -> Result<()> {
    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let artifacts = write_artifacts()?;
    let ctx = create_context(&chain, &pool, artifacts.path());

    let mut job = TxMixJob::new();
    job.before_start(&ctx).await?;

    chain.set_revert_all(true);
    assert!(job.on_start(&ctx).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_block_watcher_counts_new_blocks() -> Result<()> {
    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let artifacts = write_artifacts()?;
    let ctx = create_context(&chain, &pool, artifacts.path());

    // history before the watcher starts is skipped
    let sender = pool.sender();
    sender
        .transfer(&pool.genesis(), Address::repeat_byte(2), U256::from(1), TxFormat::Legacy)
        .await?;

    let mut watcher = BlockWatcherJob::new();
    watcher.before_start(&ctx).await?;
    assert_eq!(watcher.last_block(), 1);

    for format in TxFormat::ALL {
        sender
            .transfer(&pool.genesis(), Address::repeat_byte(2), U256::from(1), format)
            .await?;
    }

    watcher.run_task("get_block", &ctx).await?;
    assert_eq!(watcher.last_block(), 4);
    assert_eq!(watcher.transactions_seen(), 3);

    // nothing new, nothing counted
    watcher.run_task("get_block", &ctx).await?;
    assert_eq!(watcher.transactions_seen(), 3);
    Ok(())
}

#[tokio::test]
async fn test_transfer_job_tasks_cover_all_formats() -> Result<()> {
    let chain = funded_chain();
    let pool = create_pool(&chain).await?;
    let artifacts = write_artifacts()?;
    let ctx = create_context(&chain, &pool, artifacts.path());

    let mut job = TransferJob::new().with_value(ether_to_wei(1));
    let names: Vec<String> = job.tasks().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["legacy", "access_list", "fee_market"]);

    job.before_start(&ctx).await?;
    for name in &names {
        job.run_task(name, &ctx).await?;
    }
    assert!(job.run_task("carrier_pigeon", &ctx).await.is_err());

    assert_eq!(chain.mined_count(), 1 + 3);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_controller_runs_tx_mix_population() -> Result<()> {
    eprintln!("🚀 Running two tx_mix users through the controller...");

    let chain = funded_chain();
    let artifacts = write_artifacts()?;
    let config_path = artifacts.path().join("load.json");
    std::fs::write(
        &config_path,
        r#"{ "jobClasses": [{ "name": "tx_mix", "users": 2 }], "host": "http://127.0.0.1:8545", "spawnRate": 20 }"#,
    )?;

    let controller = LoadController::new(
        LoadConfig::from_file(&config_path)?,
        JobRegistry::with_builtins(),
        fast_settings(),
        Arc::new(ArtifactCompiler::new(artifacts.path())),
    )
    .with_client(chain.clone());
    let controller = &controller;

    controller.start().await?;
    let busy = wait_until(Duration::from_secs(10), move || async move {
        let report = controller.report();
        report.running == 2 && report.iterations >= 4
    })
    .await;
    controller.stop().await;

    let report = controller.report();
    assert!(busy, "unexpected report: {report:?}");
    assert_eq!(report.failed, 0);
    assert_eq!(report.stopped, 2);
    assert!(!controller.status());
    Ok(())
}
