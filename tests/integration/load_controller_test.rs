#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use common::{fast_settings, funded_chain, wait_until, write_artifacts};
use evm_loadgen::{
    ArtifactCompiler, InMemoryChain, Job, JobContext, JobRegistry, LoadConfig, LoadController,
    config::ConfigError,
    controller::ControllerError,
    jobs::TaskSpec,
    rpc::{LoadGenRpcImpl, LoadGenRpcServer},
    transaction::{TransactionSender, TxIntent},
};
use serial_test::serial;
use tempfile::TempDir;

// Does nothing but count its iterations
struct IdleJob;

#[async_trait]
impl Job for IdleJob {
    fn name(&self) -> &str {
        "idle"
    }

    fn tasks(&self) -> Vec<TaskSpec> {
        vec![TaskSpec::new("tick", 1)]
    }

    async fn run_task(&mut self, _task: &str, _ctx: &JobContext) -> Result<()> {
        Ok(())
    }
}

// Setup fails for even user indexes
struct FlakySetupJob {
    user_index: usize,
}

#[async_trait]
impl Job for FlakySetupJob {
    fn name(&self) -> &str {
        "flaky_setup"
    }

    fn tasks(&self) -> Vec<TaskSpec> {
        vec![TaskSpec::new("tick", 1)]
    }

    async fn before_start(&mut self, _ctx: &JobContext) -> Result<()> {
        if self.user_index % 2 == 0 {
            bail!("setup failed for user {}", self.user_index);
        }
        Ok(())
    }

    async fn run_task(&mut self, _task: &str, _ctx: &JobContext) -> Result<()> {
        Ok(())
    }
}

// Every other iteration sends a transaction without a recipient
struct HalfBrokenJob {
    sender: Option<TransactionSender>,
    counter: u64,
}

#[async_trait]
impl Job for HalfBrokenJob {
    fn name(&self) -> &str {
        "half_broken"
    }

    fn tasks(&self) -> Vec<TaskSpec> {
        vec![TaskSpec::new("send", 1)]
    }

    async fn before_start(&mut self, ctx: &JobContext) -> Result<()> {
        self.sender = Some(ctx.sender());
        Ok(())
    }

    async fn run_task(&mut self, _task: &str, ctx: &JobContext) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| anyhow!("no sender"))?;
        self.counter += 1;

        let intent = if self.counter % 2 == 0 {
            TxIntent::default()
        } else {
            TxIntent::transfer(Address::repeat_byte(0x33), U256::from(1))
        };
        sender.send_intent(&ctx.pool.genesis(), intent).await?;
        Ok(())
    }
}

fn test_registry() -> JobRegistry {
    let mut registry = JobRegistry::with_builtins();
    registry.register("idle", |_| Box::new(IdleJob) as Box<dyn Job>);
    registry.register("flaky_setup", |user_index| {
        Box::new(FlakySetupJob { user_index }) as Box<dyn Job>
    });
    registry.register("half_broken", |_| {
        Box::new(HalfBrokenJob {
            sender: None,
            counter: 0,
        }) as Box<dyn Job>
    });
    registry
}

fn create_controller(config: LoadConfig) -> Result<(LoadController, Arc<InMemoryChain>, TempDir)> {
    let chain = funded_chain();
    let artifacts = write_artifacts()?;
    let controller = LoadController::new(
        config,
        test_registry(),
        fast_settings(),
        Arc::new(ArtifactCompiler::new(artifacts.path())),
    )
    .with_client(chain.clone());
    Ok((controller, chain, artifacts))
}

fn config(job: &str, users: usize, spawn_rate: u32) -> LoadConfig {
    LoadConfig::new("http://127.0.0.1:8545", spawn_rate).with_job(job, users)
}

#[tokio::test]
async fn test_stop_is_idempotent() -> Result<()> {
    let (controller, _chain, _dir) = create_controller(config("idle", 2, 100))?;

    // never started
    controller.stop().await;
    controller.stop().await;
    assert!(!controller.status());

    controller.start().await?;
    assert!(controller.status());

    controller.stop().await;
    assert!(!controller.status());
    controller.stop().await;
    assert!(!controller.status());
    Ok(())
}

#[tokio::test]
async fn test_start_twice_is_rejected() -> Result<()> {
    let (controller, _chain, _dir) = create_controller(config("idle", 1, 10))?;

    controller.start().await?;
    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, ControllerError::AlreadyStarted));
    assert!(controller.is_started());

    controller.stop().await;

    // a stopped controller can be started again
    controller.start().await?;
    assert!(controller.is_started());
    controller.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_does_not_start() -> Result<()> {
    let (controller, _chain, _dir) = create_controller(config("no_such_job", 1, 1))?;
    let err = controller.start().await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Config(ConfigError::UnknownJobClass(name)) if name == "no_such_job"
    ));
    assert!(!controller.is_started());

    let (controller, _chain, _dir) = create_controller(config("idle", 1, 0))?;
    assert!(matches!(
        controller.start().await.unwrap_err(),
        ControllerError::Config(ConfigError::ZeroSpawnRate)
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_ramp_reaches_full_population_after_two_seconds() -> Result<()> {
    eprintln!("⏱️  Ramping 10 users at 5 users/s...");

    let (controller, _chain, _dir) = create_controller(config("idle", 10, 5))?;
    let controller = &controller;

    let started = tokio::time::Instant::now();
    controller.start().await?;

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let early = controller.report();
    assert!(early.spawned < 10, "spawned {} after 1s", early.spawned);

    let full = wait_until(Duration::from_secs(5), move || async move {
        controller.report().running == 10
    })
    .await;
    let elapsed = started.elapsed();

    assert!(full, "population never reached 10");
    assert!(elapsed >= Duration::from_millis(1900), "too early: {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(2600), "too late: {elapsed:?}");

    controller.stop().await;
    let report = controller.report();
    assert_eq!(report.stopped, 10);
    assert!(!report.is_started);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_setup_failure_only_affects_that_user() -> Result<()> {
    let (controller, _chain, _dir) = create_controller(config("flaky_setup", 4, 50))?;
    let controller = &controller;
    controller.start().await?;

    let settled = wait_until(Duration::from_secs(3), move || async move {
        let report = controller.report();
        report.failed == 2 && report.running == 2
    })
    .await;

    assert!(settled, "unexpected report: {:?}", controller.report());
    assert!(controller.status());

    controller.stop().await;
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_failed_sends_do_not_stop_the_loop() -> Result<()> {
    let (controller, chain, _dir) = create_controller(config("half_broken", 1, 50))?;
    let controller = &controller;
    controller.start().await?;

    let progressed = wait_until(Duration::from_secs(3), move || async move {
        let report = controller.report();
        report.iterations >= 3 && report.failed_iterations >= 3
    })
    .await;

    assert!(progressed, "unexpected report: {:?}", controller.report());
    assert!(controller.status());
    assert_eq!(controller.report().running, 1);

    controller.stop().await;

    // only the well-formed half reached the chain, and without nonce gaps
    let report = controller.report();
    assert_eq!(chain.mined_count() as u64, report.iterations);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_builtin_transfer_job_generates_traffic() -> Result<()> {
    let (controller, chain, _dir) = create_controller(config("transfer", 2, 50))?;
    let controller = &controller;
    controller.start().await?;

    let busy = wait_until(Duration::from_secs(5), move || async move {
        controller.report().iterations >= 6
    })
    .await;
    controller.stop().await;

    assert!(busy, "unexpected report: {:?}", controller.report());
    // two funding transfers plus one transaction per iteration
    let report = controller.report();
    assert_eq!(report.failed, 0);
    assert!(chain.mined_count() as u64 >= 2 + report.iterations);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_rpc_control_surface() -> Result<()> {
    let (controller, _chain, _dir) = create_controller(config("idle", 1, 20))?;
    let rpc = LoadGenRpcImpl::new(Arc::new(controller));

    assert!(!LoadGenRpcServer::is_started(&rpc).await?);
    assert!(LoadGenRpcServer::start(&rpc).await?);
    assert!(LoadGenRpcServer::is_started(&rpc).await?);

    // second start is refused with an error object
    assert!(LoadGenRpcServer::start(&rpc).await.is_err());

    let status = LoadGenRpcServer::status(&rpc).await?;
    assert!(status.is_started);
    assert_eq!(status.target_users, 1);
    assert!(status.started_at.is_some());

    assert!(!LoadGenRpcServer::stop(&rpc).await?);
    assert!(!LoadGenRpcServer::stop(&rpc).await?);
    assert!(!LoadGenRpcServer::is_started(&rpc).await?);
    Ok(())
}
