use std::sync::Arc;

use alloy::{dyn_abi::DynSolValue, primitives::U256};
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use tracing::{info, warn};

use super::{Job, JobContext, TaskSpec};
use crate::Result;
use crate::account::Account;
use crate::common::ONE_ETHER;
use crate::contracts::{CallOutcome, ContractRegistry, Erc20, Uniswap};
use crate::transaction::{TransactionSender, TxFormat, require_success};

const COUNTER: &str = "Counter";
const EGM: &str = "EGM";
const SUSD: &str = "SUSD";
const FACTORY: &str = "UniswapFactory";
const ROUTER: &str = "Uniswap";

const INITIAL_MINT: u64 = 1_000_000;
const LIQUIDITY: u64 = 100_000;
const SETUP_SWAP: u64 = 500;
const TASK_MINT: u64 = 100;
// three transfers, one increment, one mint
const TASK_SENDS: usize = 5;

// capabilities built once the account is funded
struct Session {
    account: Arc<Account>,
    sender: TransactionSender,
    registry: Arc<ContractRegistry>,
    egm: Erc20,
    susd: Erc20,
    uniswap: Uniswap,
}

/// Mixed traffic: transfers in every format, a counter contract and ERC20 mints.
///
/// Setup deploys Counter, two tokens and a Uniswap factory and router, then
/// mints, approves, seeds a pool and swaps once. Each task iteration sends
/// three transfers, one counter increment and one mint without waiting.
pub struct TxMixJob {
    session: Option<Session>,
    transfer_value: U256,
}

impl TxMixJob {
    pub const NAME: &'static str = "tx_mix";

    pub fn new() -> Self {
        Self {
            session: None,
            transfer_value: U256::from(ONE_ETHER / 10),
        }
    }

    pub fn with_transfer_value(mut self, value: U256) -> Self {
        self.transfer_value = value;
        self
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| anyhow!("tx_mix job used before setup"))
    }
}

impl Default for TxMixJob {
    fn default() -> Self {
        Self::new()
    }
}

fn confirmed(outcome: CallOutcome, step: &str) -> Result<()> {
    match outcome {
        CallOutcome::Confirmed(receipt) => {
            require_success(receipt).with_context(|| format!("{step} reverted"))?;
            Ok(())
        }
        CallOutcome::Sent(tx_hash) => Err(anyhow!("{step} was not awaited ({tx_hash})")),
    }
}

#[async_trait]
impl Job for TxMixJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn tasks(&self) -> Vec<TaskSpec> {
        vec![TaskSpec::new("transactions", 1)]
    }

    async fn before_start(&mut self, ctx: &JobContext) -> Result<()> {
        let account = ctx
            .new_account()
            .await
            .context("failed to fund tx_mix account")?;
        let registry = Arc::new(ctx.registry_for(account.clone()));

        self.session = Some(Session {
            sender: ctx.sender(),
            egm: Erc20::new(registry.clone(), EGM),
            susd: Erc20::new(registry.clone(), SUSD),
            uniswap: Uniswap::new(registry.clone(), ROUTER),
            registry,
            account,
        });
        Ok(())
    }

    async fn on_start(&mut self, _ctx: &JobContext) -> Result<()> {
        let s = self.session()?;
        let registry = &s.registry;

        registry.deploy(COUNTER, "Counter.sol", "Counter", &[]).await?;

        for (id, name) in [(EGM, "EndGameMoney"), (SUSD, "StrataUSD")] {
            let args = [
                DynSolValue::String(name.to_string()),
                DynSolValue::String(id.to_string()),
            ];
            registry.deploy(id, "ERC20.sol", "ERC20", &args).await?;
        }

        let (factory, _) = registry
            .deploy(FACTORY, "Uniswap.sol", "UniswapFactory", &[])
            .await?;
        registry
            .deploy(
                ROUTER,
                "Uniswap.sol",
                "UniswapRouter",
                &[DynSolValue::Address(factory)],
            )
            .await?;

        let router = s.uniswap.address().await?;
        let egm = s.egm.address().await?;
        let susd = s.susd.address().await?;

        // each step depends on the previous one being mined
        confirmed(s.egm.mint(U256::from(INITIAL_MINT), true).await?, "EGM mint")?;
        confirmed(s.susd.mint(U256::from(INITIAL_MINT), true).await?, "SUSD mint")?;
        confirmed(
            s.egm.approve(router, U256::from(INITIAL_MINT), true).await?,
            "EGM approve",
        )?;
        confirmed(
            s.susd.approve(router, U256::from(INITIAL_MINT), true).await?,
            "SUSD approve",
        )?;
        confirmed(
            s.uniswap
                .add_liquidity(egm, U256::from(LIQUIDITY), susd, U256::from(LIQUIDITY), true)
                .await?,
            "add liquidity",
        )?;
        confirmed(
            s.uniswap
                .swap(susd, egm, U256::from(SETUP_SWAP), true)
                .await?,
            "swap",
        )?;

        info!(account = %s.account.address(), %router, "contracts ready");
        Ok(())
    }

    /// Every send of the iteration is attempted even when an earlier one
    /// fails; the iteration then reports how many were lost.
    async fn run_task(&mut self, _task: &str, _ctx: &JobContext) -> Result<()> {
        let s = self.session()?;
        let target = Account::generate().address();
        let mut failed = 0usize;

        for format in TxFormat::ALL {
            if let Err(e) = s
                .sender
                .transfer(&s.account, target, self.transfer_value, format)
                .await
            {
                warn!(%format, error = %e, "transfer failed");
                failed += 1;
            }
        }

        if let Err(e) = s.registry.call(COUNTER, "increment", &[]).await {
            warn!(error = %e, "counter increment failed");
            failed += 1;
        }
        if let Err(e) = s.susd.mint(U256::from(TASK_MINT), false).await {
            warn!(error = %e, "SUSD mint failed");
            failed += 1;
        }

        if failed > 0 {
            bail!("{failed} of {TASK_SENDS} sends failed");
        }

        info!("task completed");
        Ok(())
    }
}
