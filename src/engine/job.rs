//! 单个 (账户, 目标链) 任务：余额 → 金额 → 报价 → 限额 → 拆单 → 顺序存款。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::amount::{AmountSelector, PrecisionBand, from_micro, to_micro};
use crate::api::QuoteSource;
use crate::chain::Chain;
use crate::config::{AppConfig, ConfigError};
use crate::monitoring::{CompletedSet, JobStatus, events, short_address};
use crate::refuel::{PlanError, RandomBudget, RandomSource, RouteLimit, RouteLimits, TransferPlanner};
use crate::rpc::{BalanceSource, DepositReceipt, DepositRequest, TransactionExecutor};
use crate::wallet::AccountRow;

use super::error::{JobError, JobResult};
use super::scheduler::Scheduler;

/// 启动后不再变化的任务参数。
#[derive(Clone, Debug)]
pub struct JobSettings {
    pub source: Chain,
    pub selectors: BTreeMap<Chain, AmountSelector>,
    pub budget: RandomBudget,
    pub tx_wait: Scheduler,
    pub dry_run: bool,
}

impl JobSettings {
    pub fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self, ConfigError> {
        let refuel = &config.refuel;
        let decimals = refuel.from.decimals();
        let precision = PrecisionBand {
            min_places: refuel.valuable_decimals(),
            extra_places: refuel.extra_precision,
        };
        let selectors = refuel
            .to
            .iter()
            .map(|chain| {
                let selector = AmountSelector {
                    mode: refuel.amount_mode(),
                    range: refuel.range_for(*chain).into(),
                    precision,
                    decimals,
                };
                (*chain, selector)
            })
            .collect();
        let filler_min = to_micro(refuel.random_tx_min_amount, decimals)
            .map_err(|err| ConfigError::invalid(err.to_string()))?;

        Ok(Self {
            source: refuel.from,
            selectors,
            budget: RandomBudget {
                max_filler_count: refuel.max_random_tx_count,
                filler_min,
            },
            tx_wait: Scheduler::from_secs(config.timing.tx_wait_secs),
            dry_run: dry_run || config.bot.dry_run,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub account: AccountRow,
    pub destination: Chain,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobReport {
    pub status: JobStatus,
    pub planned: Vec<u128>,
    pub deposits: Vec<DepositReceipt>,
    pub estimated_arrival: Option<Duration>,
}

impl JobReport {
    fn already() -> Self {
        Self {
            status: JobStatus::Already,
            planned: Vec::new(),
            deposits: Vec::new(),
            estimated_arrival: None,
        }
    }
}

pub struct JobRunner {
    settings: Arc<JobSettings>,
    limits: Arc<RouteLimits>,
    quotes: Arc<dyn QuoteSource>,
    balances: Arc<dyn BalanceSource>,
    executor: Arc<dyn TransactionExecutor>,
    completed: Arc<CompletedSet>,
}

impl JobRunner {
    pub fn new(
        settings: Arc<JobSettings>,
        limits: Arc<RouteLimits>,
        quotes: Arc<dyn QuoteSource>,
        balances: Arc<dyn BalanceSource>,
        executor: Arc<dyn TransactionExecutor>,
    ) -> Self {
        Self {
            settings,
            limits,
            quotes,
            balances,
            executor,
            completed: Arc::new(CompletedSet::default()),
        }
    }

    pub fn with_completed(mut self, completed: Arc<CompletedSet>) -> Self {
        self.completed = completed;
        self
    }

    /// 运行任务并吞掉错误，只返回最终状态。
    pub async fn execute<R>(&self, job: &Job, worker: usize, rng: &mut R) -> JobStatus
    where
        R: RandomSource + Send,
    {
        let account = &job.account.address;
        events::job_started(account, job.destination, worker);
        let started = Instant::now();
        let (status, eta) = match self.run(job, rng).await {
            Ok(report) => (report.status, report.estimated_arrival),
            Err(err) => {
                error!(
                    target: "engine::job",
                    account = %short_address(account),
                    destination = %job.destination,
                    error = %err,
                    "任务失败"
                );
                (JobStatus::Failed, None)
            }
        };
        events::job_finished(account, job.destination, status, started.elapsed(), eta);
        status
    }

    pub async fn run<R>(&self, job: &Job, rng: &mut R) -> JobResult<JobReport>
    where
        R: RandomSource + Send,
    {
        let source = self.settings.source;
        let destination = job.destination;
        let account = &job.account.address;

        if self.completed.contains(destination, account) {
            info!(
                target: "engine::job",
                account = %short_address(account),
                destination = %destination,
                "该账户此前已完成，跳过"
            );
            return Ok(JobReport::already());
        }

        let selector = self
            .settings
            .selectors
            .get(&destination)
            .ok_or(JobError::RouteDisabled { destination })?;

        let balance = self.balances.balance(account).await?;
        let selection = selector.select(balance, rng)?;
        debug!(
            target: "engine::job",
            account = %short_address(account),
            destination = %destination,
            amount = %selection.amount,
            token = source.native_token(),
            "请求金额已确定"
        );

        let quote = self
            .quotes
            .quote(source.chain_id(), destination.chain_id(), selection.micro)
            .await?;
        if !quote.allowed {
            return Err(JobError::QuoteDenied { destination });
        }

        let pair = match self.limits.resolve(source, destination) {
            RouteLimit::Enabled(pair) => pair,
            RouteLimit::Disabled => return Err(JobError::RouteDisabled { destination }),
        };
        let budget = self.settings.budget.sample(rng);
        let plan = TransferPlanner::new(pair, budget)
            .and_then(|planner| planner.plan(selection.micro, &mut *rng))
            .map_err(|err| plan_error(err, selector.decimals))?;
        events::plan_built(account, destination, &plan);

        let estimated_arrival = Some(Duration::from_millis(quote.estimated_time_ms));
        if self.settings.dry_run {
            info!(
                target: "engine::job",
                account = %short_address(account),
                destination = %destination,
                chunks = ?plan.amounts(),
                "dry-run：不发送交易"
            );
            return Ok(JobReport {
                status: JobStatus::Success,
                planned: plan.amounts(),
                deposits: Vec::new(),
                estimated_arrival,
            });
        }

        let total = plan.len();
        let mut deposits = Vec::with_capacity(total);
        for (index, chunk) in plan.chunks().iter().enumerate() {
            if index > 0 {
                self.settings.tx_wait.wait(rng).await;
            }
            let request = DepositRequest {
                from: *account,
                contract: quote.contract_address,
                dest_chain_id: destination.chain_id(),
                amount: chunk.amount,
            };
            match self.executor.deposit(&request).await {
                Ok(receipt) => {
                    events::deposit_confirmed(
                        account,
                        destination,
                        index,
                        total,
                        &receipt.explorer_link,
                    );
                    deposits.push(receipt);
                }
                Err(source) => {
                    events::deposit_failed(account, destination, index, total, &source);
                    return Err(JobError::Transaction {
                        index,
                        total,
                        source,
                    });
                }
            }
        }

        info!(
            target: "engine::job",
            account = %short_address(account),
            destination = %destination,
            eta_secs = quote.estimated_time_ms / 1_000,
            "refuel 完成，预计到账时间"
        );
        Ok(JobReport {
            status: JobStatus::Success,
            planned: plan.amounts(),
            deposits,
            estimated_arrival,
        })
    }
}

fn plan_error(err: PlanError, decimals: u32) -> JobError {
    match err {
        PlanError::InsufficientBalance { requested, min } => JobError::InsufficientBalance {
            amount: from_micro(requested, decimals).unwrap_or(Decimal::ZERO),
            min: from_micro(min, decimals).unwrap_or(Decimal::ZERO),
        },
        other => JobError::Plan(other),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::amount::{AmountMode, AmountRange};
    use crate::engine::testing::{
        ACCOUNT, CONTRACT, FakeBalances, FakeQuotes, ONE, RecordingExecutor, limits,
    };
    use crate::refuel::random::testing::ScriptedRandom;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn settings(mode: AmountMode, min: &str, max: &str, dry_run: bool) -> Arc<JobSettings> {
        let selector = AmountSelector {
            mode,
            range: AmountRange {
                min: dec(min),
                max: dec(max),
            },
            precision: PrecisionBand {
                min_places: 2,
                extra_places: 0,
            },
            decimals: 18,
        };
        Arc::new(JobSettings {
            source: Chain::Avalanche,
            selectors: BTreeMap::from([(Chain::Optimism, selector)]),
            budget: RandomBudget::NONE,
            tx_wait: Scheduler::NONE,
            dry_run,
        })
    }

    struct Harness {
        runner: JobRunner,
        balances: Arc<FakeBalances>,
        executor: Arc<RecordingExecutor>,
    }

    fn harness(
        settings: Arc<JobSettings>,
        balance: u128,
        allowed: bool,
        executor: RecordingExecutor,
    ) -> Harness {
        let balances = Arc::new(FakeBalances {
            balance,
            calls: AtomicUsize::new(0),
        });
        let executor = Arc::new(executor);
        let runner = JobRunner::new(
            settings,
            limits("300000000000000000", "400000000000000000"),
            Arc::new(FakeQuotes { allowed }),
            balances.clone(),
            executor.clone(),
        );
        Harness {
            runner,
            balances,
            executor,
        }
    }

    fn job() -> Job {
        Job {
            account: AccountRow {
                address: ACCOUNT.parse().unwrap(),
                row: ACCOUNT.to_string(),
            },
            destination: Chain::Optimism,
        }
    }

    #[tokio::test]
    async fn splits_one_unit_into_three_deposits() {
        let h = harness(
            settings(AmountMode::Range, "1", "1", false),
            10 * ONE,
            true,
            RecordingExecutor::default(),
        );
        let report = h
            .runner
            .run(&job(), &mut ScriptedRandom::new([]))
            .await
            .unwrap();

        assert_eq!(report.status, JobStatus::Success);
        assert_eq!(
            report.planned,
            vec![4 * ONE / 10, 3 * ONE / 10, 3 * ONE / 10]
        );
        assert_eq!(report.deposits.len(), 3);
        assert_eq!(report.estimated_arrival, Some(Duration::from_secs(60)));

        let calls = h.executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|call| call.contract == CONTRACT));
        assert!(calls.iter().all(|call| call.dest_chain_id == 10));
        assert_eq!(calls.iter().map(|call| call.amount).sum::<u128>(), ONE);
    }

    #[tokio::test]
    async fn below_bridge_minimum_never_calls_executor() {
        // 余额 0.2 的 95% = 0.19，低于桥下限 0.3。
        let h = harness(
            settings(AmountMode::Percentage(dec("95")), "0.1", "0.4", false),
            2 * ONE / 10,
            true,
            RecordingExecutor::default(),
        );
        let err = h
            .runner
            .run(&job(), &mut ScriptedRandom::new([]))
            .await
            .unwrap_err();

        match err {
            JobError::InsufficientBalance { amount, min } => {
                assert_eq!(amount, dec("0.19"));
                assert_eq!(min, dec("0.3"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(h.executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn denied_quote_fails_job() {
        let h = harness(
            settings(AmountMode::Range, "0.35", "0.35", false),
            10 * ONE,
            false,
            RecordingExecutor::default(),
        );
        let err = h
            .runner
            .run(&job(), &mut ScriptedRandom::new([]))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::QuoteDenied { .. }));
        assert!(h.executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_deposit_stops_remaining_chunks() {
        let h = harness(
            settings(AmountMode::Range, "1", "1", false),
            10 * ONE,
            true,
            RecordingExecutor {
                fail_at: Some(1),
                ..Default::default()
            },
        );
        let err = h
            .runner
            .run(&job(), &mut ScriptedRandom::new([]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::Transaction {
                index: 1,
                total: 3,
                ..
            }
        ));
        assert_eq!(h.executor.calls.lock().unwrap().len(), 2);

        let status = h
            .runner
            .execute(&job(), 0, &mut ScriptedRandom::new([]))
            .await;
        assert_eq!(status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn dry_run_plans_without_sending() {
        let h = harness(
            settings(AmountMode::Range, "1", "1", true),
            10 * ONE,
            true,
            RecordingExecutor::default(),
        );
        let report = h
            .runner
            .run(&job(), &mut ScriptedRandom::new([]))
            .await
            .unwrap();
        assert_eq!(report.planned.len(), 3);
        assert!(report.deposits.is_empty());
        assert!(h.executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn completed_accounts_are_reported_already() {
        let tmp = tempfile::tempdir().unwrap();
        let success = tmp.path().join("to_Optimism").join("SUCCESS.txt");
        std::fs::create_dir_all(success.parent().unwrap()).unwrap();
        std::fs::write(&success, format!("{ACCOUNT}\n")).unwrap();
        let completed = CompletedSet::load(tmp.path(), &[Chain::Optimism]);

        let h = harness(
            settings(AmountMode::Range, "1", "1", false),
            10 * ONE,
            true,
            RecordingExecutor::default(),
        );
        let runner = h.runner.with_completed(Arc::new(completed));
        let status = runner
            .execute(&job(), 0, &mut ScriptedRandom::new([]))
            .await;
        assert_eq!(status, JobStatus::Already);
        assert_eq!(h.balances.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.refuel.to = vec![Chain::Optimism];
        let settings = JobSettings::from_config(&config, true).unwrap();
        assert!(settings.dry_run);
        assert_eq!(settings.source, Chain::Avalanche);
        assert_eq!(settings.budget.max_filler_count, 2);
        assert_eq!(settings.budget.filler_min, ONE);
        let selector = settings.selectors[&Chain::Optimism];
        assert_eq!(selector.mode, AmountMode::Percentage(dec("95")));
        assert_eq!(selector.precision.min_places, Chain::Avalanche.valuable_decimals());
    }
}
