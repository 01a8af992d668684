//! worker 池：同一账户的所有任务固定在同一个 worker 上顺序执行。

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::chain::Chain;
use crate::monitoring::{JobOutcome, JobStatus, ResultSink};
use crate::refuel::RngSource;
use crate::wallet::AccountRow;

use super::job::{Job, JobRunner};
use super::scheduler::Scheduler;

/// 打乱账户后轮询分配；每个 worker 内部再打乱一次任务顺序。
pub fn assign_jobs(
    mut accounts: Vec<AccountRow>,
    destinations: &[Chain],
    workers: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<Job>> {
    let workers = workers.max(1);
    accounts.shuffle(rng);
    let mut batches: Vec<Vec<Job>> = vec![Vec::new(); workers];
    for (idx, account) in accounts.into_iter().enumerate() {
        let batch = &mut batches[idx % workers];
        for destination in destinations {
            batch.push(Job {
                account: account.clone(),
                destination: *destination,
            });
        }
    }
    for batch in &mut batches {
        batch.shuffle(rng);
    }
    batches.retain(|batch| !batch.is_empty());
    batches
}

pub struct WorkerPool {
    runner: Arc<JobRunner>,
    account_wait: Scheduler,
    sink: Option<ResultSink>,
}

impl WorkerPool {
    pub fn new(runner: Arc<JobRunner>, account_wait: Scheduler) -> Self {
        Self {
            runner,
            account_wait,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: ResultSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 等所有 worker 结束，返回各状态计数。
    pub async fn run(self, batches: Vec<Vec<Job>>) -> BTreeMap<JobStatus, usize> {
        let total: usize = batches.iter().map(Vec::len).sum();
        info!(
            target: "engine::pool",
            workers = batches.len(),
            jobs = total,
            "启动 worker"
        );

        let handles = batches
            .into_iter()
            .enumerate()
            .map(|(worker, batch)| {
                let runner = self.runner.clone();
                let sink = self.sink.clone();
                let account_wait = self.account_wait;
                tokio::spawn(async move {
                    run_worker(worker, batch, runner, account_wait, sink).await
                })
            })
            .collect::<Vec<_>>();

        let mut counts = BTreeMap::new();
        for result in join_all(handles).await {
            match result {
                Ok(worker_counts) => {
                    for (status, count) in worker_counts {
                        *counts.entry(status).or_default() += count;
                    }
                }
                Err(err) => {
                    warn!(target: "engine::pool", error = %err, "worker 异常退出");
                }
            }
        }
        counts
    }
}

async fn run_worker(
    worker: usize,
    batch: Vec<Job>,
    runner: Arc<JobRunner>,
    account_wait: Scheduler,
    sink: Option<ResultSink>,
) -> BTreeMap<JobStatus, usize> {
    let mut rng = RngSource(StdRng::from_os_rng());
    let mut counts = BTreeMap::new();
    for (idx, job) in batch.iter().enumerate() {
        if idx > 0 {
            account_wait.wait(&mut rng).await;
        }
        let status = runner.execute(job, worker, &mut rng).await;
        *counts.entry(status).or_default() += 1;
        if let Some(sink) = &sink {
            sink.record(JobOutcome {
                destination: job.destination,
                status,
                row: job.account.row.clone(),
            })
            .await;
        }
    }
    info!(target: "engine::pool", worker, jobs = batch.len(), "worker 完成");
    counts
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::amount::{AmountMode, AmountRange, AmountSelector, PrecisionBand};
    use crate::engine::job::JobSettings;
    use crate::engine::testing::{FakeBalances, FakeQuotes, ONE, RecordingExecutor, limits};
    use crate::monitoring::ResultWriter;
    use crate::monitoring::results::status_file;
    use crate::refuel::RandomBudget;

    fn accounts(count: usize) -> Vec<AccountRow> {
        (0..count)
            .map(|idx| {
                let raw = format!("0x{idx:040x}");
                AccountRow {
                    address: raw.parse().unwrap(),
                    row: raw,
                }
            })
            .collect()
    }

    #[test]
    fn every_account_stays_on_one_worker() {
        let mut rng = StdRng::seed_from_u64(7);
        let destinations = [Chain::Optimism, Chain::ZkSync];
        let batches = assign_jobs(accounts(10), &destinations, 3, &mut rng);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 20);

        let mut owner = HashMap::new();
        for (worker, batch) in batches.iter().enumerate() {
            for job in batch {
                let previous = owner.insert(job.account.address, worker);
                assert!(previous.is_none_or(|prev| prev == worker));
            }
        }
        assert_eq!(owner.len(), 10);
        // 10 个账户分 3 组：4/3/3。
        let mut sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![6, 6, 8]);
    }

    #[test]
    fn idle_workers_are_dropped() {
        let mut rng = StdRng::seed_from_u64(1);
        let batches = assign_jobs(accounts(2), &[Chain::Optimism], 5, &mut rng);
        assert_eq!(batches.len(), 2);
        assert!(assign_jobs(Vec::new(), &[Chain::Optimism], 2, &mut rng).is_empty());
    }

    #[tokio::test]
    async fn pool_runs_every_job_and_reports_results() {
        let selector = AmountSelector {
            mode: AmountMode::Range,
            range: AmountRange {
                min: rust_decimal::Decimal::new(35, 2),
                max: rust_decimal::Decimal::new(35, 2),
            },
            precision: PrecisionBand {
                min_places: 2,
                extra_places: 0,
            },
            decimals: 18,
        };
        let settings = Arc::new(JobSettings {
            source: Chain::Avalanche,
            selectors: BTreeMap::from([(Chain::Optimism, selector)]),
            budget: RandomBudget::NONE,
            tx_wait: Scheduler::NONE,
            dry_run: false,
        });
        let executor = Arc::new(RecordingExecutor::default());
        let runner = Arc::new(JobRunner::new(
            settings,
            limits("300000000000000000", "400000000000000000"),
            Arc::new(FakeQuotes { allowed: true }),
            Arc::new(FakeBalances {
                balance: ONE,
                calls: AtomicUsize::new(0),
            }),
            executor.clone(),
        ));

        let tmp = tempfile::tempdir().unwrap();
        let (sink, writer) = ResultWriter::spawn(tmp.path().to_path_buf(), &[Chain::Optimism]);
        let mut rng = StdRng::seed_from_u64(3);
        let batches = assign_jobs(accounts(4), &[Chain::Optimism], 2, &mut rng);

        let counts = WorkerPool::new(runner, Scheduler::NONE)
            .with_sink(sink)
            .run(batches)
            .await;
        assert_eq!(counts.get(&JobStatus::Success), Some(&4));

        let summary = writer.await.unwrap();
        assert_eq!(summary.failed_writes, 0);
        assert_eq!(summary.count(JobStatus::Success), 4);
        let rows = std::fs::read_to_string(status_file(
            tmp.path(),
            Chain::Optimism,
            JobStatus::Success,
        ))
        .unwrap();
        assert_eq!(rows.lines().count(), 4);
        // 0.35 在 [0.3, 0.4] 内，每个账户一笔。
        assert_eq!(executor.calls.lock().unwrap().len(), 4);
    }
}
