use std::sync::Arc;

use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::amount::{from_micro, to_micro};
use crate::api::RefuelApiClient;
use crate::chain::Chain;
use crate::cli::args::PlanCmd;
use crate::cli::context::log_offset;
use crate::config::AppConfig;
use crate::config::validate::{validate_routes, validate_static};
use crate::engine::{JobRunner, JobSettings, Scheduler, WorkerPool, assign_jobs};
use crate::monitoring::results::run_directory;
use crate::monitoring::{CompletedSet, JobStatus, ResultWriter};
use crate::network::{RetryPolicy, build_http_client};
use crate::refuel::{LimitPair, RandomBudget, RngSource, RouteLimit, TransferPlan, TransferPlanner};
use crate::rpc::EvmRpcClient;
use crate::wallet::load_accounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefuelMode {
    Live,
    DryRun,
}

fn api_client(config: &AppConfig) -> Result<(RefuelApiClient, reqwest::Client, RetryPolicy)> {
    let http = build_http_client(config.global.proxy(), config.bot.request_timeout())?;
    let retry = RetryPolicy::new(config.bot.max_tries);
    let api = RefuelApiClient::new(http.clone(), config.bot.api_base.clone(), retry);
    Ok((api, http, retry))
}

pub async fn run_refuel(config: &AppConfig, mode: RefuelMode) -> Result<()> {
    validate_static(config)?;

    let accounts = load_accounts(&config.files.accounts)?;
    if accounts.is_empty() {
        warn!(
            target: "runner",
            path = %config.files.accounts.display(),
            "账户文件为空，无需处理"
        );
        return Ok(());
    }

    let source = config.refuel.from;
    let (api, http, retry) = api_client(config)?;
    let limits = api.route_limits(source).await?;
    validate_routes(config, &limits)?;

    let rpc = Arc::new(
        EvmRpcClient::new(source, config.global.rpc_url(source), http, retry)?
            .with_receipt_wait(
                config.timing.receipt_timeout(),
                config.timing.receipt_poll_interval(),
            ),
    );
    let settings = JobSettings::from_config(config, mode == RefuelMode::DryRun)?;
    let dry_run = settings.dry_run;
    let completed = match &config.files.skip_completed_from {
        Some(dir) => {
            let completed = CompletedSet::load(dir, &config.refuel.to);
            info!(
                target: "runner",
                dir = %dir.display(),
                completed = completed.len(),
                "已加载历史成功记录"
            );
            completed
        }
        None => CompletedSet::default(),
    };
    let runner = JobRunner::new(
        Arc::new(settings),
        Arc::new(limits),
        Arc::new(api),
        rpc.clone(),
        rpc,
    )
    .with_completed(Arc::new(completed));

    let account_count = accounts.len();
    let batches = assign_jobs(
        accounts,
        &config.refuel.to,
        config.bot.workers,
        &mut rand::rng(),
    );
    let mut pool = WorkerPool::new(
        Arc::new(runner),
        Scheduler::from_mins(config.timing.account_wait_mins),
    );

    let writer = if dry_run {
        None
    } else {
        let offset = log_offset(&config.global.logging)?;
        let run_dir = run_directory(
            &config.files.results_dir,
            OffsetDateTime::now_utc().to_offset(offset),
        )?;
        let (sink, handle) = ResultWriter::spawn(run_dir.clone(), &config.refuel.to);
        pool = pool.with_sink(sink);
        Some((run_dir, handle))
    };

    info!(
        target: "runner",
        source = %source,
        destinations = ?config.refuel.to,
        accounts = account_count,
        dry_run,
        "开始 refuel"
    );

    let counts = tokio::select! {
        counts = pool.run(batches) => counts,
        _ = tokio::signal::ctrl_c() => {
            info!(target: "runner", "收到终止信号，停止运行");
            return Ok(());
        }
    };

    if let Some((run_dir, handle)) = writer {
        let summary = handle.await?;
        info!(
            target: "runner",
            dir = %run_dir.display(),
            written = summary.total(),
            "结果已写入"
        );
        if summary.failed_writes > 0 {
            warn!(
                target: "runner",
                dir = %run_dir.display(),
                failed = summary.failed_writes,
                "部分结果写入失败，请查看日志"
            );
        }
    }
    let count = |status: JobStatus| counts.get(&status).copied().unwrap_or_default();
    info!(
        target: "runner",
        success = count(JobStatus::Success),
        already = count(JobStatus::Already),
        failed = count(JobStatus::Failed),
        "全部任务结束"
    );
    Ok(())
}

pub async fn print_limits(config: &AppConfig) -> Result<()> {
    let source = config.refuel.from;
    let (api, _, _) = api_client(config)?;
    let limits = api.route_limits(source).await?;
    let decimals = source.decimals();
    let token = source.native_token();

    for destination in Chain::ALL.into_iter().filter(|chain| *chain != source) {
        let configured = if config.refuel.to.contains(&destination) {
            "*"
        } else {
            " "
        };
        match limits.resolve(source, destination) {
            RouteLimit::Enabled(LimitPair { min, max }) => println!(
                "{configured} {source} -> {destination}: min {} {token}, max {} {token}",
                from_micro(min, decimals)?,
                from_micro(max, decimals)?,
            ),
            RouteLimit::Disabled => println!("{configured} {source} -> {destination}: disabled"),
        }
    }
    Ok(())
}

pub fn preview_plan(config: &AppConfig, args: PlanCmd) -> Result<()> {
    let decimals = config.refuel.from.decimals();
    let token = config.refuel.from.native_token();
    let plan = build_preview(&args, decimals)?;

    for (idx, chunk) in plan.chunks().iter().enumerate() {
        println!(
            "#{:<2} {:>24} {token}  ({})",
            idx + 1,
            from_micro(chunk.amount, decimals)?,
            chunk.kind.as_str()
        );
    }
    println!(
        "total {} {token} in {} deposit(s), {} filler(s)",
        from_micro(plan.total(), decimals)?,
        plan.len(),
        plan.filler_count()
    );
    Ok(())
}

/// `--fillers` 直接作为本次预览的填充上限，不再随机抽取。
fn build_preview(args: &PlanCmd, decimals: u32) -> Result<TransferPlan> {
    let min = to_micro(args.min, decimals)?;
    let max = to_micro(args.max, decimals)?;
    let total = to_micro(args.total, decimals)?;
    let filler_min = to_micro(args.filler_min.unwrap_or(args.min), decimals)?;

    let planner = TransferPlanner::new(
        LimitPair::new(min, max),
        RandomBudget {
            max_filler_count: args.fillers,
            filler_min,
        },
    )?;
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    planner
        .plan(total, &mut RngSource(rng))
        .map_err(|err| anyhow!(err))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn args(total: &str, fillers: u32) -> PlanCmd {
        PlanCmd {
            total: Decimal::from_str(total).unwrap(),
            min: Decimal::from_str("0.3").unwrap(),
            max: Decimal::from_str("0.4").unwrap(),
            fillers,
            filler_min: None,
            seed: Some(42),
        }
    }

    #[test]
    fn preview_matches_planner() {
        let plan = build_preview(&args("1", 0), 18).unwrap();
        assert_eq!(
            plan.amounts(),
            vec![
                400_000_000_000_000_000,
                300_000_000_000_000_000,
                300_000_000_000_000_000
            ]
        );
    }

    #[test]
    fn seeded_preview_is_reproducible() {
        let first = build_preview(&args("2.5", 3), 18).unwrap();
        let second = build_preview(&args("2.5", 3), 18).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total(), 2_500_000_000_000_000_000);
        assert!(first.filler_count() <= 3);
    }

    #[test]
    fn preview_rejects_total_below_minimum() {
        assert!(build_preview(&args("0.1", 0), 18).is_err());
    }
}
