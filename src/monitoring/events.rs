use std::time::Duration;

use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::chain::Chain;
use crate::refuel::TransferPlan;
use crate::wallet::Address;

use super::format::short_address;
use super::metrics::prometheus_enabled;
use super::results::JobStatus;

pub fn job_started(account: &Address, destination: Chain, worker: usize) {
    info!(
        target: "monitoring::job",
        event = "start",
        account = %short_address(account),
        destination = %destination,
        worker,
        "开始处理任务"
    );
}

pub fn plan_built(account: &Address, destination: Chain, plan: &TransferPlan) {
    let kinds = plan
        .chunks()
        .iter()
        .map(|chunk| chunk.kind.as_str())
        .collect::<Vec<_>>()
        .join(",");
    info!(
        target: "monitoring::job",
        event = "plan",
        account = %short_address(account),
        destination = %destination,
        chunks = plan.len(),
        fillers = plan.filler_count(),
        kinds = %kinds,
        "拆单完成"
    );

    if prometheus_enabled() {
        histogram!(
            "refueler_plan_chunks",
            "destination" => destination.name()
        )
        .record(plan.len() as f64);
    }
}

pub fn deposit_confirmed(
    account: &Address,
    destination: Chain,
    index: usize,
    total: usize,
    link: &str,
) {
    info!(
        target: "monitoring::deposit",
        event = "confirmed",
        account = %short_address(account),
        destination = %destination,
        index = index + 1,
        total,
        link,
        "存款交易成功"
    );
    record_deposit(destination, "success");
}

pub fn deposit_failed(
    account: &Address,
    destination: Chain,
    index: usize,
    total: usize,
    error: &dyn std::fmt::Display,
) {
    warn!(
        target: "monitoring::deposit",
        event = "failed",
        account = %short_address(account),
        destination = %destination,
        index = index + 1,
        total,
        error = %error,
        "存款交易失败"
    );
    record_deposit(destination, "failed");
}

pub fn job_finished(
    account: &Address,
    destination: Chain,
    status: JobStatus,
    elapsed: Duration,
    estimated_arrival: Option<Duration>,
) {
    info!(
        target: "monitoring::job",
        event = "finish",
        account = %short_address(account),
        destination = %destination,
        status = status.as_str(),
        elapsed_ms = elapsed.as_millis() as u64,
        estimated_arrival_secs = estimated_arrival.map(|value| value.as_secs()),
        "任务结束"
    );

    if prometheus_enabled() {
        counter!(
            "refueler_jobs_total",
            "destination" => destination.name(),
            "status" => status.as_str()
        )
        .increment(1);
    }
}

fn record_deposit(destination: Chain, result: &'static str) {
    if prometheus_enabled() {
        counter!(
            "refueler_deposits_total",
            "destination" => destination.name(),
            "result" => result
        )
        .increment(1);
    }
}
