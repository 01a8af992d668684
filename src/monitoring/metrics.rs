//! Prometheus 导出。未启用时各处的指标调用直接跳过。

use std::net::{AddrParseError, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{Unit, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::info;

use crate::config::PrometheusConfig;

static EXPORTER: OnceCell<SocketAddr> = OnceCell::new();
static PROMETHEUS_ENABLED: AtomicBool = AtomicBool::new(false);

const CHUNK_BUCKETS: &[f64] = &[1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0, 16.0];
const STAGE_LATENCY_BUCKETS_MS: &[f64] = &[
    50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 15_000.0, 60_000.0, 180_000.0,
];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid prometheus listen address `{listen}`: {source}")]
    Listen {
        listen: String,
        #[source]
        source: AddrParseError,
    },
    #[error("failed to install prometheus exporter: {0}")]
    Install(#[from] BuildError),
}

/// 只安装一次；重复调用返回首次监听的地址。
pub fn try_init_prometheus(config: &PrometheusConfig) -> Result<SocketAddr, MetricsError> {
    EXPORTER
        .get_or_try_init(|| {
            let addr = parse_listen(&config.listen)?;
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .set_buckets_for_metric(
                    Matcher::Full("refueler_plan_chunks".to_string()),
                    CHUNK_BUCKETS,
                )?
                .set_buckets_for_metric(
                    Matcher::Full("refueler_stage_latency_ms".to_string()),
                    STAGE_LATENCY_BUCKETS_MS,
                )?
                .install()?;
            describe_metrics();
            PROMETHEUS_ENABLED.store(true, Ordering::Relaxed);
            info!(target: "monitoring::metrics", listen = %addr, "Prometheus 导出已启动");
            Ok(addr)
        })
        .copied()
}

pub fn prometheus_enabled() -> bool {
    PROMETHEUS_ENABLED.load(Ordering::Relaxed)
}

fn parse_listen(listen: &str) -> Result<SocketAddr, MetricsError> {
    listen.parse().map_err(|source| MetricsError::Listen {
        listen: listen.to_string(),
        source,
    })
}

fn describe_metrics() {
    describe_counter!(
        "refueler_jobs_total",
        "Finished refuel jobs by destination and status"
    );
    describe_counter!(
        "refueler_deposits_total",
        "Deposit transactions by destination and result"
    );
    describe_counter!(
        "refueler_stage_total",
        "API and RPC stages by stage, chain and outcome"
    );
    describe_histogram!(
        "refueler_plan_chunks",
        Unit::Count,
        "Deposits planned per job"
    );
    describe_histogram!(
        "refueler_stage_latency_ms",
        Unit::Milliseconds,
        "Latency of API and RPC stages"
    );
}
