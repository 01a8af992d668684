use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::debug;

use crate::chain::Chain;

use super::metrics::prometheus_enabled;

/// 耗时统计的标签：阶段名，以及涉及的链（API 请求没有）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLabels {
    pub stage: &'static str,
    pub chain: Option<Chain>,
}

impl StageLabels {
    pub fn api(stage: &'static str) -> Self {
        Self { stage, chain: None }
    }

    pub fn chain(stage: &'static str, chain: Chain) -> Self {
        Self {
            stage,
            chain: Some(chain),
        }
    }

    fn chain_name(&self) -> &'static str {
        self.chain.map_or("-", Chain::name)
    }
}

/// 未调用 `finish` 就被丢弃时按 `cancelled` 记录。
#[derive(Debug)]
pub struct StageTimer {
    labels: StageLabels,
    start: Instant,
    finished: bool,
}

impl StageTimer {
    pub fn start(labels: StageLabels) -> Self {
        Self {
            labels,
            start: Instant::now(),
            finished: false,
        }
    }

    pub fn finish(mut self, outcome: &'static str) -> Duration {
        self.finished = true;
        let elapsed = self.start.elapsed();
        record_stage(self.labels, outcome, elapsed);
        elapsed
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        if !self.finished {
            record_stage(self.labels, "cancelled", self.start.elapsed());
        }
    }
}

fn record_stage(labels: StageLabels, outcome: &'static str, elapsed: Duration) {
    let elapsed_ms = elapsed.as_secs_f64() * 1_000.0;
    debug!(
        target: "latency",
        stage = labels.stage,
        chain = labels.chain_name(),
        outcome,
        elapsed_ms = %format!("{elapsed_ms:.3}"),
        "耗时统计"
    );

    if prometheus_enabled() {
        counter!(
            "refueler_stage_total",
            "stage" => labels.stage,
            "chain" => labels.chain_name(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!(
            "refueler_stage_latency_ms",
            "stage" => labels.stage,
            "chain" => labels.chain_name(),
            "outcome" => outcome
        )
        .record(elapsed_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_the_chain() {
        assert_eq!(StageLabels::api("quote").chain_name(), "-");
        assert_eq!(
            StageLabels::chain("deposit", Chain::Avalanche).chain_name(),
            "Avalanche"
        );
    }

    #[test]
    fn finish_returns_elapsed() {
        let timer = StageTimer::start(StageLabels::api("chains"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.finish("ok") >= Duration::from_millis(2));
    }
}
