//! 可观测性：结构化事件、Prometheus 指标、耗时统计与结果落盘。

pub mod events;
mod format;
pub mod latency;
pub mod metrics;
pub mod results;
pub mod types;

pub use format::short_address;
pub use latency::*;
pub use metrics::{MetricsError, try_init_prometheus};
pub use results::{CompletedSet, JobOutcome, JobStatus, ResultSink, ResultSummary, ResultWriter};
pub use types::*;
