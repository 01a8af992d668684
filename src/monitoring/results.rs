//! 结果落盘：`<results_dir>/<dd-mm-YYYY-HH-MM-SS>/to_<Chain>/<STATUS>.txt`。
//!
//! 所有 worker 通过 flume 通道把结果交给同一个写入任务。

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::chain::Chain;
use crate::wallet::{Address, parse_accounts};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    Already,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Already => "ALREADY",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOutcome {
    pub destination: Chain,
    pub status: JobStatus,
    pub row: String,
}

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("failed to write results file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to format results directory name: {0}")]
    Format(#[from] time::error::Format),
}

pub fn run_directory(base: &Path, now: OffsetDateTime) -> Result<PathBuf, ResultsError> {
    let format = format_description!("[day]-[month]-[year]-[hour]-[minute]-[second]");
    Ok(base.join(now.format(format)?))
}

pub fn destination_dir(run_dir: &Path, destination: Chain) -> PathBuf {
    run_dir.join(format!("to_{}", destination.name()))
}

pub fn status_file(run_dir: &Path, destination: Chain, status: JobStatus) -> PathBuf {
    destination_dir(run_dir, destination).join(format!("{}.txt", status.as_str()))
}

/// 各状态成功写入的行数，以及写入失败的次数。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub counts: BTreeMap<JobStatus, usize>,
    pub failed_writes: usize,
}

impl ResultSummary {
    pub fn count(&self, status: JobStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// worker 侧句柄，可随意克隆。
#[derive(Clone, Debug)]
pub struct ResultSink {
    sender: flume::Sender<JobOutcome>,
}

impl ResultSink {
    pub async fn record(&self, outcome: JobOutcome) {
        if let Err(err) = self.sender.send_async(outcome).await {
            warn!(
                target: "monitoring::results",
                row = %err.0.row,
                "结果写入任务已退出，丢弃结果"
            );
        }
    }
}

pub struct ResultWriter;

impl ResultWriter {
    /// 先建好各目标链目录；单条写入失败只记录，继续处理后续结果。
    /// 所有 `ResultSink` 释放后写入任务结束并返回汇总。
    pub fn spawn(
        run_dir: PathBuf,
        destinations: &[Chain],
    ) -> (ResultSink, JoinHandle<ResultSummary>) {
        let (sender, receiver) = flume::unbounded::<JobOutcome>();
        let destinations = destinations.to_vec();
        let handle = tokio::spawn(async move {
            for destination in destinations {
                let dir = destination_dir(&run_dir, destination);
                if let Err(err) = tokio::fs::create_dir_all(&dir).await {
                    warn!(
                        target: "monitoring::results",
                        path = %dir.display(),
                        error = %err,
                        "无法创建结果目录"
                    );
                }
            }

            let mut summary = ResultSummary::default();
            while let Ok(outcome) = receiver.recv_async().await {
                match append_line(&run_dir, &outcome).await {
                    Ok(()) => *summary.counts.entry(outcome.status).or_default() += 1,
                    Err(err) => {
                        summary.failed_writes += 1;
                        error!(
                            target: "monitoring::results",
                            status = outcome.status.as_str(),
                            row = %outcome.row,
                            error = %err,
                            "结果写入失败"
                        );
                    }
                }
            }
            summary
        });
        (ResultSink { sender }, handle)
    }
}

async fn append_line(run_dir: &Path, outcome: &JobOutcome) -> Result<(), ResultsError> {
    let path = status_file(run_dir, outcome.destination, outcome.status);
    let io_err = |source| ResultsError::Io {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(io_err)?;
    file.write_all(format!("{}\n", outcome.row).as_bytes())
        .await
        .map_err(io_err)?;
    debug!(
        target: "monitoring::results",
        path = %path.display(),
        status = outcome.status.as_str(),
        "结果已写入"
    );
    Ok(())
}

/// 之前一次运行中已经成功的 (目标链, 地址)。
#[derive(Clone, Debug, Default)]
pub struct CompletedSet {
    entries: HashSet<(Chain, Address)>,
}

impl CompletedSet {
    /// 缺失或无法解析的文件视为空。
    pub fn load(run_dir: &Path, destinations: &[Chain]) -> Self {
        let mut entries = HashSet::new();
        for destination in destinations {
            let path = status_file(run_dir, *destination, JobStatus::Success);
            let Ok(contents) = std::fs::read_to_string(&path) else {
                continue;
            };
            match parse_accounts(&contents) {
                Ok(rows) => {
                    entries.extend(rows.into_iter().map(|row| (*destination, row.address)));
                }
                Err(err) => {
                    warn!(
                        target: "monitoring::results",
                        path = %path.display(),
                        error = %err,
                        "无法解析历史结果，忽略"
                    );
                }
            }
        }
        Self { entries }
    }

    pub fn contains(&self, destination: Chain, address: &Address) -> bool {
        self.entries.contains(&(destination, *address))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
