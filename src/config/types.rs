use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::Deserializer;

use crate::amount::{AmountMode, AmountRange};
use crate::chain::Chain;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub refuel: RefuelConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// 链名 -> RPC 地址，未配置的链使用内置地址。
    #[serde(default)]
    pub rpc_urls: BTreeMap<Chain, String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GlobalConfig {
    pub fn rpc_url(&self, chain: Chain) -> &str {
        self.rpc_urls
            .get(&chain)
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| chain.default_rpc_url())
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingProfile {
    #[default]
    Lean,
    Verbose,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "super::default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "super::default_logging_profile")]
    pub profile: LoggingProfile,
    #[serde(default = "super::default_timezone_offset_hours")]
    pub timezone_offset_hours: i8,
}

/// 十进制金额区间，支持 `{ min = .., max = .. }` 或 `[min, max]` 两种写法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl From<DecimalRange> for AmountRange {
    fn from(range: DecimalRange) -> Self {
        AmountRange {
            min: range.min,
            max: range.max,
        }
    }
}

impl<'de> Deserialize<'de> for DecimalRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RangeField {
            Table { min: Decimal, max: Decimal },
            Pair((Decimal, Decimal)),
        }

        Ok(match RangeField::deserialize(deserializer)? {
            RangeField::Table { min, max } | RangeField::Pair((min, max)) => {
                DecimalRange { min, max }
            }
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefuelConfig {
    #[serde(default = "super::default_refuel_from")]
    pub from: Chain,
    #[serde(default = "super::default_refuel_to")]
    pub to: Vec<Chain>,
    /// 大于 0 时按余额百分比发送，为 0 时使用金额区间。
    #[serde(default = "super::default_amount_percentage")]
    pub amount_percentage: Decimal,
    #[serde(default = "super::default_amount_range")]
    pub default_range: DecimalRange,
    #[serde(default)]
    pub range_by_chain: BTreeMap<Chain, DecimalRange>,
    #[serde(default = "super::default_max_random_tx_count")]
    pub max_random_tx_count: u32,
    #[serde(default = "super::default_random_tx_min_amount")]
    pub random_tx_min_amount: Decimal,
    /// 覆盖源链默认的最少保留小数位。
    #[serde(default)]
    pub valuable_decimals: Option<u32>,
    #[serde(default = "super::default_extra_precision")]
    pub extra_precision: u32,
    /// 配置上限超过桥上限时，是否允许拆成多笔交易。
    #[serde(default)]
    pub allow_multi_tx: bool,
}

impl RefuelConfig {
    pub fn range_for(&self, chain: Chain) -> DecimalRange {
        self.range_by_chain
            .get(&chain)
            .copied()
            .unwrap_or(self.default_range)
    }

    pub fn amount_mode(&self) -> AmountMode {
        if self.amount_percentage.is_zero() {
            AmountMode::Range
        } else {
            AmountMode::Percentage(self.amount_percentage)
        }
    }

    pub fn valuable_decimals(&self) -> u32 {
        self.valuable_decimals
            .unwrap_or_else(|| self.from.valuable_decimals())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct WaitRange {
    pub min: f64,
    pub max: f64,
}

impl WaitRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// 同一账户两笔交易之间的等待（秒）。
    #[serde(default = "super::default_tx_wait_secs")]
    pub tx_wait_secs: WaitRange,
    /// 同一 worker 两个任务之间的等待（分钟）。
    #[serde(default = "super::default_account_wait_mins")]
    pub account_wait_mins: WaitRange,
    #[serde(default = "super::default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "super::default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
}

impl TimingConfig {
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "super::default_prometheus_listen")]
    pub listen: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "super::default_workers")]
    pub workers: usize,
    #[serde(default = "super::default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "super::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "super::default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

impl BotConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "super::default_accounts_path")]
    pub accounts: PathBuf,
    #[serde(default = "super::default_results_dir")]
    pub results_dir: PathBuf,
    /// 之前一次运行的结果目录，其中 SUCCESS 的账户直接记为 ALREADY。
    #[serde(default)]
    pub skip_completed_from: Option<PathBuf>,
}
