use std::path::PathBuf;

use rust_decimal::Decimal;

pub mod loader;
pub mod types;
pub mod validate;

pub use loader::*;
pub use types::*;

use crate::chain::Chain;

use self::types as cfg;

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

pub(crate) fn default_logging_profile() -> cfg::LoggingProfile {
    cfg::LoggingProfile::Lean
}

pub(crate) fn default_timezone_offset_hours() -> i8 {
    0
}

pub(crate) fn default_refuel_from() -> Chain {
    Chain::Avalanche
}

pub(crate) fn default_refuel_to() -> Vec<Chain> {
    vec![Chain::Optimism, Chain::ZkSync]
}

pub(crate) fn default_amount_percentage() -> Decimal {
    Decimal::from(95)
}

pub(crate) fn default_amount_range() -> cfg::DecimalRange {
    cfg::DecimalRange {
        min: Decimal::new(35, 2),
        max: Decimal::new(35, 2),
    }
}

pub(crate) fn default_max_random_tx_count() -> u32 {
    2
}

pub(crate) fn default_random_tx_min_amount() -> Decimal {
    Decimal::ONE
}

pub(crate) fn default_extra_precision() -> u32 {
    2
}

pub(crate) fn default_tx_wait_secs() -> cfg::WaitRange {
    cfg::WaitRange::new(6.0, 12.0)
}

pub(crate) fn default_account_wait_mins() -> cfg::WaitRange {
    cfg::WaitRange::new(0.5, 1.5)
}

pub(crate) fn default_receipt_timeout_secs() -> u64 {
    180
}

pub(crate) fn default_receipt_poll_ms() -> u64 {
    2_000
}

pub(crate) fn default_prometheus_listen() -> String {
    "0.0.0.0:9898".to_string()
}

pub(crate) fn default_workers() -> usize {
    1
}

pub(crate) fn default_max_tries() -> u32 {
    3
}

pub(crate) fn default_request_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_api_base() -> String {
    "https://refuel.socket.tech".to_string()
}

pub(crate) fn default_accounts_path() -> PathBuf {
    PathBuf::from("files/wallets.txt")
}

pub(crate) fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for cfg::AppConfig {
    fn default() -> Self {
        Self {
            global: cfg::GlobalConfig::default(),
            refuel: cfg::RefuelConfig::default(),
            timing: cfg::TimingConfig::default(),
            bot: cfg::BotConfig::default(),
            files: cfg::FilesConfig::default(),
        }
    }
}

impl Default for cfg::GlobalConfig {
    fn default() -> Self {
        Self {
            rpc_urls: Default::default(),
            proxy: None,
            logging: cfg::LoggingConfig::default(),
        }
    }
}

impl Default for cfg::LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
            profile: default_logging_profile(),
            timezone_offset_hours: default_timezone_offset_hours(),
        }
    }
}

impl Default for cfg::RefuelConfig {
    fn default() -> Self {
        Self {
            from: default_refuel_from(),
            to: default_refuel_to(),
            amount_percentage: default_amount_percentage(),
            default_range: default_amount_range(),
            range_by_chain: Default::default(),
            max_random_tx_count: default_max_random_tx_count(),
            random_tx_min_amount: default_random_tx_min_amount(),
            valuable_decimals: None,
            extra_precision: default_extra_precision(),
            allow_multi_tx: false,
        }
    }
}

impl Default for cfg::TimingConfig {
    fn default() -> Self {
        Self {
            tx_wait_secs: default_tx_wait_secs(),
            account_wait_mins: default_account_wait_mins(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            receipt_poll_ms: default_receipt_poll_ms(),
        }
    }
}

impl Default for cfg::PrometheusConfig {
    fn default() -> Self {
        Self {
            enable: false,
            listen: default_prometheus_listen(),
        }
    }
}

impl Default for cfg::BotConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_tries: default_max_tries(),
            request_timeout_ms: default_request_timeout_ms(),
            api_base: default_api_base(),
            dry_run: false,
            prometheus: cfg::PrometheusConfig::default(),
        }
    }
}

impl Default for cfg::FilesConfig {
    fn default() -> Self {
        Self {
            accounts: default_accounts_path(),
            results_dir: default_results_dir(),
            skip_completed_from: None,
        }
    }
}
