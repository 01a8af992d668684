//! 启动校验：任何一项失败都会在处理账户之前终止运行。

use rust_decimal::Decimal;
use tracing::warn;

use crate::amount::{from_micro, to_micro};
use crate::refuel::{LimitPair, RouteLimit, RouteLimits};

use super::{AppConfig, ConfigError};

/// 与桥限额无关的配置检查。
pub fn validate_static(config: &AppConfig) -> Result<(), ConfigError> {
    let refuel = &config.refuel;

    if refuel.to.is_empty() {
        return Err(ConfigError::invalid("refuel.to 为空"));
    }
    if let Some(chain) = refuel.to.iter().find(|chain| **chain == refuel.from) {
        return Err(ConfigError::invalid(format!(
            "refuel.to 包含源链 {chain}"
        )));
    }
    if refuel.amount_percentage < Decimal::ZERO || refuel.amount_percentage > Decimal::ONE_HUNDRED
    {
        return Err(ConfigError::invalid(format!(
            "amount_percentage {} 不在 0..=100",
            refuel.amount_percentage
        )));
    }
    if refuel.random_tx_min_amount < Decimal::ZERO {
        return Err(ConfigError::invalid("random_tx_min_amount 不能为负"));
    }
    for chain in &refuel.to {
        let range = refuel.range_for(*chain);
        if range.min < Decimal::ZERO || range.min > range.max {
            return Err(ConfigError::invalid(format!(
                "min amount > max amount for {chain} in config"
            )));
        }
    }
    if !config.timing.tx_wait_secs.is_valid() {
        return Err(ConfigError::invalid("timing.tx_wait_secs 区间非法"));
    }
    if !config.timing.account_wait_mins.is_valid() {
        return Err(ConfigError::invalid("timing.account_wait_mins 区间非法"));
    }
    if config.bot.workers == 0 {
        return Err(ConfigError::invalid("bot.workers 必须大于 0"));
    }
    if config.bot.max_tries == 0 {
        return Err(ConfigError::invalid("bot.max_tries 必须大于 0"));
    }
    url::Url::parse(&config.bot.api_base).map_err(|err| {
        ConfigError::invalid(format!("bot.api_base 无效 {}: {err}", config.bot.api_base))
    })?;
    for chain in std::iter::once(&refuel.from).chain(refuel.to.iter()) {
        let rpc = config.global.rpc_url(*chain);
        url::Url::parse(rpc)
            .map_err(|err| ConfigError::invalid(format!("{chain} RPC 地址无效 {rpc}: {err}")))?;
    }

    Ok(())
}

/// 按拉取到的桥限额检查每条目标路线。
pub fn validate_routes(config: &AppConfig, limits: &RouteLimits) -> Result<(), ConfigError> {
    let refuel = &config.refuel;
    let decimals = refuel.from.decimals();
    let token = refuel.from.native_token();
    let to_micro_checked = |value: Decimal| {
        to_micro(value, decimals).map_err(|err| ConfigError::invalid(err.to_string()))
    };
    let display = |micro: u128| {
        from_micro(micro, decimals)
            .map(|value| value.to_string())
            .unwrap_or_else(|_| micro.to_string())
    };

    let filler_min = to_micro_checked(refuel.random_tx_min_amount)?;

    for chain in &refuel.to {
        let LimitPair {
            min: min_limit,
            max: max_limit,
        } = match limits.resolve(refuel.from, *chain) {
            RouteLimit::Enabled(pair) => pair,
            RouteLimit::Disabled => {
                return Err(ConfigError::invalid(format!(
                    "refuel from {} to {chain} is not enabled",
                    refuel.from
                )));
            }
        };
        if min_limit > max_limit || max_limit == 0 {
            return Err(ConfigError::invalid(format!(
                "bridge limits for {chain} are inconsistent: min {min_limit} max {max_limit}"
            )));
        }

        let range = refuel.range_for(*chain);
        let min_amount = to_micro_checked(range.min)?;
        let max_amount = to_micro_checked(range.max)?;

        if refuel.max_random_tx_count > 0 && filler_min < min_limit {
            return Err(ConfigError::invalid(format!(
                "random tx min amount is lower than refuel to {chain} min value {} ${token}",
                display(min_limit)
            )));
        }
        if min_amount < min_limit {
            return Err(ConfigError::invalid(format!(
                "min amount for {chain} in config is lower than refuel min value {} ${token}",
                display(min_limit)
            )));
        }
        if max_amount > max_limit {
            if !refuel.allow_multi_tx {
                return Err(ConfigError::invalid(format!(
                    "max amount for {chain} in config is greater than refuel max value {} ${token}; \
                     set refuel.allow_multi_tx = true to split into multiple transactions",
                    display(max_limit)
                )));
            }
            warn!(
                target: "config",
                destination = %chain,
                max_limit = %display(max_limit),
                "配置上限超过桥上限，将拆分为多笔交易"
            );
        }
    }

    Ok(())
}
