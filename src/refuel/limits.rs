use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::chain::Chain;

/// 桥对某条路线的金额上下限（micro 单位）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitPair {
    pub min: u128,
    pub max: u128,
}

impl LimitPair {
    pub fn new(min: u128, max: u128) -> Self {
        Self { min, max }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteLimit {
    Enabled(LimitPair),
    /// 路线未开放或链表中不存在。
    Disabled,
}

/// `/chains` 响应中单条源链信息。
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    #[serde(default)]
    pub name: String,
    pub chain_id: u64,
    #[serde(default)]
    pub limits: Vec<ChainLimitEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLimitEntry {
    pub chain_id: u64,
    #[serde(default)]
    pub is_enabled: bool,
    pub min_amount: String,
    pub max_amount: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitsError {
    #[error("source chain {0} not present in bridge chain list")]
    UnsupportedSource(Chain),
    #[error("limit `{field}`=`{value}` for destination chain id {chain_id} is not an integer")]
    BadAmount {
        chain_id: u64,
        field: &'static str,
        value: String,
    },
}

/// 启动时拉取一次的源链限额表，按目标链 ID 索引。
#[derive(Clone, Debug)]
pub struct RouteLimits {
    source: Chain,
    by_destination: HashMap<u64, RouteLimit>,
}

impl RouteLimits {
    pub fn from_chain_info(source: Chain, chains: &[ChainInfo]) -> Result<Self, LimitsError> {
        let info = chains
            .iter()
            .find(|info| info.chain_id == source.chain_id())
            .or_else(|| {
                chains
                    .iter()
                    .find(|info| info.name.eq_ignore_ascii_case(source.name()))
            })
            .ok_or(LimitsError::UnsupportedSource(source))?;

        let mut by_destination = HashMap::with_capacity(info.limits.len());
        for entry in &info.limits {
            // 重复条目以首条为准。
            if by_destination.contains_key(&entry.chain_id) {
                continue;
            }
            let limit = if entry.is_enabled {
                let min = parse_amount(entry.chain_id, "minAmount", &entry.min_amount)?;
                let max = parse_amount(entry.chain_id, "maxAmount", &entry.max_amount)?;
                RouteLimit::Enabled(LimitPair::new(min, max))
            } else {
                RouteLimit::Disabled
            };
            by_destination.insert(entry.chain_id, limit);
        }

        Ok(Self {
            source,
            by_destination,
        })
    }

    pub fn resolve(&self, source: Chain, destination: Chain) -> RouteLimit {
        if source != self.source {
            return RouteLimit::Disabled;
        }
        self.by_destination
            .get(&destination.chain_id())
            .copied()
            .unwrap_or(RouteLimit::Disabled)
    }
}

fn parse_amount(chain_id: u64, field: &'static str, value: &str) -> Result<u128, LimitsError> {
    value
        .trim()
        .parse::<u128>()
        .map_err(|_| LimitsError::BadAmount {
            chain_id,
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ChainInfo> {
        let raw = r#"[
            {
                "name": "Avalanche",
                "chainId": 43114,
                "limits": [
                    {"chainId": 10, "isEnabled": true, "minAmount": "300000000000000000", "maxAmount": "400000000000000000"},
                    {"chainId": 324, "isEnabled": false, "minAmount": "1", "maxAmount": "2"}
                ]
            },
            {"name": "Optimism", "chainId": 10, "limits": []}
        ]"#;
        serde_json::from_str(raw).expect("parse chain info")
    }

    #[test]
    fn resolves_enabled_route() {
        let limits = RouteLimits::from_chain_info(Chain::Avalanche, &sample()).unwrap();
        assert_eq!(
            limits.resolve(Chain::Avalanche, Chain::Optimism),
            RouteLimit::Enabled(LimitPair::new(
                300_000_000_000_000_000,
                400_000_000_000_000_000
            ))
        );
    }

    #[test]
    fn disabled_and_missing_routes_resolve_to_disabled() {
        let limits = RouteLimits::from_chain_info(Chain::Avalanche, &sample()).unwrap();
        assert_eq!(
            limits.resolve(Chain::Avalanche, Chain::ZkSync),
            RouteLimit::Disabled
        );
        assert_eq!(
            limits.resolve(Chain::Avalanche, Chain::Bsc),
            RouteLimit::Disabled
        );
        assert_eq!(
            limits.resolve(Chain::Optimism, Chain::Optimism),
            RouteLimit::Disabled
        );
    }

    #[test]
    fn unknown_source_is_rejected() {
        let err = RouteLimits::from_chain_info(Chain::Fantom, &sample()).unwrap_err();
        assert_eq!(err, LimitsError::UnsupportedSource(Chain::Fantom));
    }

    #[test]
    fn malformed_amount_is_schema_error() {
        let mut chains = sample();
        chains[0].limits[0].max_amount = "0.4".to_string();
        let err = RouteLimits::from_chain_info(Chain::Avalanche, &chains).unwrap_err();
        assert!(matches!(err, LimitsError::BadAmount { field: "maxAmount", .. }));
    }
}
