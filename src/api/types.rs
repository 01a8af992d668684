use serde::Deserialize;
use serde::de::Error as _;
use serde_json::Value;

use crate::refuel::ChainInfo;
use crate::wallet::Address;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotePayload {
    contract_address: String,
    #[serde(default)]
    estimated_time: u64,
}

/// 单次报价结论。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefuelQuote {
    pub allowed: bool,
    pub contract_address: Address,
    pub estimated_time_ms: u64,
}

impl RefuelQuote {
    pub fn denied() -> Self {
        Self {
            allowed: false,
            contract_address: Address::ZERO,
            estimated_time_ms: 0,
        }
    }

    /// `success = false` 视为不允许，此时 `result` 可能是错误字符串。
    pub fn try_from_value(value: Value) -> Result<Self, serde_json::Error> {
        if !is_success(&value) {
            return Ok(Self::denied());
        }
        let payload: QuotePayload =
            serde_json::from_value(value.get("result").cloned().unwrap_or(Value::Null))?;
        let contract_address = payload
            .contract_address
            .parse::<Address>()
            .map_err(serde_json::Error::custom)?;
        Ok(Self {
            allowed: true,
            contract_address,
            estimated_time_ms: payload.estimated_time,
        })
    }
}

/// 解析 `/chains` 响应；`success = false` 返回 `None`。
pub fn parse_chains(value: Value) -> Result<Option<Vec<ChainInfo>>, serde_json::Error> {
    if !is_success(&value) {
        return Ok(None);
    }
    serde_json::from_value(value.get("result").cloned().unwrap_or(Value::Null)).map(Some)
}

fn is_success(value: &Value) -> bool {
    value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
