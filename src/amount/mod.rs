//! 金额换算与请求金额选择。
//!
//! 链上金额统一使用 micro（最小单位，`u128`），配置与日志使用 `Decimal`。

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::debug;

use crate::refuel::RandomSource;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount {0} is negative")]
    Negative(Decimal),
    #[error("amount {0} overflows {1} decimals")]
    Overflow(String, u32),
    #[error("insufficient balance {balance} for minimum amount {min}")]
    InsufficientBalance { balance: Decimal, min: Decimal },
}

/// `micro = round(value * 10^decimals)`。
pub fn to_micro(value: Decimal, decimals: u32) -> Result<u128, AmountError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative(value));
    }
    let rounded = value.round_dp(decimals);
    let mantissa = rounded.mantissa().unsigned_abs();
    10u128
        .checked_pow(decimals - rounded.scale())
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| AmountError::Overflow(value.to_string(), decimals))
}

pub fn from_micro(micro: u128, decimals: u32) -> Result<Decimal, AmountError> {
    let overflow = || AmountError::Overflow(micro.to_string(), decimals);
    let mantissa = i128::try_from(micro).map_err(|_| overflow())?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map(|value| value.normalize())
        .map_err(|_| overflow())
}

/// 请求金额的来源。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmountMode {
    /// 余额的固定百分比。
    Percentage(Decimal),
    /// 在配置区间内随机。
    Range,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// 随机保留的小数位区间 `[min_places, min_places + extra_places]`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrecisionBand {
    pub min_places: u32,
    pub extra_places: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountSelection {
    pub amount: Decimal,
    pub micro: u128,
}

#[derive(Clone, Copy, Debug)]
pub struct AmountSelector {
    pub mode: AmountMode,
    pub range: AmountRange,
    pub precision: PrecisionBand,
    pub decimals: u32,
}

impl AmountSelector {
    pub fn select(
        &self,
        balance_micro: u128,
        rng: &mut impl RandomSource,
    ) -> Result<AmountSelection, AmountError> {
        let balance = from_micro(balance_micro, self.decimals)?;

        let (raw, lower, upper) = match self.mode {
            AmountMode::Range => {
                if self.range.min > balance {
                    return Err(AmountError::InsufficientBalance {
                        balance,
                        min: self.range.min,
                    });
                }
                let upper = self.range.max.min(balance);
                let low_micro = to_micro(self.range.min, self.decimals)?;
                let high_micro = to_micro(upper, self.decimals)?;
                let picked = from_micro(rng.uniform(low_micro, high_micro), self.decimals)?;
                (picked, self.range.min, upper)
            }
            AmountMode::Percentage(percentage) => {
                let amount = balance * percentage / Decimal::ONE_HUNDRED;
                if self.range.min > amount {
                    return Err(AmountError::InsufficientBalance {
                        balance: amount,
                        min: self.range.min,
                    });
                }
                (amount, self.range.min, amount)
            }
        };

        let amount = self.round_to_random_places(raw, lower, upper, rng);
        let micro = to_micro(amount, self.decimals)?;
        debug!(
            target: "amount",
            balance = %balance,
            raw = %raw,
            amount = %amount,
            "selected refuel amount"
        );
        Ok(AmountSelection { amount, micro })
    }

    fn round_to_random_places(
        &self,
        amount: Decimal,
        lower: Decimal,
        upper: Decimal,
        rng: &mut impl RandomSource,
    ) -> Decimal {
        let low = u128::from(self.precision.min_places);
        let high = low + u128::from(self.precision.extra_places);
        let places = u32::try_from(rng.uniform(low, high))
            .unwrap_or(self.precision.min_places)
            .min(self.decimals);

        let rounded = amount.round_dp(places);
        let adjusted = if rounded > upper {
            amount.round_dp_with_strategy(places, RoundingStrategy::ToZero)
        } else if rounded < lower {
            amount.round_dp_with_strategy(places, RoundingStrategy::AwayFromZero)
        } else {
            rounded
        };
        // 区间比取整步长还窄时保留原值。
        if (lower..=upper).contains(&adjusted) {
            adjusted
        } else {
            amount
        }
    }
}
