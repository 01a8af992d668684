use thiserror::Error;
use tracing::debug;

use super::limits::LimitPair;
use super::random::RandomSource;

/// 随机填充交易的预算。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomBudget {
    /// 填充交易数量上限。
    pub max_filler_count: u32,
    /// 单笔填充交易的最小金额（micro）。
    pub filler_min: u128,
}

impl RandomBudget {
    pub const NONE: RandomBudget = RandomBudget {
        max_filler_count: 0,
        filler_min: 0,
    };

    /// 每个任务重新抽取实际上限：`0..=max_filler_count`。
    pub fn sample(self, rng: &mut impl RandomSource) -> RandomBudget {
        let drawn = rng.uniform(0, u128::from(self.max_filler_count));
        RandomBudget {
            max_filler_count: u32::try_from(drawn).unwrap_or(self.max_filler_count),
            filler_min: self.filler_min,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    /// 剩余不足两倍下限，整笔清空。
    Final,
    Filler,
    /// 发满上限会留下不足下限的尾款，改为预留下限。
    NearCeiling,
    Default,
}

impl ChunkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkKind::Final => "final",
            ChunkKind::Filler => "filler",
            ChunkKind::NearCeiling => "near_ceiling",
            ChunkKind::Default => "default",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedChunk {
    pub amount: u128,
    pub kind: ChunkKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferPlan {
    chunks: Vec<PlannedChunk>,
}

impl TransferPlan {
    pub fn chunks(&self) -> &[PlannedChunk] {
        &self.chunks
    }

    pub fn amounts(&self) -> Vec<u128> {
        self.chunks.iter().map(|chunk| chunk.amount).collect()
    }

    pub fn total(&self) -> u128 {
        self.chunks.iter().map(|chunk| chunk.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn filler_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.kind == ChunkKind::Filler)
            .count()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("insufficient amount {requested} for route minimum {min}")]
    InsufficientBalance { requested: u128, min: u128 },
    #[error("invalid route limits: min {min}, max {max}")]
    InvalidLimits { min: u128, max: u128 },
}

/// 把请求总额拆成若干笔满足桥限额的存款。
#[derive(Clone, Copy, Debug)]
pub struct TransferPlanner {
    limits: LimitPair,
    budget: RandomBudget,
}

impl TransferPlanner {
    pub fn new(limits: LimitPair, budget: RandomBudget) -> Result<Self, PlanError> {
        if limits.max == 0 || limits.min > limits.max {
            return Err(PlanError::InvalidLimits {
                min: limits.min,
                max: limits.max,
            });
        }
        Ok(Self { limits, budget })
    }

    pub fn plan(
        &self,
        requested: u128,
        rng: &mut impl RandomSource,
    ) -> Result<TransferPlan, PlanError> {
        let LimitPair { min, max } = self.limits;
        if requested < min {
            return Err(PlanError::InsufficientBalance { requested, min });
        }

        let mut chunks = Vec::new();
        let mut remaining = requested;
        let mut fillers = 0u32;

        while remaining > 0 && remaining >= min {
            let (amount, kind) = if min.saturating_mul(2) > remaining {
                (remaining, ChunkKind::Final)
            } else if fillers < self.budget.max_filler_count
                && self.budget.filler_min <= remaining - min
            {
                let upper = (remaining - min).min(max);
                let lower = self.budget.filler_min.min(upper).max(1);
                fillers += 1;
                (rng.uniform(lower, upper), ChunkKind::Filler)
            } else if remaining > max && remaining - max < min {
                (remaining - min, ChunkKind::NearCeiling)
            } else {
                (remaining.min(max), ChunkKind::Default)
            };

            debug!(
                target: "refuel::planner",
                amount,
                kind = kind.as_str(),
                remaining,
                "planned chunk"
            );
            chunks.push(PlannedChunk { amount, kind });
            remaining -= amount;
        }

        Ok(TransferPlan { chunks })
    }
}
