//! Refuel 核心：路线限额查询与拆单规划。

pub mod limits;
pub mod planner;
pub mod random;

pub use limits::{ChainInfo, LimitPair, LimitsError, RouteLimit, RouteLimits};
pub use planner::{ChunkKind, PlanError, PlannedChunk, RandomBudget, TransferPlan, TransferPlanner};
pub use random::{RandomSource, RngSource};
