use rust_decimal::Decimal;
use thiserror::Error;

use crate::amount::AmountError;
use crate::api::RefuelApiError;
use crate::chain::Chain;
use crate::refuel::PlanError;
use crate::rpc::RpcError;

/// 单个任务的失败原因；只影响当前任务。
#[derive(Debug, Error)]
pub enum JobError {
    #[error("余额不足: 金额 {amount} 低于最小值 {min}")]
    InsufficientBalance { amount: Decimal, min: Decimal },
    #[error("refuel 报价被拒绝: 目标链 {destination}")]
    QuoteDenied { destination: Chain },
    #[error("refuel 路线未开放: 目标链 {destination}")]
    RouteDisabled { destination: Chain },
    #[error("第 {} 笔存款失败（共 {total} 笔）: {source}", .index + 1)]
    Transaction {
        index: usize,
        total: usize,
        #[source]
        source: RpcError,
    },
    #[error("refuel API 错误: {0}")]
    Api(#[from] RefuelApiError),
    #[error("RPC 请求失败: {0}")]
    Rpc(#[from] RpcError),
    #[error("金额处理失败: {0}")]
    Amount(AmountError),
    #[error("拆单失败: {0}")]
    Plan(PlanError),
}

pub type JobResult<T> = Result<T, JobError>;

impl From<AmountError> for JobError {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::InsufficientBalance { balance, min } => {
                JobError::InsufficientBalance {
                    amount: balance,
                    min,
                }
            }
            other => JobError::Amount(other),
        }
    }
}
