//! 任务与 worker 池测试共用的假实现。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{TxHash, address};
use async_trait::async_trait;

use crate::api::{QuoteSource, RefuelApiError, RefuelQuote};
use crate::chain::Chain;
use crate::refuel::{ChainInfo, RouteLimits};
use crate::rpc::{BalanceSource, DepositReceipt, DepositRequest, RpcError, TransactionExecutor};
use crate::wallet::Address;

pub const ONE: u128 = 1_000_000_000_000_000_000;
pub const CONTRACT: Address = address!("c0e02aa55d10e38855e13b64a8e1387a04681a00");
pub const ACCOUNT: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

pub struct FakeQuotes {
    pub allowed: bool,
}

#[async_trait]
impl QuoteSource for FakeQuotes {
    async fn quote(
        &self,
        _from_chain_id: u64,
        _to_chain_id: u64,
        _amount: u128,
    ) -> Result<RefuelQuote, RefuelApiError> {
        if !self.allowed {
            return Ok(RefuelQuote::denied());
        }
        Ok(RefuelQuote {
            allowed: true,
            contract_address: CONTRACT,
            estimated_time_ms: 60_000,
        })
    }
}

pub struct FakeBalances {
    pub balance: u128,
    pub calls: AtomicUsize,
}

#[async_trait]
impl BalanceSource for FakeBalances {
    async fn balance(&self, _address: &Address) -> Result<u128, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }
}

/// 记录每次存款；从第 `fail_at` 次起返回回滚。
#[derive(Default)]
pub struct RecordingExecutor {
    pub fail_at: Option<usize>,
    pub calls: Mutex<Vec<DepositRequest>>,
}

#[async_trait]
impl TransactionExecutor for RecordingExecutor {
    async fn deposit(&self, request: &DepositRequest) -> Result<DepositReceipt, RpcError> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(request.clone());
        let tx_hash = TxHash::with_last_byte(index as u8);
        if self.fail_at.is_some_and(|at| index >= at) {
            return Err(RpcError::Reverted { tx_hash });
        }
        Ok(DepositReceipt {
            tx_hash,
            explorer_link: Chain::Avalanche.tx_link(tx_hash),
        })
    }
}

/// Avalanche → Optimism 一条开放路线。
pub fn limits(min: &str, max: &str) -> Arc<RouteLimits> {
    let raw = format!(
        r#"[{{"name":"Avalanche","chainId":43114,"limits":[
            {{"chainId":10,"isEnabled":true,"minAmount":"{min}","maxAmount":"{max}"}}
        ]}}]"#
    );
    let chains: Vec<ChainInfo> = serde_json::from_str(&raw).unwrap();
    Arc::new(RouteLimits::from_chain_info(Chain::Avalanche, &chains).unwrap())
}
