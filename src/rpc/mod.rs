//! EVM 链交互：余额查询与 refuel 存款交易。
//!
//! 签名交给节点（`eth_sendTransaction`），本模块只负责填充 gas/nonce、
//! 发送与回执轮询。读请求按策略重试；发送只做一次，拿到交易哈希之后
//! 也不会再重发。

pub mod abi;

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::Http;
use alloy::transports::{RpcError as TransportRpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::chain::Chain;
use crate::monitoring::{StageLabels, measure_result};
use crate::network::RetryPolicy;

/// 节点限流时返回的 JSON-RPC 错误码。
const RATE_LIMIT_CODES: [i64; 2] = [429, -32005];

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid RPC url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{method} failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("balance {0} does not fit into 128 bits")]
    Overflow(U256),
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
    #[error("transaction {tx_hash} not confirmed within {waited_secs}s")]
    Timeout { tx_hash: TxHash, waited_secs: u64 },
}

impl RpcError {
    /// 网络层、5xx/429 与节点限流可以重试；节点明确拒绝的不重试。
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Transport { source, .. } => match source {
                TransportRpcError::Transport(TransportErrorKind::HttpError(http)) => {
                    http.status == 429 || http.status >= 500
                }
                TransportRpcError::Transport(_) => true,
                TransportRpcError::ErrorResp(payload) => RATE_LIMIT_CODES.contains(&payload.code),
                _ => false,
            },
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositRequest {
    pub from: Address,
    pub contract: Address,
    pub dest_chain_id: u64,
    pub amount: u128,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub tx_hash: TxHash,
    pub explorer_link: String,
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance(&self, address: &Address) -> Result<u128, RpcError>;
}

/// 发送一笔存款并等待确认；失败或回滚都返回错误。
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    async fn deposit(&self, request: &DepositRequest) -> Result<DepositReceipt, RpcError>;
}

pub struct EvmRpcClient {
    chain: Chain,
    provider: RootProvider,
    retry: RetryPolicy,
    receipt_timeout: Duration,
    receipt_poll: Duration,
}

impl fmt::Debug for EvmRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmRpcClient")
            .field("chain", &self.chain)
            .finish()
    }
}

impl EvmRpcClient {
    /// 复用全局 reqwest 客户端（代理与超时设置一致）。
    pub fn new(
        chain: Chain,
        url: &str,
        client: reqwest::Client,
        retry: RetryPolicy,
    ) -> Result<Self, RpcError> {
        let endpoint = Url::parse(url).map_err(|source| RpcError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let transport = Http::with_client(client, endpoint);
        let provider = RootProvider::new(RpcClient::new(transport, false));
        Ok(Self::from_provider(chain, provider, retry))
    }

    pub fn from_provider(chain: Chain, provider: RootProvider, retry: RetryPolicy) -> Self {
        Self {
            chain,
            provider,
            retry,
            receipt_timeout: Duration::from_secs(180),
            receipt_poll: Duration::from_secs(2),
        }
    }

    pub fn with_receipt_wait(mut self, timeout: Duration, poll: Duration) -> Self {
        self.receipt_timeout = timeout;
        self.receipt_poll = poll;
        self
    }

    async fn with_retry<T, F, Fut>(&self, method: &'static str, mut call: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        self.retry
            .run_if(method, RpcError::is_transient, || {
                let pending = call();
                async move {
                    pending
                        .await
                        .map_err(|source| RpcError::Transport { method, source })
                }
            })
            .await
    }

    pub async fn get_balance(&self, address: Address) -> Result<u128, RpcError> {
        let balance = self
            .with_retry("eth_getBalance", || async move {
                self.provider.get_balance(address).await
            })
            .await?;
        u128::try_from(balance).map_err(|_| RpcError::Overflow(balance))
    }

    pub async fn gas_price(&self) -> Result<u128, RpcError> {
        self.with_retry("eth_gasPrice", || async move {
            self.provider.get_gas_price().await
        })
        .await
    }

    pub async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError> {
        self.with_retry("eth_getTransactionCount", || async move {
            self.provider.get_transaction_count(address).pending().await
        })
        .await
    }

    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, RpcError> {
        self.with_retry("eth_estimateGas", || {
            let tx = tx.clone();
            async move { self.provider.estimate_gas(tx).await }
        })
        .await
    }

    /// 只发送一次：传输层报错时节点可能已经收下交易。
    pub async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, RpcError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|source| RpcError::Transport {
                method: "eth_sendTransaction",
                source,
            })?;
        Ok(*pending.tx_hash())
    }

    /// `Some(true)` 成功，`Some(false)` 回滚，`None` 尚未打包。
    pub async fn receipt(&self, tx_hash: TxHash) -> Result<Option<bool>, RpcError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|source| RpcError::Transport {
                method: "eth_getTransactionReceipt",
                source,
            })?;
        Ok(receipt.map(|receipt| receipt.status()))
    }

    /// 轮询回执直到确认、回滚或超时；轮询出错只记录日志。
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<(), RpcError> {
        let started = Instant::now();
        loop {
            match self.receipt(tx_hash).await {
                Ok(Some(true)) => return Ok(()),
                Ok(Some(false)) => return Err(RpcError::Reverted { tx_hash }),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        target: "rpc::receipt",
                        chain = %self.chain,
                        tx_hash = %tx_hash,
                        error = %err,
                        "查询回执失败，继续等待"
                    );
                }
            }
            if started.elapsed() >= self.receipt_timeout {
                return Err(RpcError::Timeout {
                    tx_hash,
                    waited_secs: self.receipt_timeout.as_secs(),
                });
            }
            sleep(self.receipt_poll).await;
        }
    }

    async fn send_deposit(&self, request: &DepositRequest) -> Result<DepositReceipt, RpcError> {
        let tx = TransactionRequest::default()
            .with_from(request.from)
            .with_to(request.contract)
            .with_value(U256::from(request.amount))
            .with_input(abi::deposit_calldata(request.dest_chain_id, request.from));
        let gas_price = self.gas_price().await?;
        let nonce = self.pending_nonce(request.from).await?;
        let tx = tx.with_gas_price(gas_price).with_nonce(nonce);
        let gas = self.estimate_gas(&tx).await?;
        let tx = tx.with_gas_limit(gas);

        let tx_hash = self.send_transaction(tx).await?;
        let explorer_link = self.chain.tx_link(tx_hash);
        info!(
            target: "rpc::deposit",
            chain = %self.chain,
            from = %request.from,
            dest_chain_id = request.dest_chain_id,
            amount = %request.amount,
            nonce,
            gas,
            tx_hash = %tx_hash,
            "存款交易已发送，等待确认"
        );
        self.wait_for_receipt(tx_hash).await?;
        debug!(target: "rpc::deposit", tx_hash = %tx_hash, "存款交易已确认");
        Ok(DepositReceipt {
            tx_hash,
            explorer_link,
        })
    }
}

#[async_trait]
impl BalanceSource for EvmRpcClient {
    async fn balance(&self, address: &Address) -> Result<u128, RpcError> {
        self.get_balance(*address).await
    }
}

#[async_trait]
impl TransactionExecutor for EvmRpcClient {
    async fn deposit(&self, request: &DepositRequest) -> Result<DepositReceipt, RpcError> {
        let labels = StageLabels::chain("deposit", self.chain);
        measure_result(labels, self.send_deposit(request)).await
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::transports::mock::Asserter;
    use serde_json::Value;

    use super::*;

    const ACCOUNT: Address = address!("52908400098527886e0f7030069857d2e4169ee7");
    const CONTRACT: Address = address!("c0e02aa55d10e38855e13b64a8e1387a04681a00");

    fn rate_limited() -> ErrorPayload {
        ErrorPayload {
            code: -32005,
            message: "limit exceeded".into(),
            data: None,
        }
    }

    fn mocked(asserter: &Asserter) -> EvmRpcClient {
        let provider = RootProvider::new(RpcClient::mocked(asserter.clone()));
        EvmRpcClient::from_provider(Chain::Avalanche, provider, RetryPolicy::immediate(3))
            .with_receipt_wait(Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn balance_read_retries_rate_limits() {
        let asserter = Asserter::new();
        asserter.push_failure(rate_limited());
        asserter.push_success(&U256::from(5_000u64));
        let client = mocked(&asserter);

        assert_eq!(client.get_balance(ACCOUNT).await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn rejected_send_is_not_resubmitted() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(25_000_000_000u64));
        asserter.push_success(&U256::from(7u64));
        asserter.push_success(&U256::from(21_000u64));
        asserter.push_failure(rate_limited());
        asserter.push_success(&U256::from(42u64));
        let client = mocked(&asserter);

        let err = client
            .send_deposit(&DepositRequest {
                from: ACCOUNT,
                contract: CONTRACT,
                dest_chain_id: 10,
                amount: 1_000,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RpcError::Transport {
                method: "eth_sendTransaction",
                ..
            }
        ));
        // 下一条响应仍在队列里，说明失败的发送没有被重放。
        assert_eq!(client.gas_price().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn pending_receipt_times_out() {
        let asserter = Asserter::new();
        asserter.push_success(&Value::Null);
        let client = mocked(&asserter);

        let err = client.wait_for_receipt(TxHash::ZERO).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout { waited_secs: 0, .. }));
    }

    #[test]
    fn only_transport_and_overload_errors_are_transient() {
        let transport = |source: TransportError| RpcError::Transport {
            method: "eth_gasPrice",
            source,
        };
        assert!(transport(TransportErrorKind::http_error(502, String::new())).is_transient());
        assert!(transport(TransportErrorKind::http_error(429, String::new())).is_transient());
        assert!(!transport(TransportErrorKind::http_error(400, String::new())).is_transient());
        assert!(transport(TransportRpcError::ErrorResp(rate_limited())).is_transient());
        assert!(
            !transport(TransportRpcError::ErrorResp(ErrorPayload {
                code: -32000,
                message: "insufficient funds".into(),
                data: None,
            }))
            .is_transient()
        );
        assert!(!RpcError::Reverted { tx_hash: TxHash::ZERO }.is_transient());
    }
}
