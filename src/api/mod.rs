//! Socket/Bungee refuel API 客户端：链限额与报价。

pub mod types;

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::chain::Chain;
use crate::monitoring::{StageLabels, StageTimer};
use crate::network::RetryPolicy;
use crate::refuel::{ChainInfo, LimitsError, RouteLimits};

pub use types::{RefuelQuote, parse_chains};

#[derive(Debug, Error)]
pub enum RefuelApiError {
    #[error("failed to call refuel API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse response body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API request to {endpoint} failed with status {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("refuel API reported failure for {endpoint}")]
    Unsuccessful { endpoint: String },
    #[error(transparent)]
    Limits(#[from] LimitsError),
}

impl RefuelApiError {
    /// 耗时统计里的结果标签。
    pub fn outcome(&self) -> &'static str {
        match self {
            RefuelApiError::Http(_) => "network_error",
            RefuelApiError::Json(_) => "decode_error",
            RefuelApiError::ApiStatus { .. } => "http_error",
            RefuelApiError::Unsuccessful { .. } => "unsuccessful",
            RefuelApiError::Limits(_) => "limits_error",
        }
    }
}

/// 报价来源；每个任务在执行前调用一次。
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(
        &self,
        from_chain_id: u64,
        to_chain_id: u64,
        amount: u128,
    ) -> Result<RefuelQuote, RefuelApiError>;
}

#[derive(Clone)]
pub struct RefuelApiClient {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl fmt::Debug for RefuelApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefuelApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl RefuelApiClient {
    pub fn new(client: reqwest::Client, base_url: String, retry: RetryPolicy) -> Self {
        Self {
            base_url,
            client,
            retry,
        }
    }

    pub async fn chains(&self) -> Result<Vec<ChainInfo>, RefuelApiError> {
        let endpoint = self.endpoint("/chains");
        let value = self
            .retry
            .run("refuel.chains", || self.get_json(&endpoint, &[], "chains"))
            .await?;
        parse_chains(value)?.ok_or(RefuelApiError::Unsuccessful { endpoint })
    }

    /// 拉取源链的限额表，整个运行期间只调用一次。
    pub async fn route_limits(&self, source: Chain) -> Result<RouteLimits, RefuelApiError> {
        let chains = self.chains().await?;
        let limits = RouteLimits::from_chain_info(source, &chains)?;
        info!(
            target: "api::refuel",
            source = %source,
            chains = chains.len(),
            "已获取 refuel 链限额"
        );
        Ok(limits)
    }

    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        stage: &'static str,
    ) -> Result<Value, RefuelApiError> {
        let timer = StageTimer::start(StageLabels::api(stage));
        let result = self.fetch_json(endpoint, query).await;
        timer.finish(match &result {
            Ok(_) => "ok",
            Err(err) => err.outcome(),
        });
        result
    }

    async fn fetch_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Value, RefuelApiError> {
        let response = self.client.get(endpoint).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RefuelApiError::ApiStatus {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl QuoteSource for RefuelApiClient {
    async fn quote(
        &self,
        from_chain_id: u64,
        to_chain_id: u64,
        amount: u128,
    ) -> Result<RefuelQuote, RefuelApiError> {
        let endpoint = self.endpoint("/quote");
        let query = [
            ("fromChainId", from_chain_id.to_string()),
            ("toChainId", to_chain_id.to_string()),
            ("amount", amount.to_string()),
        ];
        let value = self
            .retry
            .run("refuel.quote", || self.get_json(&endpoint, &query, "quote"))
            .await?;
        let quote = RefuelQuote::try_from_value(value)?;
        debug!(
            target: "api::refuel",
            from_chain_id,
            to_chain_id,
            amount = %amount,
            allowed = quote.allowed,
            contract = %quote.contract_address,
            estimated_time_ms = quote.estimated_time_ms,
            "refuel 报价完成"
        );
        Ok(quote)
    }
}
