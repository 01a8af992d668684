use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("HTTP 代理地址无效 {proxy}: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("构建 HTTP 客户端失败: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
