use std::time::Duration;

use reqwest::Proxy;

use super::{NetworkError, NetworkResult};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

/// 构建共享的 HTTP 客户端；桥 API 与 RPC 共用同一代理设置。
pub fn build_http_client(proxy: Option<&str>, timeout: Duration) -> NetworkResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(30));

    if let Some(proxy_url) = proxy.map(str::trim).filter(|value| !value.is_empty()) {
        let proxy_url = if proxy_url.contains("://") {
            proxy_url.to_string()
        } else {
            format!("http://{proxy_url}")
        };
        let proxy = Proxy::all(&proxy_url).map_err(|source| NetworkError::InvalidProxy {
            proxy: proxy_url.clone(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(NetworkError::ClientBuild)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_host_port_proxy() {
        build_http_client(Some("127.0.0.1:8080"), Duration::from_secs(1)).expect("client");
        build_http_client(None, Duration::from_secs(1)).expect("client");
        build_http_client(Some("  "), Duration::from_secs(1)).expect("client");
    }
}
