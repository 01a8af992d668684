use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

/// 有界重试：指数退避加随机抖动。
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub initial_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_tries: u32) -> Self {
        Self {
            max_tries: max_tries.max(1),
            initial_delay: Duration::from_millis(1_500),
            factor: 2,
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_secs(1),
        }
    }

    /// 不等待的策略，用于测试。
    pub fn immediate(max_tries: u32) -> Self {
        Self {
            max_tries: max_tries.max(1),
            initial_delay: Duration::ZERO,
            factor: 1,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    pub async fn run<T, E, F, Fut>(&self, operation: &str, f: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(operation, |_| true, f).await
    }

    /// `should_retry` 返回 false 的错误立即返回。
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        operation: &str,
        should_retry: P,
        mut f: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_tries && should_retry(&err) => {
                    let wait = delay + self.jitter();
                    warn!(
                        target: "network::retry",
                        operation,
                        attempt,
                        max_tries = self.max_tries,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "请求失败，将重试"
                    );
                    if !wait.is_zero() {
                        sleep(wait).await;
                    }
                    delay = (delay * self.factor).min(self.max_delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = RetryPolicy::immediate(3)
            .run("flaky", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("fail {n}")) } else { Ok(n) }
            })
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_tries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = RetryPolicy::immediate(2)
            .run("broken", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            })
            .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = RetryPolicy::immediate(5)
            .run_if(
                "fatal",
                |err: &String| err != "fatal",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
