use std::future::Future;

use super::types::{StageLabels, StageTimer};

/// 记录整个 future 的耗时，成功记 `ok`，失败记 `error`。
pub async fn measure_result<Fut, T, E>(labels: StageLabels, fut: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let timer = StageTimer::start(labels);
    let res = fut.await;
    timer.finish(if res.is_ok() { "ok" } else { "error" });
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;

    #[tokio::test]
    async fn passes_result_through() {
        let labels = StageLabels::chain("deposit", Chain::Bsc);
        let ok: Result<u8, String> = measure_result(labels, async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));
        let err: Result<u8, String> =
            measure_result(labels, async { Err("reverted".to_string()) }).await;
        assert_eq!(err, Err("reverted".to_string()));
    }
}
