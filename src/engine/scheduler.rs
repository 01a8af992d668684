use std::time::Duration;

use tracing::debug;

use crate::config::WaitRange;
use crate::refuel::RandomSource;

/// 随机等待窗口 `[min, max]`，按毫秒均匀取值。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduler {
    min: Duration,
    max: Duration,
}

impl Scheduler {
    pub const NONE: Scheduler = Scheduler {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn from_secs(range: WaitRange) -> Self {
        Self::new(secs(range.min), secs(range.max))
    }

    pub fn from_mins(range: WaitRange) -> Self {
        Self::new(secs(range.min * 60.0), secs(range.max * 60.0))
    }

    pub fn sample(&self, rng: &mut impl RandomSource) -> Duration {
        let low = self.min.as_millis();
        let high = self.max.as_millis();
        let millis = rng.uniform(low, high);
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    pub async fn wait(&self, rng: &mut impl RandomSource) -> Duration {
        let delay = self.sample(rng);
        if !delay.is_zero() {
            debug!(target: "engine::scheduler", delay_ms = delay.as_millis() as u64, "等待");
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::refuel::RngSource;

    #[test]
    fn samples_within_window() {
        let scheduler = Scheduler::from_secs(WaitRange::new(6.0, 12.0));
        let mut rng = RngSource(StdRng::seed_from_u64(5));
        for _ in 0..200 {
            let delay = scheduler.sample(&mut rng);
            assert!(delay >= Duration::from_secs(6) && delay <= Duration::from_secs(12));
        }
    }

    #[test]
    fn minutes_window_converts_to_seconds() {
        let scheduler = Scheduler::from_mins(WaitRange::new(0.5, 0.5));
        let mut rng = RngSource(StdRng::seed_from_u64(1));
        assert_eq!(scheduler.sample(&mut rng), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn empty_window_does_not_sleep() {
        let mut rng = RngSource(StdRng::seed_from_u64(1));
        assert_eq!(Scheduler::NONE.wait(&mut rng).await, Duration::ZERO);
    }
}
