use rand::Rng;

/// 规划与金额选择共用的随机源，只需要闭区间均匀整数。
pub trait RandomSource {
    /// 返回 `[low, high]` 内的均匀整数；`low >= high` 时直接返回 `low`。
    fn uniform(&mut self, low: u128, high: u128) -> u128;
}

/// 任意 `rand::Rng` 的适配器。
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self, low: u128, high: u128) -> u128 {
        if low >= high {
            low
        } else {
            self.0.random_range(low..=high)
        }
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn uniform(&mut self, low: u128, high: u128) -> u128 {
        (**self).uniform(low, high)
    }
}
