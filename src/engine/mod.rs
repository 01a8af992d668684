//! 任务执行层：单任务流水线、worker 池与随机等待。

mod error;
mod job;
mod pool;
mod scheduler;
#[cfg(test)]
mod testing;

pub use error::{JobError, JobResult};
pub use job::{Job, JobReport, JobRunner, JobSettings};
pub use pool::{WorkerPool, assign_jobs};
pub use scheduler::Scheduler;
