mod client;
mod error;
pub mod retry;

pub use client::build_http_client;
pub use error::{NetworkError, NetworkResult};
pub use retry::RetryPolicy;
