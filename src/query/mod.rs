//! Keyed query cache with staleness, garbage collection and policy-driven retries.

pub mod cache;
pub mod keys;
pub mod retry;

pub use cache::{QueryCache, QueryOptions, QuerySnapshot, QueryStatus};
pub use keys::{QueryKey, QueryNamespace};
pub use retry::{exponential_delay, run_with_retry, Backoff, Retried, RetryPolicy};
