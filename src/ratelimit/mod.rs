//! Rate limiting logic and state management.

mod identity;
mod limiter;
mod store;

pub use identity::CallerIdentity;
pub use limiter::{Decision, Quota, RateLimiter};
pub use store::{CounterStore, MemoryCounterStore, RedisCounterStore, StoreError};
