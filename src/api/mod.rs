pub mod client;
pub mod error;
pub mod kite;
pub mod rate_limiter;

pub use client::{BrokerClient, RawOrder, SessionGrant};
pub use error::ApiError;
pub use kite::KiteClient;
pub use rate_limiter::RateLimiter;
