pub mod client;
pub mod rate_limiter;

pub use client::OverpassClient;
pub use rate_limiter::RateLimiter;
