use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread::sleep;
use tracing::debug;

use crate::metrics::registry::OVERPASS_RATE_LIMIT_WAITS_TOTAL;

/// Client-side pacing for Overpass requests. It only delays a call, it never
/// repeats one.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Option<Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    requests_per_second: u32,
}

impl RateLimiter {
    /// A rate of zero disables limiting
    pub fn new(requests_per_second: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_second)
            .map(|rps| Arc::new(GovernorRateLimiter::direct(Quota::per_second(rps))));

        Self {
            limiter,
            requests_per_second,
        }
    }

    /// Block the calling thread until a request is allowed
    pub fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        loop {
            match limiter.check() {
                Ok(_) => {
                    debug!("Rate limit check passed");
                    return;
                }
                Err(not_until) => {
                    let wait_time = not_until.wait_time_from(DefaultClock::default().now());
                    debug!("Rate limit exceeded, waiting {:?}", wait_time);
                    OVERPASS_RATE_LIMIT_WAITS_TOTAL.inc();
                    sleep(wait_time);
                }
            }
        }
    }

    /// Try to acquire without waiting
    pub fn try_acquire(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }
}
