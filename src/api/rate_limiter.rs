use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Client-side request pacing for a broker API.
///
/// Requests draw from a governor token bucket sized to the broker's published
/// per-second limit. When the broker still answers 429, `back_off` pauses every
/// caller until the cooldown ends.
pub struct RateLimiter {
    bucket: DefaultDirectRateLimiter,
    cooldown_until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Bucket holding one second's worth of requests; zero falls back to 1 req/s
    pub fn per_second(requests: u32) -> Self {
        let rate = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        Self {
            bucket: governor::RateLimiter::direct(Quota::per_second(rate)),
            cooldown_until: Mutex::new(None),
        }
    }

    /// Wait out any cooldown, then for a token
    pub async fn acquire(&self) {
        if let Some(until) = self.cooldown() {
            log::debug!(
                "Broker cooldown active, waiting {:?}",
                until.saturating_duration_since(Instant::now())
            );
            tokio::time::sleep_until(until).await;
        }
        self.bucket.until_ready().await;
    }

    /// Hold back all requests for `pause`. An earlier, longer cooldown is kept.
    pub fn back_off(&self, pause: Duration) {
        let until = Instant::now() + pause;
        let mut cooldown = self.cooldown_until.lock().unwrap_or_else(|e| e.into_inner());
        if cooldown.is_none_or(|current| current < until) {
            *cooldown = Some(until);
        }
    }

    fn cooldown(&self) -> Option<Instant> {
        let cooldown = self.cooldown_until.lock().unwrap_or_else(|e| e.into_inner());
        cooldown.filter(|until| *until > Instant::now())
    }
}
