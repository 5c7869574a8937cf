use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum interval between successive calls to an external service.
///
/// The first `acquire` returns immediately; every later one blocks the calling
/// thread until `min_interval` has passed since the previous acquire. The lock
/// is held while sleeping, so concurrent callers are serialized too.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait for permission to make one call. Returns how long the caller slept.
    pub fn acquire(&self) -> Duration {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut waited = Duration::ZERO;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                std::thread::sleep(waited);
            }
        }
        *last = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_acquire_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        assert_eq!(limiter.acquire(), Duration::ZERO);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_successive_acquires_are_spaced() {
        let interval = Duration::from_millis(40);
        let limiter = RateLimiter::new(interval);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire();
        }
        // Two gaps of at least `interval` each
        assert!(start.elapsed() >= interval * 2);
    }

    #[test]
    fn test_no_wait_after_interval_elapsed() {
        let limiter = RateLimiter::new(Duration::from_millis(10));
        limiter.acquire();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiter.acquire(), Duration::ZERO);
    }

    #[test]
    fn test_unlimited() {
        let limiter = RateLimiter::unlimited();
        assert_eq!(limiter.acquire(), Duration::ZERO);
        assert_eq!(limiter.acquire(), Duration::ZERO);
    }
}
