//! Rate limiter for login failures
//!
//! Tracks failed login attempts per client IP inside a sliding window.
//! Once an IP accumulates the configured number of failures it is blocked
//! for a fixed duration; a successful login resets its record.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Configuration for the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of failed attempts before blocking
    pub max_failures: u32,

    /// Duration an IP stays blocked
    pub block_duration: Duration,

    /// Duration after which the failure count resets
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_failures: 10,
            block_duration: Duration::from_secs(300),
            window_duration: Duration::from_secs(600),
        }
    }
}

/// Failure record for a single IP
#[derive(Debug)]
struct Attempts {
    failures: u32,
    window_started: Instant,
    blocked_until: Option<Instant>,
}

impl Attempts {
    fn fresh(now: Instant) -> Self {
        Self {
            failures: 0,
            window_started: now,
            blocked_until: None,
        }
    }
}

/// Thread-safe per-IP rate limiter for login failures
pub struct RateLimiter {
    config: RateLimitConfig,
    attempts: RwLock<HashMap<IpAddr, Attempts>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Record a failed login attempt for an IP
    ///
    /// Returns `true` if the IP is now blocked
    pub fn record_failure(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.write().unwrap();
        let entry = attempts.entry(ip).or_insert_with(|| Attempts::fresh(now));

        if let Some(until) = entry.blocked_until {
            if now < until {
                return true;
            }
            // Block served; start over
            *entry = Attempts::fresh(now);
        }

        if now.duration_since(entry.window_started) >= self.config.window_duration {
            entry.failures = 0;
            entry.window_started = now;
        }

        entry.failures += 1;
        if entry.failures >= self.config.max_failures {
            entry.blocked_until = Some(now + self.config.block_duration);
            true
        } else {
            false
        }
    }

    /// Check if an IP is currently blocked
    pub fn is_blocked(&self, ip: IpAddr) -> bool {
        let attempts = self.attempts.read().unwrap();
        attempts
            .get(&ip)
            .and_then(|entry| entry.blocked_until)
            .is_some_and(|until| Instant::now() < until)
    }

    /// Forget an IP's failures (after a successful login)
    pub fn reset(&self, ip: IpAddr) {
        self.attempts.write().unwrap().remove(&ip);
    }

    /// Number of failures recorded for an IP in the current window
    pub fn failure_count(&self, ip: IpAddr) -> u32 {
        let attempts = self.attempts.read().unwrap();
        match attempts.get(&ip) {
            Some(entry)
                if Instant::now().duration_since(entry.window_started)
                    < self.config.window_duration =>
            {
                entry.failures
            }
            _ => 0,
        }
    }

    /// Drop entries whose window and block have both lapsed
    ///
    /// Should be called periodically to free memory
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut attempts = self.attempts.write().unwrap();

        attempts.retain(|_, entry| {
            if entry.blocked_until.is_some_and(|until| now < until) {
                return true;
            }
            now.duration_since(entry.window_started) < self.config.window_duration
        });
    }

    /// Number of IPs currently tracked
    pub fn tracked_ips(&self) -> usize {
        self.attempts.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn test_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 42))
    }

    fn limiter(max_failures: u32, block_ms: u64, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_failures,
            block_duration: Duration::from_millis(block_ms),
            window_duration: Duration::from_millis(window_ms),
        })
    }

    // Test 1: blocks only after the configured number of failures
    #[test]
    fn test_blocks_after_max_failures() {
        let limiter = limiter(3, 60_000, 60_000);
        let ip = test_ip();

        assert!(!limiter.record_failure(ip));
        assert!(!limiter.record_failure(ip));
        assert!(!limiter.is_blocked(ip));

        assert!(limiter.record_failure(ip));
        assert!(limiter.is_blocked(ip));
    }

    // Test 2: failures below the threshold never block
    #[test]
    fn test_below_threshold_not_blocked() {
        let limiter = limiter(5, 60_000, 60_000);
        let ip = test_ip();

        for _ in 0..4 {
            limiter.record_failure(ip);
        }
        assert!(!limiter.is_blocked(ip));
        assert_eq!(limiter.failure_count(ip), 4);
    }

    // Test 3: reset clears the record
    #[test]
    fn test_reset_clears_failures() {
        let limiter = limiter(3, 60_000, 60_000);
        let ip = test_ip();

        limiter.record_failure(ip);
        limiter.record_failure(ip);
        limiter.reset(ip);

        assert_eq!(limiter.failure_count(ip), 0);
        assert!(!limiter.is_blocked(ip));
    }

    // Test 4: the failure window expires
    #[test]
    fn test_window_expiry_resets_count() {
        let limiter = limiter(3, 60_000, 20);
        let ip = test_ip();

        limiter.record_failure(ip);
        limiter.record_failure(ip);
        std::thread::sleep(Duration::from_millis(30));

        // Window lapsed, so this failure starts a new count
        assert!(!limiter.record_failure(ip));
        assert_eq!(limiter.failure_count(ip), 1);
    }

    // Test 5: a block expires after its duration
    #[test]
    fn test_block_expires() {
        let limiter = limiter(1, 20, 60_000);
        let ip = test_ip();

        assert!(limiter.record_failure(ip));
        assert!(limiter.is_blocked(ip));

        std::thread::sleep(Duration::from_millis(30));
        assert!(!limiter.is_blocked(ip));

        // Next failure starts a fresh count rather than an instant block
        // (max_failures is 1 here, so it blocks again immediately)
        assert!(limiter.record_failure(ip));
    }

    // Test 6: independent IPs do not interfere
    #[test]
    fn test_ips_are_independent() {
        let limiter = limiter(2, 60_000, 60_000);
        let first = test_ip();
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 43));

        limiter.record_failure(first);
        limiter.record_failure(first);

        assert!(limiter.is_blocked(first));
        assert!(!limiter.is_blocked(second));
    }

    // Test 7: cleanup drops lapsed entries
    #[test]
    fn test_cleanup() {
        let limiter = limiter(5, 20, 20);
        let ip = test_ip();

        limiter.record_failure(ip);
        assert_eq!(limiter.tracked_ips(), 1);

        std::thread::sleep(Duration::from_millis(30));
        limiter.cleanup();
        assert_eq!(limiter.tracked_ips(), 0);
    }
}
