//! Per-IP limit on WebSocket upgrades within a sliding one-minute window.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

const WINDOW: Duration = Duration::from_secs(60);

type Admissions = HashMap<IpAddr, VecDeque<Instant>>;

pub struct RateLimiter {
    max_connections_per_ip: u32,
    admissions: Mutex<Admissions>,
}

impl RateLimiter {
    pub fn new(max_connections_per_ip: u32) -> Self {
        Self {
            max_connections_per_ip,
            admissions: Mutex::new(HashMap::new()),
        }
    }

    /// Admit a new connection from `ip`, or refuse it when the window is full.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut admissions = self.lock();
        let window = admissions.entry(ip).or_default();
        expire(window, now);

        if window.len() >= self.max_connections_per_ip as usize {
            warn!(
                %ip,
                recent = window.len(),
                limit = self.max_connections_per_ip,
                "Refusing connection: per-IP limit reached"
            );
            return false;
        }

        window.push_back(now);
        true
    }

    /// Give back the oldest admission for `ip` once its connection closes.
    pub fn release(&self, ip: IpAddr) {
        let mut admissions = self.lock();
        let Some(window) = admissions.get_mut(&ip) else {
            return;
        };
        window.pop_front();
        if window.is_empty() {
            admissions.remove(&ip);
        }
    }

    /// Drop admissions that have aged out of the window.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        let mut admissions = self.lock();
        admissions.retain(|_, window| {
            expire(window, now);
            !window.is_empty()
        });
        debug!(tracked = admissions.len(), "Pruned rate limiter");
    }

    pub fn tracked_ips(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Admissions> {
        self.admissions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn expire(window: &mut VecDeque<Instant>, now: Instant) {
    while window.front().is_some_and(|t| now.duration_since(*t) >= WINDOW) {
        window.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_refuses_past_limit() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        assert!(limiter.check(ip(2)));
    }

    #[test]
    fn test_release_frees_a_slot() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));

        limiter.release(ip(1));
        assert_eq!(limiter.tracked_ips(), 0);
        assert!(limiter.check(ip(1)));
    }

    #[test]
    fn test_release_unknown_ip_is_noop() {
        let limiter = RateLimiter::new(1);
        limiter.release(ip(9));
        assert_eq!(limiter.tracked_ips(), 0);
    }

    #[test]
    fn test_window_expiry() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start));
        assert!(!limiter.check_at(ip(1), start + Duration::from_secs(30)));
        assert!(limiter.check_at(ip(1), start + WINDOW));
    }

    #[test]
    fn test_prune_forgets_idle_ips() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();
        limiter.check_at(ip(1), start);
        limiter.check_at(ip(2), start + Duration::from_secs(45));

        limiter.prune_at(start + Duration::from_secs(50));
        assert_eq!(limiter.tracked_ips(), 2);

        limiter.prune_at(start + WINDOW);
        assert_eq!(limiter.tracked_ips(), 1);
    }
}
