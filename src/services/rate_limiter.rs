//! Shared sliding-window rate limiter.
//!
//! Async-safe: any number of tasks can call [`RateLimiter::acquire`]
//! concurrently; a caller over the window limit sleeps until the oldest
//! admission expires.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    /// Admission timestamps inside the current window
    admissions: Mutex<VecDeque<Instant>>,
    max_per_window: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            admissions: Mutex::new(VecDeque::with_capacity(max_per_window as usize)),
            max_per_window,
            window,
        }
    }

    /// Per-second limiter, the shape both pipelines use.
    pub fn per_second(max_per_second: u32) -> Self {
        Self::new(max_per_second, Duration::from_secs(1))
    }

    /// Wait until this caller may proceed, then record the admission.
    pub async fn acquire(&self) {
        loop {
            let now = Instant::now();
            let mut admissions = self.admissions.lock().await;

            while let Some(&oldest) = admissions.front() {
                if now.duration_since(oldest) >= self.window {
                    admissions.pop_front();
                } else {
                    break;
                }
            }

            if (admissions.len() as u32) < self.max_per_window {
                admissions.push_back(now);
                return;
            }

            let oldest = *admissions.front().expect("window is non-empty when full");
            let wait = self.window - now.duration_since(oldest);
            // Drop the lock before sleeping so other tasks can recheck
            drop(admissions);
            sleep(wait + Duration::from_millis(5)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_under_limit_is_immediate() {
        let limiter = RateLimiter::new(10, Duration::from_secs(1));
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_over_limit_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await; // third must wait out the window
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
