//! Bounded concurrency for outbound fetches.
//!
//! Every tile, blob and point-API request takes a permit first, which keeps
//! the number of concurrent requests against upstream servers bounded no
//! matter how many hazard tasks run at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::HazardError;

#[derive(Debug)]
pub struct FetchLimiter {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: AtomicUsize,
}

impl FetchLimiter {
    /// A zero limit is raised to one.
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_permits: max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Wait for a permit. Released on drop.
    pub async fn acquire(&self) -> Result<FetchPermit, HazardError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| HazardError::upstream("fetch limiter", e))?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);

        Ok(FetchPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneous permits observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }
}

pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_bounded_and_released() {
        let limiter = FetchLimiter::new(2);
        let a = limiter.acquire().await.unwrap();
        let _b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 2);

        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            limiter.acquire(),
        )
        .await;
        assert!(waiting.is_err(), "third permit must wait");

        drop(a);
        assert_eq!(limiter.in_flight(), 1);
        let _c = limiter.acquire().await.unwrap();
        assert_eq!(limiter.peak_in_flight(), 2);
    }

    #[test]
    fn test_zero_limit_is_raised() {
        assert_eq!(FetchLimiter::new(0).max_concurrent(), 1);
    }
}
