use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Snapshot of admission-gate activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Requests waiting for a concurrency slot.
    pub queued: usize,
    /// Requests currently past the gate.
    pub active: usize,
    /// Total requests admitted since construction.
    pub total: u64,
}

/// Admission gate in front of the provider.
///
/// Two independent conditions must both hold before a request dispatches:
/// a counting semaphore bounds concurrently in-flight requests, and a
/// minimum-interval gate enforces spacing between dispatch instants
/// regardless of the concurrency bound.
pub struct RequestGate {
    semaphore: Arc<Semaphore>,
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
    queued: AtomicUsize,
    active: Arc<AtomicUsize>,
    total: AtomicU64,
    max_concurrent: usize,
}

impl RequestGate {
    /// Gate admitting at most `max_concurrent` in-flight requests, spaced
    /// at least `1 / requests_per_second` apart.
    #[must_use]
    pub fn new(max_concurrent: usize, requests_per_second: f64) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            min_interval,
            last_dispatch: Mutex::new(None),
            queued: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            total: AtomicU64::new(0),
            max_concurrent,
        }
    }

    /// Wait for a slot and for the spacing interval; the returned permit
    /// holds the slot until dropped.
    pub async fn admit(&self) -> RequestPermit {
        self.queued.fetch_add(1, Ordering::Relaxed);
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("request gate semaphore closed"));
        self.queued.fetch_sub(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        if !self.min_interval.is_zero() {
            // Holding the dispatch-time lock through the sleep serializes
            // spacing across concurrent admitters.
            let mut last = self.last_dispatch.lock().await;
            if let Some(previous) = *last {
                let elapsed = previous.elapsed();
                if elapsed < self.min_interval {
                    tokio::time::sleep(self.min_interval - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        RequestPermit {
            _permit: permit,
            active: self.active.clone(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> GateStats {
        GateStats {
            queued: self.queued.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

/// Slot held by an admitted request; dropping it releases the slot.
pub struct RequestPermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for RequestPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }
}
