use std::sync::atomic::{AtomicUsize, Ordering};

use event_listener::{Event, EventListener};
use tracing::error;

/// Admission control for a pool: tracks the number of outstanding
/// acquisitions against a fixed bound and wakes waiters as capacity frees up.
pub(crate) struct Gate {
    event: Event,
    in_use: AtomicUsize,
    max_concurrent: usize,
    max_waiters: Option<usize>,
    waiters: AtomicUsize,
}

impl Gate {
    pub fn new(max_concurrent: usize, max_waiters: Option<usize>) -> Self {
        Self {
            event: Event::new(),
            in_use: AtomicUsize::new(0),
            max_concurrent,
            max_waiters,
            waiters: AtomicUsize::new(0),
        }
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    /// Register interest in the next release. Must be called before
    /// re-checking capacity, or a release between the two may be missed.
    pub fn listen(&self) -> EventListener {
        self.event.listen()
    }

    /// Claim one unit of capacity if any is available.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.in_use.load(Ordering::Acquire);
        loop {
            if count >= self.max_concurrent {
                return false;
            }
            match self.in_use.compare_exchange_weak(
                count,
                count + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(c) => count = c,
            }
        }
    }

    /// Return one unit of capacity and wake a single waiter.
    pub fn release(&self) {
        let mut count = self.in_use.load(Ordering::Acquire);
        loop {
            if count == 0 {
                error!("connection released with no outstanding acquisitions");
                return;
            }
            match self.in_use.compare_exchange_weak(
                count,
                count - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(c) => count = c,
            }
        }
        self.event.notify_additional(1);
    }

    /// Wake every waiter, used when the pool is closed.
    pub fn notify_all(&self) {
        self.event.notify(usize::MAX);
    }

    pub fn try_add_waiter(&self) -> bool {
        let mut count = self.waiters.load(Ordering::Acquire);
        loop {
            if let Some(max) = self.max_waiters {
                if count >= max {
                    return false;
                }
            }
            match self.waiters.compare_exchange_weak(
                count,
                count + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(c) => count = c,
            }
        }
    }

    pub fn remove_waiter(&self) {
        self.waiters.fetch_sub(1, Ordering::AcqRel);
    }
}
