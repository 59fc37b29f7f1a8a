use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use async_dbpool::{Client, ClientLimits};
use futures_lite::future::{self, Boxed as BoxFuture, FutureExt};

pub struct AtomicCounter {
    count: AtomicUsize,
}

#[allow(unused)]
impl AtomicCounter {
    pub fn new(val: usize) -> Self {
        Self {
            count: AtomicUsize::new(val),
        }
    }

    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn decrement(&self) -> usize {
        self.count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn value(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Raise the stored value to `val` if it is larger.
    pub fn record_max(&self, val: usize) {
        self.count.fetch_max(val, Ordering::SeqCst);
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockError(pub &'static str);

impl Display for MockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "mock error: {}", self.0)
    }
}

impl std::error::Error for MockError {}

#[derive(Default)]
pub struct MockState {
    pub closed: AtomicCounter,
    pub hanging: AtomicBool,
    pub limits: Mutex<Option<ClientLimits>>,
    pub pings: AtomicCounter,
    pub unreachable: AtomicBool,
}

/// A client whose liveness probe can be switched off or stalled from the
/// test.
#[derive(Clone, Default)]
pub struct MockClient {
    pub state: Arc<MockState>,
}

#[allow(unused)]
impl MockClient {
    pub fn set_reachable(&self, reachable: bool) {
        self.state.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Make pings never complete.
    pub fn set_hanging(&self, hanging: bool) {
        self.state.hanging.store(hanging, Ordering::SeqCst);
    }

    pub fn pings(&self) -> usize {
        self.state.pings.value()
    }

    pub fn closed(&self) -> usize {
        self.state.closed.value()
    }

    pub fn limits(&self) -> Option<ClientLimits> {
        *self.state.limits.lock().unwrap()
    }
}

impl Client for MockClient {
    type Error = MockError;

    fn ping(&self) -> BoxFuture<Result<(), MockError>> {
        self.state.pings.increment();
        if self.state.hanging.load(Ordering::SeqCst) {
            return future::pending().boxed();
        }
        let result = if self.state.unreachable.load(Ordering::SeqCst) {
            Err(MockError("unreachable"))
        } else {
            Ok(())
        };
        future::ready(result).boxed()
    }

    fn set_limits(&self, limits: ClientLimits) {
        self.state.limits.lock().unwrap().replace(limits);
    }

    fn close(&self) -> BoxFuture<Result<(), MockError>> {
        self.state.closed.increment();
        future::ready(Ok(())).boxed()
    }
}

/// Spin until `cond` holds.
#[allow(unused)]
pub fn spin_until(cond: impl Fn() -> bool) {
    while !cond() {
        thread::yield_now();
    }
}
