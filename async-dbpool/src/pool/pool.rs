use std::fmt::{self, Debug, Formatter};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::client::Client;

use super::acquire::Acquire;
use super::connection::Connection;
use super::error::{PoolError, ReleaseError};
use super::gate::Gate;

const OPEN: u8 = 0;
const CLOSED: u8 = 1;

pub(crate) struct PoolInternal<C: Client> {
    pub(crate) acquire_timeout: Option<Duration>,
    pub(crate) client: C,
    pub(crate) gate: Gate,
    pub(crate) probe_interval: Duration,
    state: AtomicU8,
}

impl<C: Client> PoolInternal<C> {
    pub fn new(
        client: C,
        max_concurrent: usize,
        max_waiters: Option<usize>,
        probe_interval: Duration,
        acquire_timeout: Option<Duration>,
    ) -> Self {
        Self {
            acquire_timeout,
            client,
            gate: Gate::new(max_concurrent, max_waiters),
            probe_interval,
            state: AtomicU8::new(OPEN),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }
}

/// A snapshot of the pool's admission state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolStatus {
    pub in_use: usize,
    pub max_concurrent: usize,
    pub waiters: usize,
    pub closed: bool,
}

/// A pool metering concurrent use of a single shared database client.
///
/// Clones of a `Pool` share the same client and capacity.
pub struct Pool<C: Client> {
    pub(crate) inner: Arc<PoolInternal<C>>,
}

impl<C: Client> Pool<C> {
    pub(crate) fn new(inner: PoolInternal<C>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns an `Acquire<C>`, a `Future` resolving to a `Connection<C>`
    /// once capacity is available, using the configured acquire timeout.
    /// A timeout too large to represent as an `Instant` waits forever.
    pub fn acquire(&self) -> Acquire<C> {
        let deadline = self
            .inner
            .acquire_timeout
            .and_then(|dur| Instant::now().checked_add(dur));
        Acquire::new(self.clone(), deadline)
    }

    /// Acquire a connection, failing with `PoolError::Timeout` if none is
    /// available within `timeout`. A timeout too large to represent as an
    /// `Instant` waits forever.
    pub fn acquire_timeout(&self, timeout: Duration) -> Acquire<C> {
        Acquire::new(self.clone(), Instant::now().checked_add(timeout))
    }

    /// Acquire a connection, failing with `PoolError::Timeout` if none is
    /// available by `deadline`.
    pub fn acquire_deadline(&self, deadline: Instant) -> Acquire<C> {
        Acquire::new(self.clone(), Some(deadline))
    }

    /// Acquire a connection only if capacity is immediately available.
    pub fn try_acquire(&self) -> Option<Connection<C>> {
        if !self.inner.is_closed() && self.inner.gate.try_acquire() {
            Some(Connection::new(self.inner.clone()))
        } else {
            None
        }
    }

    /// Return a connection to the pool.
    ///
    /// A connection handed out by a different pool is rejected with
    /// `PoolError::ProtocolViolation` and this pool's count is untouched. The
    /// connection is handed back inside the `ReleaseError`, still checked out
    /// from the pool it came from. After close the capacity is returned and
    /// the release fails with `PoolError::PoolClosed`.
    pub fn release(&self, conn: Connection<C>) -> Result<(), ReleaseError<C>> {
        if !self.owns(&conn) {
            error!("attempted to release a connection that does not belong to the pool");
            return Err(ReleaseError::new(PoolError::ProtocolViolation, Some(conn)));
        }
        let closed = self.inner.is_closed();
        drop(conn);
        if closed {
            Err(ReleaseError::new(PoolError::PoolClosed, None))
        } else {
            Ok(())
        }
    }

    /// Check whether `conn` was handed out by this pool.
    pub fn owns(&self, conn: &Connection<C>) -> bool {
        Arc::ptr_eq(&self.inner, &conn.inner)
    }

    /// Close the pool and the shared client. Any pending acquisitions fail
    /// with `PoolError::PoolClosed`. Calling this more than once is a no-op.
    pub async fn close(&self) -> Result<(), PoolError<C::Error>> {
        if self
            .inner
            .state
            .compare_exchange(OPEN, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("pool already closed");
            return Ok(());
        }
        info!(in_use = self.in_use(), "closing connection pool");
        self.inner.gate.notify_all();
        self.inner
            .client
            .close()
            .await
            .map_err(PoolError::Connection)
    }

    /// The shared client handle.
    pub fn client(&self) -> &C {
        &self.inner.client
    }

    pub fn in_use(&self) -> usize {
        self.inner.gate.in_use()
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.gate.max_concurrent()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            in_use: self.inner.gate.in_use(),
            max_concurrent: self.inner.gate.max_concurrent(),
            waiters: self.inner.gate.waiters(),
            closed: self.inner.is_closed(),
        }
    }
}

impl<C: Client> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Client> Debug for Pool<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("in_use", &self.in_use())
            .field("max_concurrent", &self.max_concurrent())
            .field("closed", &self.is_closed())
            .finish()
    }
}
