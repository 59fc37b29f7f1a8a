use std::future::Future;
use std::sync::Arc;

use futures_lite::future::{Boxed as BoxFuture, FutureExt};

use crate::dsn::Dsn;

/// Limits applied to the client's own connection management when a pool is
/// constructed around it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClientLimits {
    /// Maximum number of simultaneously open physical connections
    pub max_open: usize,
    /// Maximum number of idle physical connections retained by the client
    pub max_idle: usize,
}

impl ClientLimits {
    /// Derive the client limits for a pool admitting `max_concurrent` callers.
    pub fn for_capacity(max_concurrent: usize) -> Self {
        Self {
            max_open: max_concurrent,
            max_idle: max_concurrent / 2,
        }
    }
}

/// An opened database client which is shared by every connection handed out
/// by a pool.
///
/// The returned futures must be `'static`, so implementations are expected to
/// be cheap handles over shared state.
pub trait Client: Send + Sync + 'static {
    type Error: Send + 'static;

    /// Perform a lightweight round-trip to confirm the database is reachable.
    fn ping(&self) -> BoxFuture<Result<(), Self::Error>>;

    /// Apply the internal connection limits derived from the pool capacity.
    fn set_limits(&self, _limits: ClientLimits) {}

    /// Close the client and any physical connections it holds.
    fn close(&self) -> BoxFuture<Result<(), Self::Error>>;
}

impl<C: Client> Client for Arc<C> {
    type Error = C::Error;

    fn ping(&self) -> BoxFuture<Result<(), Self::Error>> {
        (**self).ping()
    }

    fn set_limits(&self, limits: ClientLimits) {
        (**self).set_limits(limits)
    }

    fn close(&self) -> BoxFuture<Result<(), Self::Error>> {
        (**self).close()
    }
}

/// Opens a `Client` for a connection target.
pub trait Connect<C: Client>: Send + Sync {
    fn connect(&self, dsn: Dsn) -> BoxFuture<Result<C, C::Error>>;
}

impl<C, F, R> Connect<C> for F
where
    C: Client,
    F: Fn(Dsn) -> R + Send + Sync,
    R: Future<Output = Result<C, C::Error>> + Send + 'static,
{
    fn connect(&self, dsn: Dsn) -> BoxFuture<Result<C, C::Error>> {
        (self)(dsn).boxed()
    }
}
