use std::fmt::{self, Debug, Display, Formatter};

use thiserror::Error;

use crate::client::Client;
use crate::dsn::DsnError;

use super::connection::Connection;

/// An error from pool construction, acquisition, release or shutdown.
#[derive(Debug, Error)]
pub enum PoolError<E> {
    /// The pool configuration was rejected before any connection attempt
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// The database could not be opened or failed a liveness probe
    #[error("Connection error: {0}")]
    Connection(#[source] E),
    /// A connection was released to a pool which did not hand it out
    #[error("Released a connection that does not belong to the pool")]
    ProtocolViolation,
    /// The resource pool is closed
    #[error("The connection pool is closed")]
    PoolClosed,
    /// There are too many waiters
    #[error("The connection pool is occupied")]
    PoolBusy,
    /// The acquire timed out
    #[error("The request timed out")]
    Timeout,
}

impl<E> PoolError<E> {
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// A configuration error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_concurrent must be greater than zero")]
    ZeroCapacity,
    #[error("probe_interval must be greater than zero")]
    ZeroProbeInterval,
    #[error(transparent)]
    InvalidDsn(#[from] DsnError),
}

/// An error from `Pool::release`.
///
/// A connection the pool refused to take back is handed back to the caller,
/// still counted against the pool that issued it.
pub struct ReleaseError<C: Client> {
    conn: Option<Connection<C>>,
    error: PoolError<C::Error>,
}

impl<C: Client> ReleaseError<C> {
    pub(crate) fn new(error: PoolError<C::Error>, conn: Option<Connection<C>>) -> Self {
        Self { conn, error }
    }

    pub fn error(&self) -> &PoolError<C::Error> {
        &self.error
    }

    /// Take back the rejected connection, if the pool did not consume it.
    pub fn into_connection(self) -> Option<Connection<C>> {
        self.conn
    }

    /// Discard any rejected connection, returning its capacity to the pool
    /// it came from.
    pub fn into_error(self) -> PoolError<C::Error> {
        self.error
    }
}

impl<C: Client> Debug for ReleaseError<C>
where
    C::Error: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseError")
            .field("error", &self.error)
            .field("returned", &self.conn.is_some())
            .finish()
    }
}

impl<C: Client> Display for ReleaseError<C>
where
    C::Error: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.error, f)
    }
}

impl<C: Client> std::error::Error for ReleaseError<C>
where
    C::Error: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<C: Client> From<ReleaseError<C>> for PoolError<C::Error> {
    fn from(err: ReleaseError<C>) -> Self {
        err.into_error()
    }
}
