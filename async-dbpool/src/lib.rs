//! An admission-controlled pool over a single shared database client.
//!
//! The pool hands out `Connection` guards which all dereference to the same
//! client, limiting how many callers may use it at once. When the pool is
//! saturated, acquisition waits for a release while periodically probing the
//! database, and fails if the database stops responding.
//!
//! ```no_run
//! # use async_dbpool::{Client, Dsn, PoolConfig};
//! # async fn run<C: Client>(connect: impl Fn(Dsn) -> futures_lite::future::Boxed<Result<C, C::Error>> + Send + Sync) -> Result<(), async_dbpool::PoolError<C::Error>> {
//! let pool = PoolConfig::new(10)
//!     .open("root@tcp(localhost:3306)/inventory", connect)
//!     .await?;
//! let conn = pool.acquire().await?;
//! // issue queries through `conn`
//! pool.release(conn)?;
//! pool.close().await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub use self::client::{Client, ClientLimits, Connect};

mod dsn;
pub use self::dsn::{Dsn, DsnError};

mod pool;
pub use self::pool::{
    Acquire, ConfigError, Connection, Pool, PoolConfig, PoolError, PoolStatus, ReleaseError,
};
