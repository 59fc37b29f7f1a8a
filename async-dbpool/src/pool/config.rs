use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{Client, ClientLimits, Connect};
use crate::dsn::Dsn;

use super::error::{ConfigError, PoolError};
use super::pool::{Pool, PoolInternal};

const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Builder for a `Pool`.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    acquire_timeout: Option<Duration>,
    max_concurrent: usize,
    max_waiters: Option<usize>,
    probe_interval: Duration,
}

impl PoolConfig {
    /// Start a configuration admitting at most `max_concurrent` simultaneous
    /// acquisitions.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            acquire_timeout: None,
            max_concurrent,
            max_waiters: None,
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    /// Default timeout for `Pool::acquire`. A zero duration waits forever.
    pub fn acquire_timeout(mut self, val: Duration) -> Self {
        if val.as_micros() > 0 {
            self.acquire_timeout.replace(val);
        } else {
            self.acquire_timeout.take();
        }
        self
    }

    pub fn max_waiters(mut self, val: usize) -> Self {
        self.max_waiters.replace(val);
        self
    }

    /// How often a waiting caller probes the database while the pool is
    /// saturated.
    pub fn probe_interval(mut self, val: Duration) -> Self {
        self.probe_interval = val;
        self
    }

    pub fn client_limits(&self) -> ClientLimits {
        ClientLimits::for_capacity(self.max_concurrent)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.probe_interval == Duration::from_secs(0) {
            return Err(ConfigError::ZeroProbeInterval);
        }
        Ok(())
    }

    /// Open a client for `target` using `connect`, then build the pool
    /// around it.
    pub async fn open<C, F>(self, target: &str, connect: F) -> Result<Pool<C>, PoolError<C::Error>>
    where
        C: Client,
        F: Connect<C>,
    {
        self.validate()?;
        let dsn: Dsn = target.parse().map_err(ConfigError::from)?;
        debug!(dsn = %dsn, "opening database client");
        let client = connect.connect(dsn).await.map_err(|err| {
            warn!("failed to open database client");
            PoolError::Connection(err)
        })?;
        self.build(client).await
    }

    /// Build a pool around an already opened client, after confirming it is
    /// reachable.
    pub async fn build<C: Client>(self, client: C) -> Result<Pool<C>, PoolError<C::Error>> {
        self.validate()?;
        client.ping().await.map_err(|err| {
            warn!("initial liveness probe failed");
            PoolError::Connection(err)
        })?;
        client.set_limits(self.client_limits());
        debug!(max_concurrent = self.max_concurrent, "connection pool ready");
        Ok(Pool::new(PoolInternal::new(
            client,
            self.max_concurrent,
            self.max_waiters,
            self.probe_interval,
            self.acquire_timeout,
        )))
    }
}
