mod acquire;
pub use acquire::Acquire;

mod config;
pub use config::PoolConfig;

mod connection;
pub use connection::Connection;

mod error;
pub use error::{ConfigError, PoolError, ReleaseError};

mod gate;

mod pool;
pub use pool::{Pool, PoolStatus};
