use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use crate::client::Client;

use super::pool::PoolInternal;

/// A checked-out unit of pool capacity.
///
/// Dereferences to the client shared by the pool. The capacity is returned
/// when the connection is passed to `Pool::release` or dropped.
pub struct Connection<C: Client> {
    pub(crate) inner: Arc<PoolInternal<C>>,
}

impl<C: Client> Connection<C> {
    pub(crate) fn new(inner: Arc<PoolInternal<C>>) -> Self {
        Self { inner }
    }

    /// The shared client handle.
    pub fn client(&self) -> &C {
        &self.inner.client
    }
}

impl<C: Client + Debug> Debug for Connection<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.debug_struct("Connection")
                .field("client", self.client())
                .field("in_use", &self.inner.gate.in_use())
                .finish()
        } else {
            Debug::fmt(self.client(), f)
        }
    }
}

impl<C: Client> Deref for Connection<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.client()
    }
}

impl<C: Client> Drop for Connection<C> {
    fn drop(&mut self) {
        self.inner.gate.release();
    }
}
