use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use async_io::Timer;
use event_listener::EventListener;
use futures_lite::future::{self, Boxed as BoxFuture};
use tracing::{debug, warn};

use crate::client::Client;

use super::connection::Connection;
use super::error::PoolError;
use super::pool::Pool;

enum AcquireState<E> {
    Init,
    Probe(EventListener, BoxFuture<Result<(), E>>, Option<Timer>),
    Waiting(EventListener, Option<Timer>),
}

fn poll_timer(timer: &mut Option<Timer>, cx: &mut Context<'_>) -> bool {
    timer
        .as_mut()
        .map(|timer| Pin::new(timer).poll(cx).is_ready())
        .unwrap_or(false)
}

/// A Future resolving to a `Connection<C>` or a `PoolError`.
///
/// While the pool is saturated the database is probed at most once per probe
/// interval; a failed probe ends the wait with `PoolError::Connection`. A
/// probe that never completes is abandoned when capacity is released, the
/// pool is closed or the deadline passes. Dropping the future abandons the
/// wait.
pub struct Acquire<C: Client> {
    deadline: Option<Instant>,
    last_probe: Option<Instant>,
    pool: Pool<C>,
    state: Option<AcquireState<C::Error>>,
    waiting: bool,
}

impl<C: Client> Acquire<C> {
    pub(crate) fn new(pool: Pool<C>, deadline: Option<Instant>) -> Self {
        Self {
            deadline,
            last_probe: None,
            pool,
            state: Some(AcquireState::Init),
            waiting: false,
        }
    }

    /// Block the current thread until the acquisition completes.
    pub fn wait(self) -> Result<Connection<C>, PoolError<C::Error>> {
        future::block_on(self)
    }

    fn complete(
        &mut self,
        result: Result<Connection<C>, PoolError<C::Error>>,
    ) -> Poll<Result<Connection<C>, PoolError<C::Error>>> {
        if self.waiting {
            self.waiting = false;
            self.pool.inner.gate.remove_waiter();
        }
        Poll::Ready(result)
    }

    fn expired(&self, now: Instant) -> bool {
        self.deadline.map(|d| d <= now).unwrap_or(false)
    }

    /// Whether another probe should be issued. An interval which overflows
    /// `Instant` is never reached.
    fn probe_due(&self, now: Instant) -> bool {
        match self.last_probe {
            Some(last) => last
                .checked_add(self.pool.inner.probe_interval)
                .map(|next| now >= next)
                .unwrap_or(false),
            None => true,
        }
    }

    /// The next instant at which the wait should be re-evaluated, if any.
    fn next_check(&self, now: Instant) -> Option<Instant> {
        let next = self
            .last_probe
            .unwrap_or(now)
            .checked_add(self.pool.inner.probe_interval);
        match (next, self.deadline) {
            (Some(next), Some(deadline)) => Some(next.min(deadline)),
            (next, deadline) => next.or(deadline),
        }
    }
}

impl<C: Client> Future for Acquire<C> {
    type Output = Result<Connection<C>, PoolError<C::Error>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => {
                // future already completed
                return Poll::Ready(Err(PoolError::PoolClosed));
            }
        };

        loop {
            state = match state {
                AcquireState::Init => {
                    if self.pool.is_closed() {
                        return self.complete(Err(PoolError::PoolClosed));
                    }
                    if let Some(conn) = self.pool.try_acquire() {
                        return self.complete(Ok(conn));
                    }

                    let listener = self.pool.inner.gate.listen();
                    // Capacity may have been released before the listener
                    // was registered
                    if let Some(conn) = self.pool.try_acquire() {
                        return self.complete(Ok(conn));
                    }

                    let now = Instant::now();
                    if self.expired(now) {
                        return self.complete(Err(PoolError::Timeout));
                    }

                    if !self.waiting {
                        if !self.pool.inner.gate.try_add_waiter() {
                            return Poll::Ready(Err(PoolError::PoolBusy));
                        }
                        self.waiting = true;
                        debug!(
                            in_use = self.pool.in_use(),
                            "connection pool saturated, waiting"
                        );
                    }

                    if self.probe_due(now) {
                        let deadline = self.deadline.map(Timer::at);
                        AcquireState::Probe(listener, self.pool.inner.client.ping(), deadline)
                    } else {
                        let check = self.next_check(now).map(Timer::at);
                        AcquireState::Waiting(listener, check)
                    }
                }

                AcquireState::Probe(mut listener, mut probe, mut deadline) => {
                    match probe.as_mut().poll(cx) {
                        Poll::Pending => {
                            if Pin::new(&mut listener).poll(cx).is_ready() {
                                debug!("abandoning liveness probe, pool state changed");
                                AcquireState::Init
                            } else if poll_timer(&mut deadline, cx) {
                                debug!("abandoning liveness probe, deadline passed");
                                AcquireState::Init
                            } else {
                                self.state
                                    .replace(AcquireState::Probe(listener, probe, deadline));
                                return Poll::Pending;
                            }
                        }
                        Poll::Ready(Err(err)) => {
                            warn!("liveness probe failed while waiting for a connection");
                            return self.complete(Err(PoolError::Connection(err)));
                        }
                        Poll::Ready(Ok(())) => {
                            let now = Instant::now();
                            self.last_probe.replace(now);
                            let check = self.next_check(now).map(Timer::at);
                            AcquireState::Waiting(listener, check)
                        }
                    }
                }

                AcquireState::Waiting(mut listener, mut timer) => {
                    if Pin::new(&mut listener).poll(cx).is_ready() {
                        // Capacity was released or the pool was closed
                        AcquireState::Init
                    } else if poll_timer(&mut timer, cx) {
                        AcquireState::Init
                    } else {
                        self.state.replace(AcquireState::Waiting(listener, timer));
                        return Poll::Pending;
                    }
                }
            };
        }
    }
}

impl<C: Client> Drop for Acquire<C> {
    fn drop(&mut self) {
        if self.waiting {
            self.pool.inner.gate.remove_waiter();
        }
    }
}

impl<C: Client> Debug for Acquire<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquire")
            .field("deadline", &self.deadline)
            .field("waiting", &self.waiting)
            .finish()
    }
}
