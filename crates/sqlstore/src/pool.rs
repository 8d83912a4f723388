//! Connection pool.
//!
//! A fixed set of connections behind a mutex + condvar. Checkout honors the
//! three timeout modes; a connection freed after its waiter already gave up
//! simply re-enters the free list for the next caller — never leaked.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use roster_core::{Error, Result, Timeout};
use rusqlite::Connection;

struct PoolState {
    idle: Vec<Connection>,
    closed: bool,
}

struct PoolInner {
    state: Mutex<PoolState>,
    available: Condvar,
}

/// Shared handle to the connection pool.
#[derive(Clone)]
pub(crate) struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub(crate) fn new(connections: Vec<Connection>) -> Self {
        ConnectionPool {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState { idle: connections, closed: false }),
                available: Condvar::new(),
            }),
        }
    }

    /// Take a connection, waiting per `timeout`.
    pub(crate) fn checkout(&self, timeout: Timeout) -> Result<Connection> {
        let deadline = match timeout {
            Timeout::Bounded(d) => Some(Instant::now() + d),
            _ => None,
        };
        let mut state = self.inner.state.lock();
        loop {
            if state.closed {
                return Err(Error::Database("database is closed".into()));
            }
            if let Some(conn) = state.idle.pop() {
                return Ok(conn);
            }
            match timeout {
                Timeout::Immediate => {
                    return Err(Error::Timeout("no pooled connection available".into()));
                }
                Timeout::Infinite => {
                    self.inner.available.wait(&mut state);
                }
                Timeout::Bounded(_) => {
                    let deadline = deadline.expect("bounded wait has a deadline");
                    if self.inner.available.wait_until(&mut state, deadline).timed_out()
                        && state.idle.is_empty()
                    {
                        return Err(Error::Timeout(format!(
                            "no pooled connection after {}",
                            timeout
                        )));
                    }
                }
            }
        }
    }

    /// Return a connection. After close, late returns are dropped instead
    /// of re-pooled.
    pub(crate) fn checkin(&self, conn: Connection) {
        let mut state = self.inner.state.lock();
        if state.closed {
            drop(state);
            drop(conn);
            return;
        }
        state.idle.push(conn);
        self.inner.available.notify_one();
    }

    /// Drain the free list and refuse further checkouts.
    pub(crate) fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        state.idle.clear();
        self.inner.available.notify_all();
    }
}
