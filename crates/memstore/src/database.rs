//! Mock-store database handle.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use roster_core::txn::{drive, drive_read_only, TxOutcome};
use roster_core::{Error, Result, Timeout};

use crate::store::TableSet;
use crate::txn::MemoryTransaction;

pub(crate) struct Slot {
    pub(crate) busy: bool,
    pub(crate) closed: bool,
}

pub(crate) struct Inner {
    /// Canonical state. Overwritten only at commit time, by exactly the
    /// committing transaction.
    pub(crate) canonical: Mutex<TableSet>,
    /// Single transaction slot: only one transaction is ever in flight.
    pub(crate) slot: Mutex<Slot>,
    pub(crate) available: Condvar,
}

/// The in-memory mock database.
///
/// `begin_transaction` hands out a snapshot of canonical state; the slot
/// lock guarantees strict mutual exclusion between transactions.
#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Arc<Inner>,
}

impl MemoryDatabase {
    /// Create an empty mock database.
    pub fn new() -> Self {
        MemoryDatabase {
            inner: Arc::new(Inner {
                canonical: Mutex::new(TableSet::new()),
                slot: Mutex::new(Slot { busy: false, closed: false }),
                available: Condvar::new(),
            }),
        }
    }

    /// Begin a transaction, waiting for the slot per `timeout`.
    pub fn begin_transaction(&self, timeout: Timeout) -> Result<MemoryTransaction> {
        self.acquire_slot(timeout)?;
        let working = self.inner.canonical.lock().clone();
        tracing::debug!("mock transaction began");
        Ok(MemoryTransaction::new(Arc::clone(&self.inner), working))
    }

    /// Begin, run `f`, and commit or roll back on its outcome; on error,
    /// roll back and re-throw with the suppressed-cause rule.
    pub fn do_transaction<T, F>(&self, timeout: Timeout, f: F) -> Result<T>
    where
        T: TxOutcome,
        F: FnOnce(&mut MemoryTransaction) -> Result<T>,
    {
        drive(self.begin_transaction(timeout)?, f)
    }

    /// Like [`MemoryDatabase::do_transaction`] but always rolls back.
    pub fn do_rtransaction<T, F>(&self, timeout: Timeout, f: F) -> Result<T>
    where
        F: FnOnce(&mut MemoryTransaction) -> Result<T>,
    {
        drive_read_only(self.begin_transaction(timeout)?, f)
    }

    /// Tear the store down. Later `begin_transaction` calls fail; the
    /// transaction currently holding the slot may still finish.
    pub fn close(&self) -> Result<()> {
        let mut slot = self.inner.slot.lock();
        slot.closed = true;
        self.inner.available.notify_all();
        Ok(())
    }

    fn acquire_slot(&self, timeout: Timeout) -> Result<()> {
        let deadline = match timeout {
            Timeout::Bounded(d) => Some(Instant::now() + d),
            _ => None,
        };
        let mut slot = self.inner.slot.lock();
        loop {
            if slot.closed {
                return Err(Error::Database("database is closed".into()));
            }
            if !slot.busy {
                slot.busy = true;
                return Ok(());
            }
            match timeout {
                Timeout::Immediate => {
                    return Err(Error::Timeout("transaction slot is busy".into()));
                }
                Timeout::Infinite => {
                    self.inner.available.wait(&mut slot);
                }
                Timeout::Bounded(_) => {
                    let deadline = deadline.expect("bounded wait has a deadline");
                    if self.inner.available.wait_until(&mut slot, deadline).timed_out()
                        && slot.busy
                    {
                        return Err(Error::Timeout(format!(
                            "transaction slot still busy after {}",
                            timeout
                        )));
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn canonical_snapshot(&self) -> TableSet {
        self.inner.canonical.lock().clone()
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    /// Give the slot back and wake one waiter. Idempotence is handled by
    /// the transaction's `slot_released` guard.
    pub(crate) fn release_slot(&self) {
        let mut slot = self.slot.lock();
        slot.busy = false;
        self.available.notify_one();
    }
}
