//! Closure-driven transaction execution.
//!
//! Implemented once so every database handle (and the facade) shares the
//! same commit/rollback/compensation behavior.

use crate::error::Result;
use crate::txn::{TransactionOps, TxOutcome};

/// Run `f` against a fresh transaction: commit on a commit-worthy result,
/// roll back otherwise. If `f` fails, attempt a rollback and attach any
/// secondary failure as the suppressed cause of the original error.
pub fn drive<TX, T, F>(mut tx: TX, f: F) -> Result<T>
where
    TX: TransactionOps,
    T: TxOutcome,
    F: FnOnce(&mut TX) -> Result<T>,
{
    match f(&mut tx) {
        Ok(outcome) => {
            if outcome.should_commit() {
                tx.commit()?;
            } else {
                tx.rollback()?;
            }
            Ok(outcome)
        }
        Err(err) => match tx.rollback() {
            Ok(()) => Err(err),
            Err(rollback_err) => Err(err.with_rollback_failure(rollback_err)),
        },
    }
}

/// Like [`drive`], but always rolls back: a pure read path that can never
/// mutate durable state, whatever `f` returns.
pub fn drive_read_only<TX, T, F>(mut tx: TX, f: F) -> Result<T>
where
    TX: TransactionOps,
    F: FnOnce(&mut TX) -> Result<T>,
{
    match f(&mut tx) {
        Ok(value) => {
            tx.rollback()?;
            Ok(value)
        }
        Err(err) => match tx.rollback() {
            Ok(()) => Err(err),
            Err(rollback_err) => Err(err.with_rollback_failure(rollback_err)),
        },
    }
}
