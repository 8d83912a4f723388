//! Convenience re-exports for consumers of the data-access layer.
//!
//! ```ignore
//! use rosterdb::prelude::*;
//! ```

pub use crate::database::{Database, Transaction};
pub use roster_core::txn::{DomainOps, TransactionOps, TxOutcome};
pub use roster_core::{record, Error, Key, Record, Result, Timeout, Value};
pub use roster_schema::{DeletePolicy, Entity};
