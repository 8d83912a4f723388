//! SQLite backend for rosterdb
//!
//! Transactions map onto native `BEGIN`/`SAVEPOINT` statements over a
//! pooled connection; generic CRUD is composed from the shared entity
//! descriptors, and referential integrity is delegated to the schema's real
//! foreign-key clauses — generated from the same descriptors the mock
//! store walks, so the two declarations cannot drift.

mod codec;
pub mod database;
pub mod ddl;
mod pool;
pub mod txn;

pub use database::{SqliteDatabase, SqliteDatabaseBuilder};
pub use txn::SqliteTransaction;

use roster_core::Error;

/// Tag a driver-level fault with the uniform taxonomy: foreign-key
/// violations become [`Error::Constraint`], everything else the generic
/// [`Error::Database`], so the transaction core can treat backend failures
/// identically to the mock store's.
pub(crate) fn map_sql_err(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(fail, _)
            if fail.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Constraint(err.to_string())
        }
        _ => Error::Database(err.to_string()),
    }
}
