//! # rosterdb
//!
//! Transactional data-access layer for the roster project-matching system:
//! ACID-style transactions with nested, savepoint-based sub-transactions
//! over two interchangeable backends — an in-process mock store and SQLite
//! — with identical observable behavior from either.
//!
//! ```ignore
//! use rosterdb::prelude::*;
//!
//! let db = Database::in_memory();
//! let inserted = db.do_transaction(Timeout::Infinite, |tx| {
//!     tx.insert(Entity::User, 1, &record! { "email" => "a@b.co" })
//! })?;
//! assert!(inserted);
//! ```
//!
//! The route/business layer is expected to consume this crate through
//! [`Database`] and [`Transaction`] only; which backend sits underneath is
//! not observable.

pub mod database;
pub mod prelude;

pub use database::{Database, Transaction};

pub use roster_core::txn::{DomainOps, TransactionOps, TxOutcome, CHOICE_SLOTS};
pub use roster_core::{record, Error, Key, Record, Result, Timeout, Value};
pub use roster_schema::{DeletePolicy, Entity, EntityDescriptor, FieldKind};

pub use roster_memstore::MemoryDatabase;
pub use roster_sqlstore::{SqliteDatabase, SqliteDatabaseBuilder};
