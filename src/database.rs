//! Backend-opaque database and transaction facade.

use roster_core::txn::{drive, drive_read_only, TransactionOps, TxnCore, TxOutcome};
use roster_core::{Key, Record, Result, Timeout};
use roster_memstore::{MemoryDatabase, MemoryTransaction};
use roster_schema::Entity;
use roster_sqlstore::{SqliteDatabase, SqliteTransaction};
use std::path::Path;

/// A roster database, backed by the mock store or SQLite.
///
/// Callers cannot observe which backend they hold: both expose the same
/// error taxonomy, cascade semantics, and savepoint discipline.
#[derive(Clone)]
pub enum Database {
    /// Snapshot-isolated in-process mock store.
    Memory(MemoryDatabase),
    /// Connection-pool-backed SQLite store.
    Sqlite(SqliteDatabase),
}

impl Database {
    /// A fresh mock-store database.
    pub fn in_memory() -> Self {
        Database::Memory(MemoryDatabase::new())
    }

    /// Open (creating if needed) a SQLite database file.
    pub fn open_sqlite(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Database::Sqlite(SqliteDatabase::open(path)?))
    }

    /// Begin a transaction, waiting for the backend's isolation resource
    /// per `timeout`.
    pub fn begin_transaction(&self, timeout: Timeout) -> Result<Transaction> {
        match self {
            Database::Memory(db) => Ok(Transaction::Memory(db.begin_transaction(timeout)?)),
            Database::Sqlite(db) => Ok(Transaction::Sqlite(db.begin_transaction(timeout)?)),
        }
    }

    /// Begin, run `f`, and commit or roll back on its outcome; on error,
    /// roll back and re-throw, attaching a secondary rollback failure as
    /// the suppressed cause.
    pub fn do_transaction<T, F>(&self, timeout: Timeout, f: F) -> Result<T>
    where
        T: TxOutcome,
        F: FnOnce(&mut Transaction) -> Result<T>,
    {
        drive(self.begin_transaction(timeout)?, f)
    }

    /// Like [`Database::do_transaction`] but always rolls back, whatever
    /// `f` returns — a pure read path.
    pub fn do_rtransaction<T, F>(&self, timeout: Timeout, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction) -> Result<T>,
    {
        drive_read_only(self.begin_transaction(timeout)?, f)
    }

    /// Release the backend's resources (pool drain / store teardown).
    pub fn close(&self) -> Result<()> {
        match self {
            Database::Memory(db) => db.close(),
            Database::Sqlite(db) => db.close(),
        }
    }
}

/// A transaction from either backend.
pub enum Transaction {
    Memory(MemoryTransaction),
    Sqlite(SqliteTransaction),
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transaction::Memory(_) => f.write_str("Transaction::Memory"),
            Transaction::Sqlite(_) => f.write_str("Transaction::Sqlite"),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $tx:ident => $call:expr) => {
        match $self {
            Transaction::Memory($tx) => $call,
            Transaction::Sqlite($tx) => $call,
        }
    };
}

impl TransactionOps for Transaction {
    fn txn_core(&self) -> &TxnCore {
        delegate!(self, tx => tx.txn_core())
    }

    fn txn_core_mut(&mut self) -> &mut TxnCore {
        delegate!(self, tx => tx.txn_core_mut())
    }

    fn sp_save(&mut self, name: &str) -> Result<()> {
        delegate!(self, tx => tx.sp_save(name))
    }

    fn sp_release(&mut self, name: &str) -> Result<()> {
        delegate!(self, tx => tx.sp_release(name))
    }

    fn sp_restore(&mut self, name: &str) -> Result<()> {
        delegate!(self, tx => tx.sp_restore(name))
    }

    fn do_commit(&mut self) -> Result<()> {
        delegate!(self, tx => tx.do_commit())
    }

    fn do_rollback(&mut self) -> Result<()> {
        delegate!(self, tx => tx.do_rollback())
    }

    fn do_insert(&mut self, entity: Entity, key: &Key, attrs: &Record) -> Result<bool> {
        delegate!(self, tx => tx.do_insert(entity, key, attrs))
    }

    fn do_load(&mut self, entity: Entity, key: &Key) -> Result<Option<Record>> {
        delegate!(self, tx => tx.do_load(entity, key))
    }

    fn do_alter(&mut self, entity: Entity, key: &Key, changes: &Record) -> Result<bool> {
        delegate!(self, tx => tx.do_alter(entity, key, changes))
    }

    fn do_delete(&mut self, entity: Entity, key: &Key) -> Result<bool> {
        delegate!(self, tx => tx.do_delete(entity, key))
    }

    fn do_delete_all(&mut self, entity: Entity) -> Result<bool> {
        delegate!(self, tx => tx.do_delete_all(entity))
    }

    fn do_find_all(&mut self, entity: Entity) -> Result<Vec<Key>> {
        delegate!(self, tx => tx.do_find_all(entity))
    }
}
