//! SQLite database handle and builder.

use std::path::{Path, PathBuf};

use roster_core::txn::{drive, drive_read_only, TxOutcome};
use roster_core::{Error, Result, Timeout};
use rusqlite::Connection;

use crate::ddl;
use crate::map_sql_err;
use crate::pool::ConnectionPool;
use crate::txn::SqliteTransaction;

const DEFAULT_POOL_SIZE: usize = 4;

/// The SQLite-backed database.
///
/// Connections are created eagerly at open (schema applied through the
/// first one) and live in a pool; each transaction owns one exclusively
/// from `begin_transaction` until commit/rollback returns it.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: ConnectionPool,
}

impl SqliteDatabase {
    /// Open (creating if needed) a database file with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create a builder for database configuration.
    pub fn builder() -> SqliteDatabaseBuilder {
        SqliteDatabaseBuilder::new()
    }

    /// Begin a transaction on a pooled connection, waiting per `timeout`.
    pub fn begin_transaction(&self, timeout: Timeout) -> Result<SqliteTransaction> {
        let conn = self.pool.checkout(timeout)?;
        if let Err(err) = conn.execute_batch("BEGIN;") {
            // The connection stays usable; give it back before failing.
            self.pool.checkin(conn);
            return Err(map_sql_err(err));
        }
        tracing::debug!("sql transaction began");
        Ok(SqliteTransaction::new(conn, self.pool.clone()))
    }

    /// Begin, run `f`, and commit or roll back on its outcome; on error,
    /// roll back and re-throw with the suppressed-cause rule.
    pub fn do_transaction<T, F>(&self, timeout: Timeout, f: F) -> Result<T>
    where
        T: TxOutcome,
        F: FnOnce(&mut SqliteTransaction) -> Result<T>,
    {
        drive(self.begin_transaction(timeout)?, f)
    }

    /// Like [`SqliteDatabase::do_transaction`] but always rolls back.
    pub fn do_rtransaction<T, F>(&self, timeout: Timeout, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteTransaction) -> Result<T>,
    {
        drive_read_only(self.begin_transaction(timeout)?, f)
    }

    /// Drain the pool. In-flight transactions may finish; their connections
    /// are dropped on check-in.
    pub fn close(&self) -> Result<()> {
        self.pool.close();
        Ok(())
    }
}

/// Builder for [`SqliteDatabase`].
pub struct SqliteDatabaseBuilder {
    path: Option<PathBuf>,
    pool_size: usize,
}

impl SqliteDatabaseBuilder {
    /// Default settings: no path yet, four pooled connections.
    pub fn new() -> Self {
        SqliteDatabaseBuilder {
            path: None,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Set the database file path.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set how many connections the pool holds.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    /// Open the database: create connections, apply the schema, build the
    /// pool.
    pub fn open(self) -> Result<SqliteDatabase> {
        let path = self
            .path
            .ok_or_else(|| Error::Database("no database path configured".into()))?;
        let mut connections = Vec::with_capacity(self.pool_size);
        for i in 0..self.pool_size {
            let conn = Connection::open(&path).map_err(map_sql_err)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(map_sql_err)?;
            // These two answer with a row; query them instead of executing.
            conn.query_row("PRAGMA busy_timeout = 5000", [], |_| Ok(()))
                .map_err(map_sql_err)?;
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
                .map_err(map_sql_err)?;
            if i == 0 {
                ddl::create_schema(&conn)?;
            }
            connections.push(conn);
        }
        tracing::info!(path = %path.display(), pool = self.pool_size, "sqlite database open");
        Ok(SqliteDatabase {
            pool: ConnectionPool::new(connections),
        })
    }
}

impl Default for SqliteDatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
