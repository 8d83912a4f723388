//! SQL transaction over an exclusively-owned pooled connection.
//!
//! Savepoint primitives are 1:1 with native `SAVEPOINT` statements, using
//! the names the core generates, so the stack discipline is byte-for-byte
//! the mock store's. CRUD statements are composed from the entity
//! descriptors; the insert probes for an existing key first so a duplicate
//! reports `false` instead of a driver error.

use roster_core::txn::{TransactionOps, TxnCore};
use roster_core::{Error, Key, Record, Result};
use roster_schema::Entity;
use rusqlite::Connection;

use crate::codec;
use crate::map_sql_err;
use crate::pool::ConnectionPool;

/// A transaction against the SQLite backend.
pub struct SqliteTransaction {
    conn: Option<Connection>,
    pool: ConnectionPool,
    core: TxnCore,
}

impl SqliteTransaction {
    pub(crate) fn new(conn: Connection, pool: ConnectionPool) -> Self {
        SqliteTransaction {
            conn: Some(conn),
            pool,
            core: TxnCore::new(),
        }
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| Error::Database("connection already returned to the pool".into()))
    }

    /// Hand the connection back. After a failed COMMIT/ROLLBACK the
    /// connection state is unknown, so it is dropped instead of re-pooled.
    fn release_conn(&mut self, reusable: bool) {
        if let Some(conn) = self.conn.take() {
            if reusable {
                self.pool.checkin(conn);
            } else {
                tracing::warn!("dropping connection after failed transaction finalizer");
                drop(conn);
            }
        }
    }

    fn exec(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql).map_err(map_sql_err)
    }
}

impl TransactionOps for SqliteTransaction {
    fn txn_core(&self) -> &TxnCore {
        &self.core
    }

    fn txn_core_mut(&mut self) -> &mut TxnCore {
        &mut self.core
    }

    fn sp_save(&mut self, name: &str) -> Result<()> {
        self.exec(&format!("SAVEPOINT \"{}\";", name))
    }

    fn sp_release(&mut self, name: &str) -> Result<()> {
        // RELEASE also discards any frames stacked above `name`.
        self.exec(&format!("RELEASE SAVEPOINT \"{}\";", name))
    }

    fn sp_restore(&mut self, name: &str) -> Result<()> {
        // ROLLBACK TO rewinds but keeps the frame; RELEASE pops it so the
        // native stack tracks the core's.
        self.exec(&format!(
            "ROLLBACK TO \"{0}\"; RELEASE SAVEPOINT \"{0}\";",
            name
        ))
    }

    fn do_commit(&mut self) -> Result<()> {
        match self.exec("COMMIT;") {
            Ok(()) => {
                self.release_conn(true);
                Ok(())
            }
            Err(err) => {
                self.release_conn(false);
                Err(err)
            }
        }
    }

    fn do_rollback(&mut self) -> Result<()> {
        match self.exec("ROLLBACK;") {
            Ok(()) => {
                self.release_conn(true);
                Ok(())
            }
            Err(err) => {
                self.release_conn(false);
                Err(err)
            }
        }
    }

    fn do_insert(&mut self, entity: Entity, key: &Key, attrs: &Record) -> Result<bool> {
        let desc = entity.descriptor();
        let conn = self.conn()?;

        // Probe first: a duplicate key is an expected negative outcome, not
        // a driver error.
        let exists = conn
            .query_row(
                &format!(
                    "SELECT 1 FROM \"{}\" WHERE \"{}\" = ?1",
                    desc.table, desc.primary_key
                ),
                [codec::encode_key(key)],
                |_| Ok(()),
            )
            .map(|_| true)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(map_sql_err(other)),
            })?;
        if exists {
            return Ok(false);
        }

        let mut columns = vec![format!("\"{}\"", desc.primary_key)];
        let mut params = vec![codec::encode_key(key)];
        for field in desc.fields {
            columns.push(format!("\"{}\"", field.name));
            let value = attrs.get(field.name).cloned().unwrap_or(roster_core::Value::Null);
            params.push(codec::encode(&value));
        }
        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
        conn.execute(
            &format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                desc.table,
                columns.join(", "),
                placeholders.join(", ")
            ),
            rusqlite::params_from_iter(params),
        )
        .map_err(map_sql_err)?;
        Ok(true)
    }

    fn do_load(&mut self, entity: Entity, key: &Key) -> Result<Option<Record>> {
        let desc = entity.descriptor();
        let conn = self.conn()?;
        let columns: Vec<String> = desc
            .fields
            .iter()
            .map(|f| format!("\"{}\"", f.name))
            .collect();
        if columns.is_empty() {
            // Keyed presence rows (the namespace table before ownership):
            // the record is just "exists".
            let found = conn
                .query_row(
                    &format!(
                        "SELECT 1 FROM \"{}\" WHERE \"{}\" = ?1",
                        desc.table, desc.primary_key
                    ),
                    [codec::encode_key(key)],
                    |_| Ok(()),
                )
                .map(|_| true)
                .or_else(no_rows_as_false)?;
            return Ok(found.then(Record::new));
        }
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1",
            columns.join(", "),
            desc.table,
            desc.primary_key
        );
        let row = conn
            .query_row(&sql, [codec::encode_key(key)], |row| {
                let mut record = Record::with_capacity(desc.fields.len());
                for (idx, field) in desc.fields.iter().enumerate() {
                    // Defer codec errors so they surface as our taxonomy.
                    let raw = row.get_ref(idx)?;
                    record.insert(
                        field.name.to_string(),
                        codec::decode(raw, field.kind).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                idx,
                                raw.data_type(),
                                Box::new(std::io::Error::new(
                                    std::io::ErrorKind::InvalidData,
                                    e.to_string(),
                                )),
                            )
                        })?,
                    );
                }
                Ok(record)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(map_sql_err(other)),
            })?;
        Ok(row)
    }

    fn do_alter(&mut self, entity: Entity, key: &Key, changes: &Record) -> Result<bool> {
        let desc = entity.descriptor();
        let conn = self.conn()?;
        // Deterministic column order: follow the descriptor, not the map.
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for field in desc.fields {
            if let Some(value) = changes.get(field.name) {
                params.push(codec::encode(value));
                assignments.push(format!("\"{}\" = ?{}", field.name, params.len()));
            }
        }
        if assignments.is_empty() {
            return Ok(false);
        }
        params.push(codec::encode_key(key));
        let changed = conn
            .execute(
                &format!(
                    "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{}",
                    desc.table,
                    assignments.join(", "),
                    desc.primary_key,
                    params.len()
                ),
                rusqlite::params_from_iter(params),
            )
            .map_err(map_sql_err)?;
        Ok(changed > 0)
    }

    fn do_delete(&mut self, entity: Entity, key: &Key) -> Result<bool> {
        let desc = entity.descriptor();
        let changed = self
            .conn()?
            .execute(
                &format!(
                    "DELETE FROM \"{}\" WHERE \"{}\" = ?1",
                    desc.table, desc.primary_key
                ),
                [codec::encode_key(key)],
            )
            .map_err(map_sql_err)?;
        Ok(changed > 0)
    }

    fn do_delete_all(&mut self, entity: Entity) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(&format!("DELETE FROM \"{}\"", entity.table()), [])
            .map_err(map_sql_err)?;
        Ok(changed > 0)
    }

    fn do_find_all(&mut self, entity: Entity) -> Result<Vec<Key>> {
        let desc = entity.descriptor();
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT \"{}\" FROM \"{}\"",
                desc.primary_key, desc.table
            ))
            .map_err(map_sql_err)?;
        let mut keys = Vec::new();
        let mut rows = stmt.query([]).map_err(map_sql_err)?;
        while let Some(row) = rows.next().map_err(map_sql_err)? {
            let raw = row.get_ref(0).map_err(map_sql_err)?;
            keys.push(codec::decode_key(raw, desc.key_kind)?);
        }
        Ok(keys)
    }
}

fn no_rows_as_false(err: rusqlite::Error) -> Result<bool> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(false),
        other => Err(map_sql_err(other)),
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.core.is_valid() {
            if let Err(err) = self.rollback() {
                tracing::warn!(%err, "rollback on drop failed");
            }
        }
        // Belt for the failed-commit path: the connection is gone (dropped
        // as unreusable) or already back in the pool by now.
        debug_assert!(self.conn.is_none() || self.core.is_valid());
    }
}
