//! Mock-store transaction: a private working copy of canonical state.
//!
//! Savepoints are `(name, full clone)` pairs; restore swaps the recorded
//! clone back in and truncates everything stacked above it. Every delete is
//! wrapped in its own implicit savepoint so a RESTRICT anywhere in the walk
//! leaves zero partial mutations.

use std::sync::Arc;

use roster_core::txn::{TransactionOps, TxnCore};
use roster_core::{Error, Key, Record, Result, Value};
use roster_schema::{graph, DeletePolicy, Entity};

use crate::database::Inner;
use crate::store::TableSet;

/// A transaction against the mock store.
pub struct MemoryTransaction {
    inner: Arc<Inner>,
    working: TableSet,
    savepoints: Vec<(String, TableSet)>,
    core: TxnCore,
    slot_released: bool,
}

impl MemoryTransaction {
    pub(crate) fn new(inner: Arc<Inner>, working: TableSet) -> Self {
        MemoryTransaction {
            inner,
            working,
            savepoints: Vec::new(),
            core: TxnCore::new(),
            slot_released: false,
        }
    }

    fn release_slot(&mut self) {
        if !self.slot_released {
            self.slot_released = true;
            self.inner.release_slot();
        }
    }

    fn frame_position(&self, name: &str) -> Result<usize> {
        self.savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| Error::Database(format!("savepoint {} was never recorded", name)))
    }

    /// Referential check for one row about to enter `entity`'s table.
    fn check_foreign_keys(&self, entity: Entity, key: &Key, row: &Record) -> Result<()> {
        let desc = entity.descriptor();
        for fk in desc.foreign_keys {
            let value = if fk.field == desc.primary_key {
                key.to_value()
            } else {
                match row.get(fk.field) {
                    Some(v) => v.clone(),
                    None => continue,
                }
            };
            if value.is_null() {
                continue;
            }
            self.check_reference(entity, fk.field, &value, fk.references)?;
        }
        Ok(())
    }

    fn check_reference(
        &self,
        entity: Entity,
        field: &str,
        value: &Value,
        target: Entity,
    ) -> Result<()> {
        let target_key = Key::from_value(value).ok_or_else(|| {
            Error::Constraint(format!(
                "{}.{} holds {:?}, which is not key-shaped",
                entity.table(),
                field,
                value
            ))
        })?;
        if self.working.table(target).contains_key(&target_key) {
            Ok(())
        } else {
            Err(Error::Constraint(format!(
                "{}.{} references missing {} row {}",
                entity.table(),
                field,
                target.table(),
                target_key
            )))
        }
    }

    /// Delete `key` from `entity`, applying the declared policy to every
    /// referencing row, transitively for CASCADE. RESTRICT aborts the whole
    /// walk; the caller restores the pre-delete snapshot.
    fn cascade_delete(&mut self, entity: Entity, key: &Key) -> Result<()> {
        // A wider cascade may already have consumed this row.
        if !self.working.table(entity).contains_key(key) {
            return Ok(());
        }
        let victim = key.to_value();
        for rref in graph::referencing(entity) {
            let referencing: Vec<Key> = if rref.via_primary_key {
                // Shadow rows: the source pk itself is the reference.
                match Key::from_value(&victim) {
                    Some(k) if self.working.table(rref.source).contains_key(&k) => vec![k],
                    _ => Vec::new(),
                }
            } else {
                self.working
                    .table(rref.source)
                    .iter()
                    .filter(|(_, row)| row.get(rref.field) == Some(&victim))
                    .map(|(k, _)| k.clone())
                    .collect()
            };
            if referencing.is_empty() {
                continue;
            }
            match rref.on_delete {
                DeletePolicy::Restrict => {
                    return Err(Error::Constraint(format!(
                        "{} row {} is still referenced by {}.{}",
                        entity.table(),
                        key,
                        rref.source.table(),
                        rref.field
                    )));
                }
                DeletePolicy::SetNull => {
                    for k in referencing {
                        if let Some(row) = self.working.table_mut(rref.source).get_mut(&k) {
                            row.insert(rref.field.to_string(), Value::Null);
                        }
                    }
                }
                DeletePolicy::Cascade => {
                    tracing::trace!(
                        from = %entity.table(),
                        to = %rref.source.table(),
                        "cascading delete"
                    );
                    for k in referencing {
                        self.cascade_delete(rref.source, &k)?;
                    }
                }
            }
        }
        self.working.table_mut(entity).remove(key);
        Ok(())
    }
}

impl TransactionOps for MemoryTransaction {
    fn txn_core(&self) -> &TxnCore {
        &self.core
    }

    fn txn_core_mut(&mut self) -> &mut TxnCore {
        &mut self.core
    }

    fn sp_save(&mut self, name: &str) -> Result<()> {
        self.savepoints.push((name.to_string(), self.working.clone()));
        Ok(())
    }

    fn sp_release(&mut self, name: &str) -> Result<()> {
        let pos = self.frame_position(name)?;
        self.savepoints.truncate(pos);
        Ok(())
    }

    fn sp_restore(&mut self, name: &str) -> Result<()> {
        let pos = self.frame_position(name)?;
        let (_, snapshot) = self
            .savepoints
            .drain(pos..)
            .next()
            .expect("frame_position returned a live index");
        self.working = snapshot;
        Ok(())
    }

    fn do_commit(&mut self) -> Result<()> {
        let working = std::mem::take(&mut self.working);
        *self.inner.canonical.lock() = working;
        self.savepoints.clear();
        self.release_slot();
        Ok(())
    }

    fn do_rollback(&mut self) -> Result<()> {
        self.savepoints.clear();
        self.release_slot();
        Ok(())
    }

    fn do_insert(&mut self, entity: Entity, key: &Key, attrs: &Record) -> Result<bool> {
        if self.working.table(entity).contains_key(key) {
            return Ok(false);
        }
        self.check_foreign_keys(entity, key, attrs)?;
        self.working.table_mut(entity).insert(key.clone(), attrs.clone());
        Ok(true)
    }

    fn do_load(&mut self, entity: Entity, key: &Key) -> Result<Option<Record>> {
        Ok(self.working.table(entity).get(key).cloned())
    }

    fn do_alter(&mut self, entity: Entity, key: &Key, changes: &Record) -> Result<bool> {
        if !self.working.table(entity).contains_key(key) {
            return Ok(false);
        }
        // SQLite enforces foreign keys on UPDATE as well; mirror that here.
        for fk in entity.descriptor().foreign_keys {
            if let Some(value) = changes.get(fk.field) {
                if !value.is_null() {
                    self.check_reference(entity, fk.field, value, fk.references)?;
                }
            }
        }
        let row = self
            .working
            .table_mut(entity)
            .get_mut(key)
            .expect("checked above");
        for (field, value) in changes {
            row.insert(field.clone(), value.clone());
        }
        Ok(true)
    }

    fn do_delete(&mut self, entity: Entity, key: &Key) -> Result<bool> {
        if !self.working.table(entity).contains_key(key) {
            return Ok(false);
        }
        let snapshot = self.working.clone();
        match self.cascade_delete(entity, key) {
            Ok(()) => Ok(true),
            Err(err) => {
                self.working = snapshot;
                Err(err)
            }
        }
    }

    fn do_delete_all(&mut self, entity: Entity) -> Result<bool> {
        let keys: Vec<Key> = self.working.table(entity).keys().cloned().collect();
        if keys.is_empty() {
            return Ok(false);
        }
        let snapshot = self.working.clone();
        for key in keys {
            if let Err(err) = self.cascade_delete(entity, &key) {
                self.working = snapshot;
                return Err(err);
            }
        }
        Ok(true)
    }

    fn do_find_all(&mut self, entity: Entity) -> Result<Vec<Key>> {
        Ok(self.working.table(entity).keys().cloned().collect())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.core.is_valid() {
            if let Err(err) = self.rollback() {
                tracing::warn!(%err, "rollback on drop failed");
            }
        }
        // Commit and rollback both free the slot; this covers panics
        // between begin and either of them.
        self.release_slot();
    }
}
