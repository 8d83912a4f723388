//! Transaction contract shared by every backend.
//!
//! The lifecycle state machine is one-way: ACTIVE → (commit | rollback) →
//! DESTROYED. Every public operation revalidates through [`TransactionOps::check_valid`],
//! which yields to the scheduler once for fairness and then refuses
//! destroyed transactions.
//!
//! Savepoint names are `"sp<N>"` with a per-transaction monotonic counter,
//! so a live stack can never hold two frames with the same name. The stack
//! is strict LIFO: restoring a frame discards everything pushed after it.

mod driver;
mod ops;

pub use driver::{drive, drive_read_only};
pub use ops::{DomainOps, CHOICE_SLOTS};

use roster_schema::Entity;

use crate::error::{Error, Result};
use crate::value::{Key, Record};

/// Shared per-transaction state: the validity flag and the savepoint stack.
///
/// Owned by each backend transaction and handed to the trait through
/// [`TransactionOps::txn_core`]; only the provided methods below mutate it.
#[derive(Debug)]
pub struct TxnCore {
    valid: bool,
    stack: Vec<String>,
    counter: u64,
}

impl TxnCore {
    /// Fresh state for a newly begun transaction.
    pub fn new() -> Self {
        TxnCore {
            valid: true,
            stack: Vec::new(),
            counter: 0,
        }
    }

    /// Whether the transaction may still be used.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Flip the monotonic validity flag. There is no way back.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Number of live savepoints.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn next_name(&mut self) -> String {
        self.counter += 1;
        format!("sp{}", self.counter)
    }

    fn push(&mut self, name: String) {
        self.stack.push(name);
    }

    fn pop(&mut self) -> Option<String> {
        self.stack.pop()
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.stack.iter().rposition(|n| n == name)
    }

    fn truncate(&mut self, len: usize) {
        self.stack.truncate(len);
    }
}

impl Default for TxnCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether a transaction/nested-transaction callback result commits
/// or rolls back, the way the route layer's truthiness convention did.
pub trait TxOutcome {
    /// `true` commits (or releases the savepoint), `false` rolls back.
    fn should_commit(&self) -> bool;
}

impl TxOutcome for bool {
    fn should_commit(&self) -> bool {
        *self
    }
}

impl TxOutcome for () {
    fn should_commit(&self) -> bool {
        true
    }
}

impl<T> TxOutcome for Option<T> {
    fn should_commit(&self) -> bool {
        self.is_some()
    }
}

/// The transaction contract.
///
/// Backends implement the raw `do_*`/`sp_*` primitives; everything a caller
/// touches is a provided method, so the savepoint discipline, validity
/// machine, and whitelist/absence rules exist exactly once.
pub trait TransactionOps {
    /// Shared lifecycle state.
    fn txn_core(&self) -> &TxnCore;
    /// Shared lifecycle state, mutably.
    fn txn_core_mut(&mut self) -> &mut TxnCore;

    /// Record a savepoint under `name`.
    fn sp_save(&mut self, name: &str) -> Result<()>;
    /// Discard the savepoint `name` (and any frames stacked above it),
    /// keeping its changes.
    fn sp_release(&mut self, name: &str) -> Result<()>;
    /// Undo back to the savepoint `name` and discard it together with any
    /// frames stacked above it.
    fn sp_restore(&mut self, name: &str) -> Result<()>;

    /// Make the transaction's writes canonical. Called once, via
    /// [`TransactionOps::commit`].
    fn do_commit(&mut self) -> Result<()>;
    /// Discard the transaction's writes. Called once, via
    /// [`TransactionOps::rollback`] (or the drop guard).
    fn do_rollback(&mut self) -> Result<()>;

    /// Insert a row. `false` on duplicate key; `attrs` is already
    /// whitelist-filtered and type-checked.
    fn do_insert(&mut self, entity: Entity, key: &Key, attrs: &Record) -> Result<bool>;
    /// Load a full row, every whitelisted field present (`Null` if unset).
    fn do_load(&mut self, entity: Entity, key: &Key) -> Result<Option<Record>>;
    /// Apply pre-filtered, non-empty changes. `false` if the row is gone.
    fn do_alter(&mut self, entity: Entity, key: &Key, changes: &Record) -> Result<bool>;
    /// Delete one row, applying reverse-fk policies. `false` if absent.
    fn do_delete(&mut self, entity: Entity, key: &Key) -> Result<bool>;
    /// Delete every row of the table, all-or-nothing. `false` if empty.
    fn do_delete_all(&mut self, entity: Entity) -> Result<bool>;
    /// Every primary key currently in the table.
    fn do_find_all(&mut self, entity: Entity) -> Result<Vec<Key>>;

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Fail with [`Error::InvalidTransaction`] once the transaction is
    /// destroyed. Yields once first so competing pending work gets a turn,
    /// preserving the cooperative fairness of the original scheduler.
    fn check_valid(&self) -> Result<()> {
        std::thread::yield_now();
        if self.txn_core().is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidTransaction)
        }
    }

    /// Commit and destroy the transaction.
    fn commit(&mut self) -> Result<()> {
        self.check_valid()?;
        self.do_commit()?;
        self.txn_core_mut().invalidate();
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Roll back and destroy the transaction.
    fn rollback(&mut self) -> Result<()> {
        self.check_valid()?;
        self.do_rollback()?;
        self.txn_core_mut().invalidate();
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    // =========================================================================
    // Savepoints
    // =========================================================================

    /// Push a savepoint and return its name.
    fn push_sp(&mut self) -> Result<String> {
        self.check_valid()?;
        let name = self.txn_core_mut().next_name();
        self.sp_save(&name)?;
        self.txn_core_mut().push(name.clone());
        tracing::trace!(savepoint = %name, "pushed");
        Ok(name)
    }

    /// Discard the most recent savepoint, keeping its changes.
    fn release_sp(&mut self) -> Result<()> {
        self.check_valid()?;
        let name = self
            .txn_core_mut()
            .pop()
            .ok_or_else(|| Error::Database("savepoint stack is empty".into()))?;
        self.sp_release(&name)
    }

    /// Alias of [`TransactionOps::release_sp`].
    fn pop_sp(&mut self) -> Result<()> {
        self.release_sp()
    }

    /// Undo all mutations back to the most recent savepoint and discard it.
    fn restore_sp(&mut self) -> Result<()> {
        self.check_valid()?;
        let name = self
            .txn_core_mut()
            .pop()
            .ok_or_else(|| Error::Database("savepoint stack is empty".into()))?;
        self.sp_restore(&name)
    }

    /// Discard down to the named savepoint inclusive, keeping changes.
    /// Frames stacked above it are discarded with it.
    fn release_to(&mut self, name: &str) -> Result<()> {
        self.check_valid()?;
        let pos = self
            .txn_core()
            .position_of(name)
            .ok_or_else(|| Error::Database(format!("savepoint {} is not on the stack", name)))?;
        self.sp_release(name)?;
        self.txn_core_mut().truncate(pos);
        Ok(())
    }

    /// Undo down to the named savepoint and discard it together with any
    /// frames stacked above it.
    fn restore_to(&mut self, name: &str) -> Result<()> {
        self.check_valid()?;
        let pos = self
            .txn_core()
            .position_of(name)
            .ok_or_else(|| Error::Database(format!("savepoint {} is not on the stack", name)))?;
        self.sp_restore(name)?;
        self.txn_core_mut().truncate(pos);
        Ok(())
    }

    /// Run `f` inside its own savepoint: release on a commit-worthy result,
    /// restore otherwise. On error, attempt the restore and attach any
    /// secondary failure as the suppressed cause before propagating.
    ///
    /// This is the mechanism behind every all-or-nothing composite write.
    fn do_nested<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        T: TxOutcome,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let name = self.push_sp()?;
        match f(self) {
            Ok(outcome) => {
                if outcome.should_commit() {
                    self.release_to(&name)?;
                } else {
                    self.restore_to(&name)?;
                }
                Ok(outcome)
            }
            Err(err) => match self.restore_to(&name) {
                Ok(()) => Err(err),
                Err(restore_err) => Err(err.with_rollback_failure(restore_err)),
            },
        }
    }

    // =========================================================================
    // Generic CRUD
    // =========================================================================

    /// Insert a row. Returns `false` (not an error) on a duplicate key.
    /// Unknown fields in `attrs` are silently dropped; missing whitelisted
    /// fields become explicit `Null`. Non-null foreign-key values must
    /// resolve or the insert fails with [`Error::Constraint`].
    fn insert(&mut self, entity: Entity, key: impl Into<Key>, attrs: &Record) -> Result<bool>
    where
        Self: Sized,
    {
        self.check_valid()?;
        let key = key.into();
        let desc = entity.descriptor();
        check_key_kind(entity, &key)?;
        let mut row = Record::with_capacity(desc.fields.len());
        for field in desc.fields {
            let value = attrs.get(field.name).cloned().unwrap_or(crate::Value::Null);
            if !value.fits(field.kind) {
                return Err(Error::Constraint(format!(
                    "{}.{} cannot hold {:?}",
                    desc.table, field.name, value
                )));
            }
            row.insert(field.name.to_string(), value);
        }
        self.do_insert(entity, &key, &row)
    }

    /// Load a row, or `None` if the key is absent.
    fn load(&mut self, entity: Entity, key: impl Into<Key>) -> Result<Option<Record>>
    where
        Self: Sized,
    {
        self.check_valid()?;
        let key = key.into();
        check_key_kind(entity, &key)?;
        self.do_load(entity, &key)
    }

    /// Alter a row. Returns `false` when the row is missing or no
    /// whitelisted field appears in `changes`; unknown fields are ignored.
    fn alter(&mut self, entity: Entity, key: impl Into<Key>, changes: &Record) -> Result<bool>
    where
        Self: Sized,
    {
        self.check_valid()?;
        let key = key.into();
        let desc = entity.descriptor();
        check_key_kind(entity, &key)?;
        let mut filtered = Record::new();
        for field in desc.fields {
            if let Some(value) = changes.get(field.name) {
                if !value.fits(field.kind) {
                    return Err(Error::Constraint(format!(
                        "{}.{} cannot hold {:?}",
                        desc.table, field.name, value
                    )));
                }
                filtered.insert(field.name.to_string(), value.clone());
            }
        }
        if filtered.is_empty() {
            return Ok(false);
        }
        self.do_alter(entity, &key, &filtered)
    }

    /// Delete one row and apply its reverse-foreign-key policies. Returns
    /// `false` if the key is absent; a RESTRICT reference aborts the whole
    /// delete with [`Error::Constraint`] and no partial mutations.
    fn delete(&mut self, entity: Entity, key: impl Into<Key>) -> Result<bool>
    where
        Self: Sized,
    {
        self.check_valid()?;
        let key = key.into();
        check_key_kind(entity, &key)?;
        self.do_delete(entity, &key)
    }

    /// Bulk purge of a whole table, all-or-nothing. The counterpart of the
    /// route layer's `delete(null)` convention.
    fn delete_all(&mut self, entity: Entity) -> Result<bool> {
        self.check_valid()?;
        self.do_delete_all(entity)
    }

    /// All primary keys of the table.
    fn find_all(&mut self, entity: Entity) -> Result<Vec<Key>> {
        self.check_valid()?;
        self.do_find_all(entity)
    }
}

fn check_key_kind(entity: Entity, key: &Key) -> Result<()> {
    let desc = entity.descriptor();
    if key.kind() == desc.key_kind {
        Ok(())
    } else {
        Err(Error::Constraint(format!(
            "{}.{} expects a {:?} key, got {:?}",
            desc.table, desc.primary_key, desc.key_kind, key
        )))
    }
}
