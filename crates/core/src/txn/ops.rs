//! Derived domain operations, layered on the generic primitives.
//!
//! Nothing here touches backend internals: every operation is expressed in
//! terms of the [`TransactionOps`] contract, so it behaves identically on
//! the mock store and the SQL backend. Composite writes go through
//! `do_nested` so they are all-or-nothing.

use rand::Rng;
use roster_schema::{Entity, FieldKind};

use crate::error::{Error, Result};
use crate::record;
use crate::txn::TransactionOps;
use crate::value::{Key, Record, Value};

/// Number of ranked project preferences a team holds.
pub const CHOICE_SLOTS: usize = 6;

/// Domain-level operations of the roster system.
///
/// Blanket-implemented for every transaction type.
pub trait DomainOps: TransactionOps + Sized {
    /// Draw random positive 31-bit ids until one is unused in `entity`.
    ///
    /// Best-effort only: concurrent transactions on the SQL backend can race
    /// the probe, in which case the losing insert reports a duplicate.
    fn find_unique_id(&mut self, entity: Entity) -> Result<i64> {
        self.check_valid()?;
        let desc = entity.descriptor();
        if desc.key_kind != FieldKind::Int {
            return Err(Error::Database(format!(
                "{} has a text primary key; cannot draw a numeric id",
                desc.table
            )));
        }
        let mut rng = rand::thread_rng();
        loop {
            let id = rng.gen_range(1..=i32::MAX as i64);
            if self.load(entity, id)?.is_none() {
                return Ok(id);
            }
        }
    }

    /// First id whose record carries `field == value`, or `None`. Unknown
    /// fields match nothing, mirroring the whitelist's ignore rule.
    fn search_by_field(&mut self, entity: Entity, field: &str, value: &Value) -> Result<Option<Key>> {
        if !entity.descriptor().is_whitelisted(field) {
            return Ok(None);
        }
        for key in self.find_all(entity)? {
            if let Some(row) = self.load(entity, key.clone())? {
                if row.get(field) == Some(value) {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }

    /// Student ids of every member of team `tid`, in no particular order.
    fn find_members_of_team(&mut self, tid: i64) -> Result<Vec<i64>> {
        let mut members = Vec::new();
        for key in self.find_all(Entity::Student)? {
            if let Some(row) = self.load(Entity::Student, key.clone())? {
                if row.get("member_of").and_then(Value::as_int) == Some(tid) {
                    if let Some(suid) = key.as_int() {
                        members.push(suid);
                    }
                }
            }
        }
        Ok(members)
    }

    /// Project ids managed by `id` as mentor, sponsor, or advisor.
    fn find_managed_projects(&mut self, id: i64) -> Result<Vec<i64>> {
        let mut managed = Vec::new();
        for key in self.find_all(Entity::Project)? {
            if let Some(row) = self.load(Entity::Project, key.clone())? {
                let is_manager = ["mentor", "sponsor", "advisor"]
                    .iter()
                    .any(|f| row.get(*f).and_then(Value::as_int) == Some(id));
                if is_manager {
                    if let Some(pid) = key.as_int() {
                        managed.push(pid);
                    }
                }
            }
        }
        Ok(managed)
    }

    /// The team's ranked project preferences: exactly [`CHOICE_SLOTS`]
    /// slots, unset ranks `None`. All `None` when the team has no choice
    /// row.
    fn find_team_choices(&mut self, tid: i64) -> Result<[Option<i64>; CHOICE_SLOTS]> {
        let mut slots = [None; CHOICE_SLOTS];
        if let Some(row) = self.load(Entity::Choice, tid)? {
            for (rank, slot) in slots.iter_mut().enumerate() {
                *slot = row.get(&format!("choice{}", rank + 1)).and_then(Value::as_int);
            }
        }
        Ok(slots)
    }

    /// Record that project `pid` requires `skill`. Idempotent: a duplicate
    /// add is silently ignored and reports `false`.
    fn add_project_skill(&mut self, pid: i64, skill: &str) -> Result<bool> {
        let key = Key::Text(format!("{}:{}", pid, skill));
        let attrs = record! { "pid" => pid, "skill_name" => skill };
        self.insert(Entity::ProjectSkill, key, &attrs)
    }

    /// Record that student `suid` has `skill`. Idempotent like
    /// [`DomainOps::add_project_skill`].
    fn add_student_skill(&mut self, suid: i64, skill: &str) -> Result<bool> {
        let key = Key::Text(format!("{}:{}", suid, skill));
        let attrs = record! { "suid" => suid, "skill_name" => skill };
        self.insert(Entity::StudentSkill, key, &attrs)
    }

    /// Move every accepted project to archived, atomically. Returns how
    /// many projects changed.
    fn archive_accepted_projects(&mut self) -> Result<u64> {
        let archived = self.do_nested(|tx| {
            let mut archived = 0u64;
            for key in tx.find_all(Entity::Project)? {
                let Some(row) = tx.load(Entity::Project, key.clone())? else {
                    continue;
                };
                if row.get("status").and_then(Value::as_str) == Some("accepted") {
                    let changes = record! { "status" => "archived" };
                    if tx.alter(Entity::Project, key, &changes)? {
                        archived += 1;
                    }
                }
            }
            Ok(Some(archived))
        })?;
        Ok(archived.unwrap_or(0))
    }

    /// Remove every student row, all-or-nothing.
    fn purge_students(&mut self) -> Result<bool> {
        self.delete_all(Entity::Student)
    }

    /// Insert a team together with its id-namespace shadow row,
    /// all-or-nothing. `false` if either id is taken.
    fn insert_team(&mut self, tid: i64, attrs: &Record) -> Result<bool> {
        self.do_nested(|tx| {
            if !tx.insert(Entity::TeamSpace, tid, &Record::new())? {
                return Ok(false);
            }
            tx.insert(Entity::Team, tid, attrs)
        })
    }

    /// Remove a team and its namespace shadow row; choice rows cascade,
    /// members are unassigned through their SET-NULL policy.
    fn delete_team(&mut self, tid: i64) -> Result<bool> {
        self.delete(Entity::TeamSpace, tid)
    }

    /// Insert a faculty member owning the namespace id `tid`,
    /// all-or-nothing. The shadow row is inserted unowned first and
    /// back-filled once the faculty row exists, because the two reference
    /// each other.
    fn insert_faculty(&mut self, fuid: i64, tid: i64, attrs: &Record) -> Result<bool> {
        self.do_nested(|tx| {
            if !tx.insert(Entity::TeamSpace, tid, &Record::new())? {
                return Ok(false);
            }
            let mut row = attrs.clone();
            row.insert("tid".to_string(), Value::Int(tid));
            if !tx.insert(Entity::Faculty, fuid, &row)? {
                return Ok(false);
            }
            tx.alter(Entity::TeamSpace, tid, &record! { "fuid" => fuid })
        })
    }

    /// Remove a faculty member. The owned namespace row cascades away, and
    /// projects advised by this member are nulled per their policy.
    fn delete_faculty(&mut self, fuid: i64) -> Result<bool> {
        self.delete(Entity::Faculty, fuid)
    }
}

impl<T: TransactionOps + Sized> DomainOps for T {}
