//! Canonical table set.
//!
//! Records are plain data with no shared mutable references, so a snapshot
//! is a pure structural clone and commit/discard is a single swap/drop.

use std::collections::BTreeMap;

use roster_core::{Key, Record};
use roster_schema::Entity;

/// Every table of the data model, each a map from primary key to record.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSet {
    tables: BTreeMap<Entity, BTreeMap<Key, Record>>,
}

impl TableSet {
    /// An empty table per entity.
    pub fn new() -> Self {
        TableSet {
            tables: Entity::ALL.iter().map(|e| (*e, BTreeMap::new())).collect(),
        }
    }

    /// The table for `entity`.
    pub fn table(&self, entity: Entity) -> &BTreeMap<Key, Record> {
        &self.tables[&entity]
    }

    /// The table for `entity`, mutably.
    pub fn table_mut(&mut self, entity: Entity) -> &mut BTreeMap<Key, Record> {
        self.tables.get_mut(&entity).expect("every entity has a table")
    }
}

impl Default for TableSet {
    fn default() -> Self {
        Self::new()
    }
}
