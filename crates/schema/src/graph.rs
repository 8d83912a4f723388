//! Reverse foreign-key graph.
//!
//! The mock store walks this graph on every delete to apply declared
//! policies to referencing rows. It is derived once from [`DESCRIPTORS`],
//! so it can never drift from the forward declarations the SQL DDL uses.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::entity::{DeletePolicy, Entity, DESCRIPTORS};

/// One incoming reference: a field of `source` points at the entity being
/// deleted. `via_primary_key` marks shadow rows whose pk doubles as the
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseRef {
    pub source: Entity,
    pub field: &'static str,
    pub on_delete: DeletePolicy,
    pub via_primary_key: bool,
}

static REVERSE: Lazy<HashMap<Entity, Vec<ReverseRef>>> = Lazy::new(|| {
    let mut graph: HashMap<Entity, Vec<ReverseRef>> =
        Entity::ALL.iter().map(|e| (*e, Vec::new())).collect();
    for desc in DESCRIPTORS.iter() {
        for fk in desc.foreign_keys {
            graph.get_mut(&fk.references).expect("all entities present").push(ReverseRef {
                source: desc.entity,
                field: fk.field,
                on_delete: fk.on_delete,
                via_primary_key: fk.field == desc.primary_key,
            });
        }
    }
    graph
});

/// Every declared reference to `entity`, in declaration order.
pub fn referencing(entity: Entity) -> &'static [ReverseRef] {
    REVERSE.get(&entity).map(Vec::as_slice).unwrap_or(&[])
}
