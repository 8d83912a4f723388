//! Entity schema registry for rosterdb
//!
//! One declarative table of entity descriptors drives both backends: the
//! mock store walks it to emulate referential integrity, the SQL backend
//! generates DDL and parameterized statements from it. Adding an entity
//! means adding exactly one descriptor here.

pub mod entity;
pub mod graph;

pub use entity::{
    DeletePolicy, Entity, EntityDescriptor, FieldDef, FieldKind, ForeignKey,
};
pub use graph::{referencing, ReverseRef};
