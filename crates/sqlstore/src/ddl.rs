//! Schema DDL generated from the shared entity descriptors.

use roster_core::Result;
use roster_schema::{DeletePolicy, Entity, EntityDescriptor, FieldKind};
use rusqlite::Connection;

use crate::map_sql_err;

/// Create every table that does not exist yet.
pub(crate) fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(&schema_sql()).map_err(map_sql_err)
}

/// The full `CREATE TABLE` script, one statement per entity.
pub fn schema_sql() -> String {
    Entity::ALL
        .iter()
        .map(|e| create_table_sql(e.descriptor()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn create_table_sql(desc: &EntityDescriptor) -> String {
    let mut clauses = Vec::with_capacity(1 + desc.fields.len() + desc.foreign_keys.len());
    clauses.push(format!(
        "\"{}\" {} PRIMARY KEY",
        desc.primary_key,
        sql_type(desc.key_kind)
    ));
    for field in desc.fields {
        clauses.push(format!("\"{}\" {}", field.name, sql_type(field.kind)));
    }
    for fk in desc.foreign_keys {
        let target = fk.references.descriptor();
        clauses.push(format!(
            "FOREIGN KEY (\"{}\") REFERENCES \"{}\"(\"{}\") ON DELETE {}",
            fk.field,
            target.table,
            target.primary_key,
            delete_action(fk.on_delete)
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" ({});",
        desc.table,
        clauses.join(", ")
    )
}

fn sql_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Int | FieldKind::Bool => "INTEGER",
        FieldKind::Float => "REAL",
        FieldKind::Text | FieldKind::Timestamp => "TEXT",
    }
}

fn delete_action(policy: DeletePolicy) -> &'static str {
    match policy {
        DeletePolicy::SetNull => "SET NULL",
        DeletePolicy::Cascade => "CASCADE",
        DeletePolicy::Restrict => "RESTRICT",
    }
}
