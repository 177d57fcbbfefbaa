//! CREATE TABLE text for one entity.

use srm_core::{Dialect, EntityDescriptor, FieldDef, FieldKind, Result, SqlType};

/// PostgreSQL DDL; see [`create_table_sql_for`].
pub fn create_table_sql(desc: &EntityDescriptor) -> Result<String> {
    create_table_sql_for(desc, Dialect::Postgres)
}

/// `create table <t> (<col> <type> not null, ..., primary key (id), foreign key (...) references ...)`
///
/// Every column is `not null`; references become `<field>_id bigint` plus a foreign key
/// to the referenced table's identity. SQLite only accepts an unqualified table name
/// in a foreign key clause, and stores decimals as text so their scale survives.
pub fn create_table_sql_for(desc: &EntityDescriptor, dialect: Dialect) -> Result<String> {
    desc.validate()?;

    let identity = desc.fields[0].name;
    let mut parts: Vec<String> = desc
        .fields
        .iter()
        .map(|f| format!("{} {} not null", f.column_name(), column_type(f, dialect)))
        .collect();

    parts.push(format!("primary key ({identity})"));

    for field in desc.references() {
        if let Some(target) = field.referenced() {
            let target_identity = target.fields.first().map_or("id", |f| f.name);
            let target_table = match dialect {
                Dialect::Postgres => target.qualified_table_name(),
                Dialect::Sqlite => target.name.to_lowercase(),
            };
            parts.push(format!(
                "foreign key ({}) references {} ({})",
                field.column_name(),
                target_table,
                target_identity
            ));
        }
    }

    Ok(format!(
        "create table {} ({})",
        desc.qualified_table_name(),
        parts.join(", ")
    ))
}

fn column_type(field: &FieldDef, dialect: Dialect) -> String {
    match (dialect, field.kind) {
        // Numeric affinity would turn "12.50" into the REAL 12.5.
        (Dialect::Sqlite, FieldKind::Scalar(SqlType::Numeric)) => "text".to_string(),
        _ => field.column_type(),
    }
}

/// Existence probe: succeeds on an existing table and returns no rows.
pub fn table_probe_sql(desc: &EntityDescriptor) -> String {
    format!("select * from {} where 1 = 2", desc.qualified_table_name())
}
