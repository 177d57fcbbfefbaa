//! Schema creation for SRM entities.
//!
//! `srm-schema` turns entity descriptors into CREATE TABLE statements, ordered so that
//! every referenced table is created before the tables that point at it.
//!
//! ```ignore
//! let statements = SchemaBuilder::new()
//!     .create_table::<Master1>()
//!     .create_table::<Detail>()
//!     .build()?;
//! ```

pub mod ddl;

pub use ddl::{create_table_sql, create_table_sql_for, table_probe_sql};

use srm_core::{DescriptorTree, Dialect, Entity, EntityDescriptor, Result};

/// Collects entity types and emits their DDL in dependency order.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    roots: Vec<&'static EntityDescriptor>,
    dialect: Dialect,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type; referenced types are pulled in automatically.
    #[must_use]
    pub fn create_table<E: Entity>(self) -> Self {
        self.add(E::descriptor())
    }

    /// Target dialect; PostgreSQL unless set.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn add(mut self, descriptor: &'static EntityDescriptor) -> Self {
        self.roots.push(descriptor);
        self
    }

    /// Every table to create, referenced tables first, each once.
    pub fn ordered(&self) -> Result<Vec<&'static EntityDescriptor>> {
        let mut seen: Vec<String> = Vec::new();
        let mut ordered = Vec::new();
        for root in &self.roots {
            let tree = DescriptorTree::build(root)?;
            // Reverse pre-order visits every node after all of its descendants.
            for node in tree.nodes().iter().rev() {
                let table = node.entity.qualified_table_name();
                if !seen.contains(&table) {
                    seen.push(table);
                    ordered.push(node.entity);
                }
            }
        }
        Ok(ordered)
    }

    /// CREATE TABLE statements in creation order.
    pub fn build(&self) -> Result<Vec<String>> {
        self.ordered()?
            .into_iter()
            .map(|desc| {
                let sql = create_table_sql_for(desc, self.dialect)?;
                tracing::debug!(table = %desc.qualified_table_name(), sql = %sql, "Generated DDL");
                Ok(sql)
            })
            .collect()
    }
}
