//! Per-transaction caches: descriptor trees, generated SQL and prepared statements.

use std::collections::HashMap;
use std::sync::Arc;

use srm_core::{Connection, DescriptorTree, EntityDescriptor, PreparedStatement, Result};

/// Which single-entity statement a memoised SQL string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// Address of a static descriptor. Two entity types that share a name still have
/// distinct descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DescriptorKey(usize);

impl DescriptorKey {
    fn of(desc: &'static EntityDescriptor) -> Self {
        Self(std::ptr::from_ref(desc).addr())
    }
}

/// Everything a transaction memoises. Lives exactly as long as its transaction.
#[derive(Debug, Default)]
pub struct StatementCache {
    trees: HashMap<DescriptorKey, Arc<DescriptorTree>>,
    sql: HashMap<(SqlKind, DescriptorKey), String>,
    statements: HashMap<String, Arc<PreparedStatement>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor tree for `desc`, built and validated on first use.
    pub fn tree(&mut self, desc: &'static EntityDescriptor) -> Result<Arc<DescriptorTree>> {
        let key = DescriptorKey::of(desc);
        if let Some(tree) = self.trees.get(&key) {
            return Ok(Arc::clone(tree));
        }
        let tree = Arc::new(DescriptorTree::build(desc)?);
        self.trees.insert(key, Arc::clone(&tree));
        Ok(tree)
    }

    /// Generated SQL for `(kind, type)`, built on first use.
    pub fn sql(
        &mut self,
        kind: SqlKind,
        desc: &'static EntityDescriptor,
        build: impl FnOnce() -> String,
    ) -> String {
        self.sql
            .entry((kind, DescriptorKey::of(desc)))
            .or_insert_with(build)
            .clone()
    }

    /// Prepared statement stored under `key`; `build` supplies the SQL on a miss.
    pub fn statement<C: Connection>(
        &mut self,
        connection: &C,
        key: &str,
        build: impl FnOnce() -> Result<String>,
    ) -> Result<Arc<PreparedStatement>> {
        if let Some(stmt) = self.statements.get(key) {
            tracing::trace!(key = %key, "Statement cache hit");
            return Ok(Arc::clone(stmt));
        }
        let sql = build()?;
        tracing::debug!(sql = %sql, "Preparing statement");
        let stmt = Arc::new(connection.prepare(&sql)?);
        self.statements.insert(key.to_string(), Arc::clone(&stmt));
        Ok(stmt)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn sql_count(&self) -> usize {
        self.sql.len()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}
