//! Transactions for SRM.
//!
//! A [`Transaction`] owns one connection with one live database transaction, the
//! identity allocator, and the per-transaction caches. It is the persistence API:
//! persist / update / delete single entities, query one entity type with its whole
//! many-to-one graph, or query several joined entity types in one round trip.
//!
//! # Example
//!
//! ```ignore
//! let tx = Transaction::begin(connection, sequences)?;
//!
//! let mut master = Master1 { id: 0, name: "A".into() };
//! tx.persist(&mut master)?;
//!
//! let details = tx.query::<Detail>("where o_master1.id = $1", &[Value::BigInt(master.id)])?;
//! tx.commit()?;
//! ```
//!
//! # Lifecycle
//!
//! `Active` moves to `Committed` or `RolledBack` exactly once. Every operation on a
//! finished transaction returns `Error::State`, except `rollback`, which is a no-op.
//! Dropping an active transaction rolls it back.

pub mod cache;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use srm_core::marshal::{read_row, read_templates};
use srm_core::{
    Connection, DescriptorTree, Entity, EntityDescriptor, Error, PreparedStatement, Record,
    Result, Row, Sequences, TransactionState, Value,
};
use srm_query::{
    DeleteBuilder, Filter, InsertBuilder, Joins, ROOT_ALIAS, UpdateBuilder, delete_sql,
    insert_sql, multi_select_sql, multi_statement_key, select_sql, update_sql, with_condition,
};

pub use cache::{SqlKind, StatementCache};

// ============================================================================
// Multi-entity rows
// ============================================================================

/// One row of a multi-entity query: a record per template, `None` where an outer join
/// found no match.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiRow {
    records: Vec<Option<Record>>,
}

impl MultiRow {
    pub fn new(records: Vec<Option<Record>>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Untyped record for template `index`.
    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index).and_then(Option::as_ref)
    }

    /// Typed value for template `index`.
    ///
    /// Fails with `Error::Query` when the index is out of range or the template at that
    /// position is not `E`.
    pub fn get<E: Entity>(&self, index: usize) -> Result<Option<E>> {
        let slot = self.records.get(index).ok_or_else(|| {
            Error::Query(format!(
                "template index {} out of range for a row of {}",
                index,
                self.records.len()
            ))
        })?;
        match slot {
            None => Ok(None),
            Some(record) if record.entity() == E::descriptor().name => {
                E::from_record(record.clone()).map(Some)
            }
            Some(record) => Err(Error::Query(format!(
                "template {} is {}, not {}",
                index,
                record.entity(),
                E::descriptor().name
            ))),
        }
    }

    pub fn into_records(self) -> Vec<Option<Record>> {
        self.records
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// A unit of work over one physical database transaction.
pub struct Transaction<C: Connection> {
    /// The database connection, with its transaction already begun.
    connection: C,
    /// Identity allocator shared with the manager.
    sequences: Arc<dyn Sequences>,
    /// Lifecycle state.
    state: Mutex<TransactionState>,
    /// Trees, SQL and prepared statements; lookup, build and insert happen under one lock.
    cache: Mutex<StatementCache>,
}

impl<C: Connection> Transaction<C> {
    /// Begin a transaction on `connection`.
    #[tracing::instrument(level = "debug", skip(connection, sequences))]
    pub fn begin(connection: C, sequences: Arc<dyn Sequences>) -> Result<Self> {
        tracing::info!("Beginning transaction");
        connection.begin()?;
        Ok(Self {
            connection,
            sequences,
            state: Mutex::new(TransactionState::Active),
            cache: Mutex::new(StatementCache::new()),
        })
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn sequences(&self) -> &Arc<dyn Sequences> {
        &self.sequences
    }

    pub fn state(&self) -> TransactionState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, TransactionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cache(&self) -> MutexGuard<'_, StatementCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_active(&self) -> Result<()> {
        match *self.lock_state() {
            TransactionState::Active => Ok(()),
            state => Err(Error::State(state)),
        }
    }

    // ========================================================================
    // Statement lookup
    // ========================================================================

    fn dml_statement(
        &self,
        kind: SqlKind,
        desc: &'static EntityDescriptor,
        build: fn(&EntityDescriptor) -> String,
    ) -> Result<Arc<PreparedStatement>> {
        let mut cache = self.lock_cache();
        cache.tree(desc)?;
        let sql = cache.sql(kind, desc, || build(desc));
        cache.statement(&self.connection, &sql, || Ok(sql.clone()))
    }

    fn select_statement(
        &self,
        desc: &'static EntityDescriptor,
        condition: &str,
    ) -> Result<(Arc<DescriptorTree>, Arc<PreparedStatement>)> {
        let mut cache = self.lock_cache();
        let tree = cache.tree(desc)?;
        let select = cache.sql(SqlKind::Select, desc, || select_sql(&tree));
        let sql = with_condition(&select, condition);
        let stmt = cache.statement(&self.connection, &sql, || Ok(sql.clone()))?;
        Ok((tree, stmt))
    }

    // ========================================================================
    // Single-entity operations
    // ========================================================================

    /// Insert `entity` under a freshly allocated identity, which is written back into it.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(model = E::descriptor().name))]
    pub fn persist<E: Entity>(&self, entity: &mut E) -> Result<()> {
        self.ensure_active()?;
        let desc = E::descriptor();
        let stmt = self.dml_statement(SqlKind::Insert, desc, insert_sql)?;

        let id = self.sequences.next(&desc.qualified_table_name())?;
        entity.set_id(id);

        let params = InsertBuilder::new(&*entity).params();
        self.connection.execute_prepared(&stmt, &params)?;
        tracing::debug!(id, "Persisted entity");
        Ok(())
    }

    /// Write every non-identity field of `entity`.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(model = E::descriptor().name, id = entity.id()))]
    pub fn update<E: Entity>(&self, entity: &E) -> Result<()> {
        self.ensure_active()?;
        let desc = E::descriptor();
        if desc.mutable_fields().is_empty() {
            self.lock_cache().tree(desc)?;
            tracing::debug!("Identity-only entity, nothing to update");
            return Ok(());
        }
        let stmt = self.dml_statement(SqlKind::Update, E::descriptor(), update_sql)?;
        let rows = self
            .connection
            .execute_prepared(&stmt, &UpdateBuilder::new(entity).params())?;
        tracing::debug!(rows, "Updated entity");
        Ok(())
    }

    /// Delete the row with `entity`'s identity.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(model = E::descriptor().name, id = entity.id()))]
    pub fn delete<E: Entity>(&self, entity: &E) -> Result<()> {
        self.ensure_active()?;
        let stmt = self.dml_statement(SqlKind::Delete, E::descriptor(), delete_sql)?;
        let rows = self
            .connection
            .execute_prepared(&stmt, &DeleteBuilder::from_entity(entity).params())?;
        tracing::debug!(rows, "Deleted entity");
        Ok(())
    }

    /// Query `E` with its references, appending a trusted raw condition.
    ///
    /// `condition` is spliced into the SQL verbatim after the generated joins and may use
    /// `$n` placeholders bound from `args`. The root alias is `o`, references are
    /// `o_<field>`, nested references `o_<field>_<nested>`. Never build `condition` from
    /// untrusted input; use [`Transaction::query_where`] instead.
    #[tracing::instrument(level = "debug", skip(self, args), fields(model = E::descriptor().name))]
    pub fn query<E: Entity>(&self, condition: &str, args: &[Value]) -> Result<Vec<E>> {
        self.ensure_active()?;
        let (tree, stmt) = self.select_statement(E::descriptor(), condition)?;
        let rows = self.connection.query_prepared(&stmt, args)?;
        tracing::debug!(rows = rows.len(), "Query returned");

        rows.into_iter()
            .map(|row| match read_row(&tree, row.values())? {
                Some(record) => E::from_record(record),
                None => Err(Error::Scan(format!(
                    "null identity in a {} row",
                    E::descriptor().name
                ))),
            })
            .collect()
    }

    /// Query `E` with a structured filter.
    ///
    /// The rendered filter text is the cache key, so filters that differ only in bound
    /// values share one prepared statement.
    pub fn query_where<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>> {
        let (condition, params) = filter.build()?;
        self.query(&condition, &params)
    }

    /// Fetch one `E` by identity.
    pub fn find<E: Entity>(&self, id: i64) -> Result<Option<E>> {
        let tree = self.lock_cache().tree(E::descriptor())?;
        let identity = tree.entity().identity().map_or("id", |f| f.name);
        let condition = format!("where {}.{} = $1", ROOT_ALIAS, identity);
        Ok(self
            .query::<E>(&condition, &[Value::BigInt(id)])?
            .into_iter()
            .next())
    }

    // ========================================================================
    // Multi-entity queries
    // ========================================================================

    /// Query several entity types joined by `joins`, in one round trip.
    ///
    /// Template `i` is aliased `o{i+1}`; its references `o{i+1}_<field>`. Step `i` of
    /// `joins` connects template `i + 1`, and its `on` text is trusted like a raw
    /// condition.
    #[tracing::instrument(level = "debug", skip(self, templates, joins, args))]
    pub fn query_multi(
        &self,
        templates: &[&'static EntityDescriptor],
        joins: &Joins,
        condition: &str,
        args: &[Value],
    ) -> Result<Vec<MultiRow>> {
        self.ensure_active()?;
        if templates.is_empty() || joins.len() + 1 != templates.len() {
            return Err(Error::Query(format!(
                "{} templates cannot be connected by {} join steps",
                templates.len(),
                joins.len()
            )));
        }

        let (trees, stmt) = {
            let mut cache = self.lock_cache();
            let trees = templates
                .iter()
                .map(|&desc| cache.tree(desc))
                .collect::<Result<Vec<_>>>()?;
            let refs: Vec<&DescriptorTree> = trees.iter().map(AsRef::as_ref).collect();
            let key = multi_statement_key(&refs, joins, condition);
            let stmt = cache.statement(&self.connection, &key, || {
                multi_select_sql(&refs, joins, condition)
            })?;
            (trees, stmt)
        };

        let refs: Vec<&DescriptorTree> = trees.iter().map(AsRef::as_ref).collect();
        let rows = self.connection.query_prepared(&stmt, args)?;
        tracing::debug!(rows = rows.len(), templates = templates.len(), "Multi query returned");
        rows.iter()
            .map(|row| read_templates(&refs, row.values()).map(MultiRow::new))
            .collect()
    }

    // ========================================================================
    // Raw statements
    // ========================================================================

    /// Execute trusted SQL without caching.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.ensure_active()?;
        tracing::debug!(sql = %sql, "Executing raw statement");
        self.connection.execute(sql, params)
    }

    /// Run a trusted query without caching.
    pub fn query_raw(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.ensure_active()?;
        tracing::debug!(sql = %sql, "Running raw query");
        self.connection.query(sql, params)
    }

    // ========================================================================
    // Transaction Management
    // ========================================================================

    /// Commit. A failed driver commit leaves the transaction active so it can still be
    /// rolled back.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&self) -> Result<()> {
        let mut state = self.lock_state();
        if state.is_terminal() {
            return Err(Error::State(*state));
        }
        tracing::info!("Committing transaction");
        self.connection.commit()?;
        *state = TransactionState::Committed;
        Ok(())
    }

    /// Roll back. No-op when already committed or rolled back.
    ///
    /// The transaction is finished afterwards even if the driver reports a failure.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.lock_state();
        if state.is_terminal() {
            return Ok(());
        }
        tracing::info!("Rolling back transaction");
        *state = TransactionState::RolledBack;
        self.connection.rollback()
    }

    // ========================================================================
    // Debug Diagnostics
    // ========================================================================

    /// Dump transaction state for debugging.
    pub fn debug_info(&self) -> TransactionDebugInfo {
        let cache = self.lock_cache();
        TransactionDebugInfo {
            state: self.state(),
            trees: cache.tree_count(),
            sql: cache.sql_count(),
            statements: cache.statement_count(),
        }
    }
}

impl<C: Connection> Drop for Transaction<C> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            return;
        }
        tracing::warn!("Transaction dropped while active, rolling back");
        *state = TransactionState::RolledBack;
        if let Err(e) = self.connection.rollback() {
            tracing::warn!(error = %e, "Rollback on drop failed");
        }
    }
}

/// Debug information about transaction state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDebugInfo {
    /// Lifecycle state.
    pub state: TransactionState,
    /// Cached descriptor trees.
    pub trees: usize,
    /// Cached generated SQL strings.
    pub sql: usize,
    /// Cached prepared statements.
    pub statements: usize,
}

// ============================================================================
// Unit Tests
// ============================================================================
