//! Transaction manager: a configuration plus a connection provider.
//!
//! The manager owns the identity allocator, so every transaction it starts draws ids
//! from the same sequences.
//!
//! # Example
//!
//! ```rust,ignore
//! use srm::prelude::*;
//! use srm_sqlite::SqliteProvider;
//!
//! let manager = Manager::new(DatabaseConfig::from_file("conf.json")?, SqliteProvider::new());
//! manager.create_tables(&[Master1::descriptor(), Detail::descriptor()])?;
//!
//! manager.transactional(|tx| {
//!     let mut master = Master1 { id: 0, name: "A".into() };
//!     tx.persist(&mut master)
//! })?;
//! ```

use std::sync::Arc;

use srm_core::{
    Connection, ConnectionProvider, DatabaseConfig, EntityDescriptor, MemorySequences, Result,
    Sequences,
};
use srm_schema::{SchemaBuilder, create_table_sql_for, table_probe_sql};
use srm_session::Transaction;

/// Opens transactions against one database.
pub struct Manager<P: ConnectionProvider> {
    config: DatabaseConfig,
    provider: P,
    sequences: Arc<dyn Sequences>,
}

impl<P: ConnectionProvider> std::fmt::Debug for Manager<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P: ConnectionProvider> Manager<P> {
    /// Create a manager with in-process sequences starting at 1.
    pub fn new(config: DatabaseConfig, provider: P) -> Self {
        Self::with_sequences(config, provider, Arc::new(MemorySequences::new()))
    }

    /// Create a manager drawing identities from `sequences`.
    pub fn with_sequences(
        config: DatabaseConfig,
        provider: P,
        sequences: Arc<dyn Sequences>,
    ) -> Self {
        Self {
            config,
            provider,
            sequences,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn sequences(&self) -> &Arc<dyn Sequences> {
        &self.sequences
    }

    /// Open a connection and begin a transaction on it.
    #[tracing::instrument(level = "debug", skip(self), fields(database = %self.config.database))]
    pub fn start_transaction(&self) -> Result<Transaction<P::Connection>> {
        let connection = self.provider.open(&self.config)?;
        Transaction::begin(connection, Arc::clone(&self.sequences))
    }

    /// Run `f` in a fresh transaction: commit on `Ok`, roll back and return the error on
    /// `Err`. A panic in `f` rolls back through the transaction's drop guard.
    pub fn transactional<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<P::Connection>) -> Result<T>,
    {
        let tx = self.start_transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(error = %rollback, "Rollback after failed unit of work failed");
                }
                Err(e)
            }
        }
    }

    /// Create every missing table for `descriptors` and the entities they reference.
    ///
    /// Existence is probed on a separate connection so that a failed probe cannot
    /// abort the transaction doing the creates. Returns the tables that were created.
    #[tracing::instrument(level = "debug", skip(self, descriptors))]
    pub fn create_tables(&self, descriptors: &[&'static EntityDescriptor]) -> Result<Vec<String>> {
        let ordered = descriptors
            .iter()
            .fold(SchemaBuilder::new(), |builder, &desc| builder.add(desc))
            .ordered()?;

        let probe = self.provider.open(&self.config)?;
        let missing: Vec<&'static EntityDescriptor> = ordered
            .into_iter()
            .filter(|desc| {
                let table = desc.qualified_table_name();
                match probe.query(&table_probe_sql(desc), &[]) {
                    Ok(_) => {
                        tracing::info!(table = %table, "Table exists");
                        false
                    }
                    Err(e) => {
                        tracing::info!(table = %table, error = %e, "Table absent");
                        true
                    }
                }
            })
            .collect();
        drop(probe);

        if missing.is_empty() {
            return Ok(Vec::new());
        }

        self.transactional(|tx| {
            let dialect = tx.connection().dialect();
            let mut created = Vec::with_capacity(missing.len());
            for desc in &missing {
                let sql = create_table_sql_for(desc, dialect)?;
                tx.execute(&sql, &[])?;
                let table = desc.qualified_table_name();
                tracing::info!(table = %table, "Created table");
                created.push(table);
            }
            Ok(created)
        })
    }
}
