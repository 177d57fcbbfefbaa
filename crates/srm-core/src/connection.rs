//! Driver seams: a single database connection and the factory that opens it.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// SQL dialect spoken by a connection.
///
/// Generated DML and queries are the same for every dialect; only DDL differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// PostgreSQL: schema-qualified names everywhere.
    #[default]
    Postgres,
    /// SQLite: schemas are attached databases, and a foreign key must name a table in
    /// the same database without qualification.
    Sqlite,
}

/// Handle to a statement prepared on a `Connection`.
///
/// The handle is only meaningful for the connection that produced it; drivers use the
/// `id` (or the SQL text) to find their native statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    id: u64,
    sql: String,
    param_count: usize,
}

impl PreparedStatement {
    pub fn new(id: u64, sql: impl Into<String>, param_count: usize) -> Self {
        Self {
            id,
            sql: sql.into(),
            param_count,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of placeholders the driver reported for this statement.
    pub fn param_count(&self) -> usize {
        self.param_count
    }
}

/// One open database connection.
///
/// Methods take `&self`; drivers that need mutation use interior mutability. Failures
/// are reported as `Error::Prepare` / `Error::Execution` carrying the SQL text.
pub trait Connection {
    /// Dialect used for DDL generation.
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    /// Start the physical transaction.
    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Compile `sql` once; the handle can be executed repeatedly.
    fn prepare(&self, sql: &str) -> Result<PreparedStatement>;

    /// Run a prepared query and collect every row.
    fn query_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a prepared statement, returning the affected row count.
    fn execute_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<u64>;

    /// Run an ad-hoc query without caching.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run an ad-hoc statement without caching.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

/// Opens connections from a configuration.
pub trait ConnectionProvider {
    type Connection: Connection;

    fn open(&self, config: &DatabaseConfig) -> Result<Self::Connection>;
}
