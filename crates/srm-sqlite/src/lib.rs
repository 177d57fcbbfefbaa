//! SQLite driver for SRM, backed by `rusqlite`.
//!
//! Schema-qualified tables (`harness.master1`) live in attached databases: opening a
//! connection through [`SqliteProvider`] attaches one database per configured schema.
//! Statement handles map onto rusqlite's prepared-statement cache, and `$n`
//! placeholders are bound by name so a placeholder may repeat or appear out of order.
//!
//! Each in-memory connection is its own database; use a file path in
//! `DatabaseConfig::database` to share data between transactions.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{Statement, params};
use srm_core::identifiers::is_valid_identifier;
use srm_core::{
    Connection, ConnectionProvider, DatabaseConfig, Dialect, Error, PreparedStatement, Result,
    Row, Value,
};

const MEMORY: &str = ":memory:";
const STATEMENT_CACHE_CAPACITY: usize = 256;

/// A single SQLite connection.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    next_statement: Cell<u64>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.conn.path())
            .field("statements", &self.next_statement.get())
            .finish()
    }
}

fn connection_error(e: impl std::fmt::Display) -> Error {
    Error::Connection(e.to_string())
}

impl SqliteConnection {
    fn wrap(conn: rusqlite::Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        Self {
            conn,
            next_statement: Cell::new(0),
        }
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        tracing::debug!("Opening in-memory SQLite database");
        rusqlite::Connection::open_in_memory()
            .map(Self::wrap)
            .map_err(connection_error)
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Opening SQLite database");
        rusqlite::Connection::open(path)
            .map(Self::wrap)
            .map_err(connection_error)
    }

    /// Attach `path` (a file or `:memory:`) as schema `name`.
    pub fn attach(&self, name: &str, path: &str) -> Result<()> {
        if !is_valid_identifier(name) {
            return Err(Error::Connection(format!(
                "schema `{name}` is not a valid identifier"
            )));
        }
        let sql = format!("attach database ?1 as {name}");
        tracing::debug!(schema = name, path, "Attaching SQLite database");
        self.conn
            .execute(&sql, params![path])
            .map(|_| ())
            .map_err(|e| Error::execution(sql, e))
    }

    /// The wrapped rusqlite connection.
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| Error::prepare(sql, e))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        bind(&mut stmt, params).map_err(|e| Error::execution(sql, e))?;

        let mut rows = stmt.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| Error::execution(sql, e))? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value = row.get_ref(i).map_err(|e| Error::execution(sql, e))?;
                values.push(from_sqlite(value));
            }
            out.push(Row::new(columns.clone(), values));
        }
        Ok(out)
    }

    fn run_execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| Error::prepare(sql, e))?;
        bind(&mut stmt, params).map_err(|e| Error::execution(sql, e))?;
        stmt.raw_execute()
            .map(|n| n as u64)
            .map_err(|e| Error::execution(sql, e))
    }
}

/// Bind `params[i]` to `$i+1`, falling back to the positional index.
fn bind(stmt: &mut Statement<'_>, params: &[Value]) -> rusqlite::Result<()> {
    for (i, value) in params.iter().enumerate() {
        let name = format!("${}", i + 1);
        let index = stmt.parameter_index(&name)?.unwrap_or(i + 1);
        stmt.raw_bind_parameter(index, Param(value))?;
    }
    Ok(())
}

struct Param<'a>(&'a Value);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Value::Int(v) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*v))),
            Value::BigInt(v) | Value::Time(v) | Value::Timestamp(v) => {
                ToSqlOutput::Owned(SqliteValue::Integer(*v))
            }
            Value::Date(v) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*v))),
            Value::Float(v) => ToSqlOutput::Owned(SqliteValue::Real(f64::from(*v))),
            Value::Double(v) => ToSqlOutput::Owned(SqliteValue::Real(*v)),
            Value::Decimal(s) | Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::BigInt(i),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn begin(&self) -> Result<()> {
        self.conn
            .execute_batch("begin")
            .map_err(|e| Error::execution("begin", e))
    }

    fn commit(&self) -> Result<()> {
        self.conn
            .execute_batch("commit")
            .map_err(|e| Error::execution("commit", e))
    }

    fn rollback(&self) -> Result<()> {
        self.conn
            .execute_batch("rollback")
            .map_err(|e| Error::execution("rollback", e))
    }

    fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| Error::prepare(sql, e))?;
        let id = self.next_statement.get() + 1;
        self.next_statement.set(id);
        Ok(PreparedStatement::new(id, sql, stmt.parameter_count()))
    }

    fn query_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<Vec<Row>> {
        self.run_query(stmt.sql(), params)
    }

    fn execute_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<u64> {
        self.run_execute(stmt.sql(), params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run_query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.run_execute(sql, params)
    }
}

/// Opens SQLite connections from a `DatabaseConfig`.
///
/// `database` is a file path, or `:memory:` (also used when empty). A configured
/// `schema` is attached next to the main file as `<stem>.<schema>.db`, or in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProvider;

impl SqliteProvider {
    pub fn new() -> Self {
        Self
    }

    fn schema_path(database: &str, schema: &str) -> String {
        if is_memory(database) {
            return MEMORY.to_string();
        }
        let main = PathBuf::from(database);
        main.with_extension(format!("{schema}.db"))
            .to_string_lossy()
            .into_owned()
    }
}

fn is_memory(database: &str) -> bool {
    database.is_empty() || database == MEMORY
}

impl ConnectionProvider for SqliteProvider {
    type Connection = SqliteConnection;

    fn open(&self, config: &DatabaseConfig) -> Result<SqliteConnection> {
        let conn = if is_memory(&config.database) {
            SqliteConnection::open_memory()?
        } else {
            SqliteConnection::open(&config.database)?
        };
        if let Some(schema) = &config.schema {
            conn.attach(schema, &Self::schema_path(&config.database, schema))?;
        }
        Ok(conn)
    }
}
