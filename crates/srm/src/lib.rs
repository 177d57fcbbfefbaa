//! SRM: struct relational mapping for Rust.
//!
//! Entities are plain structs whose first field is an `i64` identity. A field whose type
//! is another entity is a many-to-one reference, stored as `<field>_id`. Queries load
//! the whole reference graph in one statement with one join per reference, and
//! multi-entity queries join several entity types along caller-specified steps.
//!
//! This crate is the facade: it re-exports the workspace crates and adds the
//! [`Manager`], which opens transactions from a [`DatabaseConfig`].
//!
//! ```rust,ignore
//! use srm::prelude::*;
//!
//! #[derive(Entity, Debug, Clone, Default)]
//! struct Master1 {
//!     #[srm(schema = "harness")]
//!     id: i64,
//!     name: String,
//! }
//!
//! let tx = manager.start_transaction()?;
//! let mut a = Master1 { id: 0, name: "A".into() };
//! tx.persist(&mut a)?;
//! let all = tx.query::<Master1>("order by o.id", &[])?;
//! tx.commit()?;
//! ```

pub mod manager;

pub use manager::Manager;

pub use srm_core;
pub use srm_core::{
    Connection, ConnectionProvider, DatabaseConfig, Date, Decimal, DescriptorTree, Dialect,
    EntityDescriptor, Error, FieldDef, FieldKind, FieldType, MemorySequences, PreparedStatement,
    Record, Result, Row, Sequences, Slot, SqlType, Time, Timestamp, TransactionState, Value,
    qualified_table_name,
};
pub use srm_core::Entity;
pub use srm_macros::Entity;
pub use srm_query::{Expr, Filter, JoinKind, Joins, Order, inner, left_outer};
pub use srm_schema::SchemaBuilder;
pub use srm_session::{MultiRow, Transaction, TransactionDebugInfo};

/// Everything an application needs to define entities and run transactions.
pub mod prelude {
    pub use crate::Manager;
    pub use srm_core::{
        Connection, ConnectionProvider, DatabaseConfig, Date, Decimal, Entity, Error,
        FieldType, Result, Sequences, Time, Timestamp, TransactionState, Value,
    };
    pub use srm_macros::Entity;
    pub use srm_query::{Expr, Filter, Joins, Order, inner, left_outer};
    pub use srm_session::{MultiRow, Transaction};
}
