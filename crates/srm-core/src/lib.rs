//! Core types and traits for SRM.
//!
//! `srm-core` is the **foundation layer** of the workspace. It defines the contracts
//! that user entities and database drivers implement, and the pure data structures the
//! SQL builders and the transaction layer share.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Entity` and `FieldType` are implemented by user records
//!   (usually through `#[derive(Entity)]`); `Connection`, `ConnectionProvider` and
//!   `Sequences` are implemented by drivers and identifier allocators.
//! - **Schema introspection**: `EntityDescriptor` is the static description of one
//!   entity type, and `DescriptorTree` expands it with all of its many-to-one
//!   references into an arena with precomputed slot widths.
//! - **Marshalling**: `marshal` turns one flat result row back into a nested `Record`
//!   graph, skipping absent outer-joined branches by their static width.
//! - **Data model**: `Value` and `Row` carry statement parameters and results.
//!
//! # Who Uses This Crate
//!
//! - `srm-macros` generates `Entity` implementations defined here.
//! - `srm-query` renders SQL from `DescriptorTree`s.
//! - `srm-session` drives `Connection`s and `marshal` inside a transaction.
//! - `srm-sqlite` implements `Connection` and `ConnectionProvider`.

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod identifiers;
pub mod marshal;
pub mod row;
pub mod schema;
pub mod sequence;
pub mod tree;
pub mod types;
pub mod value;

pub use config::DatabaseConfig;
pub use connection::{Connection, ConnectionProvider, Dialect, PreparedStatement};
pub use entity::{Entity, FieldReader, FieldType, Record, Slot};
pub use error::{Error, Result, TransactionState};
pub use row::Row;
pub use schema::{EntityDescriptor, FieldDef, FieldKind, is_entity_reference, qualified_table_name};
pub use sequence::{MemorySequences, Sequences};
pub use tree::{DescriptorTree, TreeNode};
pub use types::{Date, Decimal, SqlType, Time, Timestamp};
pub use value::Value;
