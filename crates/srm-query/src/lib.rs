//! SQL generation for SRM.
//!
//! Everything here is pure string building over `srm_core` descriptors: no I/O and no
//! caching. `srm-session` decides when to build and memoises the results.
//!
//! - [`select`]: single-entity SELECT with inner joins for every many-to-one reference
//! - [`dml`]: INSERT / UPDATE / DELETE
//! - [`join`]: multi-entity SELECT over caller-specified join steps
//! - [`expr`]: parameterised predicates for `where` / `order by` suffixes
//!
//! Placeholders are always PostgreSQL-style `$n`.

pub mod dml;
pub mod expr;
pub mod join;
pub mod select;

pub use dml::{DeleteBuilder, InsertBuilder, UpdateBuilder, delete_sql, insert_sql, update_sql};
pub use expr::{BinaryOp, Expr, Filter, Order};
pub use join::{
    JoinKind, JoinStep, Joins, inner, left_outer, multi_select_sql, multi_statement_key,
    template_alias,
};
pub use select::{ROOT_ALIAS, mto_joins, select_columns, select_sql, with_condition};
