//! Procedural macros for SRM.
//!
//! `#[derive(Entity)]` turns a plain struct into an SRM entity: it emits the static
//! `EntityDescriptor`, the `Entity` impl used by the transaction layer, and a
//! `FieldType` impl so the struct can itself be embedded as a many-to-one reference in
//! another entity.
//!
//! ```ignore
//! #[derive(Entity, Debug, Clone, Default)]
//! struct Detail {
//!     #[srm(schema = "harness")]
//!     id: i64,
//!     master1: Master1,
//!     #[srm(len = 80)]
//!     name: String,
//! }
//! ```
//!
//! Generated code refers to `::srm_core`, so crates using the derive depend on
//! `srm-core` directly (the `srm` facade re-exports it as well).

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity_derive;

/// Derive `srm_core::Entity` and `srm_core::FieldType` for a struct.
///
/// The first field must be the `i64` identity named `id`. Supported attributes:
///
/// - `#[srm(schema = "name")]` on the struct or on the identity field
/// - `#[srm(len = N)]` on `String` fields (varchar length, default 255)
/// - `#[srm(precision = "p,s")]` on `Decimal` fields
#[proc_macro_derive(Entity, attributes(srm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match entity_derive::parse_entity(&input) {
        Ok(def) => entity_derive::generate_entity_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
