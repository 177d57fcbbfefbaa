//! Static entity descriptors.
//!
//! Each entity type exposes one `&'static EntityDescriptor` listing its fields in
//! declaration order. The first field is the 64-bit identity; every other field is
//! either a scalar column or a many-to-one reference to another entity type.

use crate::error::{Error, Result};
use crate::identifiers::is_valid_identifier;
use crate::types::SqlType;

/// What a field maps to in the store.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A plain column of the given type.
    Scalar(SqlType),
    /// A many-to-one reference, stored as a `<field>_id` foreign key.
    ///
    /// Held as a function so that descriptors can refer to each other from statics.
    Reference(fn() -> &'static EntityDescriptor),
}

/// One field of an entity type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Field name; also the column name for scalars.
    pub name: &'static str,
    pub kind: FieldKind,
    /// Varchar length; `SqlType::DEFAULT_VARCHAR_LEN` when absent.
    pub len: Option<u32>,
    /// Numeric precision text, e.g. `"10,2"`.
    pub precision: Option<&'static str>,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            len: None,
            precision: None,
        }
    }

    pub const fn scalar(name: &'static str, sql_type: SqlType) -> Self {
        Self::new(name, FieldKind::Scalar(sql_type))
    }

    pub const fn reference(name: &'static str, target: fn() -> &'static EntityDescriptor) -> Self {
        Self::new(name, FieldKind::Reference(target))
    }

    #[must_use]
    pub const fn len(mut self, len: u32) -> Self {
        self.len = Some(len);
        self
    }

    #[must_use]
    pub const fn precision(mut self, precision: &'static str) -> Self {
        self.precision = Some(precision);
        self
    }

    pub const fn is_scalar(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar(_))
    }

    /// Descriptor of the referenced entity, for reference fields.
    pub fn referenced(&self) -> Option<&'static EntityDescriptor> {
        match self.kind {
            FieldKind::Reference(target) => Some(target()),
            FieldKind::Scalar(_) => None,
        }
    }

    /// Column name: the field name for scalars, `<field>_id` for references.
    pub fn column_name(&self) -> String {
        match self.kind {
            FieldKind::Scalar(_) => self.name.to_string(),
            FieldKind::Reference(_) => format!("{}_id", self.name),
        }
    }

    /// Column type as written in DDL, including length or precision arguments.
    pub fn column_type(&self) -> String {
        match self.kind {
            FieldKind::Scalar(SqlType::Varchar) => format!(
                "varchar({})",
                self.len.unwrap_or(SqlType::DEFAULT_VARCHAR_LEN)
            ),
            FieldKind::Scalar(SqlType::Numeric) => match self.precision {
                Some(p) => format!("numeric({p})"),
                None => "numeric".to_string(),
            },
            FieldKind::Scalar(ty) => ty.sql_name().to_string(),
            FieldKind::Reference(_) => SqlType::BigInt.sql_name().to_string(),
        }
    }
}

/// Static description of one entity type.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Type name, e.g. `"Detail"`.
    pub name: &'static str,
    /// Optional schema qualifier.
    pub schema: Option<&'static str>,
    /// Fields in declaration order, identity first.
    pub fields: &'static [FieldDef],
}

impl EntityDescriptor {
    pub const fn new(
        name: &'static str,
        schema: Option<&'static str>,
        fields: &'static [FieldDef],
    ) -> Self {
        Self {
            name,
            schema,
            fields,
        }
    }

    /// The identity field, if the first field is an `i64` named `id`.
    pub fn identity(&self) -> Option<&FieldDef> {
        self.fields.first().filter(|f| {
            f.name.eq_ignore_ascii_case("id") && matches!(f.kind, FieldKind::Scalar(SqlType::BigInt))
        })
    }

    /// Fields after the identity.
    pub fn mutable_fields(&self) -> &'static [FieldDef] {
        self.fields.get(1..).unwrap_or(&[])
    }

    /// Reference fields in declaration order.
    pub fn references(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| !f.is_scalar())
    }

    pub fn qualified_table_name(&self) -> String {
        qualified_table_name(self)
    }

    /// Check the identity-first convention and every name that ends up in SQL.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_identifier(self.name) {
            return Err(Error::Schema(format!(
                "entity name `{}` is not a valid identifier",
                self.name
            )));
        }
        if let Some(schema) = self.schema.filter(|s| !is_valid_identifier(s)) {
            return Err(Error::Schema(format!(
                "schema `{}` of {} is not a valid identifier",
                schema, self.name
            )));
        }
        if self.identity().is_none() {
            return Err(Error::Schema(format!(
                "{} must declare an i64 `id` as its first field",
                self.name
            )));
        }
        for field in self.fields {
            if !is_valid_identifier(field.name) {
                return Err(Error::Schema(format!(
                    "field `{}` of {} is not a valid identifier",
                    field.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// `schema.lowercase(name)`, or just the lowercase name without a schema tag.
pub fn qualified_table_name(descriptor: &EntityDescriptor) -> String {
    let table = descriptor.name.to_lowercase();
    match descriptor.schema {
        Some(schema) => format!("{schema}.{table}"),
        None => table,
    }
}

/// Whether `field` references an entity type with an identity-first layout.
pub fn is_entity_reference(field: &FieldDef) -> bool {
    field
        .referenced()
        .is_some_and(|target| target.identity().is_some())
}
