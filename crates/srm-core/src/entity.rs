//! Entity and field contracts, plus the untyped record graph produced by marshalling.

use crate::error::{Error, Result};
use crate::schema::{EntityDescriptor, FieldKind};
use crate::types::{Date, Decimal, SqlType, Time, Timestamp};
use crate::value::Value;

/// A record type mapped to one table.
///
/// Usually implemented with `#[derive(Entity)]`. The first field is always the `i64`
/// identity; reference fields hold the referenced entity by value.
pub trait Entity: Sized {
    /// Static field layout of this type.
    fn descriptor() -> &'static EntityDescriptor;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Column values in declared field order; references contribute the referenced id.
    fn to_values(&self) -> Vec<Value>;

    /// Build the typed value from a marshalled record.
    fn from_record(record: Record) -> Result<Self>;
}

/// A type usable as an entity field.
pub trait FieldType: Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> Value;

    fn from_slot(slot: Slot) -> Result<Self>;
}

/// One materialised entity row, fields in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: &'static str,
    slots: Vec<Slot>,
}

/// The content of one field in a `Record`.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// A scalar column value (identity included).
    Value(Value),
    /// A materialised referenced entity.
    Entity(Record),
    /// A reference whose branch was not present in the row.
    Absent,
}

impl Record {
    pub fn new(entity: &'static str, slots: Vec<Slot>) -> Self {
        Self { entity, slots }
    }

    /// Name of the entity type this record was read for.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Identity value, when the first slot holds an integer.
    pub fn id(&self) -> Option<i64> {
        match self.slots.first() {
            Some(Slot::Value(v)) => v.as_i64(),
            _ => None,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<Slot> {
        self.slots
    }

    /// Sequential reader over the fields, used by `Entity::from_record`.
    pub fn into_reader(self) -> FieldReader {
        FieldReader {
            entity: self.entity,
            slots: self.slots.into_iter(),
        }
    }
}

/// Reads a record's fields in declared order.
#[derive(Debug)]
pub struct FieldReader {
    entity: &'static str,
    slots: std::vec::IntoIter<Slot>,
}

impl FieldReader {
    pub fn next_field<T: FieldType>(&mut self, name: &str) -> Result<T> {
        let slot = self.slots.next().ok_or_else(|| {
            Error::Scan(format!("{}.{}: record has no slot for field", self.entity, name))
        })?;
        T::from_slot(slot).map_err(|e| match e {
            Error::Scan(msg) => Error::Scan(format!("{}.{}: {}", self.entity, name, msg)),
            other => other,
        })
    }
}

/// Decode a reference field into its entity type.
pub fn reference_from_slot<T: Entity>(slot: Slot) -> Result<T> {
    match slot {
        Slot::Entity(record) => T::from_record(record),
        Slot::Absent => Err(Error::Scan(format!(
            "referenced {} is absent",
            T::descriptor().name
        ))),
        Slot::Value(v) => Err(Error::Scan(format!(
            "expected a {} record, found {}",
            T::descriptor().name,
            v.type_name()
        ))),
    }
}

fn scalar(slot: Slot) -> Result<Value> {
    match slot {
        Slot::Value(Value::Null) => Err(Error::Scan("unexpected null".to_string())),
        Slot::Value(v) => Ok(v),
        Slot::Entity(record) => Err(Error::Scan(format!(
            "expected a scalar, found a {} record",
            record.entity
        ))),
        Slot::Absent => Err(Error::Scan("expected a scalar, found nothing".to_string())),
    }
}

fn mismatch<T>(expected: &str, found: &Value) -> Result<T> {
    Err(Error::Scan(format!(
        "expected {}, found {}",
        expected,
        found.type_name()
    )))
}

fn narrow(v: i64, expected: &str) -> Result<i32> {
    i32::try_from(v).map_err(|_| Error::Scan(format!("{v} does not fit {expected}")))
}

impl FieldType for i32 {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Integer);

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        match scalar(slot)? {
            Value::Int(v) => Ok(v),
            Value::BigInt(v) => narrow(v, "int"),
            other => mismatch("int", &other),
        }
    }
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::BigInt);

    fn to_value(&self) -> Value {
        Value::BigInt(*self)
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        let v = scalar(slot)?;
        match v.as_i64() {
            Some(i) => Ok(i),
            None => mismatch("bigint", &v),
        }
    }
}

impl FieldType for f32 {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Float);

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        let v = scalar(slot)?;
        match v.as_f64() {
            Some(f) => Ok(f as f32),
            None => mismatch("float", &v),
        }
    }
}

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Double);

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        let v = scalar(slot)?;
        match v.as_f64() {
            Some(f) => Ok(f),
            None => mismatch("double", &v),
        }
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Varchar);

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        match scalar(slot)? {
            Value::Text(s) => Ok(s),
            other => mismatch("varchar", &other),
        }
    }
}

impl FieldType for Vec<u8> {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Blob);

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        match scalar(slot)? {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => mismatch("blob", &other),
        }
    }
}

impl FieldType for Decimal {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Numeric);

    fn to_value(&self) -> Value {
        Value::Decimal(self.0.clone())
    }

    // Stores with numeric affinity may hand the value back as a number.
    fn from_slot(slot: Slot) -> Result<Self> {
        match scalar(slot)? {
            Value::Decimal(s) | Value::Text(s) => Ok(Decimal(s)),
            Value::Double(f) => Ok(Decimal(f.to_string())),
            Value::Float(f) => Ok(Decimal(f.to_string())),
            Value::Int(i) => Ok(Decimal(i.to_string())),
            Value::BigInt(i) => Ok(Decimal(i.to_string())),
            other => mismatch("numeric", &other),
        }
    }
}

impl FieldType for Date {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Date);

    fn to_value(&self) -> Value {
        Value::Date(self.0)
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        match scalar(slot)? {
            Value::Date(d) | Value::Int(d) => Ok(Date(d)),
            Value::BigInt(d) => narrow(d, "date").map(Date),
            other => mismatch("date", &other),
        }
    }
}

impl FieldType for Time {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Time);

    fn to_value(&self) -> Value {
        Value::Time(self.0)
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        match scalar(slot)? {
            Value::Time(t) | Value::BigInt(t) => Ok(Time(t)),
            Value::Int(t) => Ok(Time(i64::from(t))),
            other => mismatch("time", &other),
        }
    }
}

impl FieldType for Timestamp {
    const KIND: FieldKind = FieldKind::Scalar(SqlType::Timestamp);

    fn to_value(&self) -> Value {
        Value::Timestamp(self.0)
    }

    fn from_slot(slot: Slot) -> Result<Self> {
        match scalar(slot)? {
            Value::Timestamp(t) | Value::BigInt(t) => Ok(Timestamp(t)),
            Value::Int(t) => Ok(Timestamp(i64::from(t))),
            other => mismatch("timestamp", &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_walks_declared_order() {
        let record = Record::new(
            "Master1",
            vec![
                Slot::Value(Value::BigInt(4)),
                Slot::Value(Value::Text("A".to_string())),
            ],
        );
        assert_eq!(record.id(), Some(4));
        let mut reader = record.into_reader();
        assert_eq!(reader.next_field::<i64>("id").unwrap(), 4);
        assert_eq!(reader.next_field::<String>("name").unwrap(), "A");
        let err = reader.next_field::<String>("extra").unwrap_err();
        assert!(matches!(err, Error::Scan(msg) if msg.contains("Master1.extra")));
    }

    #[test]
    fn test_null_scalar_is_scan_error() {
        let err = String::from_slot(Slot::Value(Value::Null)).unwrap_err();
        assert!(matches!(err, Error::Scan(_)));
    }

    #[test]
    fn test_lenient_numeric_reads() {
        assert_eq!(i32::from_slot(Slot::Value(Value::BigInt(12))).unwrap(), 12);
        assert!(i32::from_slot(Slot::Value(Value::BigInt(i64::MAX))).is_err());
        assert_eq!(f32::from_slot(Slot::Value(Value::Double(1.5))).unwrap(), 1.5);
        assert_eq!(
            Date::from_slot(Slot::Value(Value::BigInt(19_000))).unwrap(),
            Date(19_000)
        );
        assert_eq!(
            Decimal::from_slot(Slot::Value(Value::Double(10.5))).unwrap(),
            Decimal::new("10.5")
        );
    }
}
