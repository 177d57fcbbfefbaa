//! SQL column types and the scalar wrapper types that map onto them.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Column type of a scalar entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Variable-length string; the length comes from the field's `len` tag.
    Varchar,
    /// Fixed-precision decimal; precision comes from the field's `precision` tag.
    Numeric,
    /// Raw byte sequence.
    Blob,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
}

impl SqlType {
    /// Default varchar length when a field carries no `len` tag.
    pub const DEFAULT_VARCHAR_LEN: u32 = 255;

    /// DDL type name, without length or precision arguments.
    #[must_use]
    pub const fn sql_name(self) -> &'static str {
        match self {
            SqlType::Integer => "int",
            SqlType::BigInt => "bigint",
            SqlType::Float => "float",
            SqlType::Double => "double precision",
            SqlType::Varchar => "varchar",
            SqlType::Numeric => "numeric",
            SqlType::Blob => "blob",
            SqlType::Date => "date",
            SqlType::Time => "time",
            SqlType::Timestamp => "timestamp",
        }
    }

    /// Whether this is one of the temporal column types.
    pub const fn is_temporal(self) -> bool {
        matches!(self, SqlType::Date | SqlType::Time | SqlType::Timestamp)
    }
}

/// Fixed-precision decimal carried as its canonical text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Decimal(pub String);

impl Decimal {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Calendar date as days since 1970-01-01.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Date(pub i32);

impl Date {
    /// The current UTC date.
    pub fn today() -> Self {
        Self((Timestamp::now().0 / MICROS_PER_SECOND / SECONDS_PER_DAY) as i32)
    }
}

/// Time of day as microseconds since midnight.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Time(pub i64);

impl Time {
    pub const fn from_hms(hour: u32, minute: u32, second: u32) -> Self {
        Self(((hour as i64 * 60 + minute as i64) * 60 + second as i64) * MICROS_PER_SECOND)
    }

    /// The current UTC time of day.
    pub fn now() -> Self {
        Self(Timestamp::now().0.rem_euclid(SECONDS_PER_DAY * MICROS_PER_SECOND))
    }
}

/// Point in time as microseconds since the Unix epoch (UTC).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self(since.as_micros() as i64),
            Err(before) => Self(-(before.duration().as_micros() as i64)),
        }
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sql_names() {
        assert_eq!(SqlType::Integer.sql_name(), "int");
        assert_eq!(SqlType::BigInt.sql_name(), "bigint");
        assert_eq!(SqlType::Float.sql_name(), "float");
        assert_eq!(SqlType::Double.sql_name(), "double precision");
        assert_eq!(SqlType::Blob.sql_name(), "blob");
        assert!(SqlType::Timestamp.is_temporal());
        assert!(!SqlType::Varchar.is_temporal());
    }

    #[test]
    fn test_time_from_hms() {
        assert_eq!(Time::from_hms(0, 0, 1).0, 1_000_000);
        assert_eq!(Time::from_hms(1, 1, 0).0, 3_660_000_000);
    }

    #[test]
    fn test_timestamp_from_system_time() {
        let t = UNIX_EPOCH + Duration::from_secs(2);
        assert_eq!(Timestamp::from_system_time(t).0, 2_000_000);
        let before = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(Timestamp::from_system_time(before).0, -1_000_000);
    }
}
