//! [`PgValue`]: a decoded column value or bound parameter, dynamically typed at the OID level.

use bit_vec::BitVec;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ipnetwork::IpNetwork;
use uuid::Uuid;

use crate::types::geo::PgPoint;
use crate::types::{PgNumeric, PgRange, PgRecord};

/// A PostgreSQL value, decoded to an owned Rust representation.
///
/// This is the value type the registry (C2) produces for a `DataRow` column and consumes for a
/// bound parameter. `Null` is distinct from any scalar variant so callers can distinguish SQL
/// `NULL` from, say, an empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Bytes(Vec<u8>),
    Numeric(PgNumeric),
    Uuid(Uuid),
    /// Raw JSON text for `JSON`/`JSONB` columns. `pgcore` does not depend on a JSON crate, so
    /// structured access is left to the caller.
    Json(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Timestamptz(DateTime<Utc>),
    Interval(PgInterval),
    Inet(IpNetwork),
    MacAddr([u8; 6]),
    Point(PgPoint),
    /// Fixed-point currency, stored as the integer number of cents (§4.2).
    Money(i64),
    Bit(BitVec),
    Array(Vec<PgValue>),
    Range(Box<PgRange<PgValue>>),
    Composite(PgRecord),
}

impl PgValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PgValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PgValue::Int2(v) => Some(*v as i64),
            PgValue::Int4(v) => Some(*v as i64),
            PgValue::Int8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PgValue::Float4(v) => Some(*v as f64),
            PgValue::Float8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PgValue::Text(v) | PgValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PgValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for PgValue {
            fn from(v: $ty) -> Self {
                PgValue::$variant(v.into())
            }
        }
    };
}

impl_from!(bool, Bool);
impl_from!(i16, Int2);
impl_from!(i32, Int4);
impl_from!(i64, Int8);
impl_from!(f32, Float4);
impl_from!(f64, Float8);
impl_from!(String, Text);
impl_from!(Vec<u8>, Bytes);

impl From<&str> for PgValue {
    fn from(v: &str) -> Self {
        PgValue::Text(v.to_owned())
    }
}

impl From<&[u8]> for PgValue {
    fn from(v: &[u8]) -> Self {
        PgValue::Bytes(v.to_owned())
    }
}

impl<T> From<Option<T>> for PgValue
where
    T: Into<PgValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(PgValue::Null, Into::into)
    }
}

impl<T> From<Vec<T>> for PgValue
where
    T: Into<PgValue>,
{
    fn from(v: Vec<T>) -> Self {
        PgValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// A PostgreSQL `INTERVAL`: months and days are kept separate from the microsecond component
/// because they are calendar-relative (month length, DST) rather than a fixed duration (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgInterval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}
