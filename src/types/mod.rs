//! Type OID registry (C2): maps a PostgreSQL type OID to the codec that can transcode values of
//! that type between the wire's binary format and an owned [`PgValue`].

pub(crate) mod array;
pub(crate) mod bits;
pub(crate) mod datetime;
pub(crate) mod geo;
pub(crate) mod money;
pub(crate) mod network;
pub(crate) mod numeric;
pub(crate) mod oid;
pub(crate) mod range;
pub(crate) mod record;
pub(crate) mod registry;
pub(crate) mod scalars;
mod value;

pub use geo::PgPoint;
pub use numeric::{PgNumeric, PgNumericSign};
pub use range::{PgRange, PgRangeBound};
pub use record::PgRecord;
pub use registry::CustomCodec;
pub use value::{PgInterval, PgValue};

use std::sync::Arc;

/// A PostgreSQL type OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Oid(pub(crate) u32);

impl Oid {
    pub const fn new(oid: u32) -> Self {
        Self(oid)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for Oid {
    fn from(oid: u32) -> Self {
        Self(oid)
    }
}

/// The shape of a type, beyond its OID: whether it's a scalar, or built from other types.
///
/// Composite, enum, and range kinds are filled in lazily by introspection (C8); built-in scalar
/// and array kinds are known statically.
#[derive(Debug, Clone)]
pub enum PgTypeKind {
    Simple,
    Pseudo,
    Array(Oid),
    Range(Oid),
    Domain(Oid),
    Composite(Arc<[(String, Oid)]>),
    Enum(Arc<[String]>),
}

/// Metadata about a PostgreSQL type: its OID, canonical name, and [`PgTypeKind`].
#[derive(Debug, Clone)]
pub struct PgTypeInfo {
    pub(crate) oid: Oid,
    pub(crate) name: Arc<str>,
    pub(crate) kind: PgTypeKind,
}

impl PgTypeInfo {
    pub(crate) fn new(oid: Oid, name: impl Into<Arc<str>>, kind: PgTypeKind) -> Self {
        Self {
            oid,
            name: name.into(),
            kind,
        }
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PgTypeKind {
        &self.kind
    }
}

impl PartialEq for PgTypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid
    }
}

/// Implemented by Rust types that have a fixed, well-known PostgreSQL type. Used to pick the
/// OID and binary format to send when a [`PgValue`] is bound as a query parameter with no
/// explicit cast.
pub trait PgHasType {
    fn type_oid() -> Oid;
}

macro_rules! impl_has_type {
    ($ty:ty, $oid:expr) => {
        impl PgHasType for $ty {
            fn type_oid() -> Oid {
                $oid
            }
        }
    };
}

impl_has_type!(bool, oid::BOOL);
impl_has_type!(i16, oid::INT2);
impl_has_type!(i32, oid::INT4);
impl_has_type!(i64, oid::INT8);
impl_has_type!(f32, oid::FLOAT4);
impl_has_type!(f64, oid::FLOAT8);
impl_has_type!(String, oid::TEXT);
impl_has_type!(Vec<u8>, oid::BYTEA);

pub(crate) use impl_has_type;
