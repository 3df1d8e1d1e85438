//! The runtime OID -> codec dispatch (C2): binds a type OID to a [`PgTypeInfo`] and transcodes
//! [`PgValue`]s recursively for arrays, ranges, composites, domains, and enums.
//!
//! Generalized from a simple per-connection name/oid cache into a full codec table so OIDs
//! introspected at runtime (C8) transcode the same way as the built-ins.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::error::{err_protocol, Error};
use crate::io::BufMut;
use crate::types::array::PgArray;
use crate::types::range::{PgRange, PgRangeBound};
use crate::types::record::PgRecord;
use crate::types::{bits, datetime, geo, money, network, oid, scalars};
use crate::types::{Oid, PgNumeric, PgTypeInfo, PgTypeKind, PgValue};

pub(crate) const FORMAT_TEXT: i16 = 0;
pub(crate) const FORMAT_BINARY: i16 = 1;

/// A caller-registered override for how a single OID is encoded/decoded (`set_type_codec`, §4.2/§4.6).
pub struct CustomCodec {
    pub decode: Box<dyn Fn(&[u8]) -> crate::Result<PgValue> + Send + Sync>,
    pub encode: Box<dyn Fn(&PgValue, &mut Vec<u8>) -> crate::Result<()> + Send + Sync>,
    pub format: i16,
}

/// Static metadata for the scalar built-ins that need no introspection. Array and range built-ins
/// are handled directly through [`oid::array_element`]/[`oid::range_element`] and don't need an
/// entry here; this table exists so [`TypeRegistry::info`] can name a plain scalar OID.
static BUILTINS: Lazy<HashMap<Oid, PgTypeInfo>> = Lazy::new(|| {
    let scalars: &[(Oid, &str)] = &[
        (oid::BOOL, "bool"),
        (oid::BYTEA, "bytea"),
        (oid::CHAR, "char"),
        (oid::NAME, "name"),
        (oid::INT8, "int8"),
        (oid::INT2, "int2"),
        (oid::INT4, "int4"),
        (oid::TEXT, "text"),
        (oid::OID, "oid"),
        (oid::JSON, "json"),
        (oid::XML, "xml"),
        (oid::POINT, "point"),
        (oid::CIDR, "cidr"),
        (oid::FLOAT4, "float4"),
        (oid::FLOAT8, "float8"),
        (oid::MACADDR, "macaddr"),
        (oid::INET, "inet"),
        (oid::BPCHAR, "bpchar"),
        (oid::VARCHAR, "varchar"),
        (oid::DATE, "date"),
        (oid::TIME, "time"),
        (oid::TIMESTAMP, "timestamp"),
        (oid::TIMESTAMPTZ, "timestamptz"),
        (oid::INTERVAL, "interval"),
        (oid::TIMETZ, "timetz"),
        (oid::BIT, "bit"),
        (oid::VARBIT, "varbit"),
        (oid::NUMERIC, "numeric"),
        (oid::VOID, "void"),
        (oid::UUID, "uuid"),
        (oid::JSONB, "jsonb"),
        (oid::MONEY, "money"),
    ];

    scalars
        .iter()
        .map(|&(oid, name)| (oid, PgTypeInfo::new(oid, name, PgTypeKind::Simple)))
        .collect()
});

/// Per-connection type table. Built-in entries live in the shared [`BUILTINS`] table; entries
/// discovered by introspection (C8) or installed by [`TypeRegistry::set_custom_codec`] are held
/// per-connection, since a composite's field layout or an enum's labels can differ across
/// databases (and, in principle, be redefined within one).
pub(crate) struct TypeRegistry {
    introspected: HashMap<Oid, PgTypeInfo>,
    custom: HashMap<Oid, CustomCodec>,
}

impl TypeRegistry {
    pub(crate) fn new() -> Self {
        Self {
            introspected: HashMap::new(),
            custom: HashMap::new(),
        }
    }

    pub(crate) fn set_custom_codec(&mut self, oid: Oid, codec: CustomCodec) {
        self.custom.insert(oid, codec);
    }

    pub(crate) fn info(&self, oid: Oid) -> Option<&PgTypeInfo> {
        self.introspected.get(&oid).or_else(|| BUILTINS.get(&oid))
    }

    /// Registers a type resolved by introspection (composite fields, enum labels, a range's
    /// subtype, or a domain's base type). Called by the introspection module (C8); idempotent.
    pub(crate) fn insert_introspected(&mut self, info: PgTypeInfo) {
        self.introspected.insert(info.oid(), info);
    }

    pub(crate) fn is_known(&self, oid: Oid) -> bool {
        self.custom.contains_key(&oid)
            || is_builtin_scalar(oid)
            || oid::array_element(oid).is_some()
            || oid::range_element(oid).is_some()
            || self.info(oid).is_some()
    }

    /// The format code to request for this OID in a `Bind`/`Describe` result-format list (§4.4):
    /// binary wherever we have a binary codec, text for enums (which we transcode as their label)
    /// and anything not yet known (so the raw bytes are at least legible before introspection
    /// fills in the real decoder).
    pub(crate) fn preferred_format(&self, oid: Oid) -> i16 {
        if let Some(custom) = self.custom.get(&oid) {
            return custom.format;
        }

        if is_builtin_scalar(oid) || oid::array_element(oid).is_some() || oid::range_element(oid).is_some() {
            return FORMAT_BINARY;
        }

        match self.info(oid).map(PgTypeInfo::kind) {
            Some(PgTypeKind::Enum(_)) => FORMAT_TEXT,
            Some(PgTypeKind::Pseudo) => FORMAT_TEXT,
            Some(PgTypeKind::Simple)
            | Some(PgTypeKind::Array(_))
            | Some(PgTypeKind::Range(_))
            | Some(PgTypeKind::Domain(_))
            | Some(PgTypeKind::Composite(_)) => FORMAT_BINARY,
            None => FORMAT_TEXT,
        }
    }

    /// Decodes one `DataRow` column. `None` bytes are a SQL `NULL`; `format` is the format code
    /// the column was actually sent in, which can differ from [`Self::preferred_format`] if the
    /// statement was issued over the simple query protocol (always text, §4.3).
    pub(crate) fn decode_column(
        &self,
        oid: Oid,
        format: i16,
        bytes: Option<&[u8]>,
    ) -> crate::Result<PgValue> {
        let bytes = match bytes {
            Some(b) => b,
            None => return Ok(PgValue::Null),
        };

        if let Some(custom) = self.custom.get(&oid) {
            return (custom.decode)(bytes);
        }

        if format == FORMAT_TEXT {
            return Ok(PgValue::Text(scalars::decode_text(bytes)?));
        }

        self.decode_binary(oid, bytes)
    }

    fn decode_binary(&self, oid: Oid, bytes: &[u8]) -> crate::Result<PgValue> {
        use oid::*;

        Ok(match oid {
            BOOL => PgValue::Bool(scalars::decode_bool(bytes)?),
            INT2 => PgValue::Int2(scalars::decode_int2(bytes)?),
            INT4 => PgValue::Int4(scalars::decode_int4(bytes)?),
            INT8 => PgValue::Int8(scalars::decode_int8(bytes)?),
            FLOAT4 => PgValue::Float4(scalars::decode_float4(bytes)?),
            FLOAT8 => PgValue::Float8(scalars::decode_float8(bytes)?),
            TEXT | VARCHAR | BPCHAR | NAME | XML | CHAR => PgValue::Text(scalars::decode_text(bytes)?),
            JSON => PgValue::Json(scalars::decode_text(bytes)?),
            // JSONB carries a one-byte format version (always `1`) ahead of the JSON text.
            JSONB => PgValue::Json(scalars::decode_text(
                bytes.get(1..).ok_or_else(|| err_protocol!("JSONB payload missing version byte"))?,
            )?),
            BYTEA => PgValue::Bytes(scalars::decode_bytea(bytes)?),
            OID | XID | CID => PgValue::Int4(scalars::decode_oid(bytes)? as i32),
            UUID => PgValue::Uuid(Uuid::from_slice(bytes).map_err(|e| err_protocol!("invalid UUID: {e}"))?),
            NUMERIC => PgValue::Numeric(PgNumeric::decode(bytes)?),
            DATE => PgValue::Date(datetime::decode_date(bytes)?),
            // TIMETZ appends a 4-byte zone offset after the 8-byte time-of-day; we only carry
            // the time-of-day forward, matching `PgValue`'s lack of a dedicated timetz variant.
            TIME => PgValue::Time(datetime::decode_time(bytes)?),
            TIMETZ => PgValue::Time(datetime::decode_time(
                bytes.get(..8).ok_or_else(|| err_protocol!("TIMETZ payload shorter than 8 bytes"))?,
            )?),
            TIMESTAMP => PgValue::Timestamp(datetime::decode_timestamp(bytes)?),
            TIMESTAMPTZ => PgValue::Timestamptz(datetime::decode_timestamptz(bytes)?),
            INTERVAL => PgValue::Interval(datetime::decode_interval(bytes)?),
            INET | CIDR => PgValue::Inet(network::decode_inet(bytes)?),
            MACADDR => PgValue::MacAddr(network::decode_macaddr(bytes)?),
            POINT => {
                let mut slice = bytes;
                PgValue::Point(geo::PgPoint::decode(&mut slice)?)
            }
            MONEY => PgValue::Money(money::decode(bytes)?),
            BIT | VARBIT => PgValue::Bit(bits::decode(bytes)?),
            VOID => PgValue::Null,
            _ => return self.decode_extended(oid, bytes),
        })
    }

    fn decode_extended(&self, oid: Oid, bytes: &[u8]) -> crate::Result<PgValue> {
        if let Some(elem) = oid::array_element(oid) {
            return self.decode_array(elem, bytes);
        }

        if let Some(subtype) = oid::range_element(oid) {
            return self.decode_range(subtype, bytes);
        }

        match self.info(oid).map(PgTypeInfo::kind) {
            Some(PgTypeKind::Array(elem)) => self.decode_array(*elem, bytes),
            Some(PgTypeKind::Range(subtype)) => self.decode_range(*subtype, bytes),
            Some(PgTypeKind::Domain(base)) => self.decode_binary(*base, bytes),
            Some(PgTypeKind::Enum(_)) => Ok(PgValue::Text(scalars::decode_text(bytes)?)),
            // A composite with no registered field layout is still decodable: the wire payload
            // is self-describing per field, so we keep it as raw `PgRecord` either way.
            Some(PgTypeKind::Composite(_)) | None => Ok(PgValue::Composite(PgRecord::decode(bytes)?)),
            Some(PgTypeKind::Simple) | Some(PgTypeKind::Pseudo) => {
                Err(err_protocol!("no binary decoder registered for type oid {}", oid.as_u32()))
            }
        }
    }

    fn decode_array(&self, fallback_elem_oid: Oid, bytes: &[u8]) -> crate::Result<PgValue> {
        let array = PgArray::decode(bytes)?;
        // An empty array's header still declares an element OID of 0; prefer our known element
        // OID in that case rather than failing to look up a decoder for OID 0.
        let elem_oid = if array.element_oid.as_u32() == 0 {
            fallback_elem_oid
        } else {
            array.element_oid
        };

        let values = array
            .elements
            .into_iter()
            .map(|element| match element {
                Some(bytes) => self.decode_binary(elem_oid, &bytes),
                None => Ok(PgValue::Null),
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(PgValue::Array(values))
    }

    fn decode_range(&self, subtype_oid: Oid, bytes: &[u8]) -> crate::Result<PgValue> {
        let range = PgRange::<Vec<u8>>::decode(bytes)?;
        let mapped = range.try_map(|bound| self.decode_binary(subtype_oid, &bound))?;
        Ok(PgValue::Range(Box::new(mapped)))
    }

    /// Encodes a bound parameter for `Bind` (§4.4). `None` means the parameter is sent as SQL
    /// `NULL` (a `-1` length, no payload); the caller writes that directly.
    pub(crate) fn encode_param(&self, value: &PgValue, oid: Oid) -> crate::Result<Option<Vec<u8>>> {
        if value.is_null() {
            return Ok(None);
        }

        if let Some(custom) = self.custom.get(&oid) {
            let mut buf = Vec::new();
            (custom.encode)(value, &mut buf)?;
            return Ok(Some(buf));
        }

        let mut buf = Vec::new();
        self.encode_binary(value, oid, &mut buf)?;
        Ok(Some(buf))
    }

    fn encode_binary(&self, value: &PgValue, oid: Oid, buf: &mut Vec<u8>) -> crate::Result<()> {
        use oid::*;

        match (value, oid) {
            (PgValue::Bool(v), BOOL) => scalars::encode_bool(*v, buf),
            (PgValue::Int2(v), INT2) => scalars::encode_int2(*v, buf),
            (PgValue::Int4(v), INT4) => scalars::encode_int4(*v, buf),
            (PgValue::Int8(v), INT8) => scalars::encode_int8(*v, buf),
            (PgValue::Float4(v), FLOAT4) => scalars::encode_float4(*v, buf),
            (PgValue::Float8(v), FLOAT8) => scalars::encode_float8(*v, buf),
            (PgValue::Text(v), TEXT | VARCHAR | BPCHAR | NAME | XML | CHAR) => scalars::encode_text(v, buf),
            (PgValue::Json(v), JSON) => scalars::encode_text(v, buf),
            (PgValue::Json(v), JSONB) => {
                buf.put_u8(1);
                scalars::encode_text(v, buf);
            }
            (PgValue::Bytes(v), BYTEA) => scalars::encode_bytea(v, buf),
            (PgValue::Int4(v), OID | XID | CID) => scalars::encode_oid(*v as u32, buf),
            (PgValue::Uuid(v), UUID) => buf.put_bytes(v.as_bytes()),
            (PgValue::Numeric(v), NUMERIC) => v.encode(buf),
            (PgValue::Date(v), DATE) => datetime::encode_date(v, buf),
            (PgValue::Time(v), TIME) => datetime::encode_time(v, buf),
            (PgValue::Time(v), TIMETZ) => {
                datetime::encode_time(v, buf);
                buf.put_i32(0); // UTC; we don't carry a separate zone offset.
            }
            (PgValue::Timestamp(v), TIMESTAMP) => datetime::encode_timestamp(v, buf),
            (PgValue::Timestamptz(v), TIMESTAMPTZ) => datetime::encode_timestamptz(v, buf),
            (PgValue::Interval(v), INTERVAL) => datetime::encode_interval(v, buf),
            (PgValue::Inet(v), INET | CIDR) => network::encode_inet(v, buf),
            (PgValue::MacAddr(v), MACADDR) => network::encode_macaddr(v, buf),
            (PgValue::Point(v), POINT) => v.encode(buf),
            (PgValue::Money(v), MONEY) => money::encode(*v, buf),
            (PgValue::Bit(v), BIT | VARBIT) => bits::encode(v, buf),
            (PgValue::Composite(record), _) => record.encode(buf),
            (PgValue::Array(items), _) => return self.encode_array(items, oid, buf),
            (PgValue::Range(range), _) => return self.encode_range(range, oid, buf),
            (PgValue::Text(label), _)
                if matches!(self.info(oid).map(PgTypeInfo::kind), Some(PgTypeKind::Enum(_))) =>
            {
                scalars::encode_text(label, buf)
            }
            _ => {
                return Err(Error::Data(format!(
                    "cannot encode {value:?} as type oid {}",
                    oid.as_u32()
                )))
            }
        }

        Ok(())
    }

    fn encode_array(&self, items: &[PgValue], array_oid: Oid, buf: &mut Vec<u8>) -> crate::Result<()> {
        let elem_oid = oid::array_element(array_oid)
            .or_else(|| match self.info(array_oid).map(PgTypeInfo::kind) {
                Some(PgTypeKind::Array(elem)) => Some(*elem),
                _ => None,
            })
            .ok_or_else(|| err_protocol!("oid {} is not a known array type", array_oid.as_u32()))?;

        let elements = items
            .iter()
            .map(|value| {
                if value.is_null() {
                    Ok(None)
                } else {
                    let mut bytes = Vec::new();
                    self.encode_binary(value, elem_oid, &mut bytes)?;
                    Ok(Some(bytes))
                }
            })
            .collect::<crate::Result<Vec<_>>>()?;

        PgArray::one_dimensional(elem_oid, elements).encode(buf);
        Ok(())
    }

    fn encode_range(&self, range: &PgRange<PgValue>, range_oid: Oid, buf: &mut Vec<u8>) -> crate::Result<()> {
        let subtype = oid::range_element(range_oid)
            .or_else(|| match self.info(range_oid).map(PgTypeInfo::kind) {
                Some(PgTypeKind::Range(subtype)) => Some(*subtype),
                _ => None,
            })
            .ok_or_else(|| err_protocol!("oid {} is not a known range type", range_oid.as_u32()))?;

        let encode_bound = |value: &PgValue| -> crate::Result<Vec<u8>> {
            let mut bytes = Vec::new();
            self.encode_binary(value, subtype, &mut bytes)?;
            Ok(bytes)
        };

        let wire_range = match range {
            PgRange::Empty => PgRange::Empty,
            PgRange::Bounds { lower, upper } => PgRange::Bounds {
                lower: encode_bound_side(lower, &encode_bound)?,
                upper: encode_bound_side(upper, &encode_bound)?,
            },
        };

        wire_range.encode(buf);
        Ok(())
    }
}

fn encode_bound_side(
    bound: &PgRangeBound<PgValue>,
    encode: &impl Fn(&PgValue) -> crate::Result<Vec<u8>>,
) -> crate::Result<PgRangeBound<Vec<u8>>> {
    Ok(match bound {
        PgRangeBound::Unbounded => PgRangeBound::Unbounded,
        PgRangeBound::Included(v) => PgRangeBound::Included(encode(v)?),
        PgRangeBound::Excluded(v) => PgRangeBound::Excluded(encode(v)?),
    })
}

fn is_builtin_scalar(oid: Oid) -> bool {
    BUILTINS.contains_key(&oid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_an_int4_through_the_registry() {
        let registry = TypeRegistry::new();

        let encoded = registry.encode_param(&PgValue::Int4(-7), oid::INT4).unwrap().unwrap();
        let decoded = registry.decode_column(oid::INT4, FORMAT_BINARY, Some(&encoded)).unwrap();

        assert_eq!(decoded, PgValue::Int4(-7));
    }

    #[test]
    fn it_round_trips_a_null_column() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.decode_column(oid::INT4, FORMAT_BINARY, None).unwrap(), PgValue::Null);
        assert_eq!(registry.encode_param(&PgValue::Null, oid::INT4).unwrap(), None);
    }

    #[test]
    fn it_round_trips_a_built_in_array() {
        let registry = TypeRegistry::new();
        let value = PgValue::Array(vec![PgValue::Int4(1), PgValue::Null, PgValue::Int4(3)]);

        let encoded = registry.encode_param(&value, oid::INT4_ARRAY).unwrap().unwrap();
        let decoded = registry.decode_column(oid::INT4_ARRAY, FORMAT_BINARY, Some(&encoded)).unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn it_round_trips_a_built_in_range() {
        let registry = TypeRegistry::new();
        let value = PgValue::Range(Box::new(PgRange::Bounds {
            lower: PgRangeBound::Included(PgValue::Int4(1)),
            upper: PgRangeBound::Excluded(PgValue::Int4(10)),
        }));

        let encoded = registry.encode_param(&value, oid::INT4RANGE).unwrap().unwrap();
        let decoded = registry.decode_column(oid::INT4RANGE, FORMAT_BINARY, Some(&encoded)).unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn it_decodes_an_unintrospected_composite_as_a_raw_record() {
        let registry = TypeRegistry::new();
        let record = PgRecord {
            fields: vec![(oid::INT4, Some(vec![0, 0, 0, 5]))],
        };

        let mut buf = Vec::new();
        record.encode(&mut buf);

        let decoded = registry.decode_column(Oid::new(500_000), FORMAT_BINARY, Some(&buf)).unwrap();
        assert_eq!(decoded, PgValue::Composite(record));
    }

    #[test]
    fn it_decodes_an_enum_introspected_type_from_its_text_label() {
        let mut registry = TypeRegistry::new();
        let enum_oid = Oid::new(500_001);
        registry.insert_introspected(PgTypeInfo::new(
            enum_oid,
            "mood",
            PgTypeKind::Enum(vec!["sad".to_owned(), "ok".to_owned(), "happy".to_owned()].into()),
        ));

        assert_eq!(registry.preferred_format(enum_oid), FORMAT_TEXT);

        let decoded = registry.decode_column(enum_oid, FORMAT_TEXT, Some(b"happy")).unwrap();
        assert_eq!(decoded, PgValue::Text("happy".to_owned()));
    }

    #[test]
    fn it_delegates_a_domain_to_its_base_type() {
        let mut registry = TypeRegistry::new();
        let domain_oid = Oid::new(500_002);
        registry.insert_introspected(PgTypeInfo::new(domain_oid, "positive_int", PgTypeKind::Domain(oid::INT4)));

        let mut buf = Vec::new();
        scalars::encode_int4(42, &mut buf);

        let decoded = registry.decode_column(domain_oid, FORMAT_BINARY, Some(&buf)).unwrap();
        assert_eq!(decoded, PgValue::Int4(42));
    }

    #[test]
    fn it_uses_a_custom_codec_when_one_is_registered() {
        let mut registry = TypeRegistry::new();
        registry.set_custom_codec(
            oid::TEXT,
            CustomCodec {
                decode: Box::new(|bytes| Ok(PgValue::Text(format!("custom:{}", scalars::decode_text(bytes)?)))),
                encode: Box::new(|value, buf| {
                    scalars::encode_text(value.as_str().unwrap_or_default(), buf);
                    Ok(())
                }),
                format: FORMAT_BINARY,
            },
        );

        let decoded = registry.decode_column(oid::TEXT, FORMAT_BINARY, Some(b"hi")).unwrap();
        assert_eq!(decoded, PgValue::Text("custom:hi".to_owned()));
    }
}
