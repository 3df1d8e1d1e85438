//! Well-known built-in type OIDs, per `src/include/catalog/pg_type.dat` in the Postgres source.

#![allow(dead_code)]

use super::Oid;

pub(crate) const BOOL: Oid = Oid(16);
pub(crate) const BYTEA: Oid = Oid(17);
pub(crate) const CHAR: Oid = Oid(18);
pub(crate) const NAME: Oid = Oid(19);
pub(crate) const INT8: Oid = Oid(20);
pub(crate) const INT2: Oid = Oid(21);
pub(crate) const INT4: Oid = Oid(23);
pub(crate) const TEXT: Oid = Oid(25);
pub(crate) const OID: Oid = Oid(26);
pub(crate) const TID: Oid = Oid(27);
pub(crate) const XID: Oid = Oid(28);
pub(crate) const CID: Oid = Oid(29);
pub(crate) const JSON: Oid = Oid(114);
pub(crate) const XML: Oid = Oid(142);
pub(crate) const POINT: Oid = Oid(600);
pub(crate) const LSEG: Oid = Oid(601);
pub(crate) const PATH: Oid = Oid(602);
pub(crate) const BOX: Oid = Oid(603);
pub(crate) const POLYGON: Oid = Oid(604);
pub(crate) const LINE: Oid = Oid(628);
pub(crate) const CIDR: Oid = Oid(650);
pub(crate) const FLOAT4: Oid = Oid(700);
pub(crate) const FLOAT8: Oid = Oid(701);
pub(crate) const CIRCLE: Oid = Oid(718);
pub(crate) const MACADDR8: Oid = Oid(774);
pub(crate) const MONEY: Oid = Oid(790);
pub(crate) const MACADDR: Oid = Oid(829);
pub(crate) const INET: Oid = Oid(869);
pub(crate) const BPCHAR: Oid = Oid(1042);
pub(crate) const VARCHAR: Oid = Oid(1043);
pub(crate) const DATE: Oid = Oid(1082);
pub(crate) const TIME: Oid = Oid(1083);
pub(crate) const TIMESTAMP: Oid = Oid(1114);
pub(crate) const TIMESTAMPTZ: Oid = Oid(1184);
pub(crate) const INTERVAL: Oid = Oid(1186);
pub(crate) const TIMETZ: Oid = Oid(1266);
pub(crate) const BIT: Oid = Oid(1560);
pub(crate) const VARBIT: Oid = Oid(1562);
pub(crate) const NUMERIC: Oid = Oid(1700);
pub(crate) const VOID: Oid = Oid(2278);
pub(crate) const RECORD: Oid = Oid(2249);
pub(crate) const UUID: Oid = Oid(2950);
pub(crate) const JSONB: Oid = Oid(3802);
pub(crate) const INT4RANGE: Oid = Oid(3904);
pub(crate) const NUMRANGE: Oid = Oid(3906);
pub(crate) const TSRANGE: Oid = Oid(3908);
pub(crate) const TSTZRANGE: Oid = Oid(3910);
pub(crate) const DATERANGE: Oid = Oid(3912);
pub(crate) const INT8RANGE: Oid = Oid(3926);

pub(crate) const BOOL_ARRAY: Oid = Oid(1000);
pub(crate) const BYTEA_ARRAY: Oid = Oid(1001);
pub(crate) const CHAR_ARRAY: Oid = Oid(1002);
pub(crate) const NAME_ARRAY: Oid = Oid(1003);
pub(crate) const INT2_ARRAY: Oid = Oid(1005);
pub(crate) const INT4_ARRAY: Oid = Oid(1007);
pub(crate) const TEXT_ARRAY: Oid = Oid(1009);
pub(crate) const BPCHAR_ARRAY: Oid = Oid(1014);
pub(crate) const VARCHAR_ARRAY: Oid = Oid(1015);
pub(crate) const INT8_ARRAY: Oid = Oid(1016);
pub(crate) const POINT_ARRAY: Oid = Oid(1017);
pub(crate) const FLOAT4_ARRAY: Oid = Oid(1021);
pub(crate) const FLOAT8_ARRAY: Oid = Oid(1022);
pub(crate) const MACADDR_ARRAY: Oid = Oid(1040);
pub(crate) const INET_ARRAY: Oid = Oid(1041);
pub(crate) const CIDR_ARRAY: Oid = Oid(651);
pub(crate) const OID_ARRAY: Oid = Oid(1028);
pub(crate) const DATE_ARRAY: Oid = Oid(1182);
pub(crate) const TIME_ARRAY: Oid = Oid(1183);
pub(crate) const TIMESTAMP_ARRAY: Oid = Oid(1115);
pub(crate) const TIMESTAMPTZ_ARRAY: Oid = Oid(1185);
pub(crate) const INTERVAL_ARRAY: Oid = Oid(1187);
pub(crate) const NUMERIC_ARRAY: Oid = Oid(1231);
pub(crate) const UUID_ARRAY: Oid = Oid(2951);
pub(crate) const JSON_ARRAY: Oid = Oid(199);
pub(crate) const JSONB_ARRAY: Oid = Oid(3807);
pub(crate) const MONEY_ARRAY: Oid = Oid(791);
pub(crate) const BIT_ARRAY: Oid = Oid(1561);
pub(crate) const VARBIT_ARRAY: Oid = Oid(1563);

/// Maps an array OID to its element OID, for the built-in types above. Returns `None` for
/// anything not in this table; the introspection path (C8) handles the rest via `pg_type`.
pub(crate) fn array_element(array_oid: Oid) -> Option<Oid> {
    Some(match array_oid {
        BOOL_ARRAY => BOOL,
        BYTEA_ARRAY => BYTEA,
        CHAR_ARRAY => CHAR,
        NAME_ARRAY => NAME,
        INT2_ARRAY => INT2,
        INT4_ARRAY => INT4,
        INT8_ARRAY => INT8,
        TEXT_ARRAY => TEXT,
        BPCHAR_ARRAY => BPCHAR,
        VARCHAR_ARRAY => VARCHAR,
        POINT_ARRAY => POINT,
        FLOAT4_ARRAY => FLOAT4,
        FLOAT8_ARRAY => FLOAT8,
        MACADDR_ARRAY => MACADDR,
        INET_ARRAY => INET,
        CIDR_ARRAY => CIDR,
        OID_ARRAY => OID,
        DATE_ARRAY => DATE,
        TIME_ARRAY => TIME,
        TIMESTAMP_ARRAY => TIMESTAMP,
        TIMESTAMPTZ_ARRAY => TIMESTAMPTZ,
        INTERVAL_ARRAY => INTERVAL,
        NUMERIC_ARRAY => NUMERIC,
        UUID_ARRAY => UUID,
        JSON_ARRAY => JSON,
        JSONB_ARRAY => JSONB,
        MONEY_ARRAY => MONEY,
        BIT_ARRAY => BIT,
        VARBIT_ARRAY => VARBIT,
        _ => return None,
    })
}

/// The inverse of [`array_element`]: maps a built-in element OID to its array OID, used when
/// binding a `PgValue::Array` parameter that carries no explicit type OID of its own.
pub(crate) fn array_oid(element_oid: Oid) -> Option<Oid> {
    Some(match element_oid {
        BOOL => BOOL_ARRAY,
        BYTEA => BYTEA_ARRAY,
        CHAR => CHAR_ARRAY,
        NAME => NAME_ARRAY,
        INT2 => INT2_ARRAY,
        INT4 => INT4_ARRAY,
        INT8 => INT8_ARRAY,
        TEXT => TEXT_ARRAY,
        BPCHAR => BPCHAR_ARRAY,
        VARCHAR => VARCHAR_ARRAY,
        POINT => POINT_ARRAY,
        FLOAT4 => FLOAT4_ARRAY,
        FLOAT8 => FLOAT8_ARRAY,
        MACADDR => MACADDR_ARRAY,
        INET => INET_ARRAY,
        CIDR => CIDR_ARRAY,
        OID => OID_ARRAY,
        DATE => DATE_ARRAY,
        TIME => TIME_ARRAY,
        TIMESTAMP => TIMESTAMP_ARRAY,
        TIMESTAMPTZ => TIMESTAMPTZ_ARRAY,
        INTERVAL => INTERVAL_ARRAY,
        NUMERIC => NUMERIC_ARRAY,
        UUID => UUID_ARRAY,
        JSON => JSON_ARRAY,
        JSONB => JSONB_ARRAY,
        MONEY => MONEY_ARRAY,
        BIT => BIT_ARRAY,
        VARBIT => VARBIT_ARRAY,
        _ => return None,
    })
}

/// Maps a built-in range OID to its subtype OID. Returns `None` for anything not in this table,
/// including user-defined ranges, which the introspection path (C8) resolves via `pg_range`.
pub(crate) fn range_element(range_oid: Oid) -> Option<Oid> {
    Some(match range_oid {
        INT4RANGE => INT4,
        NUMRANGE => NUMERIC,
        TSRANGE => TIMESTAMP,
        TSTZRANGE => TIMESTAMPTZ,
        DATERANGE => DATE,
        INT8RANGE => INT8,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_oid_and_array_element_are_inverses_for_every_mapped_type() {
        for (element, array) in [
            (BOOL, BOOL_ARRAY),
            (INT4, INT4_ARRAY),
            (INT8, INT8_ARRAY),
            (TEXT, TEXT_ARRAY),
            (UUID, UUID_ARRAY),
            (NUMERIC, NUMERIC_ARRAY),
            (TIMESTAMPTZ, TIMESTAMPTZ_ARRAY),
        ] {
            assert_eq!(array_oid(element), Some(array));
            assert_eq!(array_element(array), Some(element));
        }
    }

    #[test]
    fn unmapped_oid_has_no_array_or_range_mapping() {
        let unknown = Oid::new(999_999);
        assert_eq!(array_oid(unknown), None);
        assert_eq!(array_element(unknown), None);
        assert_eq!(range_element(unknown), None);
    }

    #[test]
    fn range_element_maps_every_built_in_range_to_its_subtype() {
        assert_eq!(range_element(INT4RANGE), Some(INT4));
        assert_eq!(range_element(NUMRANGE), Some(NUMERIC));
        assert_eq!(range_element(TSRANGE), Some(TIMESTAMP));
        assert_eq!(range_element(TSTZRANGE), Some(TIMESTAMPTZ));
        assert_eq!(range_element(DATERANGE), Some(DATE));
        assert_eq!(range_element(INT8RANGE), Some(INT8));
    }
}
