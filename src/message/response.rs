//! Parses the field table shared by `ErrorResponse` and `NoticeResponse` (§4.3) into a
//! [`PgDatabaseError`](crate::error::PgDatabaseError).

use crate::error::{err_protocol, PgDatabaseError};
use crate::io::Buf;

pub(crate) fn decode_error_fields(mut buf: &[u8]) -> crate::Result<PgDatabaseError> {
    let mut error = PgDatabaseError::default();

    loop {
        let field_type = buf.get_u8()?;

        if field_type == 0 {
            break;
        }

        let value = buf.get_str_nul()?;

        match field_type {
            b'S' | b'V' => error.severity = value.to_owned(),
            b'C' => error.code = value.to_owned(),
            b'M' => error.message = value.to_owned(),
            b'D' => error.detail = Some(value.to_owned()),
            b'H' => error.hint = Some(value.to_owned()),
            b'P' => error.position = Some(parse_field(value)?),
            b'p' => error.internal_position = Some(parse_field(value)?),
            b'q' => error.internal_query = Some(value.to_owned()),
            b'W' => error.where_ = Some(value.to_owned()),
            b's' => error.schema = Some(value.to_owned()),
            b't' => error.table = Some(value.to_owned()),
            b'c' => error.column = Some(value.to_owned()),
            b'd' => error.data_type = Some(value.to_owned()),
            b'n' => error.constraint = Some(value.to_owned()),
            b'F' => error.file = Some(value.to_owned()),
            b'L' => error.line = Some(parse_field(value)?),
            b'R' => error.routine = Some(value.to_owned()),

            // Unrecognized field codes are reserved for future protocol versions; ignore them.
            _ => {}
        }
    }

    if error.code.is_empty() {
        return Err(err_protocol!("ErrorResponse/NoticeResponse missing field `C` (code)"));
    }

    Ok(error)
}

fn parse_field(value: &str) -> crate::Result<u32> {
    value
        .parse()
        .map_err(|_| err_protocol!("expected integer field, got: {value}"))
}

#[cfg(test)]
mod tests {
    use super::decode_error_fields;

    const FIELDS: &[u8] =
        b"SNOTICE\0VNOTICE\0C42710\0Mextension \"uuid-ossp\" already exists, skipping\0Fextension.c\0L1656\0RCreateExtension\0\0";

    #[test]
    fn it_decodes_notice_fields() {
        let error = decode_error_fields(FIELDS).unwrap();

        assert_eq!(error.severity(), "NOTICE");
        assert_eq!(error.code(), "42710");
        assert_eq!(error.file.as_deref(), Some("extension.c"));
        assert_eq!(error.line, Some(1656));
        assert_eq!(error.routine.as_deref(), Some("CreateExtension"));
        assert_eq!(
            error.message(),
            "extension \"uuid-ossp\" already exists, skipping"
        );
    }

    #[test]
    fn it_rejects_a_field_table_with_no_code() {
        let fields = b"SNOTICE\0Mhello\0\0";

        assert!(decode_error_fields(fields).is_err());
    }
}
