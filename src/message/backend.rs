//! Backend message types and the tagged dispatcher that turns a `(tag, payload)` frame into a
//! [`Backend`] value (§4.3).

use bytes::Bytes;

use crate::error::{err_protocol, PgDatabaseError};
use crate::io::Buf;
use crate::message::response::decode_error_fields;
use crate::message::tag;

/// One fully-decoded backend message.
#[derive(Debug)]
pub(crate) enum Backend {
    Authentication(super::Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete,
    CloseComplete,
    CommandComplete(CommandComplete),
    CopyData(Bytes),
    CopyDone,
    CopyInResponse(CopyResponse),
    CopyOutResponse(CopyResponse),
    CopyBothResponse(CopyResponse),
    DataRow(DataRow),
    EmptyQueryResponse,
    ErrorResponse(Box<PgDatabaseError>),
    NoData,
    NoticeResponse(Box<PgDatabaseError>),
    NotificationResponse(NotificationResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete,
    PortalSuspended,
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

impl Backend {
    pub(crate) fn decode(wire_tag: u8, payload: Bytes) -> crate::Result<Self> {
        Ok(match wire_tag {
            tag::AUTHENTICATION => Backend::Authentication(super::Authentication::decode(&payload)?),
            tag::BACKEND_KEY_DATA => Backend::BackendKeyData(BackendKeyData::decode(&payload)?),
            tag::BIND_COMPLETE => Backend::BindComplete,
            tag::CLOSE_COMPLETE => Backend::CloseComplete,
            tag::COMMAND_COMPLETE => Backend::CommandComplete(CommandComplete::decode(&payload)?),
            tag::COPY_DATA => Backend::CopyData(payload),
            tag::COPY_DONE => Backend::CopyDone,
            tag::COPY_IN_RESPONSE => Backend::CopyInResponse(CopyResponse::decode(&payload)?),
            tag::COPY_OUT_RESPONSE => Backend::CopyOutResponse(CopyResponse::decode(&payload)?),
            tag::COPY_BOTH_RESPONSE => Backend::CopyBothResponse(CopyResponse::decode(&payload)?),
            tag::DATA_ROW => Backend::DataRow(DataRow::decode(payload)?),
            tag::EMPTY_QUERY_RESPONSE => Backend::EmptyQueryResponse,
            tag::ERROR_RESPONSE => Backend::ErrorResponse(Box::new(decode_error_fields(&payload)?)),
            tag::NO_DATA => Backend::NoData,
            tag::NOTICE_RESPONSE => Backend::NoticeResponse(Box::new(decode_error_fields(&payload)?)),
            tag::NOTIFICATION_RESPONSE => {
                Backend::NotificationResponse(NotificationResponse::decode(&payload)?)
            }
            tag::PARAMETER_DESCRIPTION => {
                Backend::ParameterDescription(ParameterDescription::decode(&payload)?)
            }
            tag::PARAMETER_STATUS => Backend::ParameterStatus(ParameterStatus::decode(&payload)?),
            tag::PARSE_COMPLETE => Backend::ParseComplete,
            tag::PORTAL_SUSPENDED => Backend::PortalSuspended,
            tag::READY_FOR_QUERY => Backend::ReadyForQuery(ReadyForQuery::decode(&payload)?),
            tag::ROW_DESCRIPTION => Backend::RowDescription(RowDescription::decode(&payload)?),

            other => {
                return Err(err_protocol!(
                    "unexpected backend message tag: {:?}",
                    other as char
                ));
            }
        })
    }
}

#[derive(Debug)]
pub(crate) struct BackendKeyData {
    pub(crate) process_id: u32,
    pub(crate) secret_key: u32,
}

impl BackendKeyData {
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        Ok(Self {
            process_id: buf.get_u32()?,
            secret_key: buf.get_u32()?,
        })
    }
}

#[derive(Debug)]
pub(crate) struct CommandComplete {
    pub(crate) affected_rows: u64,
}

impl CommandComplete {
    /// Parses the trailing integer off a command tag like `INSERT 0 1` or `UPDATE 512`.
    /// Tags with no count (`CREATE TABLE`, `BEGIN`, ...) report zero affected rows.
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let tag = buf.get_str_nul()?;

        let affected_rows = tag
            .rsplit(' ')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Ok(Self { affected_rows })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransactionStatus {
    Idle,
    InTransaction,
    Failed,
}

#[derive(Debug)]
pub(crate) struct ReadyForQuery {
    pub(crate) status: TransactionStatus,
}

impl ReadyForQuery {
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let status = match buf.get_u8()? {
            b'I' => TransactionStatus::Idle,
            b'T' => TransactionStatus::InTransaction,
            b'E' => TransactionStatus::Failed,
            other => {
                return Err(err_protocol!(
                    "unexpected transaction status in ReadyForQuery: {:?}",
                    other as char
                ));
            }
        };

        Ok(Self { status })
    }
}

#[derive(Debug)]
pub(crate) struct FieldDescription {
    pub(crate) name: String,
    pub(crate) table_id: Option<u32>,
    pub(crate) column_id: i16,
    pub(crate) type_id: u32,
    pub(crate) type_size: i16,
    pub(crate) type_mod: i32,
    pub(crate) format: i16,
}

#[derive(Debug)]
pub(crate) struct RowDescription {
    pub(crate) fields: Vec<FieldDescription>,
}

impl RowDescription {
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let cnt = buf.get_u16()? as usize;
        let mut fields = Vec::with_capacity(cnt);

        for _ in 0..cnt {
            let table_id_raw;

            fields.push(FieldDescription {
                name: buf.get_str_nul()?.to_owned(),
                table_id: {
                    table_id_raw = buf.get_u32()?;
                    if table_id_raw > 0 {
                        Some(table_id_raw)
                    } else {
                        None
                    }
                },
                column_id: buf.get_i16()?,
                type_id: buf.get_u32()?,
                type_size: buf.get_i16()?,
                type_mod: buf.get_i32()?,
                format: buf.get_i16()?,
            });
        }

        Ok(Self { fields })
    }
}

/// A `DataRow`'s values, as byte ranges into the owned frame payload. `None` is SQL `NULL`.
#[derive(Debug)]
pub(crate) struct DataRow {
    payload: Bytes,
    values: Vec<Option<(u32, u32)>>,
}

impl DataRow {
    fn decode(payload: Bytes) -> crate::Result<Self> {
        let mut buf: &[u8] = &payload;
        let cnt = buf.get_u16()? as usize;
        let mut values = Vec::with_capacity(cnt);

        let mut offset = (payload.len() - buf.len()) as u32;

        for _ in 0..cnt {
            let len = buf.get_i32()?;
            offset += 4;

            if len == -1 {
                values.push(None);
            } else {
                let len = len as u32;
                values.push(Some((offset, offset + len)));
                buf.advance(len as usize);
                offset += len;
            }
        }

        Ok(Self { payload, values })
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&[u8]> {
        let (start, end) = self.values[index]?;
        Some(&self.payload[start as usize..end as usize])
    }
}

#[derive(Debug)]
pub(crate) struct ParameterDescription {
    pub(crate) types: Vec<u32>,
}

impl ParameterDescription {
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let cnt = buf.get_u16()? as usize;
        let mut types = Vec::with_capacity(cnt);

        for _ in 0..cnt {
            types.push(buf.get_u32()?);
        }

        Ok(Self { types })
    }
}

/// `ParameterStatus`: the server's report of a `GUC` value, sent on connect and on every change
/// (`server_version`, `TimeZone`, `client_encoding`, `standard_conforming_strings`, ...).
#[derive(Debug)]
pub(crate) struct ParameterStatus {
    pub(crate) name: String,
    pub(crate) value: String,
}

impl ParameterStatus {
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        Ok(Self {
            name: buf.get_str_nul()?.to_owned(),
            value: buf.get_str_nul()?.to_owned(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct NotificationResponse {
    pub(crate) process_id: u32,
    pub(crate) channel: String,
    pub(crate) payload: String,
}

impl NotificationResponse {
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        Ok(Self {
            process_id: buf.get_u32()?,
            channel: buf.get_str_nul()?.to_owned(),
            payload: buf.get_str_nul()?.to_owned(),
        })
    }
}

/// `CopyInResponse`/`CopyOutResponse`/`CopyBothResponse` share one payload shape.
#[derive(Debug)]
pub(crate) struct CopyResponse {
    pub(crate) format: i8,
    pub(crate) column_formats: Vec<i16>,
}

impl CopyResponse {
    fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let format = buf.get_i8()?;
        let cnt = buf.get_u16()? as usize;
        let mut column_formats = Vec::with_capacity(cnt);

        for _ in 0..cnt {
            column_formats.push(buf.get_i16()?);
        }

        Ok(Self {
            format,
            column_formats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_decodes_command_complete() {
        let msg = CommandComplete::decode(b"INSERT 0 1\0").unwrap();
        assert_eq!(msg.affected_rows, 1);

        let msg = CommandComplete::decode(b"CREATE TABLE\0").unwrap();
        assert_eq!(msg.affected_rows, 0);
    }

    #[test]
    fn it_decodes_ready_for_query() {
        let msg = ReadyForQuery::decode(b"T").unwrap();
        assert_eq!(msg.status, TransactionStatus::InTransaction);
    }

    #[test]
    fn it_decodes_an_empty_row_description() {
        let msg = RowDescription::decode(b"\x00\x00").unwrap();
        assert_eq!(msg.fields.len(), 0);
    }

    #[test]
    fn it_decodes_backend_key_data() {
        let msg = BackendKeyData::decode(b"\0\0'\xc6\x89R\xc5+").unwrap();
        assert_eq!(msg.process_id, 10182);
        assert_eq!(msg.secret_key, 2303903019);
    }

    #[test]
    fn it_decodes_a_data_row_with_a_null() {
        #[rustfmt::skip]
        let payload = Bytes::from_static(&[
            0, 2, // 2 columns
            0, 0, 0, 1, b'1', // "1"
            255, 255, 255, 255, // NULL
        ]);

        let row = DataRow::decode(payload).unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&b"1"[..]));
        assert_eq!(row.get(1), None);
    }

    #[test]
    fn it_decodes_notification_response() {
        let msg = NotificationResponse::decode(b"\x34\x20\x10\x02TEST-CHANNEL\0THIS IS A TEST\0")
            .unwrap();
        assert_eq!(msg.process_id, 0x3420_1002);
        assert_eq!(msg.channel, "TEST-CHANNEL");
        assert_eq!(msg.payload, "THIS IS A TEST");
    }
}
