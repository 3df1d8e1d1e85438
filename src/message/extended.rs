use crate::io::{BufMut, Encode};

/// `Parse`: names and parses a statement, `statement` is `""` for the unnamed statement.
pub(crate) struct Parse<'a> {
    pub(crate) statement: &'a str,
    pub(crate) query: &'a str,
    pub(crate) param_types: &'a [u32],
}

impl Encode for Parse<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'P')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_nul(self.statement);
        buf.put_str_nul(self.query);
        buf.put_i16(self.param_types.len() as i16);
        for oid in self.param_types {
            buf.put_u32(*oid);
        }
    }
}

/// `Bind`: attaches argument values to a named statement, creating a portal.
pub(crate) struct Bind<'a> {
    pub(crate) portal: &'a str,
    pub(crate) statement: &'a str,
    pub(crate) param_formats: &'a [i16],
    /// `None` encodes SQL `NULL` (length `-1`); `Some(bytes)` is the binary-format value.
    pub(crate) params: &'a [Option<Vec<u8>>],
    pub(crate) result_formats: &'a [i16],
}

impl Encode for Bind<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'B')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_nul(self.portal);
        buf.put_str_nul(self.statement);

        buf.put_i16(self.param_formats.len() as i16);
        for fmt in self.param_formats {
            buf.put_i16(*fmt);
        }

        buf.put_i16(self.params.len() as i16);
        for param in self.params {
            match param {
                Some(bytes) => {
                    buf.put_i32(bytes.len() as i32);
                    buf.put_bytes(bytes);
                }
                None => buf.put_i32(-1),
            }
        }

        buf.put_i16(self.result_formats.len() as i16);
        for fmt in self.result_formats {
            buf.put_i16(*fmt);
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum DescribeTarget<'a> {
    Statement(&'a str),
    Portal(&'a str),
}

/// `Describe`: requests a `ParameterDescription`/`RowDescription` (or `NoData`) for a statement
/// or portal.
pub(crate) struct Describe<'a>(pub(crate) DescribeTarget<'a>);

impl Encode for Describe<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'D')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        match self.0 {
            DescribeTarget::Statement(name) => {
                buf.put_u8(b'S');
                buf.put_str_nul(name);
            }
            DescribeTarget::Portal(name) => {
                buf.put_u8(b'P');
                buf.put_str_nul(name);
            }
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum CloseTarget<'a> {
    Statement(&'a str),
    Portal(&'a str),
}

/// `Close`: closes a named statement or portal, freeing server-side resources.
pub(crate) struct Close<'a>(pub(crate) CloseTarget<'a>);

impl Encode for Close<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'C')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        match self.0 {
            CloseTarget::Statement(name) => {
                buf.put_u8(b'S');
                buf.put_str_nul(name);
            }
            CloseTarget::Portal(name) => {
                buf.put_u8(b'P');
                buf.put_str_nul(name);
            }
        }
    }
}

/// `Execute`: runs a bound portal. `max_rows` of `0` means "no limit"; a positive row limit
/// enables cursor-style `PortalSuspended` chunking (§4.4).
pub(crate) struct Execute<'a> {
    pub(crate) portal: &'a str,
    pub(crate) max_rows: i32,
}

impl Encode for Execute<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'E')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_nul(self.portal);
        buf.put_i32(self.max_rows);
    }
}

/// `Sync`: the extended-query barrier. Always paired 1:1 with a `ReadyForQuery` (§5 invariant 1).
pub(crate) struct Sync;

impl Encode for Sync {
    fn tag(&self) -> Option<u8> {
        Some(b'S')
    }

    fn encode(&self, _buf: &mut Vec<u8>) {}
}

/// `Flush`: asks the backend to deliver any pending response data without a `Sync` barrier.
/// Used after `Parse`+`Describe` during statement preparation so `ParseComplete` and
/// `ParameterDescription` arrive without ending the extended-query unit.
pub(crate) struct Flush;

impl Encode for Flush {
    fn tag(&self) -> Option<u8> {
        Some(b'H')
    }

    fn encode(&self, _buf: &mut Vec<u8>) {}
}
