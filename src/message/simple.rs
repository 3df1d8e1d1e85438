use crate::io::{BufMut, Encode};

/// `Query`: the simple-query sub-protocol's sole frontend message. Self-barriered — the server
/// always answers with a `ReadyForQuery` once processing completes, with or without errors
/// (§4.4).
pub(crate) struct Query<'a>(pub(crate) &'a str);

impl Encode for Query<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'Q')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_nul(self.0);
    }
}
