use crate::io::{BufMut, Encode};

/// `SASLInitialResponse`: names the chosen mechanism and carries the client-first-message.
pub(crate) struct SaslInitialResponse<'a> {
    pub(crate) mechanism: &'a str,
    pub(crate) data: &'a str,
}

impl Encode for SaslInitialResponse<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'p')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_nul(self.mechanism);
        buf.put_i32(self.data.len() as i32);
        buf.put_bytes(self.data.as_bytes());
    }
}

/// `SASLResponse`: carries the client-final-message.
pub(crate) struct SaslResponse<'a>(pub(crate) &'a str);

impl Encode for SaslResponse<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'p')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_bytes(self.0.as_bytes());
    }
}
