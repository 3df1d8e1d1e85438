use crate::io::{BufMut, Encode};

/// `CopyData`: one chunk of COPY payload, in either direction.
pub(crate) struct CopyData<'a>(pub(crate) &'a [u8]);

impl Encode for CopyData<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'd')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_bytes(self.0);
    }
}

/// `CopyDone`: signals the end of a successful `COPY` stream.
pub(crate) struct CopyDone;

impl Encode for CopyDone {
    fn tag(&self) -> Option<u8> {
        Some(b'c')
    }

    fn encode(&self, _buf: &mut Vec<u8>) {}
}

/// `CopyFail`: aborts a `COPY FROM STDIN` with an error message the server will report back.
pub(crate) struct CopyFail<'a>(pub(crate) &'a str);

impl Encode for CopyFail<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'f')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_nul(self.0);
    }
}
