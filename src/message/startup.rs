use crate::io::{BufMut, Encode};

/// `StartupMessage`: has no tag byte and no frame header produced via the common
/// [`BufStream::write`] path — it supplies its own protocol-version prefix. Encoded via
/// [`Startup::to_frame`] rather than the [`Encode`] trait so the caller controls exactly
/// when it is written (before any TLS upgrade decision has even been made in the SSL case).
pub(crate) struct Startup<'a> {
    pub(crate) username: Option<&'a str>,
    pub(crate) database: Option<&'a str>,
    /// Additional `key=value` parameters (`application_name`, `client_encoding`, `options`, …).
    pub(crate) params: &'a [(&'a str, &'a str)],
}

impl<'a> Startup<'a> {
    /// Protocol version 3, revision 0.
    const PROTOCOL_VERSION: i32 = 0x0003_0000;

    pub(crate) fn to_frame(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        let len_offset = buf.begin_frame(None);

        buf.put_i32(Self::PROTOCOL_VERSION);

        if let Some(username) = self.username {
            buf.put_str_nul("user");
            buf.put_str_nul(username);
        }

        if let Some(database) = self.database {
            buf.put_str_nul("database");
            buf.put_str_nul(database);
        }

        for (k, v) in self.params {
            buf.put_str_nul(k);
            buf.put_str_nul(v);
        }

        buf.put_u8(0);
        buf.patch_frame_len(len_offset);

        buf
    }
}

/// `CancelRequest`: sent on a fresh, un-authenticated connection. Per §4.3/§6, this is a fixed
/// 16-byte packet with no tag byte and no relation to the normal frame header convention.
pub(crate) struct CancelRequest {
    pub(crate) process_id: u32,
    pub(crate) secret_key: u32,
}

impl CancelRequest {
    /// The cancel request "protocol version" magic code (1234 in the high 16 bits, 5678 in the
    /// low 16 bits), distinguishing this packet from a `StartupMessage`.
    const CANCEL_REQUEST_CODE: i32 = (1234 << 16) | 5678;

    pub(crate) fn to_frame(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&16i32.to_be_bytes());
        buf[4..8].copy_from_slice(&Self::CANCEL_REQUEST_CODE.to_be_bytes());
        buf[8..12].copy_from_slice(&self.process_id.to_be_bytes());
        buf[12..16].copy_from_slice(&self.secret_key.to_be_bytes());
        buf
    }
}

/// `Terminate`: graceful shutdown, immediately followed by closing the socket (§4.4).
pub(crate) struct Terminate;

impl Encode for Terminate {
    fn tag(&self) -> Option<u8> {
        Some(b'X')
    }

    fn encode(&self, _buf: &mut Vec<u8>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    #[test]
    fn startup_frame_has_no_tag_and_is_length_prefixed() {
        let frame = Startup { username: Some("alice"), database: Some("postgres"), params: &[("application_name", "test")] }
            .to_frame();

        let declared_len = BigEndian::read_u32(&frame[0..4]) as usize;
        assert_eq!(declared_len, frame.len());

        let version = BigEndian::read_i32(&frame[4..8]);
        assert_eq!(version, Startup::PROTOCOL_VERSION);

        assert!(frame.ends_with(&[0]));
        let body = &frame[8..frame.len() - 1];
        assert!(body.windows(5).any(|w| w == b"alice"));
        assert!(body.windows(8).any(|w| w == b"postgres"));
        assert!(body.windows(16).any(|w| w == b"application_name"));
    }

    #[test]
    fn cancel_request_is_a_fixed_16_byte_packet() {
        let frame = CancelRequest { process_id: 42, secret_key: 0xdead_beef }.to_frame();

        assert_eq!(frame.len(), 16);
        assert_eq!(BigEndian::read_u32(&frame[0..4]), 16);
        assert_eq!(BigEndian::read_i32(&frame[4..8]), CancelRequest::CANCEL_REQUEST_CODE);
        assert_eq!(BigEndian::read_u32(&frame[8..12]), 42);
        assert_eq!(BigEndian::read_u32(&frame[12..16]), 0xdead_beef);
    }
}
