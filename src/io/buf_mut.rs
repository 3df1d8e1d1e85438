use byteorder::{BigEndian, ByteOrder};

/// Typed big-endian writes plus a length-patched frame builder.
///
/// A free extension trait over `Vec<u8>`, rather than a bespoke cursor type.
pub(crate) trait BufMut {
    fn put_u8(&mut self, val: u8);
    fn put_i16(&mut self, val: i16);
    fn put_u16(&mut self, val: u16);
    fn put_i32(&mut self, val: i32);
    fn put_u32(&mut self, val: u32);
    fn put_i64(&mut self, val: i64);
    fn put_u64(&mut self, val: u64);
    fn put_f32(&mut self, val: f32);
    fn put_f64(&mut self, val: f64);

    fn put_bytes(&mut self, val: &[u8]);
    fn put_str_nul(&mut self, val: &str);

    /// Begin a frame: writes `tag` (if present) then reserves 4 bytes for the length, returning
    /// the offset of the reserved length field so [`BufMut::patch_frame_len`] can back-fill it.
    fn begin_frame(&mut self, tag: Option<u8>) -> usize;

    /// Back-patch the 4-byte length field at `len_offset` with `self.len() - len_offset`
    /// (the length field counts itself but not the tag byte).
    fn patch_frame_len(&mut self, len_offset: usize);
}

impl BufMut for Vec<u8> {
    fn put_u8(&mut self, val: u8) {
        self.push(val);
    }

    fn put_i16(&mut self, val: i16) {
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_u16(&mut self, val: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_i32(&mut self, val: i32) {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_u32(&mut self, val: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_i64(&mut self, val: i64) {
        let mut buf = [0u8; 8];
        BigEndian::write_i64(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_u64(&mut self, val: u64) {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_f32(&mut self, val: f32) {
        let mut buf = [0u8; 4];
        BigEndian::write_f32(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_f64(&mut self, val: f64) {
        let mut buf = [0u8; 8];
        BigEndian::write_f64(&mut buf, val);
        self.extend_from_slice(&buf);
    }

    fn put_bytes(&mut self, val: &[u8]) {
        self.extend_from_slice(val);
    }

    fn put_str_nul(&mut self, val: &str) {
        self.extend_from_slice(val.as_bytes());
        self.push(0);
    }

    fn begin_frame(&mut self, tag: Option<u8>) -> usize {
        if let Some(tag) = tag {
            self.push(tag);
        }
        let len_offset = self.len();
        self.extend_from_slice(&[0; 4]);
        len_offset
    }

    fn patch_frame_len(&mut self, len_offset: usize) {
        let len = (self.len() - len_offset) as u32;
        BigEndian::write_u32(&mut self[len_offset..len_offset + 4], len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length_includes_itself_but_not_the_tag() {
        let mut buf = Vec::new();
        let len_offset = buf.begin_frame(Some(b'Q'));
        buf.put_str_nul("SELECT 1");
        buf.patch_frame_len(len_offset);

        assert_eq!(buf[0], b'Q');
        let declared_len = BigEndian::read_u32(&buf[1..5]);
        assert_eq!(declared_len as usize, buf.len() - 1);
    }

    #[test]
    fn untagged_frame_has_no_leading_tag_byte() {
        let mut buf = Vec::new();
        let len_offset = buf.begin_frame(None);
        buf.put_i32(42);
        buf.patch_frame_len(len_offset);

        assert_eq!(buf.len(), 8);
        assert_eq!(BigEndian::read_u32(&buf[0..4]) as usize, 8);
    }

    #[test]
    fn put_bytes_round_trips_through_get_bytes() {
        use crate::io::Buf;

        let mut buf = Vec::new();
        buf.put_bytes(&[1, 2, 3, 4]);

        let mut view: &[u8] = &buf;
        assert_eq!(view.get_bytes(4).unwrap(), &[1, 2, 3, 4]);
    }
}
