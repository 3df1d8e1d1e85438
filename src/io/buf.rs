use byteorder::{BigEndian, ByteOrder};
use memchr::memchr;

use crate::error::{err_protocol, Error};

/// Typed big-endian reads over a byte slice, advancing the slice as it goes.
///
/// Specialized to always read big-endian since every integer on the Postgres wire is
/// big-endian (§6).
pub(crate) trait Buf<'a> {
    fn advance(&mut self, cnt: usize);

    fn get_u8(&mut self) -> crate::Result<u8>;
    fn get_i8(&mut self) -> crate::Result<i8>;
    fn get_u16(&mut self) -> crate::Result<u16>;
    fn get_i16(&mut self) -> crate::Result<i16>;
    fn get_u32(&mut self) -> crate::Result<u32>;
    fn get_i32(&mut self) -> crate::Result<i32>;
    fn get_u64(&mut self) -> crate::Result<u64>;
    fn get_i64(&mut self) -> crate::Result<i64>;
    fn get_f32(&mut self) -> crate::Result<f32>;
    fn get_f64(&mut self) -> crate::Result<f64>;

    fn get_str_nul(&mut self) -> crate::Result<&'a str>;
    fn get_bytes(&mut self, len: usize) -> crate::Result<&'a [u8]>;

    fn is_empty(&self) -> bool;
}

impl<'a> Buf<'a> for &'a [u8] {
    fn advance(&mut self, cnt: usize) {
        *self = &self[cnt..];
    }

    fn get_u8(&mut self) -> crate::Result<u8> {
        let val = *self.first().ok_or_else(|| eof())?;
        self.advance(1);
        Ok(val)
    }

    fn get_i8(&mut self) -> crate::Result<i8> {
        Ok(self.get_u8()? as i8)
    }

    fn get_u16(&mut self) -> crate::Result<u16> {
        let bytes = self.get_bytes(2)?;
        Ok(BigEndian::read_u16(bytes))
    }

    fn get_i16(&mut self) -> crate::Result<i16> {
        let bytes = self.get_bytes(2)?;
        Ok(BigEndian::read_i16(bytes))
    }

    fn get_u32(&mut self) -> crate::Result<u32> {
        let bytes = self.get_bytes(4)?;
        Ok(BigEndian::read_u32(bytes))
    }

    fn get_i32(&mut self) -> crate::Result<i32> {
        let bytes = self.get_bytes(4)?;
        Ok(BigEndian::read_i32(bytes))
    }

    fn get_u64(&mut self) -> crate::Result<u64> {
        let bytes = self.get_bytes(8)?;
        Ok(BigEndian::read_u64(bytes))
    }

    fn get_i64(&mut self) -> crate::Result<i64> {
        let bytes = self.get_bytes(8)?;
        Ok(BigEndian::read_i64(bytes))
    }

    fn get_f32(&mut self) -> crate::Result<f32> {
        let bytes = self.get_bytes(4)?;
        Ok(BigEndian::read_f32(bytes))
    }

    fn get_f64(&mut self) -> crate::Result<f64> {
        let bytes = self.get_bytes(8)?;
        Ok(BigEndian::read_f64(bytes))
    }

    fn get_str_nul(&mut self) -> crate::Result<&'a str> {
        let nul = memchr(b'\0', self).ok_or_else(eof)?;
        let bytes = self.get_bytes(nul + 1)?;
        std::str::from_utf8(&bytes[..nul])
            .map_err(|e| err_protocol!("invalid utf-8 in null-terminated string: {e}"))
    }

    fn get_bytes(&mut self, len: usize) -> crate::Result<&'a [u8]> {
        if self.len() < len {
            return Err(eof());
        }
        let (head, tail) = self.split_at(len);
        *self = tail;
        Ok(head)
    }

    fn is_empty(&self) -> bool {
        <[u8]>::is_empty(self)
    }
}

fn eof() -> Error {
    err_protocol!("unexpected end of message")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers() {
        let bytes: &[u8] = &[0x00, 0x01, 0xff, 0xff, 0xff, 0xff];
        let mut buf = bytes;
        assert_eq!(buf.get_u16().unwrap(), 1);
        assert_eq!(buf.get_i32().unwrap(), -1);
        assert!(buf.is_empty());
    }

    #[test]
    fn get_str_nul_splits_on_first_nul_and_advances_past_it() {
        let bytes: &[u8] = b"hello\0world\0";
        let mut buf = bytes;
        assert_eq!(buf.get_str_nul().unwrap(), "hello");
        assert_eq!(buf.get_str_nul().unwrap(), "world");
        assert!(buf.is_empty());
    }

    #[test]
    fn get_bytes_past_the_end_is_an_error() {
        let bytes: &[u8] = &[1, 2, 3];
        let mut buf = bytes;
        assert!(buf.get_bytes(4).is_err());
    }

    #[test]
    fn invalid_utf8_in_nul_terminated_string_is_an_error() {
        let bytes: &[u8] = &[0xff, 0xfe, 0x00];
        let mut buf = bytes;
        assert!(buf.get_str_nul().is_err());
    }
}
