//! Binary `BIT`/`VARBIT` wire format (§4.2): a bit count followed by the bits packed
//! most-significant-first into whole bytes, the trailing byte padded with zero bits.

use bit_vec::BitVec;

use crate::error::err_protocol;
use crate::io::{Buf, BufMut};

pub(crate) fn decode(mut buf: &[u8]) -> crate::Result<BitVec> {
    let len = buf.get_i32()?;
    if len < 0 {
        return Err(err_protocol!("BIT length cannot be negative: {len}"));
    }
    let len = len as usize;

    let byte_len = (len + 7) / 8;
    let bytes = buf.get_bytes(byte_len)?;

    let mut bits = BitVec::from_bytes(bytes);
    bits.truncate(len);
    Ok(bits)
}

pub(crate) fn encode(value: &BitVec, buf: &mut Vec<u8>) {
    buf.put_i32(value.len() as i32);

    let mut padded = value.clone();
    let remainder = padded.len() % 8;
    if remainder != 0 {
        for _ in 0..(8 - remainder) {
            padded.push(false);
        }
    }

    buf.put_bytes(&padded.to_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_bit_string_not_aligned_to_a_byte() {
        let mut bits = BitVec::new();
        for b in [true, false, true, true, false] {
            bits.push(b);
        }

        let mut buf = Vec::new();
        encode(&bits, &mut buf);

        assert_eq!(decode(&buf).unwrap(), bits);
    }

    #[test]
    fn it_round_trips_an_empty_bit_string() {
        let bits = BitVec::new();
        let mut buf = Vec::new();
        encode(&bits, &mut buf);
        assert_eq!(decode(&buf).unwrap(), bits);
    }
}
