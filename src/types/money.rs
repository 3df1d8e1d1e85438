//! Binary `MONEY` wire format (§4.2): a single `i64` of fractional cents (fixed at two decimal
//! places regardless of `lc_monetary`).

use crate::io::{Buf, BufMut};

pub(crate) fn decode(mut buf: &[u8]) -> crate::Result<i64> {
    buf.get_i64()
}

pub(crate) fn encode(value: i64, buf: &mut Vec<u8>) {
    buf.put_i64(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_negative_amount() {
        let mut buf = Vec::new();
        encode(-12345, &mut buf);
        assert_eq!(decode(&buf).unwrap(), -12345);
    }
}
