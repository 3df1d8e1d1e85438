//! Binary `NUMERIC` wire format (§4.2) and conversion to/from [`bigdecimal::BigDecimal`].
//!
//! Grounded in the real layout Postgres uses for arbitrary-precision decimals: a header of
//! (digit count, weight, sign, display scale) followed by base-10000 digit groups.
//! <https://github.com/postgres/postgres/blob/master/src/backend/utils/adt/numeric.c>

use std::cmp;
use std::convert::TryInto;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};

use crate::error::{err_protocol, Error};
use crate::io::{Buf, BufMut};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i16)]
pub enum PgNumericSign {
    Positive = 0x0000,
    Negative = 0x4000,
}

impl PgNumericSign {
    fn from_i16(sign: i16) -> crate::Result<Self> {
        match sign {
            0x0000 => Ok(PgNumericSign::Positive),
            -0x4000i16 => Ok(PgNumericSign::Negative),
            _ => Err(err_protocol!("unsupported NUMERIC sign tag: {sign:#06x}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgNumeric {
    NotANumber,
    Number {
        sign: PgNumericSign,
        /// Number of significant decimal digits after the point, for display only.
        scale: i16,
        /// Weight of the first digit group, in units of 10000.
        weight: i16,
        digits: Vec<i16>,
    },
}

impl PgNumeric {
    pub(crate) fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let num_digits = buf.get_u16()?;
        let weight = buf.get_i16()?;
        let sign_tag = buf.get_i16()?;
        let scale = buf.get_i16()?;

        // 0xC000 as an i16 is -16384; that's the NaN sign tag per the C source.
        if sign_tag == -16384 {
            return Ok(PgNumeric::NotANumber);
        }

        let digits = (0..num_digits)
            .map(|_| buf.get_i16())
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(PgNumeric::Number {
            sign: PgNumericSign::from_i16(sign_tag)?,
            scale,
            weight,
            digits,
        })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            PgNumeric::NotANumber => {
                buf.put_u16(0);
                buf.put_i16(0);
                buf.put_i16(-16384);
                buf.put_i16(0);
            }
            PgNumeric::Number {
                sign,
                scale,
                weight,
                digits,
            } => {
                let len: i16 = digits
                    .len()
                    .try_into()
                    .expect("NUMERIC digit count overflowed i16");

                buf.put_u16(len as u16);
                buf.put_i16(*weight);
                buf.put_i16(*sign as i16);
                buf.put_i16(*scale);

                for &digit in digits {
                    debug_assert!(digit < 10000, "NUMERIC digits must be base-10000");
                    buf.put_i16(digit);
                }
            }
        }
    }
}

impl TryFrom<&BigDecimal> for PgNumeric {
    type Error = Error;

    fn try_from(value: &BigDecimal) -> Result<Self, Self::Error> {
        let overflow = || Error::Data("BigDecimal magnitude too large for NUMERIC".into());

        let to_base_10000 = |chunk: &[u8]| chunk.iter().fold(0i16, |a, &d| a * 10 + d as i16);

        let (bigint, exp) = value.as_bigint_and_exponent();
        let (sign, base_10) = bigint.to_radix_be(10);

        let weight_10 = base_10.len() as i64 - exp;
        let scale: i16 = cmp::max(0, exp).try_into().map_err(|_| overflow())?;

        let weight: i16 = if weight_10 <= 0 {
            weight_10 / 4 - 1
        } else {
            weight_10 / 4
        }
        .try_into()
        .map_err(|_| overflow())?;

        let offset = if weight_10 < 0 {
            4 - (-weight_10) % 4
        } else {
            weight_10 % 4
        } as usize;

        let mut digits = Vec::with_capacity(base_10.len() / 4 + 1);

        if offset != 0 {
            if let Some(first) = base_10.get(..offset) {
                digits.push(to_base_10000(first));
            }
        }

        if let Some(rest) = base_10.get(offset..) {
            digits.extend(
                rest.chunks(4)
                    .map(|chunk| to_base_10000(chunk) * 10i16.pow(4 - chunk.len() as u32)),
            );
        }

        while let Some(&0) = digits.last() {
            digits.pop();
        }

        Ok(PgNumeric::Number {
            sign: match sign {
                Sign::Plus | Sign::NoSign => PgNumericSign::Positive,
                Sign::Minus => PgNumericSign::Negative,
            },
            scale,
            weight,
            digits,
        })
    }
}

impl TryFrom<PgNumeric> for BigDecimal {
    type Error = Error;

    fn try_from(numeric: PgNumeric) -> Result<Self, Self::Error> {
        let (digits, sign, weight) = match numeric {
            PgNumeric::Number {
                digits,
                sign,
                weight,
                ..
            } => (digits, sign, weight),
            PgNumeric::NotANumber => {
                return Err(Error::Data("BigDecimal cannot represent NUMERIC NaN".into()))
            }
        };

        let sign = match sign {
            _ if digits.is_empty() => Sign::NoSign,
            PgNumericSign::Positive => Sign::Plus,
            PgNumericSign::Negative => Sign::Minus,
        };

        let scale = (digits.len() as i64 - weight as i64 - 1) * 4;

        let mut cents = Vec::with_capacity(digits.len() * 2);
        for digit in &digits {
            cents.push((digit / 100) as u8);
            cents.push((digit % 100) as u8);
        }

        let bigint = BigInt::from_radix_be(sign, &cents, 100)
            .expect("digit group out of base-100 range; PgNumeric::try_from is buggy");

        Ok(BigDecimal::new(bigint, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn it_round_trips_small_integers() {
        for s in ["1", "10", "100", "10000", "-42", "0"] {
            let bd = BigDecimal::from_str(s).unwrap();
            let numeric = PgNumeric::try_from(&bd).unwrap();
            let back = BigDecimal::try_from(numeric).unwrap();
            assert_eq!(bd, back, "round trip failed for {s}");
        }
    }

    #[test]
    fn it_round_trips_fractional_values() {
        for s in ["1.2345", "0.12345", "0.1", "123.456", "-99.01"] {
            let bd = BigDecimal::from_str(s).unwrap();
            let numeric = PgNumeric::try_from(&bd).unwrap();
            let back = BigDecimal::try_from(numeric).unwrap();
            assert_eq!(bd, back, "round trip failed for {s}");
        }
    }

    #[test]
    fn it_encodes_and_decodes_the_wire_format() {
        let bd = BigDecimal::from_str("1234.5678").unwrap();
        let numeric = PgNumeric::try_from(&bd).unwrap();

        let mut buf = Vec::new();
        numeric.encode(&mut buf);

        let decoded = PgNumeric::decode(&buf).unwrap();
        assert_eq!(numeric, decoded);
    }

    #[test]
    fn it_round_trips_nan() {
        let mut buf = Vec::new();
        PgNumeric::NotANumber.encode(&mut buf);
        assert_eq!(PgNumeric::decode(&buf).unwrap(), PgNumeric::NotANumber);
    }
}
