//! Binary `RANGE` wire format (§4.2): a flags byte, then zero, one, or two length-prefixed
//! bound values depending on which flag bits are set.

use crate::error::err_protocol;
use crate::io::{Buf, BufMut};

const RANGE_EMPTY: u8 = 0x01;
const RANGE_LB_INC: u8 = 0x02;
const RANGE_UB_INC: u8 = 0x04;
const RANGE_LB_INF: u8 = 0x08;
const RANGE_UB_INF: u8 = 0x10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgRangeBound<T> {
    Unbounded,
    Included(T),
    Excluded(T),
}

/// A PostgreSQL range value over bound type `T`. For a freshly-decoded wire value, `T` is
/// `Vec<u8>` (the raw per-bound bytes); the registry re-maps that to `PgRange<PgValue>` once it
/// has resolved the range's subtype codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgRange<T> {
    Empty,
    Bounds {
        lower: PgRangeBound<T>,
        upper: PgRangeBound<T>,
    },
}

impl PgRange<Vec<u8>> {
    pub(crate) fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        let flags = buf.get_u8()?;

        if flags & RANGE_EMPTY != 0 {
            return Ok(PgRange::Empty);
        }

        let lower = if flags & RANGE_LB_INF != 0 {
            PgRangeBound::Unbounded
        } else {
            let bytes = read_bound(&mut buf)?;
            if flags & RANGE_LB_INC != 0 {
                PgRangeBound::Included(bytes)
            } else {
                PgRangeBound::Excluded(bytes)
            }
        };

        let upper = if flags & RANGE_UB_INF != 0 {
            PgRangeBound::Unbounded
        } else {
            let bytes = read_bound(&mut buf)?;
            if flags & RANGE_UB_INC != 0 {
                PgRangeBound::Included(bytes)
            } else {
                PgRangeBound::Excluded(bytes)
            }
        };

        Ok(PgRange::Bounds { lower, upper })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            PgRange::Empty => buf.put_u8(RANGE_EMPTY),
            PgRange::Bounds { lower, upper } => {
                let mut flags = 0u8;

                match lower {
                    PgRangeBound::Unbounded => flags |= RANGE_LB_INF,
                    PgRangeBound::Included(_) => flags |= RANGE_LB_INC,
                    PgRangeBound::Excluded(_) => {}
                }

                match upper {
                    PgRangeBound::Unbounded => flags |= RANGE_UB_INF,
                    PgRangeBound::Included(_) => flags |= RANGE_UB_INC,
                    PgRangeBound::Excluded(_) => {}
                }

                buf.put_u8(flags);

                for bound in [lower, upper] {
                    match bound {
                        PgRangeBound::Included(bytes) | PgRangeBound::Excluded(bytes) => {
                            buf.put_i32(bytes.len() as i32);
                            buf.put_bytes(bytes);
                        }
                        PgRangeBound::Unbounded => {}
                    }
                }
            }
        }
    }
}

impl<T> PgRange<T> {
    pub(crate) fn try_map<U, E>(
        self,
        mut f: impl FnMut(T) -> Result<U, E>,
    ) -> Result<PgRange<U>, E> {
        Ok(match self {
            PgRange::Empty => PgRange::Empty,
            PgRange::Bounds { lower, upper } => PgRange::Bounds {
                lower: lower.try_map(&mut f)?,
                upper: upper.try_map(&mut f)?,
            },
        })
    }
}

impl<T> PgRangeBound<T> {
    fn try_map<U, E>(self, f: &mut impl FnMut(T) -> Result<U, E>) -> Result<PgRangeBound<U>, E> {
        Ok(match self {
            PgRangeBound::Unbounded => PgRangeBound::Unbounded,
            PgRangeBound::Included(v) => PgRangeBound::Included(f(v)?),
            PgRangeBound::Excluded(v) => PgRangeBound::Excluded(f(v)?),
        })
    }
}

fn read_bound(buf: &mut &[u8]) -> crate::Result<Vec<u8>> {
    let len = buf.get_i32()?;
    if len < 0 {
        return Err(err_protocol!("range bound length cannot be negative: {len}"));
    }
    Ok(buf.get_bytes(len as usize)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_bounded_range() {
        let range = PgRange::Bounds {
            lower: PgRangeBound::Included(vec![0, 0, 0, 1]),
            upper: PgRangeBound::Excluded(vec![0, 0, 0, 10]),
        };

        let mut buf = Vec::new();
        range.encode(&mut buf);

        assert_eq!(PgRange::decode(&buf).unwrap(), range);
    }

    #[test]
    fn it_round_trips_an_empty_range() {
        let mut buf = Vec::new();
        PgRange::<Vec<u8>>::Empty.encode(&mut buf);
        assert_eq!(PgRange::decode(&buf).unwrap(), PgRange::Empty);
    }

    #[test]
    fn it_round_trips_an_unbounded_upper() {
        let range = PgRange::Bounds {
            lower: PgRangeBound::Included(vec![1]),
            upper: PgRangeBound::Unbounded,
        };

        let mut buf = Vec::new();
        range.encode(&mut buf);

        assert_eq!(PgRange::decode(&buf).unwrap(), range);
    }
}
