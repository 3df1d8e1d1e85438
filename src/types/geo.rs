//! Binary geometric type wire formats (§4.2): fixed-size records of `f64` coordinates, no
//! length prefix beyond what `DataRow`/`PgRecord` already carry.

use crate::io::{Buf, BufMut};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgPoint {
    pub x: f64,
    pub y: f64,
}

impl PgPoint {
    pub(crate) fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        let x = buf.get_f64()?;
        let y = buf.get_f64()?;
        Ok(PgPoint { x, y })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgLine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PgLine {
    pub(crate) fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        Ok(PgLine {
            a: buf.get_f64()?,
            b: buf.get_f64()?,
            c: buf.get_f64()?,
        })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_f64(self.a);
        buf.put_f64(self.b);
        buf.put_f64(self.c);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgLineSegment {
    pub start: PgPoint,
    pub end: PgPoint,
}

impl PgLineSegment {
    pub(crate) fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        Ok(PgLineSegment {
            start: PgPoint::decode(buf)?,
            end: PgPoint::decode(buf)?,
        })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        self.start.encode(buf);
        self.end.encode(buf);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgBox {
    pub high: PgPoint,
    pub low: PgPoint,
}

impl PgBox {
    pub(crate) fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        Ok(PgBox {
            high: PgPoint::decode(buf)?,
            low: PgPoint::decode(buf)?,
        })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        self.high.encode(buf);
        self.low.encode(buf);
    }
}

/// `PATH`: a sequence of points, either open or closed.
#[derive(Debug, Clone, PartialEq)]
pub struct PgPath {
    pub closed: bool,
    pub points: Vec<PgPoint>,
}

impl PgPath {
    pub(crate) fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        let closed = buf.get_u8()? != 0;
        let count = buf.get_i32()?;
        let points = (0..count)
            .map(|_| PgPoint::decode(buf))
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(PgPath { closed, points })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.closed as u8);
        buf.put_i32(self.points.len() as i32);
        for point in &self.points {
            point.encode(buf);
        }
    }
}

/// `POLYGON`: always closed, with no leading flag byte (unlike `PATH`).
#[derive(Debug, Clone, PartialEq)]
pub struct PgPolygon {
    pub points: Vec<PgPoint>,
}

impl PgPolygon {
    pub(crate) fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        let count = buf.get_i32()?;
        let points = (0..count)
            .map(|_| PgPoint::decode(buf))
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(PgPolygon { points })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_i32(self.points.len() as i32);
        for point in &self.points {
            point.encode(buf);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgCircle {
    pub center: PgPoint,
    pub radius: f64,
}

impl PgCircle {
    pub(crate) fn decode(buf: &mut &[u8]) -> crate::Result<Self> {
        Ok(PgCircle {
            center: PgPoint::decode(buf)?,
            radius: buf.get_f64()?,
        })
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        self.center.encode(buf);
        buf.put_f64(self.radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_point() {
        let point = PgPoint { x: 1.5, y: -2.25 };
        let mut buf = Vec::new();
        point.encode(&mut buf);

        let mut slice = &buf[..];
        assert_eq!(PgPoint::decode(&mut slice).unwrap(), point);
    }

    #[test]
    fn it_round_trips_a_polygon() {
        let polygon = PgPolygon {
            points: vec![
                PgPoint { x: 0.0, y: 0.0 },
                PgPoint { x: 1.0, y: 0.0 },
                PgPoint { x: 0.0, y: 1.0 },
            ],
        };

        let mut buf = Vec::new();
        polygon.encode(&mut buf);

        let mut slice = &buf[..];
        assert_eq!(PgPolygon::decode(&mut slice).unwrap(), polygon);
    }

    #[test]
    fn it_round_trips_a_circle() {
        let circle = PgCircle {
            center: PgPoint { x: 3.0, y: 4.0 },
            radius: 5.0,
        };

        let mut buf = Vec::new();
        circle.encode(&mut buf);

        let mut slice = &buf[..];
        assert_eq!(PgCircle::decode(&mut slice).unwrap(), circle);
    }
}
