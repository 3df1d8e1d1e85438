//! Binary date/time wire formats (§4.2).
//!
//! Every format here is relative to the PostgreSQL epoch, 2000-01-01, and counted in integer
//! microseconds (`integer_datetimes`, the only mode any server since 8.4 advertises; pre-8.4's
//! float-seconds encoding is not supported).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::io::{Buf, BufMut};
use crate::types::value::PgInterval;

fn pg_epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("2000-01-01 is a valid date")
}

fn pg_epoch_datetime() -> NaiveDateTime {
    pg_epoch_date().and_hms_opt(0, 0, 0).expect("midnight is a valid time")
}

pub(crate) fn decode_date(mut buf: &[u8]) -> crate::Result<NaiveDate> {
    let days = buf.get_i32()?;
    Ok(pg_epoch_date() + Duration::days(days as i64))
}

pub(crate) fn encode_date(value: &NaiveDate, buf: &mut Vec<u8>) {
    let days = (*value - pg_epoch_date()).num_days();
    buf.put_i32(days as i32);
}

pub(crate) fn decode_time(mut buf: &[u8]) -> crate::Result<NaiveTime> {
    let micros = buf.get_i64()?;
    Ok(NaiveTime::from_hms_opt(0, 0, 0).unwrap() + Duration::microseconds(micros))
}

pub(crate) fn encode_time(value: &NaiveTime, buf: &mut Vec<u8>) {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
    let micros = (*value - midnight).num_microseconds().expect("time-of-day fits in i64 micros");
    buf.put_i64(micros);
}

pub(crate) fn decode_timestamp(mut buf: &[u8]) -> crate::Result<NaiveDateTime> {
    let micros = buf.get_i64()?;
    Ok(pg_epoch_datetime() + Duration::microseconds(micros))
}

pub(crate) fn encode_timestamp(value: &NaiveDateTime, buf: &mut Vec<u8>) {
    let micros = (*value - pg_epoch_datetime())
        .num_microseconds()
        .expect("timestamp offset from PostgreSQL epoch fits in i64 micros");
    buf.put_i64(micros);
}

pub(crate) fn decode_timestamptz(buf: &[u8]) -> crate::Result<DateTime<Utc>> {
    Ok(DateTime::from_naive_utc_and_offset(decode_timestamp(buf)?, Utc))
}

pub(crate) fn encode_timestamptz(value: &DateTime<Utc>, buf: &mut Vec<u8>) {
    encode_timestamp(&value.naive_utc(), buf);
}

pub(crate) fn decode_interval(mut buf: &[u8]) -> crate::Result<PgInterval> {
    let microseconds = buf.get_i64()?;
    let days = buf.get_i32()?;
    let months = buf.get_i32()?;
    Ok(PgInterval { months, days, microseconds })
}

pub(crate) fn encode_interval(value: &PgInterval, buf: &mut Vec<u8>) {
    buf.put_i64(value.microseconds);
    buf.put_i32(value.days);
    buf.put_i32(value.months);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_date_before_the_pg_epoch() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let mut buf = Vec::new();
        encode_date(&date, &mut buf);
        assert_eq!(decode_date(&buf).unwrap(), date);
    }

    #[test]
    fn it_round_trips_a_time_of_day() {
        let time = NaiveTime::from_hms_micro_opt(13, 45, 30, 123_456).unwrap();
        let mut buf = Vec::new();
        encode_time(&time, &mut buf);
        assert_eq!(decode_time(&buf).unwrap(), time);
    }

    #[test]
    fn it_round_trips_a_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2026, 7, 28)
            .unwrap()
            .and_hms_micro_opt(9, 0, 0, 500)
            .unwrap();
        let mut buf = Vec::new();
        encode_timestamp(&ts, &mut buf);
        assert_eq!(decode_timestamp(&buf).unwrap(), ts);
    }

    #[test]
    fn it_round_trips_an_interval() {
        let interval = PgInterval { months: 14, days: 3, microseconds: 1_000_000 };
        let mut buf = Vec::new();
        encode_interval(&interval, &mut buf);
        assert_eq!(decode_interval(&buf).unwrap(), interval);
    }
}
