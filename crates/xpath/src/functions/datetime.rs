use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use super::{FunctionRegistry, arg_number, arg_string};
use crate::value::Value;

const SECONDS_PER_DAY: i64 = 86_400;

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_fn("now", 0, Some(0), |_, _| {
        Ok(Value::String(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()))
    });
    reg.register_fn("local-date", 0, Some(0), |_, _| {
        Ok(Value::String(Local::now().format("%Y-%m-%d").to_string()))
    });
    reg.register_fn("local-dateTime", 0, Some(0), |_, _| {
        Ok(Value::String(Local::now().format("%Y-%m-%dT%H:%M:%S%:z").to_string()))
    });
    reg.register_fn("days-from-date", 1, Some(1), |_, args| {
        Ok(Value::Number(days_from_date(&arg_string(args, 0)).map_or(f64::NAN, |d| d as f64)))
    });
    reg.register_fn("days-to-date", 1, Some(1), |_, args| {
        Ok(Value::String(days_to_date(arg_number(args, 0)).unwrap_or_default()))
    });
    reg.register_fn("seconds-from-dateTime", 1, Some(1), |_, args| {
        Ok(Value::Number(seconds_from_date_time(&arg_string(args, 0)).unwrap_or(f64::NAN)))
    });
    reg.register_fn("seconds-to-dateTime", 1, Some(1), |_, args| {
        Ok(Value::String(seconds_to_date_time(arg_number(args, 0)).unwrap_or_default()))
    });
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// `Z`, `+hh:mm` or `-hh:mm`.
fn parse_offset(tz: &str) -> Option<FixedOffset> {
    if tz == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    let (h, m) = rest.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    if h > 14 || m > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (h * 3600 + m * 60))
}

/// Split an optional trailing timezone off `s`.
fn split_offset(s: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(body) = s.strip_suffix('Z') {
        return Some((body, parse_offset("Z")));
    }
    if s.len() > 6 && s.is_char_boundary(s.len() - 6) {
        let (body, tz) = s.split_at(s.len() - 6);
        if tz.starts_with(['+', '-']) && tz.as_bytes()[3] == b':' {
            return Some((body, Some(parse_offset(tz)?)));
        }
    }
    Some((s, None))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_date_time(s: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let (body, offset) = split_offset(s)?;
    let (date, time) = body.split_once('T')?;
    let date = parse_date(date)?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S%.f").ok()?;
    Some((date.and_time(time), offset))
}

/// Whole days since 1970-01-01 for an `xs:date` or `xs:dateTime` lexical.
pub(crate) fn days_from_date(s: &str) -> Option<i64> {
    let date = match parse_date_time(s) {
        Some((dt, _)) => dt.date(),
        None => {
            let (body, _) = split_offset(s)?;
            parse_date(body)?
        }
    };
    Some((date - epoch()).num_days())
}

pub(crate) fn days_to_date(days: f64) -> Option<String> {
    if !days.is_finite() {
        return None;
    }
    let days = (days + 0.000_001).floor() as i64;
    let secs = days.checked_mul(SECONDS_PER_DAY)?;
    let dt = DateTime::from_timestamp(secs, 0)?;
    Some(dt.format("%Y-%m-%d").to_string())
}

/// Seconds since the epoch (UTC) for an `xs:dateTime` lexical; a missing
/// timezone is taken as UTC.
pub(crate) fn seconds_from_date_time(s: &str) -> Option<f64> {
    let (naive, offset) = parse_date_time(s)?;
    let offset = offset.unwrap_or(FixedOffset::east_opt(0)?);
    let dt = offset.from_local_datetime(&naive).single()?;
    let whole = dt.timestamp() as f64;
    let frac = f64::from(dt.timestamp_subsec_nanos()) / 1e9;
    Some(whole + frac)
}

pub(crate) fn seconds_to_date_time(secs: f64) -> Option<String> {
    if !secs.is_finite() {
        return None;
    }
    let dt = DateTime::from_timestamp((secs + 0.000_001).floor() as i64, 0)?;
    Some(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_numbers() {
        assert_eq!(days_from_date("1970-01-02"), Some(1));
        assert_eq!(days_from_date("2002-01-01T12:00:00Z"), Some(11_688));
        assert_eq!(days_from_date("1969-12-31"), Some(-1));
        assert_eq!(days_from_date("2024-13-40"), None);
        assert_eq!(days_to_date(11_688.0).as_deref(), Some("2002-01-01"));
        assert_eq!(days_to_date(f64::NAN), None);
    }

    #[test]
    fn second_numbers() {
        assert_eq!(seconds_from_date_time("1970-01-01T00:00:00Z"), Some(0.0));
        assert_eq!(seconds_from_date_time("1970-01-01T01:00:00+01:00"), Some(0.0));
        assert_eq!(seconds_from_date_time("1970-01-01T00:00:01.5"), Some(1.5));
        assert_eq!(seconds_from_date_time("1970-01-01"), None);
        assert_eq!(seconds_to_date_time(86_400.0).as_deref(), Some("1970-01-02T00:00:00Z"));
    }
}
