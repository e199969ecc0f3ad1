//! Type conversions: `timestamp`, `duration`, `int`, `string`.

use chrono::{DateTime, TimeDelta, Utc};

use super::{DURATION, INT, STRING, TIMESTAMP, add};
use crate::{
    error::{CelError, RegistryError},
    registry::FunctionRegistry,
    value::{CelType, CelValue},
};

/// Parses the decimal-seconds duration form, e.g. `"3.5s"` or `"-720s"`.
/// At most nine fractional digits are carried.
fn parse_duration(text: &str) -> Option<TimeDelta> {
    let body = text.strip_suffix('s')?;
    let (negative, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (seconds_str, fraction_str) = match body.split_once('.') {
        Some((seconds, fraction)) if !fraction.is_empty() => (seconds, fraction),
        Some(_) => return None,
        None => (body, ""),
    };
    if seconds_str.is_empty() || !seconds_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if fraction_str.len() > 9 || !fraction_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let seconds: i64 = seconds_str.parse().ok()?;
    let nanos: u32 = if fraction_str.is_empty() {
        0
    } else {
        let digits: u32 = fraction_str.parse().ok()?;
        digits * 10u32.pow(9 - fraction_str.len() as u32)
    };
    let magnitude = TimeDelta::new(seconds, nanos)?;
    Some(if negative { -magnitude } else { magnitude })
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use CelType::{Bool, Bytes, Double, Int, String, Timestamp, Uint};

    add(registry, TIMESTAMP, false, &[String], |args| {
        Ok(match DateTime::parse_from_rfc3339(args[0].as_string()?) {
            Ok(parsed) => CelValue::Timestamp(parsed.with_timezone(&Utc)),
            Err(_) => CelValue::error(CelError::invalid_argument(
                "String to Timestamp conversion failed",
            )),
        })
    })?;
    add(registry, DURATION, false, &[String], |args| {
        Ok(match parse_duration(args[0].as_string()?) {
            Some(duration) => CelValue::Duration(duration),
            None => CelValue::error(CelError::invalid_argument(
                "String to Duration conversion failed",
            )),
        })
    })?;

    add(registry, INT, false, &[Timestamp], |args| {
        Ok(CelValue::Int(args[0].as_timestamp()?.timestamp()))
    })?;
    add(registry, INT, false, &[Double], |args| {
        Ok(CelValue::Int(args[0].as_double()? as i64))
    })?;
    add(registry, INT, false, &[Bool], |args| {
        Ok(CelValue::Int(i64::from(args[0].as_bool()?)))
    })?;
    add(registry, INT, false, &[Uint], |args| Ok(CelValue::Int(args[0].as_uint()? as i64)))?;

    add(registry, STRING, false, &[Int], |args| {
        Ok(CelValue::string(args[0].as_int()?.to_string()))
    })?;
    add(registry, STRING, false, &[Uint], |args| {
        Ok(CelValue::string(args[0].as_uint()?.to_string()))
    })?;
    add(registry, STRING, false, &[Double], |args| {
        let mut buffer = ryu::Buffer::new();
        Ok(CelValue::string(buffer.format(args[0].as_double()?)))
    })?;
    add(registry, STRING, false, &[Bytes], |args| {
        Ok(match std::str::from_utf8(args[0].as_bytes()?) {
            Ok(text) => CelValue::string(text),
            Err(_) => CelValue::error(CelError::invalid_argument(
                "Bytes to String conversion failed: invalid UTF-8",
            )),
        })
    })?;
    add(registry, STRING, false, &[String], |args| Ok(args[0].clone()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        register(&mut registry).unwrap();
        registry
    }

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_duration("1s"), Some(TimeDelta::seconds(1)));
        assert_eq!(parse_duration("-1.5s"), Some(TimeDelta::milliseconds(-1500)));
        assert_eq!(
            parse_duration("0.000000001s"),
            Some(TimeDelta::nanoseconds(1))
        );
        assert_eq!(parse_duration("123.456s"), Some(TimeDelta::milliseconds(123_456)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration("1"), None);
        assert_eq!(parse_duration("1.s"), None);
        assert_eq!(parse_duration("1.0000000001s"), None);
        assert_eq!(parse_duration("1e3s"), None);
    }

    #[test]
    fn timestamp_conversion_parses_rfc3339() {
        let registry = registry();
        let result = registry
            .invoke(TIMESTAMP, false, &[CelValue::string("2009-02-13T23:31:30Z")])
            .unwrap();
        assert_eq!(
            result,
            CelValue::Timestamp(Utc.timestamp_opt(1_234_567_890, 0).single().unwrap())
        );

        let bad = registry.invoke(TIMESTAMP, false, &[CelValue::string("not a time")]).unwrap();
        let CelValue::Error(err) = bad else { panic!("expected error value") };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "String to Timestamp conversion failed");
    }

    #[test]
    fn duration_conversion_reports_failures() {
        let registry = registry();
        let bad = registry.invoke(DURATION, false, &[CelValue::string("five minutes")]).unwrap();
        let CelValue::Error(err) = bad else { panic!("expected error value") };
        assert_eq!(err.message(), "String to Duration conversion failed");
    }

    #[test]
    fn int_conversions() {
        let registry = registry();
        let ts = CelValue::Timestamp(Utc.timestamp_opt(1_234_567_890, 0).single().unwrap());
        assert_eq!(registry.invoke(INT, false, &[ts]).unwrap(), CelValue::Int(1_234_567_890));
        assert_eq!(
            registry.invoke(INT, false, &[CelValue::Double(3.9)]).unwrap(),
            CelValue::Int(3)
        );
        assert_eq!(
            registry.invoke(INT, false, &[CelValue::Bool(true)]).unwrap(),
            CelValue::Int(1)
        );
        assert_eq!(
            registry.invoke(INT, false, &[CelValue::Uint(7)]).unwrap(),
            CelValue::Int(7)
        );
    }

    #[test]
    fn string_conversions() {
        let registry = registry();
        assert_eq!(
            registry.invoke(STRING, false, &[CelValue::Int(-3)]).unwrap(),
            CelValue::string("-3")
        );
        assert_eq!(
            registry.invoke(STRING, false, &[CelValue::Double(1.5)]).unwrap(),
            CelValue::string("1.5")
        );
        assert_eq!(
            registry.invoke(STRING, false, &[CelValue::bytes(b"ok".to_vec())]).unwrap(),
            CelValue::string("ok")
        );
        let bad = registry
            .invoke(STRING, false, &[CelValue::bytes(vec![0xff, 0xfe])])
            .unwrap();
        assert!(bad.is_error());
        assert_eq!(
            registry.invoke(STRING, false, &[CelValue::string("id")]).unwrap(),
            CelValue::string("id")
        );
    }
}
