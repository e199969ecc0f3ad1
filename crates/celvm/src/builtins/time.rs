//! Timestamp and duration accessors.
//!
//! Timestamp accessors break the instant down in a caller-supplied time
//! zone (IANA name; empty means UTC). Month, day-of-year and day-of-month
//! are zero based; `getDate` is the one-based day; day-of-week counts from
//! Sunday. Duration accessors are totals, except milliseconds which is the
//! sub-second remainder.

use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;

use super::{
    DATE, DAY_OF_MONTH, DAY_OF_WEEK, DAY_OF_YEAR, FULL_YEAR, HOURS, MILLISECONDS, MINUTES, MONTH,
    SECONDS, add,
};
use crate::{
    error::{CelError, RegistryError},
    registry::FunctionRegistry,
    value::{CelType, CelValue},
};

fn resolve_zone(name: &str) -> Result<Tz, CelError> {
    if name.is_empty() {
        return Ok(Tz::UTC);
    }
    name.parse().map_err(|_| CelError::invalid_argument("Invalid timezone"))
}

fn breakdown_part(
    instant: DateTime<Utc>,
    zone_name: &str,
    part: fn(&DateTime<Tz>) -> i64,
) -> CelValue {
    match resolve_zone(zone_name) {
        Ok(zone) => CelValue::Int(part(&instant.with_timezone(&zone))),
        Err(error) => CelValue::error(error),
    }
}

/// Registers the zoneless and zoned receiver overloads for one timestamp
/// accessor.
fn add_timestamp_accessor(
    registry: &mut FunctionRegistry,
    name: &str,
    part: fn(&DateTime<Tz>) -> i64,
) -> Result<(), RegistryError> {
    add(registry, name, true, &[CelType::Timestamp], move |args| {
        Ok(breakdown_part(args[0].as_timestamp()?, "", part))
    })?;
    add(registry, name, true, &[CelType::Timestamp, CelType::String], move |args| {
        let zone_name = args[1].as_string()?.clone();
        Ok(breakdown_part(args[0].as_timestamp()?, &zone_name, part))
    })
}

fn add_duration_accessor(
    registry: &mut FunctionRegistry,
    name: &str,
    part: fn(TimeDelta) -> i64,
) -> Result<(), RegistryError> {
    add(registry, name, true, &[CelType::Duration], move |args| {
        Ok(CelValue::Int(part(args[0].as_duration()?)))
    })
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    add_timestamp_accessor(registry, FULL_YEAR, |t| i64::from(t.year()))?;
    add_timestamp_accessor(registry, MONTH, |t| i64::from(t.month0()))?;
    add_timestamp_accessor(registry, DAY_OF_YEAR, |t| i64::from(t.ordinal0()))?;
    add_timestamp_accessor(registry, DAY_OF_MONTH, |t| i64::from(t.day0()))?;
    add_timestamp_accessor(registry, DATE, |t| i64::from(t.day()))?;
    add_timestamp_accessor(registry, DAY_OF_WEEK, |t| {
        i64::from(t.weekday().num_days_from_sunday())
    })?;
    add_timestamp_accessor(registry, HOURS, |t| i64::from(t.hour()))?;
    add_timestamp_accessor(registry, MINUTES, |t| i64::from(t.minute()))?;
    add_timestamp_accessor(registry, SECONDS, |t| i64::from(t.second()))?;
    add_timestamp_accessor(registry, MILLISECONDS, |t| i64::from(t.timestamp_subsec_millis()))?;

    add_duration_accessor(registry, HOURS, |d| d.num_hours())?;
    add_duration_accessor(registry, MINUTES, |d| d.num_minutes())?;
    add_duration_accessor(registry, SECONDS, |d| d.num_seconds())?;
    add_duration_accessor(registry, MILLISECONDS, |d| d.num_milliseconds() % 1000)?;
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

    // 2009-02-13T23:31:30.123Z, a Friday.
    fn ts() -> CelValue {
        CelValue::Timestamp(
            Utc.timestamp_opt(1_234_567_890, 123_000_000).single().unwrap(),
        )
    }

    fn get(name: &str, args: &[CelValue]) -> CelValue {
        registry().invoke(name, true, args).unwrap()
    }

    #[test]
    fn timestamp_parts_in_utc() {
        assert_eq!(get(FULL_YEAR, &[ts()]), CelValue::Int(2009));
        // Zero-based month and day-of-month.
        assert_eq!(get(MONTH, &[ts()]), CelValue::Int(1));
        assert_eq!(get(DAY_OF_MONTH, &[ts()]), CelValue::Int(12));
        assert_eq!(get(DATE, &[ts()]), CelValue::Int(13));
        assert_eq!(get(DAY_OF_YEAR, &[ts()]), CelValue::Int(43));
        // Friday, with Sunday as zero.
        assert_eq!(get(DAY_OF_WEEK, &[ts()]), CelValue::Int(5));
        assert_eq!(get(HOURS, &[ts()]), CelValue::Int(23));
        assert_eq!(get(MINUTES, &[ts()]), CelValue::Int(31));
        assert_eq!(get(SECONDS, &[ts()]), CelValue::Int(30));
        assert_eq!(get(MILLISECONDS, &[ts()]), CelValue::Int(123));
    }

    #[test]
    fn timestamp_parts_follow_the_time_zone() {
        // UTC-5: still the previous civil day in New York.
        let hours = get(HOURS, &[ts(), CelValue::string("America/New_York")]);
        assert_eq!(hours, CelValue::Int(18));
        let year = get(FULL_YEAR, &[ts(), CelValue::string("Australia/Sydney")]);
        assert_eq!(year, CelValue::Int(2009));
    }

    #[test]
    fn unknown_time_zones_are_invalid_argument() {
        let result = get(HOURS, &[ts(), CelValue::string("Mars/Olympus_Mons")]);
        let CelValue::Error(err) = result else { panic!("expected error value") };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "Invalid timezone");
    }

    #[test]
    fn duration_parts_are_totals_except_milliseconds() {
        let d = CelValue::Duration(
            TimeDelta::hours(2) + TimeDelta::minutes(5) + TimeDelta::milliseconds(1_500),
        );
        assert_eq!(get(HOURS, &[d.clone()]), CelValue::Int(2));
        assert_eq!(get(MINUTES, &[d.clone()]), CelValue::Int(125));
        assert_eq!(get(SECONDS, &[d.clone()]), CelValue::Int(7501));
        assert_eq!(get(MILLISECONDS, &[d]), CelValue::Int(500));
    }
}
