/// Datetime values produced by the jsonpath datetime item methods.
///
/// Five kinds, mirroring the SQL types: date, time, time with time zone,
/// timestamp, timestamp with time zone. Built on jiff's civil types; the
/// tz-aware kinds carry their parsed UTC offset in seconds so rendering
/// preserves what the input said.
///
/// Conversions that cross the tz/naive boundary are only legal when the
/// caller opted into time zone usage; they then interpret naive values in
/// the process's time zone, like the reference engine uses the session
/// time zone.
use std::cmp::Ordering;
use std::fmt;

use jiff::civil;
use jiff::tz::{Offset, TimeZone};
use jiff::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datetime {
    Date(civil::Date),
    Time(civil::Time),
    TimeTz(civil::Time, i32),
    Timestamp(civil::DateTime),
    TimestampTz(civil::DateTime, i32),
}

/// Target kind for an explicit datetime method cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeKind {
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
}

/// Why a cast between datetime kinds failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastError {
    /// The source kind cannot be cast to the target kind at all.
    NotRecognized,
    /// The cast is legal but crosses the tz/naive boundary without
    /// time zone usage enabled.
    NeedsTimeZone {
        from: &'static str,
        to: &'static str,
    },
}

impl DatetimeKind {
    pub fn short_name(&self) -> &'static str {
        match self {
            DatetimeKind::Date => "date",
            DatetimeKind::Time => "time",
            DatetimeKind::TimeTz => "timetz",
            DatetimeKind::Timestamp => "timestamp",
            DatetimeKind::TimestampTz => "timestamptz",
        }
    }
}

impl Datetime {
    /// The `.type()` name for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Datetime::Date(_) => "date",
            Datetime::Time(_) => "time without time zone",
            Datetime::TimeTz(..) => "time with time zone",
            Datetime::Timestamp(_) => "timestamp without time zone",
            Datetime::TimestampTz(..) => "timestamp with time zone",
        }
    }

    pub fn kind(&self) -> DatetimeKind {
        match self {
            Datetime::Date(_) => DatetimeKind::Date,
            Datetime::Time(_) => DatetimeKind::Time,
            Datetime::TimeTz(..) => DatetimeKind::TimeTz,
            Datetime::Timestamp(_) => DatetimeKind::Timestamp,
            Datetime::TimestampTz(..) => DatetimeKind::TimestampTz,
        }
    }

    /// Parses a canonical ISO datetime string, picking the kind from the
    /// shape of the input: date-only, time-only, time+offset, timestamp,
    /// timestamp+offset. A space separator between date and time is
    /// accepted and treated as `T`.
    pub fn parse(input: &str) -> Option<Datetime> {
        let s = input.trim();
        let normalized;
        let s = if s.len() > 10
            && s.as_bytes().get(10) == Some(&b' ')
            && s[..10].parse::<civil::Date>().is_ok()
        {
            normalized = s.replacen(' ', "T", 1);
            &normalized
        } else {
            s
        };

        if let Some((head, offset)) = split_offset(s) {
            if head.contains('T') {
                head.parse::<civil::DateTime>()
                    .ok()
                    .map(|dt| Datetime::TimestampTz(dt, offset))
            } else if head.contains(':') {
                head.parse::<civil::Time>()
                    .ok()
                    .map(|t| Datetime::TimeTz(t, offset))
            } else {
                None
            }
        } else if !s.contains(':') && !s.contains('T') {
            s.parse::<civil::Date>().ok().map(Datetime::Date)
        } else if s.contains('T') {
            s.parse::<civil::DateTime>().ok().map(Datetime::Timestamp)
        } else {
            s.parse::<civil::Time>().ok().map(Datetime::Time)
        }
    }

    /// Truncates fractional seconds to `precision` digits (0..=6; values
    /// outside that range are clamped). Dates are unaffected.
    pub fn truncate(self, precision: i32) -> Datetime {
        let p = precision.clamp(0, 6) as u32;
        let unit = 10_i32.pow(9 - p);
        let trunc_time = |t: civil::Time| {
            let nanos = t.subsec_nanosecond();
            let kept = nanos - nanos % unit;
            civil::Time::new(t.hour(), t.minute(), t.second(), kept).unwrap_or(t)
        };
        match self {
            Datetime::Date(_) => self,
            Datetime::Time(t) => Datetime::Time(trunc_time(t)),
            Datetime::TimeTz(t, off) => Datetime::TimeTz(trunc_time(t), off),
            Datetime::Timestamp(dt) => {
                Datetime::Timestamp(civil::DateTime::from_parts(dt.date(), trunc_time(dt.time())))
            }
            Datetime::TimestampTz(dt, off) => Datetime::TimestampTz(
                civil::DateTime::from_parts(dt.date(), trunc_time(dt.time())),
                off,
            ),
        }
    }

    /// Casts to another datetime kind. Casts that cross the tz/naive
    /// boundary require `use_tz` and interpret naive values in the
    /// process time zone.
    pub fn convert_to(&self, target: DatetimeKind, use_tz: bool) -> Result<Datetime, CastError> {
        use Datetime as D;
        use DatetimeKind as K;

        let gate = |ok: Result<D, CastError>| {
            if use_tz {
                ok
            } else {
                Err(CastError::NeedsTimeZone {
                    from: self.kind().short_name(),
                    to: target.short_name(),
                })
            }
        };

        match (*self, target) {
            (d, t) if d.kind() == t => Ok(d),

            (D::Date(d), K::Timestamp) => Ok(D::Timestamp(civil::DateTime::from_parts(
                d,
                civil::Time::midnight(),
            ))),
            (D::Date(d), K::TimestampTz) => gate(
                system_zoned(civil::DateTime::from_parts(d, civil::Time::midnight()))
                    .ok_or(CastError::NotRecognized),
            ),

            (D::Time(t), K::TimeTz) => gate(Ok(D::TimeTz(t, system_offset_now()))),

            (D::TimeTz(t, _), K::Time) => gate(Ok(D::Time(t))),

            (D::Timestamp(dt), K::Date) => Ok(D::Date(dt.date())),
            (D::Timestamp(dt), K::Time) => Ok(D::Time(dt.time())),
            (D::Timestamp(dt), K::TimestampTz) => {
                gate(system_zoned(dt).ok_or(CastError::NotRecognized))
            }

            (D::TimestampTz(dt, off), K::Date) => gate(
                local_civil(dt, off)
                    .map(|local| D::Date(local.date()))
                    .ok_or(CastError::NotRecognized),
            ),
            (D::TimestampTz(dt, off), K::Time) => gate(
                local_civil(dt, off)
                    .map(|local| D::Time(local.time()))
                    .ok_or(CastError::NotRecognized),
            ),
            (D::TimestampTz(dt, off), K::TimeTz) => gate(
                local_zoned(dt, off)
                    .map(|z| D::TimeTz(z.datetime().time(), z.offset().seconds()))
                    .ok_or(CastError::NotRecognized),
            ),
            (D::TimestampTz(dt, off), K::Timestamp) => gate(
                local_civil(dt, off)
                    .map(D::Timestamp)
                    .ok_or(CastError::NotRecognized),
            ),

            _ => Err(CastError::NotRecognized),
        }
    }

    /// Three-valued comparison. Comparable within the {date, timestamp,
    /// timestamptz} family and within the {time, timetz} family; anything
    /// else — including tz/naive mixes without `use_tz` — is `None`.
    pub fn compare(&self, other: &Datetime, use_tz: bool) -> Option<Ordering> {
        use Datetime as D;
        match (*self, *other) {
            (D::Time(a), D::Time(b)) => Some(a.cmp(&b)),
            (D::TimeTz(a, ao), D::TimeTz(b, bo)) => {
                Some(timetz_key(a, ao).cmp(&timetz_key(b, bo)))
            }
            (D::Time(a), D::TimeTz(b, bo)) => {
                if !use_tz {
                    return None;
                }
                let ao = system_offset_now();
                Some(timetz_key(a, ao).cmp(&timetz_key(b, bo)))
            }
            (D::TimeTz(..), D::Time(_)) => other.compare(self, use_tz).map(Ordering::reverse),

            (a, b) if a.is_date_family() && b.is_date_family() => {
                compare_date_family(a, b, use_tz)
            }
            _ => None,
        }
    }

    fn is_date_family(&self) -> bool {
        matches!(
            self,
            Datetime::Date(_) | Datetime::Timestamp(_) | Datetime::TimestampTz(..)
        )
    }
}

fn compare_date_family(a: Datetime, b: Datetime, use_tz: bool) -> Option<Ordering> {
    use Datetime as D;
    let civil_of = |d: Datetime| match d {
        D::Date(d) => civil::DateTime::from_parts(d, civil::Time::midnight()),
        D::Timestamp(dt) => dt,
        _ => unreachable!("tz-aware kinds handled separately"),
    };
    match (a, b) {
        (D::TimestampTz(adt, aoff), D::TimestampTz(bdt, boff)) => {
            Some(instant_of(adt, aoff)?.cmp(&instant_of(bdt, boff)?))
        }
        (D::TimestampTz(adt, aoff), naive) => {
            if !use_tz {
                return None;
            }
            let b_instant = system_zoned_instant(civil_of(naive))?;
            Some(instant_of(adt, aoff)?.cmp(&b_instant))
        }
        (naive, D::TimestampTz(..)) => compare_date_family(b, naive, use_tz)
            .map(Ordering::reverse),
        (a, b) => Some(civil_of(a).cmp(&civil_of(b))),
    }
}

/// Normalizes a time-with-offset to a UTC sort key; the offset itself is
/// the tiebreak so distinct renderings stay distinct.
fn timetz_key(t: civil::Time, offset: i32) -> (i64, i32) {
    let nanos_of_day = t.hour() as i64 * 3_600_000_000_000
        + t.minute() as i64 * 60_000_000_000
        + t.second() as i64 * 1_000_000_000
        + t.subsec_nanosecond() as i64;
    (nanos_of_day - offset as i64 * 1_000_000_000, offset)
}

fn fixed_zone(offset: i32) -> Option<TimeZone> {
    Offset::from_seconds(offset).ok().map(TimeZone::fixed)
}

fn instant_of(dt: civil::DateTime, offset: i32) -> Option<Timestamp> {
    dt.to_zoned(fixed_zone(offset)?).ok().map(|z| z.timestamp())
}

/// Civil datetime of a tz-aware value as seen in the process time zone.
fn local_civil(dt: civil::DateTime, offset: i32) -> Option<civil::DateTime> {
    local_zoned(dt, offset).map(|z| z.datetime())
}

fn local_zoned(dt: civil::DateTime, offset: i32) -> Option<jiff::Zoned> {
    Some(instant_of(dt, offset)?.to_zoned(TimeZone::system()))
}

/// Interprets a naive civil datetime in the process time zone, producing
/// a timestamptz value.
fn system_zoned(dt: civil::DateTime) -> Option<Datetime> {
    let zoned = dt.to_zoned(TimeZone::system()).ok()?;
    Some(Datetime::TimestampTz(
        zoned.datetime(),
        zoned.offset().seconds(),
    ))
}

fn system_zoned_instant(dt: civil::DateTime) -> Option<Timestamp> {
    dt.to_zoned(TimeZone::system()).ok().map(|z| z.timestamp())
}

fn system_offset_now() -> i32 {
    TimeZone::system().to_offset(Timestamp::now()).seconds()
}

/// Splits a trailing UTC-offset suffix (`Z`, `±HH`, `±HH:MM`, `±HHMM`)
/// off an ISO string. Date-part dashes never count: a `-` only starts an
/// offset when it appears after the first `:`.
fn split_offset(s: &str) -> Option<(&str, i32)> {
    let first_colon = s.find(':')?;
    if let Some(head) = s.strip_suffix(['Z', 'z']) {
        return Some((head, 0));
    }
    let sign_pos = s
        .char_indices()
        .rev()
        .find(|&(i, c)| c == '+' || (c == '-' && i > first_colon))
        .map(|(i, _)| i)?;
    let (head, tail) = s.split_at(sign_pos);
    let negative = tail.starts_with('-');
    let digits = &tail[1..];
    let (hh, mm) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        5 if digits.as_bytes()[2] == b':' => (
            digits[..2].parse::<i32>().ok()?,
            digits[3..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hh > 15 || mm > 59 {
        return None;
    }
    let secs = hh * 3600 + mm * 60;
    Some((head, if negative { -secs } else { secs }))
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datetime::Date(d) => write_date(f, *d),
            Datetime::Time(t) => write_time(f, *t),
            Datetime::TimeTz(t, off) => {
                write_time(f, *t)?;
                write_offset(f, *off)
            }
            Datetime::Timestamp(dt) => {
                write_date(f, dt.date())?;
                f.write_str("T")?;
                write_time(f, dt.time())
            }
            Datetime::TimestampTz(dt, off) => {
                write_date(f, dt.date())?;
                f.write_str("T")?;
                write_time(f, dt.time())?;
                write_offset(f, *off)
            }
        }
    }
}

fn write_date(f: &mut fmt::Formatter<'_>, d: civil::Date) -> fmt::Result {
    write!(f, "{:04}-{:02}-{:02}", d.year(), d.month(), d.day())
}

fn write_time(f: &mut fmt::Formatter<'_>, t: civil::Time) -> fmt::Result {
    write!(f, "{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())?;
    let nanos = t.subsec_nanosecond();
    if nanos != 0 {
        let digits = format!("{nanos:09}");
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }
    Ok(())
}

fn write_offset(f: &mut fmt::Formatter<'_>, off: i32) -> fmt::Result {
    if off == 0 {
        return f.write_str("Z");
    }
    let sign = if off < 0 { '-' } else { '+' };
    let abs = off.abs();
    write!(f, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date() {
        let dt = Datetime::parse("2017-03-10").unwrap();
        assert_eq!(dt.kind(), DatetimeKind::Date);
        assert_eq!(dt.to_string(), "2017-03-10");
    }

    #[test]
    fn parse_time_variants() {
        assert_eq!(
            Datetime::parse("12:34:56").unwrap().kind(),
            DatetimeKind::Time
        );
        let tz = Datetime::parse("12:34:56+04").unwrap();
        assert_eq!(tz.kind(), DatetimeKind::TimeTz);
        assert_eq!(tz.to_string(), "12:34:56+04:00");
        let utc = Datetime::parse("12:34:56Z").unwrap();
        assert_eq!(utc.to_string(), "12:34:56Z");
    }

    #[test]
    fn parse_timestamp_variants() {
        let ts = Datetime::parse("2017-03-10T11:22:33").unwrap();
        assert_eq!(ts.kind(), DatetimeKind::Timestamp);
        assert_eq!(ts.to_string(), "2017-03-10T11:22:33");

        let tstz = Datetime::parse("2017-03-10T01:02:03+04").unwrap();
        assert_eq!(tstz.kind(), DatetimeKind::TimestampTz);
        assert_eq!(tstz.to_string(), "2017-03-10T01:02:03+04:00");

        // space separator accepted
        let spaced = Datetime::parse("2017-03-10 11:22:33").unwrap();
        assert_eq!(spaced.kind(), DatetimeKind::Timestamp);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Datetime::parse("not a date"), None);
        assert_eq!(Datetime::parse("2017-13-40"), None);
        assert_eq!(Datetime::parse("12:99:00"), None);
    }

    #[test]
    fn fractional_seconds_render_trimmed() {
        let t = Datetime::parse("12:00:00.120000").unwrap();
        assert_eq!(t.to_string(), "12:00:00.12");
    }

    #[test]
    fn truncate_drops_extra_digits() {
        let t = Datetime::parse("12:00:00.789").unwrap().truncate(2);
        assert_eq!(t.to_string(), "12:00:00.78");
        let t0 = Datetime::parse("12:00:00.789").unwrap().truncate(0);
        assert_eq!(t0.to_string(), "12:00:00");
    }

    #[test]
    fn cast_timestamp_to_date() {
        let ts = Datetime::parse("2017-03-10T11:22:33").unwrap();
        assert_eq!(
            ts.convert_to(DatetimeKind::Date, false).unwrap().to_string(),
            "2017-03-10"
        );
    }

    #[test]
    fn cast_timestamptz_to_date_needs_tz() {
        let tstz = Datetime::parse("2017-03-10T01:02:03+04").unwrap();
        assert_eq!(
            tstz.convert_to(DatetimeKind::Date, false),
            Err(CastError::NeedsTimeZone {
                from: "timestamptz",
                to: "date"
            })
        );
    }

    #[test]
    fn cast_time_to_date_not_recognized() {
        let t = Datetime::parse("12:00:00").unwrap();
        assert_eq!(
            t.convert_to(DatetimeKind::Date, true),
            Err(CastError::NotRecognized)
        );
    }

    #[test]
    fn compare_same_kind() {
        let a = Datetime::parse("2017-03-10").unwrap();
        let b = Datetime::parse("2017-03-11").unwrap();
        assert_eq!(a.compare(&b, false), Some(Ordering::Less));
        assert_eq!(a.compare(&a, false), Some(Ordering::Equal));
    }

    #[test]
    fn compare_date_vs_timestamp() {
        let d = Datetime::parse("2017-03-10").unwrap();
        let ts = Datetime::parse("2017-03-10T00:00:00").unwrap();
        assert_eq!(d.compare(&ts, false), Some(Ordering::Equal));
        let later = Datetime::parse("2017-03-10T00:00:01").unwrap();
        assert_eq!(d.compare(&later, false), Some(Ordering::Less));
    }

    #[test]
    fn compare_cross_family_unknown() {
        let d = Datetime::parse("2017-03-10").unwrap();
        let t = Datetime::parse("12:00:00").unwrap();
        assert_eq!(d.compare(&t, true), None);
    }

    #[test]
    fn compare_tz_mix_without_use_tz_unknown() {
        let ts = Datetime::parse("2017-03-10T00:00:00").unwrap();
        let tstz = Datetime::parse("2017-03-10T00:00:00Z").unwrap();
        assert_eq!(ts.compare(&tstz, false), None);
    }

    #[test]
    fn compare_timestamptz_instants() {
        let a = Datetime::parse("2017-03-10T12:00:00+02").unwrap();
        let b = Datetime::parse("2017-03-10T11:00:00+01").unwrap();
        assert_eq!(a.compare(&b, false), Some(Ordering::Equal));
    }

    #[test]
    fn offset_splitting() {
        assert_eq!(split_offset("12:00:00+04"), Some(("12:00:00", 14400)));
        assert_eq!(split_offset("12:00:00-04:30"), Some(("12:00:00", -16200)));
        assert_eq!(split_offset("12:00:00+0430"), Some(("12:00:00", 16200)));
        assert_eq!(split_offset("2017-03-10"), None);
        assert_eq!(split_offset("12:00:00+16"), None);
    }
}
