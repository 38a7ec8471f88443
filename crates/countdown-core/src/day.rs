//! Calendar-day arithmetic.
//!
//! Everything here works on whole local calendar days. Time of day and
//! timezone offsets are stripped at the boundary by [`normalize`], so two
//! days built from the same year/month/day are interchangeable.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;

use crate::error::CountdownError;

/// Length of one calendar day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// ISO weekday number, Monday = 1 through Sunday = 7.
    pub fn weekday_number(self) -> u32 {
        self.0.weekday().number_from_monday()
    }

    pub fn is_first_of_month(self) -> bool {
        self.0.day() == 1
    }

    pub fn add_days(self, n: i64) -> Self {
        add_days(self, n)
    }

    pub fn key(self) -> DayKey {
        encode_key(self)
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl FromStr for CalendarDay {
    type Err = CountdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_key(s)
    }
}

/// Canonical `YYYY-MM-DD` identifier of a [`CalendarDay`].
///
/// Only built from a day or through [`DayKey::parse`], so the inner text is
/// always canonical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    /// Decodes `raw` and re-encodes it, so `2025-1-5` becomes `2025-01-05`.
    pub fn parse(raw: &str) -> Result<Self, CountdownError> {
        decode_key(raw).map(encode_key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn day(&self) -> Result<CalendarDay, CountdownError> {
        decode_key(&self.0)
    }
}

impl From<CalendarDay> for DayKey {
    fn from(day: CalendarDay) -> Self {
        encode_key(day)
    }
}

impl AsRef<str> for DayKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize<Tz: TimeZone>(dt: &DateTime<Tz>) -> CalendarDay {
    CalendarDay(dt.date_naive())
}

/// Signed number of calendar days from `a` to `b`.
///
/// Measured between the two midnights and rounded to the nearest whole day.
pub fn days_between(a: CalendarDay, b: CalendarDay) -> i64 {
    let start = a.0.and_time(NaiveTime::MIN);
    let end = b.0.and_time(NaiveTime::MIN);
    let ms = end.signed_duration_since(start).num_milliseconds();
    (ms + DAY_MS / 2).div_euclid(DAY_MS)
}

/// Saturates at the ends of the representable date range.
pub fn add_days(date: CalendarDay, n: i64) -> CalendarDay {
    match Duration::try_days(n).and_then(|delta| date.0.checked_add_signed(delta)) {
        Some(shifted) => CalendarDay(shifted),
        None if n < 0 => CalendarDay(NaiveDate::MIN),
        None => CalendarDay(NaiveDate::MAX),
    }
}

pub fn is_same_day(a: CalendarDay, b: CalendarDay) -> bool {
    a.year() == b.year() && a.month() == b.month() && a.day() == b.day()
}

pub fn encode_key(date: CalendarDay) -> DayKey {
    DayKey(date.to_string())
}

#[tracing::instrument(level = "trace")]
pub fn decode_key(key: &str) -> Result<CalendarDay, CountdownError> {
    let trimmed = key.trim();
    let parts: Vec<&str> = trimmed.split('-').collect();
    if parts.len() != 3 {
        return Err(CountdownError::invalid_key(
            key,
            format!("expected 3 segments, found {}", parts.len()),
        ));
    }

    let mut numbers = [0u32; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(CountdownError::invalid_key(
                key,
                format!("segment {part:?} is not numeric"),
            ));
        }
        *slot = part
            .parse()
            .map_err(|err| CountdownError::invalid_key(key, format!("{err}")))?;
    }

    let [year, month, day] = numbers;
    let year = i32::try_from(year)
        .map_err(|_| CountdownError::invalid_key(key, "year out of range"))?;

    CalendarDay::from_ymd(year, month, day)
        .ok_or_else(|| CountdownError::invalid_key(key, "no such calendar day"))
}

/// Monday of the week containing `date`. Sunday counts as day 7, so a
/// Sunday maps six days back.
pub fn start_of_week_monday(date: CalendarDay) -> CalendarDay {
    let offset = i64::from(date.weekday_number()) - 1;
    add_days(date, -offset)
}

pub fn end_of_week_sunday(date: CalendarDay) -> CalendarDay {
    add_days(start_of_week_monday(date), 6)
}

pub trait Clock {
    fn today(&self) -> CalendarDay;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> CalendarDay {
        normalize(&Local::now())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub CalendarDay);

impl Clock for FixedClock {
    fn today(&self) -> CalendarDay {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).expect("valid date")
    }

    #[test]
    fn normalize_strips_time_of_day() {
        let morning = Utc
            .with_ymd_and_hms(2025, 3, 30, 0, 15, 0)
            .single()
            .expect("valid datetime");
        let night = FixedOffset::east_opt(3 * 3600)
            .expect("valid offset")
            .with_ymd_and_hms(2025, 3, 30, 23, 59, 59)
            .single()
            .expect("valid datetime");

        assert_eq!(normalize(&morning), day(2025, 3, 30));
        assert_eq!(normalize(&morning), normalize(&night));
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(day(2025, 1, 10), day(2025, 1, 17)), 7);
        assert_eq!(days_between(day(2025, 1, 17), day(2025, 1, 10)), -7);
        assert_eq!(days_between(day(2024, 2, 28), day(2024, 3, 1)), 2);
        assert_eq!(days_between(day(2025, 1, 10), day(2027, 6, 1)), 872);
    }

    #[test]
    fn add_days_crosses_month_and_year() {
        assert_eq!(add_days(day(2025, 12, 30), 3), day(2026, 1, 2));
        assert_eq!(add_days(day(2025, 3, 1), -1), day(2025, 2, 28));
        assert_eq!(day(2024, 3, 1).add_days(-1), day(2024, 2, 29));
    }

    #[test]
    fn week_boundaries_treat_sunday_as_last_day() {
        // 2025-01-12 is a Sunday.
        assert_eq!(start_of_week_monday(day(2025, 1, 12)), day(2025, 1, 6));
        assert_eq!(start_of_week_monday(day(2025, 1, 6)), day(2025, 1, 6));
        assert_eq!(start_of_week_monday(day(2025, 1, 10)), day(2025, 1, 6));
        assert_eq!(end_of_week_sunday(day(2025, 1, 6)), day(2025, 1, 12));
        assert_eq!(end_of_week_sunday(day(2025, 1, 12)), day(2025, 1, 12));
    }

    #[test]
    fn encodes_zero_padded_keys() {
        assert_eq!(encode_key(day(2025, 1, 5)).as_str(), "2025-01-05");
        assert_eq!(day(987, 11, 30).to_string(), "0987-11-30");
    }

    #[test]
    fn decode_accepts_unpadded_segments() {
        assert_eq!(decode_key("2025-1-5").expect("decode"), day(2025, 1, 5));
        assert_eq!(
            DayKey::parse(" 2025-1-5 ").expect("parse").as_str(),
            "2025-01-05"
        );
    }

    #[test]
    fn decode_rejects_malformed_keys() {
        for raw in [
            "",
            "2025-01",
            "2025-01-05-01",
            "2025-aa-05",
            "2025--05",
            "2025-02-30",
            "2025-13-01",
            "not a date",
        ] {
            let err = decode_key(raw).expect_err(raw);
            assert!(
                matches!(err, CountdownError::InvalidKey { .. }),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn same_day_is_structural() {
        assert!(is_same_day(day(2025, 1, 10), day(2025, 1, 10)));
        assert!(!is_same_day(day(2025, 1, 10), day(2026, 1, 10)));
    }

    fn arb_day() -> impl Strategy<Value = CalendarDay> {
        (1i32..=9999, 1u32..=12, 1u32..=31).prop_filter_map("valid date", |(y, m, d)| {
            CalendarDay::from_ymd(y, m, d)
        })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(d in arb_day()) {
            prop_assert_eq!(decode_key(encode_key(d).as_str()).expect("decode"), d);
        }

        #[test]
        fn add_days_and_days_between_agree(d in arb_day(), n in -5000i64..5000) {
            prop_assert_eq!(days_between(d, add_days(d, n)), n);
        }

        #[test]
        fn week_start_is_monday_and_end_is_sunday(d in arb_day()) {
            let start = start_of_week_monday(d);
            let end = end_of_week_sunday(d);
            prop_assert_eq!(start.weekday_number(), 1);
            prop_assert_eq!(end.weekday_number(), 7);
            prop_assert!(start <= d && d <= end);
            prop_assert_eq!(days_between(start, end), 6);
        }
    }
}
