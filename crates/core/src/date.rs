//! Calendar dates on the fixed 365-day simulation calendar.
//!
//! There are no leap years. Dates are written `YEAR[.MONTH[.DAY]]`; missing
//! parts default to 1.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::{BestEffort, Diagnostic, Diagnostics};

pub const MONTHS_IN_YEAR: u8 = 12;
pub const DAYS_IN_MONTH: [u8; MONTHS_IN_YEAR as usize] =
    [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
pub const DAYS_IN_YEAR: i64 = 365;
pub const SEPARATOR: char = '.';

const DAYS_UP_TO_MONTH: [i64; MONTHS_IN_YEAR as usize] = days_up_to_month();

const fn days_up_to_month() -> [i64; MONTHS_IN_YEAR as usize] {
    let mut table = [0i64; MONTHS_IN_YEAR as usize];
    let mut days = 0i64;
    let mut month = 0;
    while month < MONTHS_IN_YEAR as usize {
        table[month] = days;
        days += DAYS_IN_MONTH[month] as i64;
        month += 1;
    }
    assert!(days == DAYS_IN_YEAR);
    table
}

// ──────────────────────────────────────────────
// Timespan
// ──────────────────────────────────────────────

/// A signed number of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timespan(i64);

impl Timespan {
    pub const fn from_days(days: i64) -> Self {
        Timespan(days)
    }

    /// Whole months counted from the start of a year, so twelve months is
    /// exactly one year regardless of which months they are.
    pub fn from_months(months: i64) -> Self {
        let years = months.div_euclid(MONTHS_IN_YEAR as i64);
        let month = months.rem_euclid(MONTHS_IN_YEAR as i64) as usize;
        Timespan(years * DAYS_IN_YEAR + DAYS_UP_TO_MONTH[month])
    }

    pub const fn from_years(years: i64) -> Self {
        Timespan(years * DAYS_IN_YEAR)
    }

    pub const fn days(self) -> i64 {
        self.0
    }
}

impl Add for Timespan {
    type Output = Timespan;

    fn add(self, rhs: Timespan) -> Timespan {
        Timespan(self.0 + rhs.0)
    }
}

impl Sub for Timespan {
    type Output = Timespan;

    fn sub(self, rhs: Timespan) -> Timespan {
        Timespan(self.0 - rhs.0)
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ──────────────────────────────────────────────
// Date
// ──────────────────────────────────────────────

/// A day on the simulation calendar. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: u16,
    month: u8,
    day: u8,
}

impl Default for Date {
    fn default() -> Self {
        Date::from_ymd(0, 1, 1)
    }
}

impl Date {
    /// Build a date, clamping month and day into range.
    pub const fn from_ymd(year: u16, month: u8, day: u8) -> Self {
        let month = if month < 1 {
            1
        } else if month > MONTHS_IN_YEAR {
            MONTHS_IN_YEAR
        } else {
            month
        };
        let last = DAYS_IN_MONTH[(month - 1) as usize];
        let day = if day < 1 {
            1
        } else if day > last {
            last
        } else {
            day
        };
        Date { year, month, day }
    }

    /// Build a date only if month and day are valid on this calendar.
    pub fn new(year: u16, month: u8, day: u8) -> Option<Self> {
        if !(1..=MONTHS_IN_YEAR).contains(&month) {
            return None;
        }
        if day < 1 || day > DAYS_IN_MONTH[(month - 1) as usize] {
            return None;
        }
        Some(Date { year, month, day })
    }

    pub fn year(self) -> u16 {
        self.year
    }

    pub fn month(self) -> u8 {
        self.month
    }

    pub fn day(self) -> u8 {
        self.day
    }

    /// Days since `0.1.1`.
    pub fn to_timespan(self) -> Timespan {
        Timespan(
            self.year as i64 * DAYS_IN_YEAR
                + DAYS_UP_TO_MONTH[(self.month - 1) as usize]
                + self.day as i64
                - 1,
        )
    }

    /// Inverse of [`Date::to_timespan`]; saturates at both ends of the
    /// representable range.
    pub fn from_timespan(span: Timespan) -> Self {
        let days = span.days();
        if days < 0 {
            return Date::default();
        }
        let year = days / DAYS_IN_YEAR;
        if year > u16::MAX as i64 {
            return Date::from_ymd(u16::MAX, MONTHS_IN_YEAR, 31);
        }
        let mut rem = days % DAYS_IN_YEAR;
        let mut month = 0usize;
        while rem >= DAYS_IN_MONTH[month] as i64 {
            rem -= DAYS_IN_MONTH[month] as i64;
            month += 1;
        }
        Date {
            year: year as u16,
            month: month as u8 + 1,
            day: rem as u8 + 1,
        }
    }

    pub fn in_range(self, start: Date, end: Date) -> bool {
        start <= self && self <= end
    }

    /// Parse date text, always producing a date.
    ///
    /// Fields that could not be read keep their defaults (`0.1.1` for a
    /// missing year). On failure the diagnostics name the offending part and
    /// the full text; the date is only a best guess.
    pub fn parse(text: &str) -> BestEffort<Date> {
        let mut fields = (0u16, 1u8, 1u8);
        let mut diagnostics = Diagnostics::new();
        if let Err(d) = read_fields(text, &mut fields) {
            diagnostics.push(d);
        }
        let (year, month, day) = fields;
        BestEffort::new(Date::from_ymd(year, month, day), diagnostics)
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn unexpected(rest: &str, part: &str, text: &str) -> Diagnostic {
    let c = rest.chars().next().unwrap_or(SEPARATOR);
    Diagnostic::format(format!(
        "unexpected character '{}' in {} of date '{}'",
        c, part, text
    ))
}

fn read_fields(text: &str, fields: &mut (u16, u8, u8)) -> Result<(), Diagnostic> {
    if text.is_empty() {
        return Err(Diagnostic::format("empty date text"));
    }

    let (digits, rest) = split_digits(text);
    if digits.is_empty() {
        return Err(Diagnostic::format(format!(
            "failed to find year digits in date '{}'",
            text
        )));
    }
    fields.0 = digits.parse().map_err(|_| {
        Diagnostic::range(format!("failed to read year '{}' in date '{}'", digits, text))
    })?;
    if rest.is_empty() {
        return Ok(());
    }
    let Some(rest) = rest.strip_prefix(SEPARATOR) else {
        return Err(unexpected(rest, "year", text));
    };

    let (digits, rest) = split_digits(rest);
    if digits.is_empty() {
        return Err(Diagnostic::format(format!(
            "failed to find month digits in date '{}'",
            text
        )));
    }
    let month = digits
        .parse::<u8>()
        .ok()
        .filter(|m| (1..=MONTHS_IN_YEAR).contains(m))
        .ok_or_else(|| {
            Diagnostic::range(format!("invalid month '{}' in date '{}'", digits, text))
        })?;
    fields.1 = month;
    if rest.is_empty() {
        return Ok(());
    }
    let Some(rest) = rest.strip_prefix(SEPARATOR) else {
        return Err(unexpected(rest, "month", text));
    };

    let (digits, rest) = split_digits(rest);
    if digits.is_empty() {
        return Err(Diagnostic::format(format!(
            "failed to find day digits in date '{}'",
            text
        )));
    }
    let last = DAYS_IN_MONTH[(month - 1) as usize];
    let day = digits
        .parse::<u8>()
        .ok()
        .filter(|d| (1..=last).contains(d))
        .ok_or_else(|| {
            Diagnostic::range(format!("invalid day '{}' in date '{}'", digits, text))
        })?;
    fields.2 = day;
    if !rest.is_empty() {
        return Err(Diagnostic::format(format!(
            "unexpected text '{}' at the end of date '{}'",
            rest, text
        )));
    }
    Ok(())
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.year, SEPARATOR, self.month, SEPARATOR, self.day
        )
    }
}

impl FromStr for Date {
    type Err = Diagnostics;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Date::parse(s).into_outcome()
    }
}

impl Add<Timespan> for Date {
    type Output = Date;

    fn add(self, rhs: Timespan) -> Date {
        Date::from_timespan(self.to_timespan() + rhs)
    }
}

impl Sub for Date {
    type Output = Timespan;

    fn sub(self, rhs: Date) -> Timespan {
        self.to_timespan() - rhs.to_timespan()
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
