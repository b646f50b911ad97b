//! Lightweight cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds)
//! Field syntax: `*`, `*/N`, `N`, `A-B`, `A-B/N` and comma lists of those.
//! Day of week: 0-7, where both 0 and 7 are Sunday.
//! Example: "0 18 * * 6" = every Saturday at 18:00
//!
//! Times are matched in the wall clock of a given timezone. A local time that
//! does not exist (spring-forward gap) is skipped; an ambiguous one
//! (fall-back) fires once, at its earlier instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use rollcall_core::error::{Result, RollcallError};
use std::fmt;
use std::str::FromStr;

/// How far ahead to search before giving up (covers Feb 29 expressions).
const MAX_LOOKAHEAD_DAYS: i64 = 366 * 4 + 1;

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
    source: String,
}

impl CronSchedule {
    /// Parse a five-field expression.
    pub fn parse(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(RollcallError::Schedule(format!(
                "Invalid cron expression: '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            )));
        }

        let field = |idx: usize, name: &str, min: u32, max: u32| {
            parse_field(parts[idx], min, max).ok_or_else(|| {
                RollcallError::Schedule(format!(
                    "Invalid {name} field '{}' in cron expression '{expression}'",
                    parts[idx]
                ))
            })
        };

        let minutes = field(0, "minute", 0, 59)?;
        let hours = field(1, "hour", 0, 23)?;
        let days_of_month = field(2, "day-of-month", 1, 31)?;
        let months = field(3, "month", 1, 12)?;
        let mut days_of_week: Vec<u32> = field(4, "day-of-week", 0, 7)?
            .into_iter()
            .map(|d| d % 7)
            .collect();
        days_of_week.sort_unstable();
        days_of_week.dedup();

        Ok(Self {
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: parts[2] != "*",
            dow_restricted: parts[4] != "*",
            source: expression.trim().to_string(),
        })
    }

    /// The expression as written.
    pub fn expression(&self) -> &str {
        &self.source
    }

    /// Classic cron rule: when both day fields are restricted, either may match.
    fn matches_date(&self, date: NaiveDate) -> bool {
        if !self.months.contains(&date.month()) {
            return false;
        }
        let dom = self.days_of_month.contains(&date.day());
        let dow = self
            .days_of_week
            .contains(&date.weekday().num_days_from_sunday());
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }

    /// First matching instant strictly after `after`, evaluated in `tz`.
    pub fn next_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        let tz = after.timezone();
        let start = after.naive_local().date();

        for offset in 0..MAX_LOOKAHEAD_DAYS {
            let date = start + Duration::days(offset);
            if !self.matches_date(date) {
                continue;
            }
            for &h in &self.hours {
                for &m in &self.minutes {
                    let Some(naive) = date.and_hms_opt(h, m, 0) else {
                        continue;
                    };
                    // None = the wall-clock time falls in a DST gap.
                    let Some(candidate) = tz.from_local_datetime(&naive).earliest() else {
                        continue;
                    };
                    if candidate > *after {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }
}

impl CronSchedule {
    /// Next fire time after `after`, matched on the wall clock of `tz`.
    pub fn next_run(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        self.next_after(&after.with_timezone(&tz))
            .map(|t| t.with_timezone(&Utc))
    }
}

impl FromStr for CronSchedule {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse a cron field into a sorted list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    let mut values = Vec::new();
    for part in field.split(',') {
        values.extend(parse_part(part.trim(), min, max)?);
    }
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    values.dedup();
    Some(values)
}

/// One comma-separated element: `*`, `*/N`, `N`, `A-B` or `A-B/N`.
fn parse_part(part: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => {
            let n: u32 = step.parse().ok()?;
            if n == 0 {
                return None;
            }
            (range, n)
        }
        None => (part, 1),
    };

    let (lo, hi) = if range == "*" {
        (min, max)
    } else if let Some((a, b)) = range.split_once('-') {
        (a.parse().ok()?, b.parse().ok()?)
    } else {
        let n: u32 = range.parse().ok()?;
        // `N/step` means "from N to max"
        if step > 1 { (n, max) } else { (n, n) }
    };

    if lo < min || hi > max || lo > hi {
        return None;
    }
    Some((lo..=hi).step_by(step as usize).collect())
}
