//! Publishing schedule: when the display is allowed to show alerts.
//!
//! Instants are UTC everywhere else; conversion to the display timezone
//! happens only here.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::types::{OverheadError, Result};

/// Inclusive local-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        TimeWindow { start, end }
    }

    /// Parse `"HH:MM-HH:MM"`.
    pub fn parse(text: &str) -> Result<Self> {
        let (start, end) = text
            .split_once('-')
            .ok_or_else(|| OverheadError::Config(format!("bad time window: {text}")))?;
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M")
                .map_err(|e| OverheadError::Config(format!("bad time '{s}': {e}")))
        };
        Ok(TimeWindow::new(parse(start)?, parse(end)?))
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Publishing windows in a display timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePolicy {
    pub timezone: Tz,
    /// Months (1-12) with publishing switched off entirely.
    pub disabled_months: Vec<u32>,
    pub weekday: TimeWindow,
    pub weekend: TimeWindow,
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        SchedulePolicy {
            timezone: chrono_tz::America::New_York,
            disabled_months: vec![12, 1, 2],
            weekday: TimeWindow::new(hm(16, 0), hm(22, 0)),
            weekend: TimeWindow::new(hm(9, 0), hm(23, 0)),
        }
    }
}

impl SchedulePolicy {
    pub fn is_publishing_allowed(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.timezone);
        if self.disabled_months.contains(&local.month()) {
            return false;
        }
        let window = match local.weekday() {
            Weekday::Sat | Weekday::Sun => &self.weekend,
            _ => &self.weekday,
        };
        window.contains(local.time())
    }
}

/// Parse a comma-separated month list: `"12,1,2"`.
pub fn parse_months(text: &str) -> Result<Vec<u32>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u32>() {
            Ok(m) if (1..=12).contains(&m) => Ok(m),
            _ => Err(OverheadError::Config(format!("bad month: {s}"))),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
