//! Wall-clock cadences for scheduled jobs (UTC).

use std::fmt;

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc, Weekday};
use rentflow_shared::config::JobsConfig;
use serde::Serialize;
use thiserror::Error;

/// Invalid schedule settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// Not `HH:MM`.
    #[error("Invalid time of day (expected HH:MM): {0}")]
    InvalidTime(String),

    /// Not a weekday name.
    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),
}

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cadence", rename_all = "lowercase")]
pub enum JobSchedule {
    /// Every day at `at`.
    Daily {
        /// Time of day.
        at: NaiveTime,
    },
    /// Every `on` at `at`.
    Weekly {
        /// Weekday.
        on: Weekday,
        /// Time of day.
        at: NaiveTime,
    },
}

impl JobSchedule {
    /// The daily cadence from `jobs.daily_at`.
    pub fn daily(config: &JobsConfig) -> Result<Self, ScheduleError> {
        Ok(Self::Daily {
            at: parse_time(&config.daily_at)?,
        })
    }

    /// The weekly cadence from `jobs.weekly_on` at `jobs.daily_at`.
    pub fn weekly(config: &JobsConfig) -> Result<Self, ScheduleError> {
        Ok(Self::Weekly {
            on: parse_weekday(&config.weekly_on)?,
            at: parse_time(&config.daily_at)?,
        })
    }

    /// First fire time strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let (at, weekday) = match *self {
            Self::Daily { at } => (at, None),
            Self::Weekly { on, at } => (at, Some(on)),
        };
        let mut day = after.date_naive();
        loop {
            let candidate = day.and_time(at).and_utc();
            let weekday_ok = weekday.is_none_or(|w| day.weekday() == w);
            if candidate > after && weekday_ok {
                return candidate;
            }
            day = day.checked_add_days(Days::new(1)).unwrap_or(day);
        }
    }
}

impl fmt::Display for JobSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Self::Weekly { on, at } => write!(f, "weekly on {on} at {}", at.format("%H:%M")),
        }
    }
}

/// Parses `HH:MM`.
pub fn parse_time(value: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ScheduleError::InvalidTime(value.to_string()))
}

/// Parses `mon`, `Monday`, `tue`, ...
pub fn parse_weekday(value: &str) -> Result<Weekday, ScheduleError> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| ScheduleError::InvalidWeekday(value.to_string()))
}
