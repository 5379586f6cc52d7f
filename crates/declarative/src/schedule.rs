//! Schedules and the schedule gate
//!
//! A schedule limits how often a resource is checked. The gate compares the
//! resource's schedule against the time it was last *checked* (not synced):
//! most resources go long stretches without changing, and gating on the
//! last sync would stop the schedule from applying after the first change.

use crate::cache::{CHECKED, ValueCache};
use crate::error::ScheduleError;
use crate::resource::{Catalog, Resource};
use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A policy deciding whether a resource is due
pub trait Schedule: Send + Sync + fmt::Debug {
    /// Whether a resource last checked at `last_checked` (epoch seconds,
    /// zero if never) is due at `now`
    fn matches(&self, last_checked: i64, now: DateTime<Utc>) -> bool;
}

// ============================================================================
// Period schedule
// ============================================================================

/// Unit of time a schedule repeats over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Never,
}

impl Period {
    /// Length of the period in seconds
    fn scale(self) -> Option<i64> {
        match self {
            Self::Hourly => Some(3_600),
            Self::Daily => Some(86_400),
            Self::Weekly => Some(604_800),
            Self::Monthly => Some(2_592_000),
            Self::Never => None,
        }
    }

    /// Calendar bucket a time falls into
    fn bucket(self, t: DateTime<Utc>) -> Option<(i32, u32, u32)> {
        match self {
            Self::Hourly => Some((t.year(), t.ordinal(), t.hour())),
            Self::Daily => Some((t.year(), t.ordinal(), 0)),
            Self::Weekly => {
                let week = t.iso_week();
                Some((week.year(), week.week(), 0))
            }
            Self::Monthly => Some((t.year(), t.month(), 0)),
            Self::Never => None,
        }
    }
}

/// How a period is compared against the last check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMatch {
    /// At least `period / repeat` seconds have elapsed
    #[default]
    Distance,
    /// The calendar hour/day/week/month has changed
    Number,
}

/// Time-of-day window, evaluated in UTC
///
/// Written as `"HH:MM - HH:MM"`; a start after the end wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, ScheduleError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(&format!("{s}:00"), "%H:%M"))
        .map_err(|_| ScheduleError::Invalid(format!("invalid time '{s}' in range")))
}

impl TryFrom<String> for TimeRange {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (start, end) = value
            .split_once('-')
            .ok_or_else(|| ScheduleError::Invalid(format!("range '{value}' must be 'start - end'")))?;
        Ok(Self {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }
}

impl From<TimeRange> for String {
    fn from(range: TimeRange) -> Self {
        format!(
            "{} - {}",
            range.start.format("%H:%M:%S"),
            range.end.format("%H:%M:%S")
        )
    }
}

fn default_repeat() -> u32 {
    1
}

/// Schedule defined by a period, a repeat count and an optional window
///
/// Every configured criterion must match for the schedule to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSchedule {
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub periodmatch: PeriodMatch,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default)]
    pub range: Option<TimeRange>,
}

impl Default for PeriodSchedule {
    fn default() -> Self {
        Self {
            period: None,
            periodmatch: PeriodMatch::Distance,
            repeat: 1,
            range: None,
        }
    }
}

impl PeriodSchedule {
    pub fn new(period: Period) -> Self {
        Self {
            period: Some(period),
            ..Self::default()
        }
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_periodmatch(mut self, periodmatch: PeriodMatch) -> Self {
        self.periodmatch = periodmatch;
        self
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.repeat == 0 {
            return Err(ScheduleError::Invalid("repeat must be at least 1".into()));
        }
        if self.repeat != 1 && self.periodmatch != PeriodMatch::Distance {
            return Err(ScheduleError::Invalid(
                "repeat must be 1 unless periodmatch is 'distance'".into(),
            ));
        }
        Ok(())
    }

    fn period_matches(&self, period: Period, previous: i64, now: DateTime<Utc>) -> bool {
        match self.periodmatch {
            PeriodMatch::Distance => match period.scale() {
                Some(scale) => now.timestamp() - previous >= scale / i64::from(self.repeat.max(1)),
                None => false,
            },
            PeriodMatch::Number => {
                let Some(previous) = DateTime::from_timestamp(previous, 0) else {
                    return true;
                };
                match (period.bucket(previous), period.bucket(now)) {
                    (Some(a), Some(b)) => a != b,
                    _ => false,
                }
            }
        }
    }
}

impl Schedule for PeriodSchedule {
    fn matches(&self, last_checked: i64, now: DateTime<Utc>) -> bool {
        if let Some(range) = &self.range
            && !range.contains(now.time())
        {
            return false;
        }
        if let Some(period) = self.period
            && !self.period_matches(period, last_checked, now)
        {
            return false;
        }
        true
    }
}

// ============================================================================
// Named schedules
// ============================================================================

/// Named schedules, usable as a resource's catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedules(pub BTreeMap<String, PeriodSchedule>);

impl Schedules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, schedule: PeriodSchedule) {
        self.0.insert(name.into(), schedule);
    }

    pub fn get(&self, name: &str) -> Option<&PeriodSchedule> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PeriodSchedule)> {
        self.0.iter()
    }

    /// Validate every schedule, reporting the first invalid one by name
    pub fn validate(&self) -> Result<(), ScheduleError> {
        for (name, schedule) in &self.0 {
            schedule
                .validate()
                .map_err(|e| ScheduleError::Invalid(format!("{name}: {e}")))?;
        }
        Ok(())
    }
}

impl Catalog for Schedules {
    fn schedule(&self, name: &str) -> Option<&dyn Schedule> {
        self.0.get(name).map(|s| s as &dyn Schedule)
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Decides whether a resource is due for evaluation
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleGate {
    /// Treat every resource as due
    pub ignore_schedules: bool,
}

impl ScheduleGate {
    pub fn new(ignore_schedules: bool) -> Self {
        Self { ignore_schedules }
    }

    /// Resolve the schedule a resource names
    ///
    /// Without a catalog there is nothing to resolve against; that is only
    /// worth a warning. A name that the catalog doesn't know is an error.
    pub fn resolve(resource: &dyn Resource) -> Result<Option<&dyn Schedule>, ScheduleError> {
        let Some(name) = resource.schedule() else {
            return Ok(None);
        };

        let Some(catalog) = resource.catalog() else {
            log::warn!(
                "{}: cannot schedule without a schedule-containing catalog",
                resource.reference()
            );
            return Ok(None);
        };

        catalog
            .schedule(name)
            .map(Some)
            .ok_or_else(|| ScheduleError::NotFound {
                resource: resource.reference(),
                name: name.to_string(),
            })
    }

    /// Whether `resource` is due at `now`, given its cached check time
    pub fn scheduled(
        &self,
        resource: &dyn Resource,
        cache: &dyn ValueCache,
        now: DateTime<Utc>,
    ) -> Result<bool, ScheduleError> {
        if self.ignore_schedules {
            return Ok(true);
        }

        let Some(schedule) = Self::resolve(resource)? else {
            return Ok(true);
        };

        let reference = resource.reference();
        let last_checked = cache
            .get(&reference, CHECKED)
            .and_then(|v| v.as_time())
            .map_or(0, |t| t.timestamp());

        let due = schedule.matches(last_checked, now);
        if !due {
            log::debug!("{reference}: not scheduled, skipping");
        }
        Ok(due)
    }
}
