// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SkyWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use skywatch_shared::summary::WeatherSummary;

/// One current-weather observation as returned by a provider, before it is
/// stamped with a capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
}

/// An immutable captured reading for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub city: String,
    pub captured_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
}

impl Reading {
    pub fn from_observation(city: &str, captured_at: DateTime<Utc>, obs: Observation) -> Self {
        Self {
            city: city.to_owned(),
            captured_at,
            temperature_c: obs.temperature_c,
            feels_like_c: obs.feels_like_c,
            condition: obs.condition,
        }
    }
}

/// A reading row exactly as persisted. The timestamp is left as text so
/// that corrupt rows surface during aggregation instead of failing a query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    pub id: i64,
    pub city: String,
    pub captured_at: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
}

/// Half-open `[start, end)` interval of capture instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// A range no instant falls into.
    pub const EMPTY: Self = Self {
        start: Some(DateTime::<Utc>::MIN_UTC),
        end: Some(DateTime::<Utc>::MIN_UTC),
    };

    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start >= end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingFilter {
    pub city: Option<String>,
    pub range: TimeRange,
}

/// Statistics for one city on one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub city: String,
    pub date: NaiveDate,
    pub avg_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub dominant_condition: String,
    pub sample_count: u32,
}

impl From<DailySummary> for WeatherSummary {
    fn from(s: DailySummary) -> Self {
        Self {
            city: s.city,
            date: s.date,
            avg_temp: s.avg_temp,
            max_temp: s.max_temp,
            min_temp: s.min_temp,
            dominant_condition: s.dominant_condition,
            sample_count: s.sample_count,
        }
    }
}

/// Calendar-day policy used to bucket readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    tz: Tz,
}

impl Default for DayBoundary {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

impl DayBoundary {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn day_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }

    /// First instant of `day` in this timezone.
    ///
    /// Zones that skip midnight on a DST change start the day at the first
    /// valid local time after it.
    pub fn start_of(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        self.tz
            .from_local_datetime(&midnight)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(midnight + TimeDelta::hours(1)))
                    .earliest()
            })
            .map_or_else(|| midnight.and_utc(), |t| t.with_timezone(&Utc))
    }

    /// Capture-time interval covering the inclusive day range `[from, to]`.
    ///
    /// Bounds past [`LAST_ENCODABLE_YEAR`] cannot be compared against
    /// encoded timestamps: a start there matches nothing and an end there
    /// is left open.
    pub fn range(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> TimeRange {
        let start = from.map(|d| self.start_of(d));
        if start.is_some_and(|t| t.year() > LAST_ENCODABLE_YEAR) {
            return TimeRange::EMPTY;
        }

        TimeRange {
            start,
            end: to
                .and_then(|d| d.succ_opt())
                .map(|d| self.start_of(d))
                .filter(|t| t.year() <= LAST_ENCODABLE_YEAR),
        }
    }
}

/// Last year [`encode_timestamp`] writes with four digits. Later years get
/// a `+` sign prefix and no longer sort after earlier ones.
pub const LAST_ENCODABLE_YEAR: i32 = 9999;

/// Canonical persisted form: RFC 3339, UTC, millisecond precision, `Z`
/// suffix. Lexicographic order of these strings is chronological order.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}
