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

//! Per-city, per-day summaries computed from the reading log.
//!
//! Summaries are never stored. Each call re-reads the matching readings,
//! buckets them by `(city, day)` under the configured [`DayBoundary`] and
//! reduces every bucket to average/max/min temperature plus the dominant
//! condition. Output is sorted by city, then date.
//!
//! The reduction does not depend on the order the store returns rows in:
//! temperatures are sorted before summation so the mean is bit-identical
//! across calls, and condition ties resolve to the lexicographically
//! smallest label.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::db::ReadingStore;
use crate::error::{AggregationError, StoreError};
use crate::model::{DailySummary, DayBoundary, ReadingFilter, StoredReading, parse_timestamp};

#[derive(Debug, Default)]
struct DayBucket {
    temperatures: Vec<f64>,
    conditions: BTreeMap<String, u32>,
    fault: Option<AggregationError>,
}

impl DayBucket {
    fn push(&mut self, row: StoredReading) {
        if self.fault.is_some() {
            return;
        }
        if !row.temperature_c.is_finite() {
            self.fault = Some(AggregationError::NonFiniteValue {
                id: row.id,
                city: row.city,
            });
            return;
        }
        self.temperatures.push(row.temperature_c);
        *self.conditions.entry(row.condition).or_insert(0) += 1;
    }

    fn finish(mut self, city: String, date: NaiveDate) -> Option<DailySummary> {
        if let Some(fault) = self.fault {
            warn!(%city, %date, error = %fault, "Dropping day summary with malformed readings");
            return None;
        }

        self.temperatures.sort_by(f64::total_cmp);
        let min_temp = *self.temperatures.first()?;
        let max_temp = *self.temperatures.last()?;
        let sample_count = u32::try_from(self.temperatures.len()).unwrap_or(u32::MAX);
        let sum: f64 = self.temperatures.iter().sum();
        let dominant_condition = pick_dominant(&self.conditions)?.to_owned();

        Some(DailySummary {
            city,
            date,
            avg_temp: sum / f64::from(sample_count),
            max_temp,
            min_temp,
            dominant_condition,
            sample_count,
        })
    }
}

/// Highest count wins; equal counts go to the lexicographically smallest
/// label. Relies on the map iterating in ascending key order.
fn pick_dominant(counts: &BTreeMap<String, u32>) -> Option<&str> {
    counts
        .iter()
        .fold(None, |best: Option<(&String, u32)>, (label, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((label, count)),
        })
        .map(|(label, _)| label.as_str())
}

/// Most frequent label in `labels`, ties broken by lexicographic order.
pub fn dominant_category<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.to_owned()).or_insert(0) += 1;
    }
    pick_dominant(&counts).map(ToOwned::to_owned)
}

/// Groups raw rows into day summaries. Rows whose timestamp cannot be
/// parsed are skipped; a bucket containing a non-finite temperature is
/// dropped as a whole. Both cases are logged and never fail the call.
pub fn summarize_rows(
    rows: impl IntoIterator<Item = StoredReading>,
    boundary: &DayBoundary,
) -> Vec<DailySummary> {
    let mut buckets: BTreeMap<(String, NaiveDate), DayBucket> = BTreeMap::new();

    for row in rows {
        let captured_at = match parse_timestamp(&row.captured_at) {
            Ok(ts) => ts,
            Err(e) => {
                let fault = AggregationError::InvalidTimestamp {
                    id: row.id,
                    raw: row.captured_at,
                    reason: e.to_string(),
                };
                warn!(city = %row.city, error = %fault, "Skipping unreadable reading");
                continue;
            }
        };

        let date = boundary.day_of(captured_at);
        buckets
            .entry((row.city.clone(), date))
            .or_default()
            .push(row);
    }

    let summaries: Vec<DailySummary> = buckets
        .into_iter()
        .filter_map(|((city, date), bucket)| bucket.finish(city, date))
        .collect();

    debug!(summaries = summaries.len(), "Aggregated daily summaries");
    summaries
}

pub fn summarize(
    store: &dyn ReadingStore,
    boundary: &DayBoundary,
    filter: &ReadingFilter,
) -> Result<Vec<DailySummary>, StoreError> {
    let rows = store.query(filter)?;
    Ok(summarize_rows(rows, boundary))
}
