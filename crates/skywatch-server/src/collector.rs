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

//! One collection cycle: fetch every tracked city, store what arrived.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::db::ReadingStore;
use crate::error::{CollectError, FetchError};
use crate::model::Reading;
use crate::provider::WeatherProvider;

/// Outcome for a single city within a cycle.
pub type CityOutcome = (String, Result<Reading, CollectError>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Collector {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn ReadingStore>,
    fetch_timeout: Duration,
}

impl Collector {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        store: Arc<dyn ReadingStore>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            fetch_timeout,
        }
    }

    /// Fetches all cities concurrently. Each city gets its own timeout and
    /// its own result; one failure never affects the others. Outcomes come
    /// back in the order of `cities`. Failed cities are not retried here,
    /// the next cycle picks them up again.
    pub async fn collect(&self, cities: &[String]) -> Vec<CityOutcome> {
        join_all(
            cities
                .iter()
                .map(|city| async move { (city.clone(), self.collect_city(city).await) }),
        )
        .await
    }

    async fn collect_city(&self, city: &str) -> Result<Reading, CollectError> {
        let observation = tokio::time::timeout(self.fetch_timeout, self.provider.fetch(city))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        // captured when the fetch completed, not when the row is written
        let reading = Reading::from_observation(city, Utc::now(), observation);
        self.store.append(&reading)?;
        Ok(reading)
    }

    /// `collect` plus per-city and per-cycle logging.
    pub async fn run_cycle(&self, cities: &[String]) -> CycleReport {
        let started = Instant::now();
        let outcomes = self.collect(cities).await;

        let mut succeeded = 0;
        for (city, outcome) in &outcomes {
            match outcome {
                Ok(reading) => {
                    succeeded += 1;
                    info!(
                        city = %city,
                        temperature_c = reading.temperature_c,
                        condition = %reading.condition,
                        "Saved weather reading"
                    );
                }
                Err(e) => {
                    warn!(city = %city, error = %e, "Failed to collect weather reading");
                }
            }
        }

        let report = CycleReport {
            succeeded,
            failed: outcomes.len() - succeeded,
            elapsed: started.elapsed(),
        };
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Collection cycle finished"
        );
        report
    }
}
