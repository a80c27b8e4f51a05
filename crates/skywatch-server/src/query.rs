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

use std::sync::Arc;

use tracing::debug;

use skywatch_shared::summary::SummaryQuery;

use crate::aggregator;
use crate::db::ReadingStore;
use crate::error::QueryError;
use crate::model::{DailySummary, DayBoundary, ReadingFilter};

/// Read-side entry point: turns a caller's filter into day summaries.
#[derive(Debug, Clone)]
pub struct SummaryService {
    store: Arc<dyn ReadingStore>,
    boundary: DayBoundary,
}

impl SummaryService {
    pub fn new(store: Arc<dyn ReadingStore>, boundary: DayBoundary) -> Self {
        Self { store, boundary }
    }

    /// An empty list means "no matching readings" and is not an error.
    /// Store failures are reported as `QueryError`, never as an empty list.
    pub fn weather_summary(&self, query: &SummaryQuery) -> Result<Vec<DailySummary>, QueryError> {
        if query.is_empty_range() {
            debug!(?query, "Empty date range requested");
            return Ok(Vec::new());
        }

        let filter = ReadingFilter {
            city: query
                .city
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(ToOwned::to_owned),
            range: self.boundary.range(query.from, query.to),
        };

        Ok(aggregator::summarize(
            self.store.as_ref(),
            &self.boundary,
            &filter,
        )?)
    }
}
