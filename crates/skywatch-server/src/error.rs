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

//! Error types for the collection and aggregation paths

use std::time::Duration;

use thiserror::Error;

/// Failure to obtain one observation from the upstream provider.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-city outcome error of a collection cycle.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to store reading: {0}")]
    Store(#[from] StoreError),
}

/// Malformed persisted data found while summarizing.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("reading {id} has an unparseable timestamp {raw:?}: {reason}")]
    InvalidTimestamp { id: i64, raw: String, reason: String },

    #[error("reading {id} for {city} has a non-finite temperature")]
    NonFiniteValue { id: i64, city: String },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("summary query failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyStarted,

    #[error("scheduler has been stopped and cannot be restarted")]
    Stopped,
}
