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

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::services::ServeDir;
use tracing::{debug, error};

use skywatch_shared::status::StatusResponse;
use skywatch_shared::summary::{SummaryQuery, WeatherSummary};

use crate::config::ServerConfig;
use crate::db::ReadingStore;
use crate::query::SummaryService;
use crate::scheduler::Scheduler;

#[derive(Debug, Clone)]
pub struct ApiState {
    pub summaries: SummaryService,
    pub store: Arc<dyn ReadingStore>,
    pub scheduler: Arc<Scheduler>,
    pub config: Arc<ServerConfig>,
}

pub fn router(state: ApiState, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/weather_summary", get(weather_summary_handler))
        .route("/api/status", get(status_handler))
        .with_state(state);

    match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn weather_summary_handler(
    State(state): State<ApiState>,
    Query(query): Query<SummaryQuery>,
) -> Response {
    match state.summaries.weather_summary(&query) {
        Ok(summaries) => {
            debug!(count = summaries.len(), ?query, "Serving weather summary");
            let body: Vec<WeatherSummary> = summaries.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Error fetching weather summary");
            internal_error("Failed to fetch weather summary")
        }
    }
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn status_handler(State(state): State<ApiState>) -> Response {
    let reading_count = match state.store.reading_count(None) {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "Error counting readings");
            return internal_error("Failed to read status");
        }
    };

    let stats = state.scheduler.stats();
    Json(StatusResponse {
        poll_interval_secs: state.scheduler.interval().as_secs(),
        cities: state.config.collector.cities.clone(),
        scheduler_state: stats.state,
        cycles_fired: stats.fired,
        cycles_skipped: stats.skipped,
        reading_count,
    })
    .into_response()
}
