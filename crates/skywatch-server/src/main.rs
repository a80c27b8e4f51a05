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

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skywatch_server::api::{self, ApiState};
use skywatch_server::collector::Collector;
use skywatch_server::config::ServerConfig;
use skywatch_server::db::{Database, ReadingStore};
use skywatch_server::provider::{OpenWeatherMapClient, WeatherProvider};
use skywatch_server::query::SummaryService;
use skywatch_server::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("skywatch_server=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "skywatch.toml".to_owned());
    info!(path = %config_path, "Loading configuration");
    let config = Arc::new(ServerConfig::from_file(&config_path)?);
    let boundary = config.day_boundary()?;

    let store: Arc<dyn ReadingStore> = Arc::new(
        Database::open(&config.database.path)
            .with_context(|| format!("Failed to open database: {}", config.database.path))?,
    );
    info!(path = %config.database.path, "Database opened");

    let provider: Arc<dyn WeatherProvider> = Arc::new(
        OpenWeatherMapClient::new(&config.provider).context("Failed to create weather client")?,
    );
    let collector = Arc::new(Collector::new(
        provider,
        Arc::clone(&store),
        config.fetch_timeout(),
    ));
    let cities: Arc<[String]> = config.collector.cities.clone().into();

    let scheduler = Arc::new(Scheduler::new(config.poll_interval()));
    scheduler.start(move || {
        let collector = Arc::clone(&collector);
        let cities = Arc::clone(&cities);
        async move {
            collector.run_cycle(&cities).await;
        }
    })?;
    info!(
        cities = ?config.collector.cities,
        timezone = %boundary.timezone(),
        "Tracking cities"
    );

    let static_dir = config
        .server
        .static_dir
        .as_deref()
        .map(Path::new)
        .filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                warn!(path = %dir.display(), "Static directory not found, not serving assets");
            }
            exists
        });

    let state = ApiState {
        summaries: SummaryService::new(Arc::clone(&store), boundary),
        store,
        scheduler: Arc::clone(&scheduler),
        config: Arc::clone(&config),
    };
    let app = api::router(state, static_dir);

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("SkyWatch server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
