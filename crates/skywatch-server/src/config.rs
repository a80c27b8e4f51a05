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

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::model::DayBoundary;

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "SKYWATCH_API_KEY";

const PLACEHOLDER_API_KEY: &str = "your_openweathermap_api_key";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub aggregation: AggregationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory of static dashboard assets served for unmatched paths.
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationSettings {
    /// IANA zone whose calendar days bucket the readings.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    "http://api.openweathermap.org".to_owned()
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_cities() -> Vec<String> {
    ["Delhi", "Mumbai", "Chennai", "Bangalore", "Kolkata", "Hyderabad"]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect()
}

fn default_db_path() -> String {
    "./data/skywatch.db".to_owned()
}

fn default_timezone() -> String {
    "UTC".to_owned()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            cities: default_cities(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&content, std::env::var(API_KEY_ENV).ok())
    }

    /// Parses TOML content, applies an optional API key override and
    /// validates the result.
    pub fn parse(content: &str, api_key_override: Option<String>) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).with_context(|| "Failed to parse config TOML")?;
        if let Some(key) = api_key_override.filter(|k| !k.trim().is_empty()) {
            config.provider.api_key = key;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let key = self.provider.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            bail!("provider.api_key must be set (or export {API_KEY_ENV})");
        }
        if self.collector.cities.is_empty() {
            bail!("collector.cities must contain at least one city");
        }
        let mut seen = HashSet::new();
        for city in &self.collector.cities {
            if city.trim().is_empty() {
                bail!("collector.cities must not contain blank names");
            }
            if !seen.insert(city.as_str()) {
                bail!("collector.cities lists {city:?} more than once");
            }
        }
        if self.collector.poll_interval_secs == 0 {
            bail!("collector.poll_interval_secs must be greater than zero");
        }
        if self.collector.fetch_timeout_secs == 0 {
            bail!("collector.fetch_timeout_secs must be greater than zero");
        }
        if self.collector.fetch_timeout_secs >= self.collector.poll_interval_secs {
            bail!("collector.fetch_timeout_secs must be shorter than poll_interval_secs");
        }
        self.day_boundary()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.collector.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.collector.fetch_timeout_secs)
    }

    pub fn day_boundary(&self) -> Result<DayBoundary> {
        let tz: Tz = self
            .aggregation
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("aggregation.timezone is not a known IANA zone: {e}"))?;
        Ok(DayBoundary::new(tz))
    }
}
