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

//! Upstream current-weather providers

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ProviderSettings;
use crate::error::FetchError;
use crate::model::Observation;

const KELVIN_OFFSET: f64 = 273.15;
const USER_AGENT: &str = concat!("skywatch-server/", env!("CARGO_PKG_VERSION"));
/// Upstream error bodies are kept in `FetchError::Status` and logged every
/// cycle, so only this many bytes are retained.
const MAX_ERROR_BODY_BYTES: usize = 512;

#[async_trait]
pub trait WeatherProvider: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, city: &str) -> Result<Observation, FetchError>;
}

/// OpenWeatherMap `data/2.5/weather` client.
///
/// The API reports Kelvin by default; readings are stored in Celsius.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainBlock,
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: String,
}

impl OpenWeatherMapClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            api_key: settings.api_key.clone(),
        })
    }

    fn parse(body: &str) -> Result<Observation, FetchError> {
        let payload: CurrentWeather =
            serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        let condition = payload
            .weather
            .into_iter()
            .next()
            .map(|c| c.main)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| FetchError::Malformed("missing weather condition".to_owned()))?;

        Ok(Observation {
            temperature_c: payload.main.temp - KELVIN_OFFSET,
            feels_like_c: payload.main.feels_like - KELVIN_OFFSET,
            condition,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    async fn fetch(&self, city: &str) -> Result<Observation, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        // without_url() keeps the api key out of error messages
        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        Self::parse(&body)
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_BYTES {
        let cut = (0..=MAX_ERROR_BODY_BYTES)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        body.truncate(cut);
    }
    body
}
