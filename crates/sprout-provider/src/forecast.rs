//! OpenWeather-style 5-day/3-hour forecast client, reduced to the next-24h
//! window the irrigation decision cares about.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::ForecastService;
use sprout_schema::WeatherForecast;

const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org";

/// 8 three-hour samples = 24 hours.
const WINDOW_SAMPLES: usize = 8;

#[derive(Debug, Clone)]
pub struct OpenWeatherForecast {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl OpenWeatherForecast {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(api_key, OPENWEATHER_API_BASE)
    }

    pub fn with_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ForecastService for OpenWeatherForecast {
    async fn forecast_24h(&self, latitude: &str, longitude: &str) -> Result<WeatherForecast> {
        let url = format!("{}/data/2.5/forecast", self.api_base);

        let resp = match self
            .client
            .get(&url)
            .query(&[
                ("lat", latitude),
                ("lon", longitude),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow!(
                    "openweather api error (timeout) [retryable]: request timed out"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow!("openweather api error (connect) [retryable]: {e}"));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await?;
            return Err(format_api_error(status, &text));
        }

        let body: ApiForecastResponse = resp.json().await?;
        reduce_window(&body.list)
    }
}

/// Reduce the first eight samples to max temperature plus the rain flag and
/// the max 3h rain amount over samples that actually carry rain.
pub(crate) fn reduce_window(samples: &[ApiSample]) -> Result<WeatherForecast> {
    let window = &samples[..samples.len().min(WINDOW_SAMPLES)];
    if window.is_empty() {
        return Err(anyhow!("openweather api error: empty forecast list"));
    }

    let max_temp = window
        .iter()
        .map(|s| s.main.temp)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut rain_expected = false;
    let mut max_rain = 0.0_f64;
    for sample in window {
        if let Some(rain) = &sample.rain {
            let amount = rain.three_h.unwrap_or(0.0);
            if amount > 0.0 {
                rain_expected = true;
                max_rain = max_rain.max(amount);
            }
        }
    }

    Ok(WeatherForecast {
        will_rain_next_24h: rain_expected,
        rain_mm_next_24h: if rain_expected { max_rain } else { 0.0 },
        max_temp_next_24h_c: max_temp,
    })
}

fn format_api_error(status: StatusCode, text: &str) -> anyhow::Error {
    let retryable = match status.as_u16() {
        429 | 500..=599 => " [retryable]",
        _ => "",
    };
    anyhow!("openweather api error ({status}){retryable}: {text}")
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiForecastResponse {
    #[serde(default)]
    pub list: Vec<ApiSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiSample {
    pub main: ApiMain,
    #[serde(default)]
    pub rain: Option<ApiRain>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMain {
    pub temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRain {
    #[serde(rename = "3h", default)]
    pub three_h: Option<f64>,
}
