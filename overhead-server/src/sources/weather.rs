//! open-meteo current temperature client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use overhead_core::LatLon;

use super::WeatherSource;

pub struct OpenMeteo {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Forecast {
    current: Option<Current>,
}

#[derive(Deserialize)]
struct Current {
    temperature_2m: Option<f64>,
}

impl OpenMeteo {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        OpenMeteo {
            base_url: base_url.to_string(),
            client,
        }
    }
}

/// Pull `current.temperature_2m` out of a forecast response.
pub fn parse_temperature(body: &str) -> Option<f64> {
    let forecast: Forecast = serde_json::from_str(body).ok()?;
    forecast.current?.temperature_2m
}

#[async_trait]
impl WeatherSource for OpenMeteo {
    async fn temperature_c(&self, at: LatLon) -> Option<f64> {
        let lat = at.lat.to_string();
        let lon = at.lon.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                ("current", "temperature_2m"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => parse_temperature(&r.text().await.ok()?),
            Err(e) => {
                warn!(error = %e, "weather request failed");
                None
            }
        }
    }
}
