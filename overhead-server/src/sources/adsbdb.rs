//! adsbdb airframe registry client (`GET /v0/aircraft/{hex}`).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use overhead_core::{AircraftInfo, OverheadError, Result};

use super::AircraftRegistry;

pub struct AdsbdbRegistry {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope {
    response: serde_json::Value,
}

#[derive(Deserialize)]
struct RawAircraft {
    #[serde(rename = "type")]
    type_name: Option<String>,
    icao_type: Option<String>,
    manufacturer: Option<String>,
    registration: Option<String>,
    registered_owner: Option<String>,
    registered_owner_country_name: Option<String>,
}

impl AdsbdbRegistry {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        AdsbdbRegistry {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

/// Extract the airframe record from an adsbdb response body.
///
/// Unknown aircraft come back as `{"response": "unknown aircraft"}`.
pub fn parse_aircraft(body: &str) -> Option<AircraftInfo> {
    let envelope: Envelope = serde_json::from_str(body).ok()?;
    let raw: RawAircraft = serde_json::from_value(envelope.response.get("aircraft")?.clone()).ok()?;
    Some(AircraftInfo {
        type_name: raw.type_name,
        icao_type: raw.icao_type,
        manufacturer: raw.manufacturer,
        registration: raw.registration,
        operator: raw.registered_owner,
        country: raw.registered_owner_country_name,
    })
}

#[async_trait]
impl AircraftRegistry for AdsbdbRegistry {
    async fn lookup(&self, hex: &str) -> Result<Option<AircraftInfo>> {
        let url = format!("{}/{}", self.base_url, hex.to_ascii_lowercase());
        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(hex, error = %e, "registry request failed");
            OverheadError::Lookup(format!("registry {hex}: {e}"))
        })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                debug!(hex, "registry: unknown aircraft");
                return Ok(None);
            }
            status => {
                warn!(hex, %status, "registry error");
                return Err(OverheadError::Lookup(format!("registry {hex}: HTTP {status}")));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| OverheadError::Lookup(format!("registry {hex}: {e}")))?;
        let info = parse_aircraft(&body);
        if info.is_none() {
            debug!(hex, "registry: no aircraft record in response");
        }
        Ok(info)
    }
}
