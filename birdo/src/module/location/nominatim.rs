use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Coordinates, LocationResolver};
use crate::error::BirdoError;

const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
const REQUEST_TIMEOUT_SECONDS: u64 = 10;
const USER_AGENT: &str = "birdo/0.1 (bird bingo card generator)";

/// One entry of the Nominatim search response. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Parse a Nominatim JSON array and take the first result.
pub fn parse_nominatim_json(address: &str, json: &str) -> Result<Coordinates> {
    let places: Vec<Place> =
        serde_json::from_str(json).context("Failed to deserialize Nominatim response")?;

    let first = places.into_iter().next().ok_or_else(|| BirdoError::NoGeocodeResult {
        address: address.to_string(),
    })?;

    let latitude: f64 = first
        .lat
        .trim()
        .parse()
        .context(format!("Invalid latitude '{}'", first.lat))?;
    let longitude: f64 = first
        .lon
        .trim()
        .parse()
        .context(format!("Invalid longitude '{}'", first.lon))?;

    if let Some(name) = &first.display_name {
        tracing::debug!("Resolved '{}' to {}", address, name);
    }

    Ok(Coordinates { latitude, longitude })
}

pub struct NominatimResolver {
    client: Client,
    endpoint: String,
}

impl NominatimResolver {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(NOMINATIM_SEARCH_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl LocationResolver for NominatimResolver {
    async fn resolve(&self, address: &str) -> Result<Coordinates> {
        tracing::info!("Geocoding '{}'", address);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", address),
                ("format", "json"),
                ("accept-language", "en"),
                ("zoom", "3"),
            ])
            .send()
            .await
            .context(format!("Failed to send geocoding request for '{}'", address))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP error {} while geocoding '{}'",
                response.status(),
                address
            ));
        }

        let body = response
            .text()
            .await
            .context("Failed to read Nominatim response body")?;

        let coordinates = parse_nominatim_json(address, &body)?;
        tracing::info!(
            "'{}' is at {:.4}, {:.4}",
            address,
            coordinates.latitude,
            coordinates.longitude
        );
        Ok(coordinates)
    }
}
