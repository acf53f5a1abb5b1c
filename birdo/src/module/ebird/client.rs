use anyhow::{Context, Result};
use async_trait::async_trait;
use birdo_common::ObservationRecord;
use reqwest::Client;
use std::time::Duration;

use super::parser::parse_observations_json;
use crate::error::BirdoError;
use crate::module::location::Coordinates;

const EBIRD_RECENT_NEARBY_URL: &str = "https://api.ebird.org/v2/data/obs/geo/recent";
const REQUEST_TIMEOUT_SECONDS: u64 = 60;
const MAX_BACK_DAYS: u32 = 30;
const MAX_RADIUS_KM: u32 = 50;

pub const DEFAULT_RADIUS_KM: u32 = 2;
pub const DEFAULT_BACK_DAYS: u32 = 30;

/// Where and how far back to look
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationQuery {
    pub location: Coordinates,
    pub radius_km: u32,
    pub days: u32,
}

impl ObservationQuery {
    pub fn new(location: Coordinates, radius_km: u32, days: u32) -> Self {
        Self {
            location,
            radius_km,
            days,
        }
    }

    pub fn validate(&self) -> Result<(), BirdoError> {
        if !(1..=MAX_BACK_DAYS).contains(&self.days) {
            return Err(BirdoError::InvalidQuery(format!(
                "days must be between 1 and {}, got {}",
                MAX_BACK_DAYS, self.days
            )));
        }
        if self.radius_km > MAX_RADIUS_KM {
            return Err(BirdoError::InvalidQuery(format!(
                "radius must be at most {} km, got {}",
                MAX_RADIUS_KM, self.radius_km
            )));
        }
        Ok(())
    }
}

#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Recent observations, one record per species
    async fn recent_observations(&self, query: &ObservationQuery) -> Result<Vec<ObservationRecord>>;
}

/// eBird API 2.0 client; the token is fixed at construction
pub struct EbirdClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl EbirdClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, EBIRD_RECENT_NEARBY_URL)
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ObservationSource for EbirdClient {
    async fn recent_observations(&self, query: &ObservationQuery) -> Result<Vec<ObservationRecord>> {
        query.validate()?;

        tracing::info!(
            "Fetching observations within {} km of {:.2}, {:.2} over the last {} days",
            query.radius_km,
            query.location.latitude,
            query.location.longitude,
            query.days
        );

        let response = self
            .client
            .get(&self.endpoint)
            .header("X-eBirdApiToken", &self.api_key)
            .query(&[
                ("lat", format!("{:.2}", query.location.latitude)),
                ("lng", format!("{:.2}", query.location.longitude)),
                ("dist", query.radius_km.to_string()),
                ("back", query.days.to_string()),
            ])
            .send()
            .await
            .context("Failed to send eBird request")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP error {} from eBird",
                response.status()
            ));
        }

        let body = response
            .text()
            .await
            .context("Failed to read eBird response body")?;

        let records = parse_observations_json(&body)?;
        tracing::info!("eBird returned {} species", records.len());
        Ok(records)
    }
}
