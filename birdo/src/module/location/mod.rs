//! Address → coordinates
//!
//! Free-text addresses are resolved with the OpenStreetMap Nominatim search
//! endpoint; the first hit wins.

pub mod nominatim;

pub use nominatim::{parse_nominatim_json, NominatimResolver};

use anyhow::Result;
use async_trait::async_trait;

/// Latitude/longitude in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates>;
}
