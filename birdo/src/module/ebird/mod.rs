//! eBird "recent nearby observations"
//!
//! Fetches the recent sightings around a point and reduces them to one
//! record per species.

pub mod client;
pub mod parser;
pub mod types;

pub use client::{EbirdClient, ObservationQuery, ObservationSource};
pub use parser::{dedup_by_species, parse_observations_json};
