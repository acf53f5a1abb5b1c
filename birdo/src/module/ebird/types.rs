use serde::Deserialize;

/// Raw observation as returned by `data/obs/geo/recent`; other fields are ignored
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservation {
    pub species_code: String,
    pub com_name: String,
    pub loc_id: String,
    /// "2024-05-01 08:15", or just the date when no time was recorded
    pub obs_dt: String,
}
