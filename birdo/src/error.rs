//! Domain errors that callers need to tell apart
//!
//! Everything else travels as `anyhow::Error` with context attached; these
//! variants can be recovered with `err.downcast_ref::<BirdoError>()`.

#[derive(Debug, thiserror::Error)]
pub enum BirdoError {
    #[error("no suitable image for species {species}")]
    NoSuitableImage { species: String },

    #[error("no candidate images for species {species}")]
    EmptyCandidateSet { species: String },

    #[error("need at least {needed} species for a card, only {available} observed")]
    NotEnoughSpecies { needed: usize, available: usize },

    #[error("species without images: {}", .0.join(", "))]
    MissingImages(Vec<String>),

    #[error("species without a usable image: {}", .0.join(", "))]
    NoUsableImages(Vec<String>),

    #[error("image download for {species} failed after {attempts} attempts")]
    DownloadExhausted { species: String, attempts: usize },

    #[error("no geocoding result for address '{address}'")]
    NoGeocodeResult { address: String },

    #[error("invalid observation query: {0}")]
    InvalidQuery(String),

    #[error("eBird API key missing: set EBIRDKEY or ebird_api_key in the config file")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_images_lists_species() {
        let err = BirdoError::MissingImages(vec!["Common Loon".into(), "Sora".into()]);
        assert_eq!(err.to_string(), "species without images: Common Loon, Sora");
    }

    #[test]
    fn test_no_usable_images_lists_species() {
        let err = BirdoError::NoUsableImages(vec!["Sora".into(), "Mallard".into()]);
        assert_eq!(err.to_string(), "species without a usable image: Sora, Mallard");
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = BirdoError::NoSuitableImage {
            species: "Sora".into(),
        }
        .into();
        let err = err.context("Failed to compose card");
        assert!(matches!(
            err.downcast_ref::<BirdoError>(),
            Some(BirdoError::NoSuitableImage { species }) if species == "Sora"
        ));
    }
}
