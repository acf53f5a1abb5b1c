use anyhow::Result;
use birdo_common::ObservationRecord;
use tracing::warn;

use super::cache::SpeciesImageCache;
use super::picker::first_usable;
use crate::error::BirdoError;

/// Which species have nothing at all in their cache directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityReport {
    pub checked: usize,
    pub missing: Vec<String>,
}

impl AvailabilityReport {
    pub fn all_available(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn into_result(self) -> Result<(), BirdoError> {
        if self.all_available() {
            Ok(())
        } else {
            Err(BirdoError::MissingImages(self.missing))
        }
    }
}

/// Check that every species has at least one cached file.
///
/// Only existence is checked, not whether any file is a usable image.
pub async fn check_availability(
    cache: &SpeciesImageCache,
    records: &[ObservationRecord],
) -> Result<AvailabilityReport> {
    let mut report = AvailabilityReport::default();

    for record in records {
        report.checked += 1;
        if !cache.has_images(&record.species_key()).await? {
            warn!("{} needs images", record.common_name);
            report.missing.push(record.common_name.clone());
        }
    }

    Ok(report)
}

/// Check that every given species has at least one image the picker accepts.
///
/// Files are decoded in listing order and the scan stops at the first
/// acceptable one, so this is cheap once the cache holds good images.
pub async fn check_usable<'a, I>(
    cache: &SpeciesImageCache,
    records: I,
) -> Result<AvailabilityReport>
where
    I: IntoIterator<Item = &'a ObservationRecord>,
{
    let mut report = AvailabilityReport::default();

    for record in records {
        report.checked += 1;
        let candidates = cache.candidates(&record.species_key()).await?;
        if first_usable(&candidates).is_none() {
            warn!("{} has no usable image", record.common_name);
            report.missing.push(record.common_name.clone());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use image::RgbImage;
    use tempfile::TempDir;

    fn record(name: &str) -> ObservationRecord {
        ObservationRecord {
            common_name: name.to_string(),
            species_code: name.to_lowercase(),
            location_id: "L1".to_string(),
            observation_date: NaiveDateTime::default(),
        }
    }

    #[tokio::test]
    async fn test_reports_every_missing_species() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SpeciesImageCache::new(temp_dir.path());

        let jay = cache.species_dir(&record("Blue Jay").species_key());
        std::fs::create_dir_all(&jay).unwrap();
        // Existence is enough, validity is the picker's job
        std::fs::write(jay.join("junk.txt"), b"x").unwrap();
        // Empty directory
        std::fs::create_dir_all(cache.species_dir(&record("Common Loon").species_key())).unwrap();

        let records = vec![record("Blue Jay"), record("Common Loon"), record("Sora")];
        let report = check_availability(&cache, &records).await.unwrap();

        assert_eq!(report.checked, 3);
        assert!(!report.all_available());
        assert_eq!(
            report.missing,
            vec!["Common Loon".to_string(), "Sora".to_string()]
        );
        assert!(matches!(
            report.into_result(),
            Err(BirdoError::MissingImages(missing)) if missing.len() == 2
        ));
    }

    #[tokio::test]
    async fn test_all_available() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SpeciesImageCache::new(temp_dir.path());
        let records = vec![record("Blue Jay"), record("Sora")];

        for r in &records {
            let dir = cache.species_dir(&r.species_key());
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("1.jpg"), b"x").unwrap();
        }

        let report = check_availability(&cache, &records).await.unwrap();
        assert!(report.all_available());
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_usable_check_ignores_thumbnails() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SpeciesImageCache::new(temp_dir.path());
        let records = vec![record("Blue Jay"), record("Sora"), record("Mallard")];

        for (r, side) in records.iter().zip([160, 60, 0]) {
            let dir = cache.species_dir(&r.species_key());
            std::fs::create_dir_all(&dir).unwrap();
            if side > 0 {
                RgbImage::from_pixel(side, side, image::Rgb([10, 20, 30]))
                    .save(dir.join("1.png"))
                    .unwrap();
            }
        }

        let report = check_usable(&cache, &records).await.unwrap();
        assert_eq!(report.checked, 3);
        assert_eq!(report.missing, vec!["Sora".to_string(), "Mallard".to_string()]);
    }
}
