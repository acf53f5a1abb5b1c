use birdo_common::{ObservationRecord, SpeciesKey};
use tracing::{info, warn};

use super::cache::SpeciesImageCache;
use super::downloader::ImageDownloader;
use crate::error::BirdoError;

/// Budgets at or below this value are not retried
pub const RETRY_FLOOR: usize = 3;
/// Each retry asks for this many fewer images
pub const RETRY_STEP: usize = 2;

/// Result of acquiring images for one species
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionOutcome {
    pub species: String,
    /// Image budget of every download call, in order
    pub budgets: Vec<usize>,
    /// Images held after the successful call
    pub images: Option<usize>,
    /// Success came from files already cached before this acquisition
    pub from_cache: bool,
    pub last_error: Option<String>,
}

impl AcquisitionOutcome {
    pub fn succeeded(&self) -> bool {
        self.images.is_some()
    }

    pub fn retries(&self) -> usize {
        self.budgets.len().saturating_sub(1)
    }

    pub fn into_result(self) -> Result<usize, BirdoError> {
        match self.images {
            Some(images) => Ok(images),
            None => Err(BirdoError::DownloadExhausted {
                attempts: self.budgets.len(),
                species: self.species,
            }),
        }
    }
}

/// Batch result; a failed species never stops the others
#[derive(Debug, Clone, Default)]
pub struct AcquisitionReport {
    pub acquired: Vec<String>,
    pub not_found: Vec<String>,
    pub outcomes: Vec<AcquisitionOutcome>,
}

pub struct ImageAcquirer<D> {
    downloader: D,
    cache: SpeciesImageCache,
}

impl<D: ImageDownloader> ImageAcquirer<D> {
    pub fn new(downloader: D, cache: SpeciesImageCache) -> Self {
        Self { downloader, cache }
    }

    pub fn cache(&self) -> &SpeciesImageCache {
        &self.cache
    }

    /// Download images for one species with a shrinking budget.
    ///
    /// A failed call is retried with `budget - RETRY_STEP` while the budget
    /// is above [`RETRY_FLOOR`]; the first successful call ends the loop.
    /// Partial downloads from failed calls are left on disk.
    pub async fn acquire(&self, species: &str, max_attempts: usize) -> AcquisitionOutcome {
        let key = SpeciesKey::from_common_name(species);
        let dir = match self.cache.ensure_species_dir(&key).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!("{:#}", e);
                self.cache.species_dir(&key)
            }
        };
        let held_before = self
            .cache
            .candidates(&key)
            .await
            .map(|files| files.len())
            .unwrap_or_default();

        let mut budget = max_attempts;
        let mut budgets = Vec::new();

        loop {
            budgets.push(budget);
            info!("Trying to download {} ({} images)", key, budget);

            match self.downloader.download(&key, budget, &dir).await {
                Ok(images) => {
                    let from_cache = budgets.len() > 1 && images <= held_before;
                    if from_cache {
                        warn!(
                            "{} only has {} images left from an earlier run, none downloaded",
                            species, images
                        );
                    } else {
                        info!("{} has {} images", species, images);
                    }
                    return AcquisitionOutcome {
                        species: species.to_string(),
                        budgets,
                        images: Some(images),
                        from_cache,
                        last_error: None,
                    };
                }
                Err(e) if budget > RETRY_FLOOR => {
                    warn!("Download of {} failed with budget {}: {:#}", key, budget, e);
                    budget -= RETRY_STEP;
                }
                Err(e) => {
                    warn!(
                        "Giving up on {} after {} attempts: {:#}",
                        species,
                        budgets.len(),
                        e
                    );
                    return AcquisitionOutcome {
                        species: species.to_string(),
                        budgets,
                        images: None,
                        from_cache: false,
                        last_error: Some(format!("{:#}", e)),
                    };
                }
            }
        }
    }

    /// Acquire images for every observed species, strictly one after another.
    pub async fn acquire_all(
        &self,
        records: &[ObservationRecord],
        max_attempts: usize,
    ) -> AcquisitionReport {
        let mut report = AcquisitionReport::default();

        for record in records {
            info!("{}", record.common_name);
            let outcome = self.acquire(&record.common_name, max_attempts).await;
            match outcome.clone().into_result() {
                Ok(_) => report.acquired.push(record.common_name.clone()),
                Err(e) => {
                    warn!("{}", e);
                    report.not_found.push(record.common_name.clone());
                }
            }
            report.outcomes.push(outcome);
        }

        if !report.not_found.is_empty() {
            warn!(
                "No images found for {} species: {}",
                report.not_found.len(),
                report.not_found.join(", ")
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Fails for the listed keys, or until `succeed_at` budget is reached
    struct ScriptedDownloader {
        always_fail: Vec<String>,
        succeed_at: Option<usize>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedDownloader {
        fn new(always_fail: &[&str], succeed_at: Option<usize>) -> Self {
            Self {
                always_fail: always_fail.iter().map(|s| s.to_string()).collect(),
                succeed_at,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageDownloader for ScriptedDownloader {
        async fn download(&self, key: &SpeciesKey, count: usize, dir: &Path) -> Result<usize> {
            self.calls.lock().unwrap().push((key.to_string(), count));
            std::fs::create_dir_all(dir)?;
            if self.always_fail.iter().any(|k| k == key.as_str()) {
                anyhow::bail!("rate limited");
            }
            match self.succeed_at {
                Some(at) if count > at => anyhow::bail!("no results"),
                _ => {
                    std::fs::write(dir.join(format!("{}_1.jpg", key)), b"x")?;
                    Ok(1)
                }
            }
        }
    }

    /// Never reaches the network: succeeds only when the directory already holds `count` files
    struct OfflineDownloader;

    #[async_trait]
    impl ImageDownloader for OfflineDownloader {
        async fn download(&self, key: &SpeciesKey, count: usize, dir: &Path) -> Result<usize> {
            let held = std::fs::read_dir(dir)?.count();
            if held >= count {
                Ok(held)
            } else {
                anyhow::bail!("offline, {} has {} of {} images", key, held, count)
            }
        }
    }

    fn record(name: &str) -> ObservationRecord {
        ObservationRecord {
            common_name: name.to_string(),
            species_code: name.to_lowercase().replace(' ', ""),
            location_id: "L1".to_string(),
            observation_date: NaiveDateTime::default(),
        }
    }

    #[tokio::test]
    async fn test_budget_sequence_from_ten() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = ImageAcquirer::new(
            ScriptedDownloader::new(&["Common+Loon"], None),
            SpeciesImageCache::new(temp_dir.path()),
        );

        let outcome = acquirer.acquire("Common Loon", 10).await;
        assert!(!outcome.succeeded());
        assert_eq!(outcome.budgets, vec![10, 8, 6, 4, 2]);
        assert_eq!(outcome.retries(), 4);
        assert!(matches!(
            outcome.into_result(),
            Err(BirdoError::DownloadExhausted { attempts: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_budget_sequence_from_five() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = ImageAcquirer::new(
            ScriptedDownloader::new(&["Sora"], None),
            SpeciesImageCache::new(temp_dir.path()),
        );

        let outcome = acquirer.acquire("Sora", 5).await;
        assert_eq!(outcome.budgets, vec![5, 3]);
        assert_eq!(outcome.retries(), 1);
    }

    #[tokio::test]
    async fn test_budget_at_floor_is_not_retried() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = ImageAcquirer::new(
            ScriptedDownloader::new(&["Sora"], None),
            SpeciesImageCache::new(temp_dir.path()),
        );

        assert_eq!(acquirer.acquire("Sora", 3).await.budgets, vec![3]);
        assert_eq!(acquirer.acquire("Sora", 4).await.budgets, vec![4, 2]);
    }

    #[tokio::test]
    async fn test_retry_stops_on_first_success() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = ImageAcquirer::new(
            ScriptedDownloader::new(&[], Some(6)),
            SpeciesImageCache::new(temp_dir.path()),
        );

        let outcome = acquirer.acquire("Blue Jay", 10).await;
        assert!(outcome.succeeded());
        assert_eq!(outcome.budgets, vec![10, 8, 6]);
        assert!(!outcome.from_cache);
        assert_eq!(outcome.into_result().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_species_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = ImageAcquirer::new(
            ScriptedDownloader::new(&["Common+Loon"], None),
            SpeciesImageCache::new(temp_dir.path()),
        );

        let records = vec![record("Blue Jay"), record("Common Loon"), record("Sora")];
        let report = acquirer.acquire_all(&records, 10).await;

        assert_eq!(report.not_found, vec!["Common Loon".to_string()]);
        assert_eq!(report.acquired, vec!["Blue Jay".to_string(), "Sora".to_string()]);

        {
            let calls = acquirer.downloader.calls.lock().unwrap();
            let sora_calls = calls.iter().filter(|(k, _)| k == "Sora").count();
            assert_eq!(sora_calls, 1);
        }

        let cache = acquirer.cache();
        assert!(cache.has_images(&SpeciesKey::from_common_name("Sora")).await.unwrap());
        assert!(!cache.has_images(&SpeciesKey::from_common_name("Common Loon")).await.unwrap());
    }

    #[tokio::test]
    async fn test_success_from_leftover_files_is_flagged() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SpeciesImageCache::new(temp_dir.path());
        let dir = cache.species_dir(&SpeciesKey::from_common_name("Sora"));
        std::fs::create_dir_all(&dir).unwrap();
        for n in 1..=3 {
            std::fs::write(dir.join(format!("Sora_{}.jpg", n)), b"x").unwrap();
        }

        let acquirer = ImageAcquirer::new(OfflineDownloader, cache);
        let outcome = acquirer.acquire("Sora", 10).await;
        assert_eq!(outcome.budgets, vec![10, 8, 6, 4, 2]);
        assert_eq!(outcome.images, Some(3));
        assert!(outcome.from_cache);

        // A full cache on the first call is a plain hit
        let outcome = acquirer.acquire("Sora", 3).await;
        assert_eq!(outcome.budgets, vec![3]);
        assert!(!outcome.from_cache);
    }

    #[tokio::test]
    async fn test_acquire_creates_species_dir() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = ImageAcquirer::new(OfflineDownloader, SpeciesImageCache::new(temp_dir.path()));

        let outcome = acquirer.acquire("Common Loon", 2).await;
        assert!(!outcome.succeeded());
        assert!(temp_dir.path().join("Common+Loon").is_dir());
    }
}
