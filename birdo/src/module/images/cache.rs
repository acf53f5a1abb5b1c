use anyhow::{Context, Result};
use birdo_common::SpeciesKey;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Root directory holding one sub-directory of candidate images per species.
///
/// Directories are created lazily and never removed; the cache carries over
/// between runs.
#[derive(Debug, Clone)]
pub struct SpeciesImageCache {
    root: PathBuf,
}

impl SpeciesImageCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn species_dir(&self, key: &SpeciesKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    pub async fn ensure_species_dir(&self, key: &SpeciesKey) -> Result<PathBuf> {
        let dir = self.species_dir(key);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .context(format!("Failed to create species directory: {:?}", dir))?;
            info!("Created species directory: {:?}", dir);
        }
        Ok(dir)
    }

    /// Regular files currently in the species directory, sorted by name.
    ///
    /// A missing directory has no candidates.
    pub async fn candidates(&self, key: &SpeciesKey) -> Result<Vec<PathBuf>> {
        let dir = self.species_dir(key);
        if !dir.is_dir() {
            debug!("Species directory does not exist: {:?}", dir);
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&dir)
            .await
            .context(format!("Failed to list species directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }

    pub async fn has_images(&self, key: &SpeciesKey) -> Result<bool> {
        Ok(!self.candidates(key).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_dir_has_no_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SpeciesImageCache::new(temp_dir.path());
        let key = SpeciesKey::from_common_name("Common Loon");

        assert!(cache.candidates(&key).await.unwrap().is_empty());
        assert!(!cache.has_images(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_candidates_lists_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SpeciesImageCache::new(temp_dir.path());
        let key = SpeciesKey::from_common_name("Common Loon");

        let dir = cache.ensure_species_dir(&key).await.unwrap();
        assert_eq!(dir, temp_dir.path().join("Common+Loon"));

        std::fs::write(dir.join("b.jpg"), b"x").unwrap();
        std::fs::write(dir.join("a.png"), b"x").unwrap();
        std::fs::create_dir(dir.join("nested")).unwrap();

        let candidates = cache.candidates(&key).await.unwrap();
        assert_eq!(candidates, vec![dir.join("a.png"), dir.join("b.jpg")]);
        assert!(cache.has_images(&key).await.unwrap());
    }
}
