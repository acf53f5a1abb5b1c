use anyhow::{Context, Result};
use birdo_common::{
    BingoSelection, ObservationRecord, CARD_CELLS, FREE_SPACE_CAPTION, FREE_SPACE_INDEX,
};
use image::DynamicImage;
use rand::Rng;
use std::path::{Path, PathBuf};

use super::renderer::CardRenderer;
use crate::module::images::{ImagePicker, SpeciesImageCache};

/// One grid cell: what is shown and what it is called
#[derive(Debug, Clone)]
pub struct CardCell {
    pub caption: String,
    pub image: DynamicImage,
    /// File the image came from; `None` for the free space
    pub source: Option<PathBuf>,
}

/// A laid-out card, 25 cells in row-major order
#[derive(Debug, Clone)]
pub struct BingoCard {
    pub label: String,
    pub cells: Vec<CardCell>,
}

pub struct CardComposer {
    cache: SpeciesImageCache,
    free_space: DynamicImage,
    renderer: CardRenderer,
}

impl CardComposer {
    pub fn new(cache: SpeciesImageCache, free_space: DynamicImage, renderer: CardRenderer) -> Self {
        Self {
            cache,
            free_space,
            renderer,
        }
    }

    /// Load the free-space picture from disk; any failure is fatal for the run.
    pub fn with_free_space_file(
        cache: SpeciesImageCache,
        free_space_path: &Path,
        renderer: CardRenderer,
    ) -> Result<Self> {
        let free_space = image::open(free_space_path)
            .context(format!("Failed to load free space image {:?}", free_space_path))?;
        Ok(Self::new(cache, free_space, renderer))
    }

    /// Pick an image for every species cell of `selection`.
    ///
    /// The candidate listing is read fresh for each cell; rejections only
    /// apply to that one pick.
    pub async fn build_card<R: Rng>(
        &self,
        selection: &BingoSelection,
        observations: &[ObservationRecord],
        label: &str,
        picker: &mut ImagePicker<R>,
    ) -> Result<BingoCard> {
        let mut cells = Vec::with_capacity(CARD_CELLS);

        for (_, index) in selection.species_cells() {
            let record = observations.get(index).with_context(|| {
                format!(
                    "Selection index {} outside {} observations",
                    index,
                    observations.len()
                )
            })?;

            let candidates = self.cache.candidates(&record.species_key()).await?;
            let picked = picker
                .pick(&record.common_name, &candidates)
                .context(format!("Failed to pick an image for {}", record.common_name))?;

            if !picked.rejected.is_empty() {
                tracing::debug!(
                    "{}: rejected {} candidates before {:?}",
                    record.common_name,
                    picked.rejected.len(),
                    picked.path
                );
            }

            cells.push(CardCell {
                caption: record.common_name.clone(),
                image: picked.image,
                source: Some(picked.path),
            });
        }

        cells.insert(
            FREE_SPACE_INDEX,
            CardCell {
                caption: FREE_SPACE_CAPTION.to_string(),
                image: self.free_space.clone(),
                source: None,
            },
        );

        Ok(BingoCard {
            label: label.to_string(),
            cells,
        })
    }

    /// Build and render one card, returning the written file.
    pub async fn compose_card<R: Rng>(
        &self,
        selection: &BingoSelection,
        observations: &[ObservationRecord],
        label: &str,
        picker: &mut ImagePicker<R>,
    ) -> Result<PathBuf> {
        let card = self.build_card(selection, observations, label, picker).await?;
        self.renderer.render(&card).await
    }
}
