//! End-to-end run: address → observations → images → cards

use anyhow::{Context, Result};
use birdo_common::CARD_CELLS;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::BirdoError;
use crate::module::bingo::{generate_selections, CardComposer};
use crate::module::ebird::{ObservationQuery, ObservationSource};
use crate::module::images::{
    check_availability, check_usable, ImageAcquirer, ImageDownloader, ImagePicker,
};
use crate::module::location::LocationResolver;

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub address: String,
    pub radius_km: u32,
    pub days: u32,
    pub number_bingos: usize,
    pub max_images: usize,
    /// Skip acquisition and rely on the existing cache
    pub download: bool,
    pub seed: Option<u64>,
}

impl RunOptions {
    /// Card label: `<address>_<radius>km_<days>days_number<i>`
    pub fn card_label(&self, index: usize) -> String {
        format!(
            "{}_{}km_{}days_number{}",
            self.address, self.radius_km, self.days, index
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub observations: usize,
    pub not_found: Vec<String>,
    pub cards: Vec<PathBuf>,
}

pub struct BirdoPipeline<L, S, D> {
    resolver: L,
    source: S,
    acquirer: ImageAcquirer<D>,
    composer: CardComposer,
}

impl<L, S, D> BirdoPipeline<L, S, D>
where
    L: LocationResolver,
    S: ObservationSource,
    D: ImageDownloader,
{
    pub fn new(resolver: L, source: S, acquirer: ImageAcquirer<D>, composer: CardComposer) -> Self {
        Self {
            resolver,
            source,
            acquirer,
            composer,
        }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        let location = self
            .resolver
            .resolve(&options.address)
            .await
            .context(format!("Failed to geocode '{}'", options.address))?;

        let query = ObservationQuery::new(location, options.radius_km, options.days);
        let observations = self
            .source
            .recent_observations(&query)
            .await
            .context("Failed to fetch observations")?;

        let mut summary = RunSummary {
            observations: observations.len(),
            ..RunSummary::default()
        };

        if observations.len() < CARD_CELLS {
            return Err(BirdoError::NotEnoughSpecies {
                needed: CARD_CELLS,
                available: observations.len(),
            }
            .into());
        }

        if options.download {
            let report = self
                .acquirer
                .acquire_all(&observations, options.max_images)
                .await;
            summary.not_found = report.not_found;
        } else {
            info!("Skipping image download, using cached images");
        }

        let availability = check_availability(self.acquirer.cache(), &observations).await?;
        if let Err(e) = availability.into_result() {
            warn!("Some birds do not have images downloaded!");
            return Err(e.into());
        }

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let selections = generate_selections(options.number_bingos, observations.len(), &mut rng)?;

        // Every selected species needs an acceptable image before any card is written
        let selected: BTreeSet<usize> = selections
            .iter()
            .flat_map(|selection| selection.species_cells().map(|(_, index)| index))
            .collect();
        let usable = check_usable(
            self.acquirer.cache(),
            selected.iter().filter_map(|&index| observations.get(index)),
        )
        .await?;
        if !usable.all_available() {
            warn!("Some birds only have unusable images!");
            return Err(BirdoError::NoUsableImages(usable.missing).into());
        }

        let mut picker = ImagePicker::new(rng);

        for (index, selection) in selections.iter().enumerate() {
            let label = options.card_label(index);
            let path = self
                .composer
                .compose_card(selection, &observations, &label, &mut picker)
                .await
                .context(format!("Failed to compose card {}", index))?;
            info!("Card {}/{} written to {:?}", index + 1, selections.len(), path);
            summary.cards.push(path);
        }

        Ok(summary)
    }
}
