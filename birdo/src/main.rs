use birdo::config::{BirdoConfig, DEFAULT_CONFIG_PATH};
use birdo::module::bingo::{CardComposer, CardRenderer};
use birdo::module::ebird::EbirdClient;
use birdo::module::images::{ImageAcquirer, SpeciesImageCache, WebImageDownloader};
use birdo::module::location::NominatimResolver;
use birdo::module::pipeline::{BirdoPipeline, RunOptions};
use birdo::BirdoError;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "birdo",
    about = "Generate bird bingo cards from recent eBird sightings near an address",
    version
)]
struct Cli {
    /// Address or place name to search around
    address: String,

    /// Search radius around the address in km
    #[arg(long = "radius-km", default_value_t = 2, value_parser = clap::value_parser!(u32).range(0..=50))]
    radius_km: u32,

    /// Number of preceding days to search
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=30))]
    days: u32,

    /// Number of cards to generate
    #[arg(short = 'n', long = "number-bingos", default_value_t = 20)]
    number_bingos: usize,

    /// Images to request per species
    #[arg(long = "max-images", default_value_t = 10)]
    max_images: usize,

    /// Use the existing image cache without downloading
    #[arg(long = "skip-download")]
    skip_download: bool,

    /// Seed for card selection and image picking
    #[arg(long)]
    seed: Option<u64>,

    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let (config, found) = BirdoConfig::load_or_default(&cli.config)?;

    // Initialize logging
    let _logging_guard = birdo::logging::init_logging(&config.log_dir, "birdo", &config.log_level)?;

    if !found {
        tracing::warn!("Config file {:?} not found, using defaults", cli.config);
    }
    tracing::info!("Birdo starting for '{}'", cli.address);

    let api_key = config.api_key()?;

    let cache = SpeciesImageCache::new(&config.cache_dir);
    let renderer = CardRenderer::new(&config.output_dir, config.fonts_dir.as_deref());
    let composer =
        CardComposer::with_free_space_file(cache.clone(), &config.free_space_image, renderer)?;
    let acquirer = ImageAcquirer::new(WebImageDownloader::new(&config.image_search)?, cache);

    let pipeline = BirdoPipeline::new(
        NominatimResolver::new()?,
        EbirdClient::new(api_key)?,
        acquirer,
        composer,
    );

    let options = RunOptions {
        address: cli.address,
        radius_km: cli.radius_km,
        days: cli.days,
        number_bingos: cli.number_bingos,
        max_images: cli.max_images,
        download: !cli.skip_download,
        seed: cli.seed,
    };

    match pipeline.run(&options).await {
        Ok(summary) => {
            if !summary.not_found.is_empty() {
                tracing::warn!("Images not found for: {}", summary.not_found.join(", "));
            }
            tracing::info!(
                "Generated {} cards from {} species",
                summary.cards.len(),
                summary.observations
            );
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<BirdoError>() {
                Some(BirdoError::MissingImages(species)) => {
                    for name in species {
                        tracing::error!("{} needs images", name);
                    }
                }
                Some(BirdoError::NoUsableImages(species)) => {
                    for name in species {
                        tracing::error!("{} needs a larger image", name);
                    }
                }
                _ => {}
            }
            tracing::error!("Run failed: {:#}", e);
            Err(e)
        }
    }
}
