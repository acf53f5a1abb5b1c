use birdo_common::MIN_IMAGE_DIMENSION;
use image::{DynamicImage, GenericImageView};
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::BirdoError;

/// An accepted candidate and the files turned down on the way
#[derive(Debug, Clone)]
pub struct PickedImage {
    pub path: PathBuf,
    pub image: DynamicImage,
    /// Rejected candidates, in draw order
    pub rejected: Vec<PathBuf>,
}

/// Random image selection by rejection sampling.
///
/// Each draw is uniform over the candidates not yet rejected. A candidate is
/// rejected when it cannot be decoded or either dimension is not larger than
/// the minimum; rejected files stay on disk.
pub struct ImagePicker<R> {
    rng: R,
}

fn is_acceptable(image: &DynamicImage) -> bool {
    let (width, height) = image.dimensions();
    width > MIN_IMAGE_DIMENSION && height > MIN_IMAGE_DIMENSION
}

/// First candidate, in listing order, that the picker would accept
pub fn first_usable(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| image::open(path).is_ok_and(|image| is_acceptable(&image)))
}

impl<R: Rng> ImagePicker<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn pick(&mut self, species: &str, candidates: &[PathBuf]) -> Result<PickedImage, BirdoError> {
        if candidates.is_empty() {
            return Err(BirdoError::EmptyCandidateSet {
                species: species.to_string(),
            });
        }

        let mut remaining: Vec<&Path> = candidates.iter().map(PathBuf::as_path).collect();
        let mut rejected = Vec::new();

        while !remaining.is_empty() {
            let path = remaining.swap_remove(self.rng.gen_range(0..remaining.len()));

            match image::open(path) {
                Ok(image) if is_acceptable(&image) => {
                    return Ok(PickedImage {
                        path: path.to_path_buf(),
                        image,
                        rejected,
                    });
                }
                Ok(image) => {
                    let (width, height) = image.dimensions();
                    debug!("Rejecting {:?}: {}x{} is too small", path, width, height);
                }
                Err(e) => {
                    warn!("Rejecting unreadable image {:?}: {}", path, e);
                }
            }
            rejected.push(path.to_path_buf());
        }

        Err(BirdoError::NoSuitableImage {
            species: species.to_string(),
        })
    }
}
