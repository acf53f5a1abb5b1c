//! Per-species image acquisition and selection
//!
//! Images live in one cache directory per species. The acquirer fills those
//! directories through an [`ImageDownloader`] with a shrinking retry budget,
//! the checker verifies every species has something on disk, and the picker
//! chooses a usable image for each card cell.

pub mod acquirer;
pub mod cache;
pub mod checker;
pub mod downloader;
pub mod picker;

pub use acquirer::{AcquisitionOutcome, AcquisitionReport, ImageAcquirer};
pub use cache::SpeciesImageCache;
pub use checker::{check_availability, check_usable, AvailabilityReport};
pub use downloader::{ImageDownloader, WebImageDownloader};
pub use picker::{first_usable, ImagePicker, PickedImage};
