pub mod types;

pub use types::{
    BingoSelection, ObservationRecord, SelectionError, SpeciesKey, CARD_CELLS, FREE_SPACE_CAPTION,
    FREE_SPACE_INDEX, GRID_SIDE, KEY_DELIMITER, MIN_IMAGE_DIMENSION,
};
