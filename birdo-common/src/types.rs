use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Cells per row and per column of a card
pub const GRID_SIDE: usize = 5;
/// Total cells on a card
pub const CARD_CELLS: usize = GRID_SIDE * GRID_SIDE;
/// Centre cell (row 3, col 3), always the free space
pub const FREE_SPACE_INDEX: usize = 12;
pub const FREE_SPACE_CAPTION: &str = "Frog Space";
/// Both pixel dimensions of an accepted image must exceed this
pub const MIN_IMAGE_DIMENSION: u32 = 100;
/// Replaces spaces in a common name to form a cache/search key
pub const KEY_DELIMITER: char = '+';

/// One species sighting summary, most recent observation per species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Display name, e.g. "Northern Cardinal"
    pub common_name: String,
    /// eBird species code, e.g. "norcar"
    pub species_code: String,
    /// eBird location id, e.g. "L123456"
    pub location_id: String,
    pub observation_date: NaiveDateTime,
}

impl ObservationRecord {
    pub fn species_key(&self) -> SpeciesKey {
        SpeciesKey::from_common_name(&self.common_name)
    }
}

/// Directory-safe key derived from a species common name.
///
/// Spaces become [`KEY_DELIMITER`]; path separators become `_` so the key is
/// always a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesKey(String);

impl SpeciesKey {
    pub fn from_common_name(name: &str) -> Self {
        let key = name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' => KEY_DELIMITER,
                '/' | '\\' => '_',
                other => other,
            })
            .collect();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Restore the human readable caption (delimiter back to space)
    pub fn display_name(&self) -> String {
        self.0.replace(KEY_DELIMITER, " ")
    }
}

impl std::fmt::Display for SpeciesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SpeciesKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("a selection needs exactly {expected} indices, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("index {index} is out of range for {population} observations")]
    OutOfRange { index: usize, population: usize },

    #[error("index {0} appears more than once")]
    Duplicate(usize),
}

/// 25 distinct indices into the observation list, in card order.
///
/// Position [`FREE_SPACE_INDEX`] is carried like every other position but is
/// never used to look up a species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BingoSelection {
    indices: Vec<usize>,
}

impl BingoSelection {
    pub fn new(indices: Vec<usize>, population: usize) -> Result<Self, SelectionError> {
        if indices.len() != CARD_CELLS {
            return Err(SelectionError::WrongLength {
                expected: CARD_CELLS,
                actual: indices.len(),
            });
        }

        let mut seen = HashSet::with_capacity(CARD_CELLS);
        for &index in &indices {
            if index >= population {
                return Err(SelectionError::OutOfRange { index, population });
            }
            if !seen.insert(index) {
                return Err(SelectionError::Duplicate(index));
            }
        }

        Ok(Self { indices })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Observation indices for every cell that shows a species, with their cell position
    pub fn species_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.indices
            .iter()
            .copied()
            .enumerate()
            .filter(|(position, _)| *position != FREE_SPACE_INDEX)
    }
}
