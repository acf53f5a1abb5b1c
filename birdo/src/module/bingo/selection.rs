use anyhow::Result;
use birdo_common::{BingoSelection, CARD_CELLS};
use rand::Rng;

use crate::error::BirdoError;

/// Draw `count` independent card selections from `0..population`.
///
/// Every selection is 25 distinct indices sampled uniformly without
/// replacement. Selections are independent of one another, so two cards may
/// in principle coincide.
pub fn generate_selections<R: Rng + ?Sized>(
    count: usize,
    population: usize,
    rng: &mut R,
) -> Result<Vec<BingoSelection>> {
    if population < CARD_CELLS {
        return Err(BirdoError::NotEnoughSpecies {
            needed: CARD_CELLS,
            available: population,
        }
        .into());
    }

    (0..count)
        .map(|_| {
            let indices = rand::seq::index::sample(&mut *rng, population, CARD_CELLS).into_vec();
            Ok(BingoSelection::new(indices, population)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn test_selections_are_valid() {
        let mut rng = StdRng::seed_from_u64(2024);
        for population in [25, 26, 30, 120] {
            let selections = generate_selections(10, population, &mut rng).unwrap();
            assert_eq!(selections.len(), 10);
            for selection in &selections {
                let indices = selection.indices();
                assert_eq!(indices.len(), CARD_CELLS);
                assert!(indices.iter().all(|&i| i < population));
                let distinct: HashSet<_> = indices.iter().collect();
                assert_eq!(distinct.len(), CARD_CELLS);
            }
        }
    }

    #[test]
    fn test_exact_population_uses_everyone() {
        let mut rng = StdRng::seed_from_u64(1);
        let selections = generate_selections(1, CARD_CELLS, &mut rng).unwrap();
        let mut indices = selections[0].indices().to_vec();
        indices.sort_unstable();
        assert_eq!(indices, (0..CARD_CELLS).collect::<Vec<_>>());
    }

    #[test]
    fn test_small_population_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate_selections(3, 24, &mut rng).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BirdoError>(),
            Some(BirdoError::NotEnoughSpecies { needed: 25, available: 24 })
        ));
    }

    #[test]
    fn test_zero_cards() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_selections(0, 30, &mut rng).unwrap().is_empty());
    }
}
