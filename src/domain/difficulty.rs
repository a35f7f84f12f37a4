//! Difficulty reference data.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Identifier of a difficulty row.
pub type DifficultyId = i32;

/// One difficulty level of the puzzle. Immutable, seeded by migrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Difficulty {
    id: DifficultyId,
    name: String,
    /// Number of blocks on the board at this difficulty.
    number_of_blocks: i32,
}
