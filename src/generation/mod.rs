//! # Generation Module
//!
//! Procedural content generation for mazes, items and encounters.
//!
//! Every generator draws from an injected [`StdRng`], so a seeded
//! configuration reproduces the same map byte for byte. Without a seed the
//! generator is seeded from OS entropy.

pub mod encounters;
pub mod items;
pub mod maze;

pub use encounters::*;
pub use items::*;
pub use maze::*;

use crate::{config, DelveError, DelveResult, Map, Position};
use log::info;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
///
/// Controls the size of the map, its randomness and how much content is
/// placed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Map width in blocks
    pub width: u32,
    /// Map height in blocks
    pub height: u32,
    /// Random seed for reproducible generation; None draws from OS entropy
    pub seed: Option<u64>,
    /// Block a player must reach to win; None picks the block farthest from the origin
    pub winning_block: Option<Position>,
    /// Open every entrance instead of carving a maze
    pub open_map: bool,
    /// Monsters placed by the encounter generator
    pub monster_count: u32,
    /// Items placed by the encounter generator
    pub item_count: u32,
}

impl GenerationConfig {
    /// Creates a configuration for a maze of the given size.
    ///
    /// Content density is roughly one monster per twelve blocks and one item
    /// per sixteen.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(16, 12, Some(7));
    /// assert_eq!(config.monster_count, 16);
    /// assert_eq!(config.item_count, 12);
    /// assert!(!config.open_map);
    /// ```
    pub fn new(width: u32, height: u32, seed: Option<u64>) -> Self {
        let blocks = width.saturating_mul(height);
        Self {
            width,
            height,
            seed,
            winning_block: None,
            open_map: false,
            monster_count: blocks / 12,
            item_count: blocks / 16,
        }
    }

    /// Creates a configuration for testing: a small seeded maze with no content.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            monster_count: 0,
            item_count: 0,
            ..Self::new(6, 4, Some(seed))
        }
    }

    pub fn with_winning_block(mut self, pos: Position) -> Self {
        self.winning_block = Some(pos);
        self
    }

    pub fn with_open_map(mut self, open_map: bool) -> Self {
        self.open_map = open_map;
        self
    }

    pub fn with_monsters(mut self, count: u32) -> Self {
        self.monster_count = count;
        self
    }

    pub fn with_items(mut self, count: u32) -> Self {
        self.item_count = count;
        self
    }

    /// Checks that the dimensions describe at least one block.
    pub fn validate_dimensions(&self) -> DelveResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DelveError::GenerationFailed(format!(
                "map dimensions must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(config::DEFAULT_MAZE_WIDTH, config::DEFAULT_MAZE_HEIGHT, None)
    }
}

/// Trait for procedural generators.
///
/// All generation systems implement this trait, giving maps, items and
/// encounters one interface.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> DelveResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;
    use rand::SeedableRng;

    /// Creates a random number generator from the config's seed, or from OS
    /// entropy when there is none.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Generates a perfect maze of `width × height` blocks.
///
/// The same `Some(seed)` always yields the same maze; `None` draws a fresh
/// one. The winning block is the block farthest from the origin.
///
/// # Examples
///
/// ```
/// use delve::generate;
///
/// let a = generate(5, 10, Some(87452)).unwrap();
/// let b = generate(5, 10, Some(87452)).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.open_pair_count(), 5 * 10 - 1);
/// ```
pub fn generate(width: u32, height: u32, seed: Option<u64>) -> DelveResult<Map> {
    let config = GenerationConfig {
        monster_count: 0,
        item_count: 0,
        ..GenerationConfig::new(width, height, seed)
    };
    let mut rng = utils::create_rng(&config);
    MazeGenerator::new().generate(&config, &mut rng)
}

/// Generates a map with every entrance open.
pub fn generate_open(width: u32, height: u32) -> DelveResult<Map> {
    let config = GenerationConfig {
        monster_count: 0,
        item_count: 0,
        ..GenerationConfig::new(width, height, Some(0)).with_open_map(true)
    };
    let mut rng = utils::create_rng(&config);
    OpenMapGenerator.generate(&config, &mut rng)
}

/// Generates a complete dungeon: layout, monsters and items.
pub fn generate_dungeon(config: &GenerationConfig) -> DelveResult<Map> {
    let mut rng = utils::create_rng(config);
    let mut map = if config.open_map {
        OpenMapGenerator.generate(config, &mut rng)?
    } else {
        MazeGenerator::new().generate(config, &mut rng)?
    };

    let placed = EncounterGenerator::new().populate(&mut map, config, &mut rng)?;
    info!(
        "Generated {}x{} dungeon with {} monsters and {} items",
        map.width(),
        map.height(),
        placed.monsters.len(),
        placed.items.len()
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_creation() {
        let config = GenerationConfig::new(12, 12, Some(12345));
        assert_eq!(config.seed, Some(12345));
        assert_eq!(config.monster_count, 12);
        assert_eq!(config.item_count, 9);
        assert!(config.validate_dimensions().is_ok());

        let testing = GenerationConfig::for_testing(1);
        assert_eq!((testing.width, testing.height), (6, 4));
        assert_eq!(testing.monster_count, 0);

        let default = GenerationConfig::default();
        assert_eq!(default.width, config::DEFAULT_MAZE_WIDTH);
        assert_eq!(default.seed, None);
    }

    #[test]
    fn test_config_rejects_empty_dimensions() {
        assert!(GenerationConfig::new(0, 3, None).validate_dimensions().is_err());
        assert!(GenerationConfig::new(3, 0, None).validate_dimensions().is_err());
        assert!(matches!(
            generate(0, 5, Some(1)),
            Err(DelveError::GenerationFailed(_))
        ));
    }

    #[test]
    fn test_config_serde() {
        let config = GenerationConfig::for_testing(9).with_winning_block(Position::new(1, 2));
        let json = serde_json::to_string(&config).unwrap();
        let back: GenerationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate(5, 10, Some(87452)).unwrap();
        let b = generate(5, 10, Some(87452)).unwrap();
        assert_eq!(a, b);
        for pos in a.positions() {
            assert_eq!(a.block(pos), b.block(pos));
        }
    }

    #[test]
    fn test_unseeded_generation_still_builds_a_maze() {
        let map = generate(7, 3, None).unwrap();
        assert_eq!(map.open_pair_count(), 20);
    }

    #[test]
    fn test_generate_open() {
        let map = generate_open(4, 4).unwrap();
        assert!(map.blocks().all(|block| block.open_mask() == 0b1111));
        assert!(map.winning_block().is_some());
    }

    #[test]
    fn test_generate_dungeon_places_content() {
        let config = GenerationConfig::for_testing(77).with_monsters(3).with_items(2);
        let map = generate_dungeon(&config).unwrap();
        assert_eq!(map.creatures().count(), 3);
        assert_eq!(map.items().count(), 2);

        let again = generate_dungeon(&config).unwrap();
        assert_eq!(map, again);
    }
}
