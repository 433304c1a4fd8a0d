//! # Maze Generation
//!
//! Layout generators for the block grid.
//!
//! [`MazeGenerator`] carves a perfect maze with an iterative depth-first
//! backtracker: starting from a random block it keeps stepping into a random
//! unvisited neighbor, opening the wall between them, and backs up whenever it
//! is boxed in. The visited blocks form a spanning tree, so every block is
//! reachable from every other by exactly one simple path.
//!
//! [`OpenMapGenerator`] opens every entrance and uses no randomness.

use super::{GenerationConfig, Generator};
use crate::{farthest_position, is_connected, DelveError, DelveResult, Direction, Map, Position};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Recursive-backtracker maze generator.
#[derive(Debug, Clone, Default)]
pub struct MazeGenerator;

impl MazeGenerator {
    /// Creates a new maze generator.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{GenerationConfig, Generator, MazeGenerator};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = GenerationConfig::for_testing(5);
    /// let mut rng = StdRng::seed_from_u64(5);
    /// let map = MazeGenerator::new().generate(&config, &mut rng).unwrap();
    /// assert_eq!(map.open_pair_count(), 6 * 4 - 1);
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Carves passages into a fully walled map.
    fn carve(&self, map: &mut Map, rng: &mut StdRng) -> DelveResult<()> {
        let width = map.width() as i32;
        let height = map.height() as i32;
        let index = |pos: Position| (pos.y * width + pos.x) as usize;
        let mut visited = vec![false; map.block_count()];

        let start = Position::new(rng.gen_range(0..width), rng.gen_range(0..height));
        debug!("Carving {}x{} maze from {:?}", width, height, start);
        visited[index(start)] = true;
        let mut stack = vec![start];

        while let Some(&current) = stack.last() {
            let candidates: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter(|direction| {
                    map.neighbor(current, *direction)
                        .is_some_and(|next| !visited[index(next)])
                })
                .collect();

            match candidates.choose(rng) {
                Some(&direction) => {
                    let next = current.step(direction);
                    map.open_passage(current, direction)?;
                    visited[index(next)] = true;
                    stack.push(next);
                }
                None => {
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

impl Generator<Map> for MazeGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> DelveResult<Map> {
        config.validate_dimensions()?;
        let mut map = Map::new(config.width, config.height)?;
        self.carve(&mut map, rng)?;
        assign_winning_block(&mut map, config)?;

        self.validate(&map, config)?;
        info!(
            "Generated {}x{} maze with winning block {:?}",
            map.width(),
            map.height(),
            map.winning_block()
        );
        Ok(map)
    }

    fn validate(&self, map: &Map, config: &GenerationConfig) -> DelveResult<()> {
        validate_layout(map, config)?;

        let expected_pairs = map.block_count() - 1;
        if map.open_pair_count() != expected_pairs {
            return Err(DelveError::GenerationFailed(format!(
                "maze has {} open passages, expected {}",
                map.open_pair_count(),
                expected_pairs
            )));
        }
        if map.block_count() > 1 {
            if let Some(block) = map.blocks().find(|block| block.open_mask() == 0) {
                return Err(DelveError::GenerationFailed(format!(
                    "block {:?} has no open entrance",
                    block.position()
                )));
            }
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "MazeGenerator"
    }
}

/// Generator for a map with no interior walls.
#[derive(Debug, Clone, Default)]
pub struct OpenMapGenerator;

impl Generator<Map> for OpenMapGenerator {
    fn generate(&self, config: &GenerationConfig, _rng: &mut StdRng) -> DelveResult<Map> {
        config.validate_dimensions()?;
        let mut map = Map::open(config.width, config.height)?;
        assign_winning_block(&mut map, config)?;

        self.validate(&map, config)?;
        info!("Generated {}x{} open map", map.width(), map.height());
        Ok(map)
    }

    fn validate(&self, map: &Map, config: &GenerationConfig) -> DelveResult<()> {
        validate_layout(map, config)?;
        if map.blocks().any(|block| block.open_mask() != 0b1111) {
            return Err(DelveError::GenerationFailed(
                "open map has a closed entrance".to_string(),
            ));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "OpenMapGenerator"
    }
}

/// Checks the properties every generated layout shares.
fn validate_layout(map: &Map, config: &GenerationConfig) -> DelveResult<()> {
    if map.width() != config.width || map.height() != config.height {
        return Err(DelveError::GenerationFailed(format!(
            "map is {}x{}, expected {}x{}",
            map.width(),
            map.height(),
            config.width,
            config.height
        )));
    }
    map.check_symmetry()
        .map_err(|err| DelveError::GenerationFailed(err.to_string()))?;
    if !is_connected(map) {
        return Err(DelveError::GenerationFailed(
            "not every block is reachable".to_string(),
        ));
    }
    Ok(())
}

/// Applies the configured winning block, or the block farthest from the origin.
fn assign_winning_block(map: &mut Map, config: &GenerationConfig) -> DelveResult<()> {
    let target = match config.winning_block {
        Some(pos) => Some(pos),
        None => farthest_position(map, Position::origin()),
    };
    map.set_winning_block(target)
}
