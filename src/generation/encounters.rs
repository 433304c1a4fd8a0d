//! # Encounter Generation
//!
//! Seeded monster factory and placement of monsters and items on a map.
//!
//! Content never lands on the origin, where players start, or on the winning
//! block.

use super::{GenerationConfig, Generator, ItemGenerator};
use crate::{CreatureBlueprint, CreatureKind, DelveError, DelveResult, Map, ObjectId, Position, Stats};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

const MONSTER_NAMES: &[&str] = &["Rat", "Bat", "Goblin", "Kobold", "Slime", "Skeleton"];

/// Ids of the content placed by [`EncounterGenerator::populate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    pub monsters: Vec<ObjectId>,
    pub items: Vec<ObjectId>,
}

/// Creates monsters and lays out a dungeon's content.
#[derive(Debug, Clone)]
pub struct EncounterGenerator {
    /// Largest random adjustment applied to each monster stat
    pub stat_variance: i32,
    pub items: ItemGenerator,
}

impl EncounterGenerator {
    pub fn new() -> Self {
        Self {
            stat_variance: 2,
            items: ItemGenerator::new(),
        }
    }

    /// Rolls a single monster.
    pub fn roll_monster(&self, rng: &mut StdRng) -> CreatureBlueprint {
        let name = MONSTER_NAMES.choose(rng).copied().unwrap_or("Monster");
        let base = Stats::monster();
        let variance = self.stat_variance.max(0);
        let mut vary = |value: i32, floor: i32| {
            (value + rng.gen_range(-variance..=variance)).max(floor)
        };
        let stats = Stats::new(vary(base.hp, 1), vary(base.attack, 1), vary(base.defense, 0));
        CreatureBlueprint::new(name, CreatureKind::Monster, stats)
    }

    /// Spawns the configured number of monsters and items onto free blocks.
    ///
    /// Monsters each get their own block; items each get their own block
    /// too, and may share one with a monster.
    pub fn populate(
        &self,
        map: &mut Map,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> DelveResult<Placement> {
        let monsters = self.generate(config, rng)?;
        let items = self.items.generate(config, rng)?;

        let mut candidates: Vec<Position> = map
            .positions()
            .filter(|pos| *pos != Position::origin() && !map.is_winning_block(*pos))
            .collect();

        let mut placement = Placement::default();

        candidates.shuffle(rng);
        let free: Vec<Position> = candidates
            .iter()
            .copied()
            .filter(|pos| !map.is_occupied(*pos))
            .collect();
        if free.len() < monsters.len() {
            return Err(DelveError::GenerationFailed(format!(
                "{} monsters do not fit on {} free blocks",
                monsters.len(),
                free.len()
            )));
        }
        for (blueprint, pos) in monsters.into_iter().zip(free) {
            placement.monsters.push(map.spawn_creature(blueprint, pos)?);
        }

        candidates.shuffle(rng);
        let free: Vec<Position> = candidates
            .iter()
            .copied()
            .filter(|pos| map.item_at(*pos).is_none())
            .collect();
        if free.len() < items.len() {
            return Err(DelveError::GenerationFailed(format!(
                "{} items do not fit on {} free blocks",
                items.len(),
                free.len()
            )));
        }
        for (blueprint, pos) in items.into_iter().zip(free) {
            placement.items.push(map.spawn_item(blueprint, pos)?);
        }

        debug!(
            "Placed {} monsters and {} items",
            placement.monsters.len(),
            placement.items.len()
        );
        Ok(placement)
    }
}

impl Default for EncounterGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<Vec<CreatureBlueprint>> for EncounterGenerator {
    fn generate(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> DelveResult<Vec<CreatureBlueprint>> {
        let monsters: Vec<CreatureBlueprint> = (0..config.monster_count)
            .map(|_| self.roll_monster(rng))
            .collect();
        self.validate(&monsters, config)?;
        Ok(monsters)
    }

    fn validate(
        &self,
        content: &Vec<CreatureBlueprint>,
        config: &GenerationConfig,
    ) -> DelveResult<()> {
        if content.len() != config.monster_count as usize {
            return Err(DelveError::GenerationFailed(format!(
                "generated {} monsters, expected {}",
                content.len(),
                config.monster_count
            )));
        }
        if let Some(monster) = content
            .iter()
            .find(|monster| monster.kind != CreatureKind::Monster || monster.stats.hp <= 0)
        {
            return Err(DelveError::GenerationFailed(format!(
                "generated an unusable monster: {:?}",
                monster
            )));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "EncounterGenerator"
    }
}
