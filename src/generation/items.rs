//! # Item Generation
//!
//! Seeded item factory producing weapons, armor and trinkets.

use super::{GenerationConfig, Generator};
use crate::{DelveError, DelveResult, ItemBlueprint, ItemKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

const WEAPON_NAMES: &[&str] = &["Dagger", "Short Sword", "Mace", "Spear", "War Axe"];
const ARMOR_NAMES: &[&str] = &["Leather Vest", "Chain Shirt", "Scale Mail", "Buckler"];
const TRINKET_NAMES: &[&str] = &["Silver Ring", "Old Coin", "Bone Charm", "Amber Idol"];

/// Creates the items scattered through a dungeon.
#[derive(Debug, Clone)]
pub struct ItemGenerator {
    /// Inclusive range of weapon damage
    pub damage_range: (i32, i32),
    /// Inclusive range of armor defense
    pub defense_range: (i32, i32),
    /// Inclusive range of trinket value
    pub value_range: (i32, i32),
}

impl ItemGenerator {
    pub fn new() -> Self {
        Self {
            damage_range: (1, 6),
            defense_range: (1, 4),
            value_range: (1, 50),
        }
    }

    /// Rolls a single random item.
    pub fn roll_item(&self, rng: &mut StdRng) -> ItemBlueprint {
        match rng.gen_range(0..3) {
            0 => ItemBlueprint::weapon(
                pick_name(WEAPON_NAMES, rng),
                roll(self.damage_range, rng),
            ),
            1 => ItemBlueprint::armor(pick_name(ARMOR_NAMES, rng), roll(self.defense_range, rng)),
            _ => ItemBlueprint::trinket(
                pick_name(TRINKET_NAMES, rng),
                roll(self.value_range, rng),
            ),
        }
    }
}

impl Default for ItemGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn pick_name(names: &[&str], rng: &mut StdRng) -> String {
    names.choose(rng).copied().unwrap_or("Curio").to_string()
}

fn roll((low, high): (i32, i32), rng: &mut StdRng) -> i32 {
    if high <= low {
        low
    } else {
        rng.gen_range(low..=high)
    }
}

impl Generator<Vec<ItemBlueprint>> for ItemGenerator {
    fn generate(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> DelveResult<Vec<ItemBlueprint>> {
        let items: Vec<ItemBlueprint> = (0..config.item_count)
            .map(|_| self.roll_item(rng))
            .collect();
        self.validate(&items, config)?;
        Ok(items)
    }

    fn validate(&self, content: &Vec<ItemBlueprint>, config: &GenerationConfig) -> DelveResult<()> {
        if content.len() != config.item_count as usize {
            return Err(DelveError::GenerationFailed(format!(
                "generated {} items, expected {}",
                content.len(),
                config.item_count
            )));
        }
        if let Some(item) = content
            .iter()
            .find(|item| matches!(item.kind, ItemKind::Unknown { .. }) || item.kind.parameter() < 0)
        {
            return Err(DelveError::GenerationFailed(format!(
                "generated an unusable item: {:?}",
                item
            )));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "ItemGenerator"
    }
}
