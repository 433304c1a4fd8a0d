//! # Entities
//!
//! Creatures, items and player gear.
//!
//! Entities do not own their place on the map: the [`Map`](crate::Map) owns
//! every placed creature and item in its arenas and is the only code that
//! changes an entity's position.

use crate::{config, Action, Brain, ObjectId, Position};
use serde::{Deserialize, Serialize};

/// Base statistics of a creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
}

impl Stats {
    /// Creates a new stat block.
    pub fn new(hp: i32, attack: i32, defense: i32) -> Self {
        Self {
            hp,
            attack,
            defense,
        }
    }

    /// Default stats for a player.
    pub fn player() -> Self {
        let (hp, attack, defense) = config::DEFAULT_PLAYER_STATS;
        Self::new(hp, attack, defense)
    }

    /// Default stats for a monster.
    pub fn monster() -> Self {
        let (hp, attack, defense) = config::DEFAULT_MONSTER_STATS;
        Self::new(hp, attack, defense)
    }
}

/// Which AI drives a computer-controlled player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiKind {
    /// Depth-first maze explorer
    Explorer,
    /// Bounded random walker
    Wanderer,
}

/// The role a creature plays in the turn loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureKind {
    Monster,
    HumanPlayer,
    AiPlayer(AiKind),
    /// A creature of a kind this engine does not know. It never takes turns.
    Unknown,
}

impl CreatureKind {
    /// Returns true for human and AI players.
    pub fn is_player(self) -> bool {
        matches!(self, CreatureKind::HumanPlayer | CreatureKind::AiPlayer(_))
    }
}

/// What an item does once picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Equippable; adds `damage` to the wielder's attack
    Weapon { damage: i32 },
    /// Equippable; adds `defense` to the wearer's defense
    Armor { defense: i32 },
    /// Goes into the inventory
    Trinket { value: i32 },
    /// Decoded from data this engine cannot interpret
    Unknown { parameter: i32 },
}

impl ItemKind {
    /// The single numeric parameter of the kind (damage, defense or value).
    pub fn parameter(self) -> i32 {
        match self {
            ItemKind::Weapon { damage } => damage,
            ItemKind::Armor { defense } => defense,
            ItemKind::Trinket { value } => value,
            ItemKind::Unknown { parameter } => parameter,
        }
    }
}

/// Everything needed to spawn a creature; the map supplies id and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureBlueprint {
    pub name: String,
    pub kind: CreatureKind,
    pub stats: Stats,
}

impl CreatureBlueprint {
    /// Creates a blueprint from its parts.
    pub fn new(name: impl Into<String>, kind: CreatureKind, stats: Stats) -> Self {
        Self {
            name: name.into(),
            kind,
            stats,
        }
    }

    /// A monster with default stats.
    pub fn monster(name: impl Into<String>) -> Self {
        Self::new(name, CreatureKind::Monster, Stats::monster())
    }

    /// A human player with default stats.
    pub fn human(name: impl Into<String>) -> Self {
        Self::new(name, CreatureKind::HumanPlayer, Stats::player())
    }

    /// An AI player with default stats.
    pub fn ai_player(name: impl Into<String>, ai: AiKind) -> Self {
        Self::new(name, CreatureKind::AiPlayer(ai), Stats::player())
    }

    /// Replaces the stats.
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }
}

/// Everything needed to spawn an item; the map supplies id and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBlueprint {
    pub name: String,
    pub kind: ItemKind,
}

impl ItemBlueprint {
    /// Creates a blueprint from its parts.
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn weapon(name: impl Into<String>, damage: i32) -> Self {
        Self::new(name, ItemKind::Weapon { damage })
    }

    pub fn armor(name: impl Into<String>, defense: i32) -> Self {
        Self::new(name, ItemKind::Armor { defense })
    }

    pub fn trinket(name: impl Into<String>, value: i32) -> Self {
        Self::new(name, ItemKind::Trinket { value })
    }
}

/// An item, either lying on a block or carried by a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) id: ObjectId,
    pub name: String,
    pub kind: ItemKind,
    pub(crate) position: Option<Position>,
}

impl Item {
    pub(crate) fn new(id: ObjectId, blueprint: ItemBlueprint) -> Self {
        Self {
            id,
            name: blueprint.name,
            kind: blueprint.kind,
            position: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The block the item lies on, or None while it is carried.
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

/// A player's inventory and equipment slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Gear {
    capacity: usize,
    inventory: Vec<Item>,
    pub(crate) weapon: Option<Item>,
    pub(crate) armor: Option<Item>,
}

impl Gear {
    /// Creates empty gear with room for `capacity` inventory items.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inventory: Vec::new(),
            weapon: None,
            armor: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn inventory(&self) -> &[Item] {
        &self.inventory
    }

    pub fn weapon(&self) -> Option<&Item> {
        self.weapon.as_ref()
    }

    pub fn armor(&self) -> Option<&Item> {
        self.armor.as_ref()
    }

    /// Returns true while the inventory has a free slot.
    pub fn has_room(&self) -> bool {
        self.inventory.len() < self.capacity
    }

    /// Adds an item to the inventory, handing it back when there is no room.
    pub(crate) fn stash(&mut self, item: Item) -> Result<(), Item> {
        if !self.has_room() {
            return Err(item);
        }
        self.inventory.push(item);
        Ok(())
    }

    fn attack_bonus(&self) -> i32 {
        match self.weapon.as_ref().map(|item| item.kind) {
            Some(ItemKind::Weapon { damage }) => damage,
            _ => 0,
        }
    }

    fn defense_bonus(&self) -> i32 {
        match self.armor.as_ref().map(|item| item.kind) {
            Some(ItemKind::Armor { defense }) => defense,
            _ => 0,
        }
    }
}

impl Default for Gear {
    fn default() -> Self {
        Self::new(config::DEFAULT_INVENTORY_CAPACITY)
    }
}

/// A player or monster on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    pub(crate) id: ObjectId,
    pub name: String,
    pub(crate) position: Position,
    pub kind: CreatureKind,
    pub stats: Stats,
    /// Current hit points; may drop below zero
    pub current_hp: f32,
    /// Action the turn loop executes on this creature's next turn
    pub next_action: Option<Action>,
    pub brain: Brain,
    pub(crate) gear: Option<Gear>,
}

impl Creature {
    pub(crate) fn new(id: ObjectId, blueprint: CreatureBlueprint, position: Position) -> Self {
        let gear = blueprint.kind.is_player().then(Gear::default);
        Self {
            id,
            name: blueprint.name,
            position,
            kind: blueprint.kind,
            stats: blueprint.stats,
            current_hp: blueprint.stats.hp as f32,
            next_action: None,
            brain: Brain::Idle,
            gear,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// A creature is alive while its current hit points stay above zero.
    pub fn is_alive(&self) -> bool {
        self.current_hp > 0.0
    }

    pub fn is_player(&self) -> bool {
        self.kind.is_player()
    }

    /// Base attack plus the equipped weapon's damage.
    pub fn total_attack(&self) -> i32 {
        self.stats.attack + self.gear.as_ref().map_or(0, Gear::attack_bonus)
    }

    /// Base defense plus the equipped armor's defense.
    pub fn total_defense(&self) -> i32 {
        self.stats.defense + self.gear.as_ref().map_or(0, Gear::defense_bonus)
    }

    /// Player gear; None for monsters.
    pub fn gear(&self) -> Option<&Gear> {
        self.gear.as_ref()
    }

    /// Carried inventory items; empty for monsters.
    pub fn inventory(&self) -> &[Item] {
        self.gear.as_ref().map_or(&[][..], Gear::inventory)
    }

    /// Subtracts `damage` from the current hit points.
    ///
    /// Returns true when this blow took the creature from alive to dead.
    pub(crate) fn apply_damage(&mut self, damage: i32) -> bool {
        let was_alive = self.is_alive();
        self.current_hp -= damage as f32;
        was_alive && !self.is_alive()
    }
}
