//! # World Module
//!
//! The grid model: entrances, map blocks and the map that owns them.
//!
//! A [`Map`] stores its blocks in one flat array indexed by coordinate and owns
//! every placed creature and item in id-keyed arenas. Blocks refer to their
//! occupants by [`ObjectId`]; occupants store their coordinate. The map is the
//! only code that changes either side, so the two always agree.

use crate::{
    Creature, CreatureBlueprint, DelveError, DelveResult, Direction, Item, ItemBlueprint,
    ObjectId, Position,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key colors for locked entrances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockColor {
    Red,
    Green,
    Blue,
    Yellow,
}

/// One side of a map block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entrance {
    /// Solid wall
    NonExistent,
    /// Passable
    Open,
    /// Needs a key of the given color. Reserved; nothing produces it yet.
    Locked(LockColor),
}

impl Entrance {
    pub fn is_open(self) -> bool {
        self == Entrance::Open
    }
}

/// A single cell of the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapBlock {
    position: Position,
    entrances: [Entrance; 4],
    creature: Option<ObjectId>,
    item: Option<ObjectId>,
}

impl MapBlock {
    fn new(position: Position) -> Self {
        Self {
            position,
            entrances: [Entrance::NonExistent; 4],
            creature: None,
            item: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn entrance(&self, direction: Direction) -> Entrance {
        self.entrances[direction.index()]
    }

    pub fn entrances(&self) -> &[Entrance; 4] {
        &self.entrances
    }

    /// Id of the creature standing here.
    pub fn creature(&self) -> Option<ObjectId> {
        self.creature
    }

    /// Id of the item lying here.
    pub fn item(&self) -> Option<ObjectId> {
        self.item
    }

    /// A block is occupied while a creature stands on it.
    pub fn is_occupied(&self) -> bool {
        self.creature.is_some()
    }

    /// Directions whose entrance is open, in North, East, South, West order.
    pub fn open_directions(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .into_iter()
            .filter(|direction| self.entrance(*direction).is_open())
    }

    /// Open entrances as a nibble: bit 0 North, bit 1 East, bit 2 South, bit 3 West.
    pub fn open_mask(&self) -> u8 {
        self.open_directions()
            .fold(0, |mask, direction| mask | (1 << direction.index()))
    }
}

/// The dungeon grid and everything placed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    width: u32,
    height: u32,
    blocks: Vec<MapBlock>,
    winning_block: Option<Position>,
    creatures: BTreeMap<ObjectId, Creature>,
    items: BTreeMap<ObjectId, Item>,
    next_id: u32,
}

impl Map {
    /// Creates a `width × height` map with every entrance walled off.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Direction, Map, Position};
    ///
    /// let map = Map::new(3, 2).unwrap();
    /// assert_eq!(map.block_count(), 6);
    /// assert!(!map.is_open(Position::new(0, 0), Direction::East));
    /// ```
    pub fn new(width: u32, height: u32) -> DelveResult<Self> {
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(DelveError::InvalidState(format!(
                "map dimensions {}x{} are not usable",
                width, height
            )));
        }

        let mut blocks = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                blocks.push(MapBlock::new(Position::new(x, y)));
            }
        }

        Ok(Self {
            width,
            height,
            blocks,
            winning_block: None,
            creatures: BTreeMap::new(),
            items: BTreeMap::new(),
            next_id: 1,
        })
    }

    /// Creates a map with every entrance open, border entrances included.
    pub fn open(width: u32, height: u32) -> DelveResult<Self> {
        let mut map = Self::new(width, height)?;
        for block in &mut map.blocks {
            block.entrances = [Entrance::Open; 4];
        }
        Ok(map)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Checks if a position lies on the map.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn block(&self, pos: Position) -> Option<&MapBlock> {
        self.index(pos).map(|index| &self.blocks[index])
    }

    fn block_mut(&mut self, pos: Position) -> DelveResult<&mut MapBlock> {
        let index = self.index(pos).ok_or(DelveError::OutOfBounds(pos))?;
        Ok(&mut self.blocks[index])
    }

    /// All blocks, row by row.
    pub fn blocks(&self) -> impl Iterator<Item = &MapBlock> {
        self.blocks.iter()
    }

    /// All positions with x as the outer loop and y as the inner loop.
    ///
    /// This is the block order of the binary map format.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let height = self.height as i32;
        (0..self.width as i32).flat_map(move |x| (0..height).map(move |y| Position::new(x, y)))
    }

    /// The on-map position one step from `pos` in `direction`.
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Option<Position> {
        let next = pos.step(direction);
        self.contains(next).then_some(next)
    }

    /// The block one step from `pos` in `direction`.
    pub fn adjacent_block(&self, pos: Position, direction: Direction) -> Option<&MapBlock> {
        self.neighbor(pos, direction)
            .and_then(|next| self.block(next))
    }

    pub fn entrance(&self, pos: Position, direction: Direction) -> Option<Entrance> {
        self.block(pos).map(|block| block.entrance(direction))
    }

    /// Checks if the entrance on `direction` side of `pos` is open.
    pub fn is_open(&self, pos: Position, direction: Direction) -> bool {
        self.entrance(pos, direction)
            .is_some_and(Entrance::is_open)
    }

    /// Checks if a creature stands on `pos`.
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.block(pos).is_some_and(MapBlock::is_occupied)
    }

    /// Checks if a creature at `from` could step in `direction` right now:
    /// the entrance is open, the neighbor exists and nobody stands on it.
    pub fn can_enter(&self, from: Position, direction: Direction) -> bool {
        self.is_open(from, direction)
            && self
                .neighbor(from, direction)
                .is_some_and(|next| !self.is_occupied(next))
    }

    /// Opens the passage between `pos` and its neighbor on both sides.
    pub fn open_passage(&mut self, pos: Position, direction: Direction) -> DelveResult<()> {
        let next = self
            .neighbor(pos, direction)
            .ok_or(DelveError::OutOfBounds(pos.step(direction)))?;
        self.set_entrance(pos, direction, Entrance::Open)?;
        self.set_entrance(next, direction.opposite(), Entrance::Open)
    }

    /// Sets one side of one block, without touching the neighbor.
    pub(crate) fn set_entrance(
        &mut self,
        pos: Position,
        direction: Direction,
        entrance: Entrance,
    ) -> DelveResult<()> {
        self.block_mut(pos)?.entrances[direction.index()] = entrance;
        Ok(())
    }

    /// Counts adjacent block pairs joined by an open passage.
    pub fn open_pair_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|block| {
                [Direction::East, Direction::South]
                    .into_iter()
                    .map(move |direction| (block.position, direction))
            })
            .filter(|(pos, direction)| {
                self.neighbor(*pos, *direction).is_some() && self.is_open(*pos, *direction)
            })
            .count()
    }

    /// Verifies that every adjacent pair agrees on whether its shared side is open.
    pub fn check_symmetry(&self) -> DelveResult<()> {
        for block in &self.blocks {
            for direction in [Direction::East, Direction::South] {
                if let Some(next) = self.neighbor(block.position, direction) {
                    let here = self.is_open(block.position, direction);
                    let there = self.is_open(next, direction.opposite());
                    if here != there {
                        return Err(DelveError::InvalidState(format!(
                            "entrance between {:?} and {:?} is open on one side only",
                            block.position, next
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn winning_block(&self) -> Option<Position> {
        self.winning_block
    }

    /// Designates the block a player must reach to win, or clears it.
    pub fn set_winning_block(&mut self, pos: Option<Position>) -> DelveResult<()> {
        if let Some(pos) = pos {
            if !self.contains(pos) {
                return Err(DelveError::OutOfBounds(pos));
            }
        }
        self.winning_block = pos;
        Ok(())
    }

    pub fn is_winning_block(&self, pos: Position) -> bool {
        self.winning_block == Some(pos)
    }

    pub fn creature(&self, id: ObjectId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn creature_mut(&mut self, id: ObjectId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    /// All creatures in id order.
    pub fn creatures(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values()
    }

    pub fn creature_at(&self, pos: Position) -> Option<&Creature> {
        self.block(pos)
            .and_then(MapBlock::creature)
            .and_then(|id| self.creatures.get(&id))
    }

    pub fn item(&self, id: ObjectId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// All items lying on the map, in id order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn item_at(&self, pos: Position) -> Option<&Item> {
        self.block(pos)
            .and_then(MapBlock::item)
            .and_then(|id| self.items.get(&id))
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Creates a creature on `pos` and returns its new id.
    pub fn spawn_creature(
        &mut self,
        blueprint: CreatureBlueprint,
        pos: Position,
    ) -> DelveResult<ObjectId> {
        self.ensure_creature_slot_free(pos)?;
        let id = self.allocate_id();
        self.insert_creature(Creature::new(id, blueprint, pos))?;
        Ok(id)
    }

    /// Creates an item on `pos` and returns its new id.
    pub fn spawn_item(&mut self, blueprint: ItemBlueprint, pos: Position) -> DelveResult<ObjectId> {
        self.ensure_item_slot_free(pos)?;
        let id = self.allocate_id();
        self.place_item(Item::new(id, blueprint), pos)?;
        Ok(id)
    }

    /// Re-creates a creature under an id it already had, e.g. when decoding.
    pub(crate) fn restore_creature(
        &mut self,
        id: ObjectId,
        blueprint: CreatureBlueprint,
        pos: Position,
    ) -> DelveResult<()> {
        self.ensure_id_unused(id)?;
        self.ensure_creature_slot_free(pos)?;
        self.insert_creature(Creature::new(id, blueprint, pos))?;
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        Ok(())
    }

    /// Re-creates an item under an id it already had, e.g. when decoding.
    pub(crate) fn restore_item(
        &mut self,
        id: ObjectId,
        blueprint: ItemBlueprint,
        pos: Position,
    ) -> DelveResult<()> {
        self.ensure_id_unused(id)?;
        self.place_item(Item::new(id, blueprint), pos)?;
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        Ok(())
    }

    fn ensure_id_unused(&self, id: ObjectId) -> DelveResult<()> {
        if self.creatures.contains_key(&id) || self.items.contains_key(&id) {
            return Err(DelveError::InvalidState(format!("object id {} is used twice", id)));
        }
        Ok(())
    }

    fn ensure_creature_slot_free(&self, pos: Position) -> DelveResult<()> {
        let block = self.block(pos).ok_or(DelveError::OutOfBounds(pos))?;
        if block.is_occupied() {
            return Err(DelveError::Occupied(pos));
        }
        Ok(())
    }

    fn ensure_item_slot_free(&self, pos: Position) -> DelveResult<()> {
        let block = self.block(pos).ok_or(DelveError::OutOfBounds(pos))?;
        if block.item.is_some() {
            return Err(DelveError::Occupied(pos));
        }
        Ok(())
    }

    fn insert_creature(&mut self, creature: Creature) -> DelveResult<()> {
        let id = creature.id;
        self.block_mut(creature.position)?.creature = Some(id);
        self.creatures.insert(id, creature);
        Ok(())
    }

    /// Moves a creature to `to`, updating the old block, the new block and
    /// the creature's position together.
    pub(crate) fn relocate_creature(&mut self, id: ObjectId, to: Position) -> DelveResult<Position> {
        let from = self
            .creatures
            .get(&id)
            .map(Creature::position)
            .ok_or(DelveError::UnknownObject(id))?;
        if from == to {
            return Ok(from);
        }
        self.ensure_creature_slot_free(to)?;

        self.block_mut(from)?.creature = None;
        self.block_mut(to)?.creature = Some(id);
        if let Some(creature) = self.creatures.get_mut(&id) {
            creature.position = to;
        }
        Ok(from)
    }

    /// Lifts the item off `pos`, removing it from the map.
    pub(crate) fn take_item(&mut self, pos: Position) -> DelveResult<Option<Item>> {
        let block = self.block_mut(pos)?;
        let Some(id) = block.item.take() else {
            return Ok(None);
        };
        let mut item = self.items.remove(&id).ok_or(DelveError::UnknownObject(id))?;
        item.position = None;
        Ok(Some(item))
    }

    /// Lays a carried item onto `pos`.
    pub(crate) fn place_item(&mut self, mut item: Item, pos: Position) -> DelveResult<()> {
        self.ensure_item_slot_free(pos)?;
        self.block_mut(pos)?.item = Some(item.id);
        item.position = Some(pos);
        self.items.insert(item.id, item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_creation() {
        let map = Map::new(4, 3).unwrap();
        assert_eq!(map.width(), 4);
        assert_eq!(map.height(), 3);
        assert_eq!(map.block_count(), 12);
        assert_eq!(map.open_pair_count(), 0);
        assert!(map.winning_block().is_none());

        for pos in map.positions() {
            let block = map.block(pos).unwrap();
            assert_eq!(block.position(), pos);
            assert_eq!(block.open_mask(), 0);
        }
    }

    #[test]
    fn test_zero_sized_map_is_rejected() {
        assert!(Map::new(0, 5).is_err());
        assert!(Map::new(5, 0).is_err());
    }

    #[test]
    fn test_positions_are_column_major() {
        let map = Map::new(2, 3).unwrap();
        let positions: Vec<_> = map.positions().collect();
        assert_eq!(
            positions,
            vec![
                Position::new(0, 0),
                Position::new(0, 1),
                Position::new(0, 2),
                Position::new(1, 0),
                Position::new(1, 1),
                Position::new(1, 2),
            ]
        );
    }

    #[test]
    fn test_open_passage_is_symmetric() {
        let mut map = Map::new(3, 3).unwrap();
        map.open_passage(Position::new(1, 1), Direction::North).unwrap();

        assert!(map.is_open(Position::new(1, 1), Direction::North));
        assert!(map.is_open(Position::new(1, 0), Direction::South));
        assert_eq!(map.open_pair_count(), 1);
        assert!(map.check_symmetry().is_ok());

        // No neighbor past the edge
        assert!(map.open_passage(Position::new(0, 0), Direction::West).is_err());
    }

    #[test]
    fn test_symmetry_violation_is_detected() {
        let mut map = Map::new(2, 1).unwrap();
        map.set_entrance(Position::new(0, 0), Direction::East, Entrance::Open)
            .unwrap();
        assert!(map.check_symmetry().is_err());
    }

    #[test]
    fn test_open_map() {
        let map = Map::open(4, 4).unwrap();
        assert!(map.blocks().all(|block| block.open_mask() == 0b1111));
        assert_eq!(map.open_pair_count(), 24);
        assert!(map.check_symmetry().is_ok());
    }

    #[test]
    fn test_neighbor_lookup() {
        let map = Map::new(3, 3).unwrap();
        let corner = Position::new(0, 0);
        assert_eq!(map.neighbor(corner, Direction::North), None);
        assert_eq!(map.neighbor(corner, Direction::West), None);
        assert_eq!(map.neighbor(corner, Direction::East), Some(Position::new(1, 0)));
        assert_eq!(
            map.adjacent_block(corner, Direction::South).map(MapBlock::position),
            Some(Position::new(0, 1))
        );
    }

    #[test]
    fn test_spawn_and_occupancy() {
        let mut map = Map::open(3, 1).unwrap();
        let rat = map
            .spawn_creature(CreatureBlueprint::monster("Rat"), Position::new(1, 0))
            .unwrap();
        let sword = map
            .spawn_item(ItemBlueprint::weapon("Sword", 3), Position::new(1, 0))
            .unwrap();

        assert_ne!(rat, sword);
        assert!(map.is_occupied(Position::new(1, 0)));
        assert_eq!(map.creature_at(Position::new(1, 0)).unwrap().id(), rat);
        assert_eq!(map.item_at(Position::new(1, 0)).unwrap().id(), sword);
        assert!(!map.can_enter(Position::new(0, 0), Direction::East));
        assert!(map.can_enter(Position::new(1, 0), Direction::East));
        // Open border entrance, but nothing beyond it
        assert!(!map.can_enter(Position::new(2, 0), Direction::East));

        let err = map
            .spawn_creature(CreatureBlueprint::monster("Bat"), Position::new(1, 0))
            .unwrap_err();
        assert!(matches!(err, DelveError::Occupied(_)));
        let err = map
            .spawn_item(ItemBlueprint::trinket("Coin", 1), Position::new(9, 9))
            .unwrap_err();
        assert!(matches!(err, DelveError::OutOfBounds(_)));
    }

    #[test]
    fn test_relocate_updates_both_sides() {
        let mut map = Map::open(2, 1).unwrap();
        let id = map
            .spawn_creature(CreatureBlueprint::human("Hero"), Position::new(0, 0))
            .unwrap();

        let from = map.relocate_creature(id, Position::new(1, 0)).unwrap();
        assert_eq!(from, Position::new(0, 0));
        assert!(!map.is_occupied(Position::new(0, 0)));
        assert_eq!(map.block(Position::new(1, 0)).unwrap().creature(), Some(id));
        assert_eq!(map.creature(id).unwrap().position(), Position::new(1, 0));
    }

    #[test]
    fn test_take_and_place_item() {
        let mut map = Map::new(2, 1).unwrap();
        let id = map
            .spawn_item(ItemBlueprint::armor("Shield", 2), Position::new(0, 0))
            .unwrap();

        let item = map.take_item(Position::new(0, 0)).unwrap().unwrap();
        assert_eq!(item.id(), id);
        assert_eq!(item.position(), None);
        assert!(map.item(id).is_none());
        assert!(map.take_item(Position::new(0, 0)).unwrap().is_none());

        map.place_item(item, Position::new(1, 0)).unwrap();
        assert_eq!(map.item(id).unwrap().position(), Some(Position::new(1, 0)));
    }

    #[test]
    fn test_restore_keeps_ids_and_advances_counter() {
        let mut map = Map::new(3, 1).unwrap();
        map.restore_creature(ObjectId(10), CreatureBlueprint::monster("Rat"), Position::new(0, 0))
            .unwrap();
        assert!(map
            .restore_item(ObjectId(10), ItemBlueprint::trinket("Coin", 1), Position::new(1, 0))
            .is_err());

        let next = map
            .spawn_item(ItemBlueprint::trinket("Coin", 1), Position::new(2, 0))
            .unwrap();
        assert_eq!(next, ObjectId(11));
    }

    #[test]
    fn test_winning_block_bounds() {
        let mut map = Map::new(2, 2).unwrap();
        assert!(map.set_winning_block(Some(Position::new(2, 0))).is_err());
        map.set_winning_block(Some(Position::new(1, 1))).unwrap();
        assert!(map.is_winning_block(Position::new(1, 1)));
        map.set_winning_block(None).unwrap();
        assert!(!map.is_winning_block(Position::new(1, 1)));
    }
}
