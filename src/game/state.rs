//! # Game State Module
//!
//! The turn loop and everything it records.
//!
//! [`Game`] owns the map, the turn order of every creature and the random
//! source the AI draws from. One call to [`Game::step`] is one tick: human
//! players act first, then AI players, then monsters, each in the order they
//! were added.

use crate::{
    ai, AiKind, Brain, Creature, CreatureBlueprint, CreatureKind, DelveError, DelveResult,
    Direction, ItemBlueprint, ItemKind, Map, ObjectId, Position, Stats,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Moved {
        creature: ObjectId,
        from: Position,
        to: Position,
    },
    Attacked {
        attacker: ObjectId,
        target: ObjectId,
        damage: i32,
    },
    Died {
        creature: ObjectId,
    },
    ItemPickedUp {
        creature: ObjectId,
        item: ObjectId,
    },
    ItemSwapped {
        creature: ObjectId,
        picked: ObjectId,
        dropped: ObjectId,
    },
    Won {
        creature: ObjectId,
    },
}

/// A game in progress.
#[derive(Debug)]
pub struct Game {
    map: Map,
    human_players: Vec<ObjectId>,
    ai_players: Vec<ObjectId>,
    monsters: Vec<ObjectId>,
    winner: Option<ObjectId>,
    rng: StdRng,
    turn_number: u64,
}

impl Game {
    /// Creates a game on `map` whose AI draws from a generator seeded with `seed`.
    ///
    /// Creatures already on the map are adopted; see [`Game::from_map`].
    pub fn new(map: Map, seed: u64) -> Self {
        Self::with_rng(map, StdRng::seed_from_u64(seed))
    }

    /// Creates a game that adopts every creature already on `map`.
    ///
    /// Creatures join the turn order by kind in id order and receive the
    /// brain their kind starts with. Use this for decoded maps.
    pub fn from_map(map: Map, seed: u64) -> Self {
        Self::new(map, seed)
    }

    /// Creates a game with an explicitly supplied random source.
    pub fn with_rng(map: Map, rng: StdRng) -> Self {
        let mut game = Self {
            map,
            human_players: Vec::new(),
            ai_players: Vec::new(),
            monsters: Vec::new(),
            winner: None,
            rng,
            turn_number: 0,
        };

        let existing: Vec<(ObjectId, CreatureKind)> = game
            .map
            .creatures()
            .map(|creature| (creature.id(), creature.kind))
            .collect();
        for (id, kind) in existing {
            game.enlist(id, kind);
        }

        info!(
            "Game created on a {}x{} map with {} players and {} monsters",
            game.map.width(),
            game.map.height(),
            game.human_players.len() + game.ai_players.len(),
            game.monsters.len()
        );
        game
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    /// Gives up the game and returns its map.
    pub fn into_map(self) -> Map {
        self.map
    }

    pub fn human_players(&self) -> &[ObjectId] {
        &self.human_players
    }

    pub fn ai_players(&self) -> &[ObjectId] {
        &self.ai_players
    }

    pub fn monsters(&self) -> &[ObjectId] {
        &self.monsters
    }

    pub fn winner(&self) -> Option<ObjectId> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Number of completed `step` calls.
    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    pub fn creature(&self, id: ObjectId) -> Option<&Creature> {
        self.map.creature(id)
    }

    /// Spawns a creature and adds it to the turn order its kind belongs to.
    pub fn add_creature(
        &mut self,
        blueprint: CreatureBlueprint,
        pos: Position,
    ) -> DelveResult<ObjectId> {
        let kind = blueprint.kind;
        let id = self.map.spawn_creature(blueprint, pos)?;
        self.enlist(id, kind);
        debug!("Added {:?} {} at {:?}", kind, id, pos);
        Ok(id)
    }

    pub fn add_human_player(
        &mut self,
        name: impl Into<String>,
        stats: Stats,
        pos: Position,
    ) -> DelveResult<ObjectId> {
        self.add_creature(
            CreatureBlueprint::new(name, CreatureKind::HumanPlayer, stats),
            pos,
        )
    }

    pub fn add_ai_player(
        &mut self,
        name: impl Into<String>,
        ai: AiKind,
        stats: Stats,
        pos: Position,
    ) -> DelveResult<ObjectId> {
        self.add_creature(
            CreatureBlueprint::new(name, CreatureKind::AiPlayer(ai), stats),
            pos,
        )
    }

    pub fn add_monster(
        &mut self,
        name: impl Into<String>,
        stats: Stats,
        pos: Position,
    ) -> DelveResult<ObjectId> {
        self.add_creature(CreatureBlueprint::new(name, CreatureKind::Monster, stats), pos)
    }

    pub fn add_item(&mut self, blueprint: ItemBlueprint, pos: Position) -> DelveResult<ObjectId> {
        self.map.spawn_item(blueprint, pos)
    }

    fn enlist(&mut self, id: ObjectId, kind: CreatureKind) {
        if let Some(creature) = self.map.creature_mut(id) {
            if creature.brain == Brain::Idle {
                creature.brain = Brain::for_kind(kind, &mut self.rng);
            }
        }
        match kind {
            CreatureKind::HumanPlayer => self.human_players.push(id),
            CreatureKind::AiPlayer(_) => self.ai_players.push(id),
            CreatureKind::Monster => self.monsters.push(id),
            CreatureKind::Unknown => {}
        }
    }

    /// Queues `action` as its actor's next action, replacing any queued one.
    pub fn submit_action(&mut self, action: crate::Action) -> DelveResult<()> {
        let actor = action.actor();
        let creature = self
            .map
            .creature_mut(actor)
            .ok_or(DelveError::UnknownObject(actor))?;
        creature.next_action = Some(action);
        Ok(())
    }

    /// Directions `actor` could move in right now.
    pub fn legal_directions(&self, actor: ObjectId) -> Vec<Direction> {
        let Some(pos) = self.map.creature(actor).map(Creature::position) else {
            return Vec::new();
        };
        Direction::ALL
            .into_iter()
            .filter(|direction| self.map.can_enter(pos, *direction))
            .collect()
    }

    /// Advances the game by one tick and returns what happened.
    ///
    /// The first player to stand on the winning block ends the tick at once.
    /// An action error aborts the rest of the tick and is returned as is.
    pub fn step(&mut self) -> DelveResult<Vec<GameEvent>> {
        let mut events = Vec::new();
        if self.winner.is_some() {
            return Ok(events);
        }
        self.turn_number += 1;

        for index in 0..self.human_players.len() {
            let id = self.human_players[index];
            if !self.is_alive(id) {
                continue;
            }
            self.run_queued_action(id, &mut events)?;
            if self.check_victory(id, &mut events) {
                return Ok(events);
            }
        }

        for index in 0..self.ai_players.len() {
            let id = self.ai_players[index];
            if !self.is_alive(id) {
                continue;
            }
            ai::think(&mut self.map, id, &mut self.rng)?;
            self.run_queued_action(id, &mut events)?;
            if self.check_victory(id, &mut events) {
                return Ok(events);
            }
        }

        for index in 0..self.monsters.len() {
            let id = self.monsters[index];
            if !self.is_alive(id) {
                continue;
            }
            ai::think(&mut self.map, id, &mut self.rng)?;
            self.run_queued_action(id, &mut events)?;
        }

        Ok(events)
    }

    fn is_alive(&self, id: ObjectId) -> bool {
        self.map.creature(id).is_some_and(Creature::is_alive)
    }

    fn run_queued_action(&mut self, id: ObjectId, events: &mut Vec<GameEvent>) -> DelveResult<()> {
        let queued = self
            .map
            .creature_mut(id)
            .and_then(|creature| creature.next_action.take());
        if let Some(action) = queued {
            events.extend(action.execute(&mut self.map)?);
        }
        Ok(())
    }

    fn check_victory(&mut self, id: ObjectId, events: &mut Vec<GameEvent>) -> bool {
        let Some(creature) = self.map.creature(id) else {
            return false;
        };
        if !self.map.is_winning_block(creature.position()) {
            return false;
        }

        info!("{} ({}) reached the winning block on turn {}", creature.name, id, self.turn_number);
        self.winner = Some(id);
        events.push(GameEvent::Won { creature: id });
        true
    }

    /// A serializable picture of the current state for hosts.
    pub fn snapshot(&self) -> GameSnapshot {
        let map = &self.map;
        let grid = (0..map.height() as i32)
            .map(|y| {
                (0..map.width() as i32)
                    .filter_map(|x| map.block(Position::new(x, y)).map(|block| block.open_mask()))
                    .collect()
            })
            .collect();

        GameSnapshot {
            turn_number: self.turn_number,
            width: map.width(),
            height: map.height(),
            winning_block: map.winning_block(),
            winner: self.winner,
            grid,
            creatures: map
                .creatures()
                .map(|creature| CreatureSnapshot {
                    id: creature.id(),
                    name: creature.name.clone(),
                    kind: creature.kind,
                    position: creature.position(),
                    current_hp: creature.current_hp,
                    max_hp: creature.stats.hp,
                    attack: creature.total_attack(),
                    defense: creature.total_defense(),
                    alive: creature.is_alive(),
                    inventory: creature.inventory().iter().map(|item| item.id()).collect(),
                })
                .collect(),
            items: map
                .items()
                .filter_map(|item| {
                    item.position().map(|position| ItemSnapshot {
                        id: item.id(),
                        name: item.name.clone(),
                        kind: item.kind,
                        position,
                    })
                })
                .collect(),
        }
    }
}

/// Read-only copy of a game for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub turn_number: u64,
    pub width: u32,
    pub height: u32,
    pub winning_block: Option<Position>,
    pub winner: Option<ObjectId>,
    /// Open-entrance masks, one row per y
    pub grid: Vec<Vec<u8>>,
    pub creatures: Vec<CreatureSnapshot>,
    pub items: Vec<ItemSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureSnapshot {
    pub id: ObjectId,
    pub name: String,
    pub kind: CreatureKind,
    pub position: Position,
    pub current_hp: f32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub alive: bool,
    pub inventory: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ObjectId,
    pub name: String,
    pub kind: ItemKind,
    pub position: Position,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, DfsExplorer};

    #[test]
    fn test_ai_player_wins_on_single_block_map() {
        let mut map = Map::new(1, 1).unwrap();
        map.set_winning_block(Some(Position::new(0, 0))).unwrap();
        let mut game = Game::new(map, 12345);
        let scout = game
            .add_ai_player("Scout", AiKind::Explorer, Stats::player(), Position::new(0, 0))
            .unwrap();

        let events = game.step().unwrap();
        assert_eq!(game.winner(), Some(scout));
        assert_eq!(events, vec![GameEvent::Won { creature: scout }]);
        assert!(game.is_over());
    }

    #[test]
    fn test_no_winning_block_means_no_winner() {
        let map = Map::new(1, 1).unwrap();
        let mut game = Game::new(map, 1);
        game.add_ai_player("Scout", AiKind::Explorer, Stats::player(), Position::new(0, 0))
            .unwrap();

        game.step().unwrap();
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_human_win_ends_tick_before_ai_thinks() {
        let mut map = Map::open(3, 1).unwrap();
        map.set_winning_block(Some(Position::new(1, 0))).unwrap();
        let mut game = Game::new(map, 1);
        let hero = game
            .add_human_player("Hero", Stats::player(), Position::new(0, 0))
            .unwrap();
        let scout = game
            .add_ai_player("Scout", AiKind::Explorer, Stats::player(), Position::new(2, 0))
            .unwrap();

        game.submit_action(Action::move_to(hero, Direction::East)).unwrap();
        let events = game.step().unwrap();

        assert_eq!(game.winner(), Some(hero));
        assert_eq!(events.last(), Some(&GameEvent::Won { creature: hero }));
        assert_eq!(
            game.creature(scout).unwrap().brain,
            Brain::Explorer(DfsExplorer::new())
        );

        // Game over: further steps change nothing
        assert!(game.step().unwrap().is_empty());
        assert_eq!(game.turn_number(), 1);
    }

    #[test]
    fn test_humans_without_orders_wait() {
        let mut game = Game::new(Map::open(2, 2).unwrap(), 1);
        let hero = game
            .add_human_player("Hero", Stats::player(), Position::new(0, 0))
            .unwrap();

        assert!(game.step().unwrap().is_empty());
        assert_eq!(game.creature(hero).unwrap().position(), Position::new(0, 0));
        assert_eq!(game.turn_number(), 1);
    }

    #[test]
    fn test_queued_action_runs_once() {
        let mut game = Game::new(Map::open(3, 1).unwrap(), 1);
        let hero = game
            .add_human_player("Hero", Stats::player(), Position::new(0, 0))
            .unwrap();

        game.submit_action(Action::move_to(hero, Direction::East)).unwrap();
        game.step().unwrap();
        game.step().unwrap();
        assert_eq!(game.creature(hero).unwrap().position(), Position::new(1, 0));
        assert!(game.creature(hero).unwrap().next_action.is_none());
    }

    #[test]
    fn test_explorer_recovers_from_host_move() {
        let mut game = Game::new(Map::open(3, 1).unwrap(), 1);
        let scout = game
            .add_ai_player("Scout", AiKind::Explorer, Stats::player(), Position::new(0, 0))
            .unwrap();
        game.step().unwrap();
        game.step().unwrap();
        assert_eq!(game.creature(scout).unwrap().position(), Position::new(2, 0));

        // The explorer pauses at the dead end, so the host's move runs instead
        game.submit_action(Action::move_to(scout, Direction::West)).unwrap();
        game.step().unwrap();
        assert_eq!(game.creature(scout).unwrap().position(), Position::new(1, 0));

        let mut visited = Vec::new();
        for _ in 0..4 {
            game.step().unwrap();
            visited.push(game.creature(scout).unwrap().position().x);
        }
        assert_eq!(visited, vec![1, 2, 1, 0]);

        game.step().unwrap();
        assert!(matches!(
            &game.creature(scout).unwrap().brain,
            Brain::Explorer(explorer) if explorer.is_finished()
        ));
    }

    #[test]
    fn test_action_error_aborts_step() {
        let mut game = Game::new(Map::new(2, 1).unwrap(), 1);
        let hero = game
            .add_human_player("Hero", Stats::player(), Position::new(0, 0))
            .unwrap();

        game.submit_action(Action::move_to(hero, Direction::East)).unwrap();
        let err = game.step().unwrap_err();
        assert!(matches!(err, DelveError::MovementBlocked { .. }));
        assert_eq!(game.creature(hero).unwrap().position(), Position::new(0, 0));
    }

    #[test]
    fn test_monsters_never_win() {
        let mut map = Map::new(1, 1).unwrap();
        map.set_winning_block(Some(Position::new(0, 0))).unwrap();
        let mut game = Game::new(map, 1);
        game.add_monster("Rat", Stats::monster(), Position::new(0, 0))
            .unwrap();

        game.step().unwrap();
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_dead_players_are_skipped() {
        let mut map = Map::new(1, 1).unwrap();
        map.set_winning_block(Some(Position::new(0, 0))).unwrap();
        let mut game = Game::new(map, 1);
        let scout = game
            .add_ai_player("Scout", AiKind::Explorer, Stats::player(), Position::new(0, 0))
            .unwrap();
        game.map_mut().creature_mut(scout).unwrap().current_hp = 0.0;

        game.step().unwrap();
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_from_map_adopts_creatures_in_id_order() {
        let mut map = Map::open(4, 1).unwrap();
        let rat = map
            .spawn_creature(CreatureBlueprint::monster("Rat"), Position::new(0, 0))
            .unwrap();
        let scout = map
            .spawn_creature(
                CreatureBlueprint::ai_player("Scout", AiKind::Explorer),
                Position::new(1, 0),
            )
            .unwrap();
        let hero = map
            .spawn_creature(CreatureBlueprint::human("Hero"), Position::new(2, 0))
            .unwrap();
        map.spawn_creature(
            CreatureBlueprint::new("???", CreatureKind::Unknown, Stats::monster()),
            Position::new(3, 0),
        )
        .unwrap();

        let game = Game::from_map(map, 9);
        assert_eq!(game.human_players(), &[hero]);
        assert_eq!(game.ai_players(), &[scout]);
        assert_eq!(game.monsters(), &[rat]);
        assert!(matches!(game.creature(rat).unwrap().brain, Brain::Walker(_)));
        assert!(matches!(game.creature(scout).unwrap().brain, Brain::Explorer(_)));
        assert_eq!(game.creature(hero).unwrap().brain, Brain::Idle);
    }

    #[test]
    fn test_legal_directions() {
        let mut map = Map::new(3, 3).unwrap();
        map.open_passage(Position::new(1, 1), Direction::North).unwrap();
        map.open_passage(Position::new(1, 1), Direction::East).unwrap();
        let mut game = Game::new(map, 1);
        let hero = game
            .add_human_player("Hero", Stats::player(), Position::new(1, 1))
            .unwrap();
        game.add_monster("Rat", Stats::monster(), Position::new(2, 1))
            .unwrap();

        assert_eq!(game.legal_directions(hero), vec![Direction::North]);
        assert!(game.legal_directions(ObjectId(999)).is_empty());
    }

    #[test]
    fn test_snapshot() {
        let mut map = Map::open(2, 1).unwrap();
        map.set_winning_block(Some(Position::new(1, 0))).unwrap();
        let mut game = Game::new(map, 1);
        let hero = game
            .add_human_player("Hero", Stats::new(12, 3, 1), Position::new(0, 0))
            .unwrap();
        let coin = game
            .add_item(ItemBlueprint::trinket("Coin", 5), Position::new(1, 0))
            .unwrap();

        let snapshot = game.snapshot();
        assert_eq!(snapshot.width, 2);
        assert_eq!(snapshot.grid, vec![vec![0b1111, 0b1111]]);
        assert_eq!(snapshot.winning_block, Some(Position::new(1, 0)));
        assert_eq!(snapshot.creatures.len(), 1);
        assert_eq!(snapshot.creatures[0].id, hero);
        assert_eq!(snapshot.creatures[0].max_hp, 12);
        assert!(snapshot.creatures[0].alive);
        assert_eq!(snapshot.items[0].id, coin);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
