//! # Creature AI
//!
//! Per-tick decision making. Every creature carries a [`Brain`]; the turn loop
//! calls [`think`] once per tick for each AI player and monster, which may
//! queue the creature's next action.

use crate::{Action, CreatureKind, AiKind, DelveError, DelveResult, DfsExplorer, Map, ObjectId, RandomWalker};
use log::trace;
use rand::rngs::StdRng;

/// The decision strategy attached to a creature.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Brain {
    /// Never decides anything; human players and unknown creatures
    #[default]
    Idle,
    /// Bounded random walk
    Walker(RandomWalker),
    /// Depth-first maze exploration
    Explorer(DfsExplorer),
}

impl Brain {
    /// The brain a creature of `kind` starts with.
    pub fn for_kind(kind: CreatureKind, rng: &mut StdRng) -> Self {
        match kind {
            CreatureKind::Monster | CreatureKind::AiPlayer(AiKind::Wanderer) => {
                Brain::Walker(RandomWalker::new(rng))
            }
            CreatureKind::AiPlayer(AiKind::Explorer) => Brain::Explorer(DfsExplorer::new()),
            CreatureKind::HumanPlayer | CreatureKind::Unknown => Brain::Idle,
        }
    }

    /// Decides the next action for `actor` without touching the map.
    pub fn decide(&mut self, actor: ObjectId, map: &Map, rng: &mut StdRng) -> Option<Action> {
        match self {
            Brain::Idle => None,
            Brain::Walker(walker) => walker.think(actor, map, rng),
            Brain::Explorer(explorer) => explorer.think(actor, map),
        }
    }
}

/// Runs one decision cycle for `actor` and stores the result as its queued
/// next action. A brain that decides nothing leaves the queue as it was.
///
/// Returns the action that is queued afterwards.
pub fn think(map: &mut Map, actor: ObjectId, rng: &mut StdRng) -> DelveResult<Option<Action>> {
    let creature = map.creature_mut(actor).ok_or(DelveError::UnknownObject(actor))?;
    let mut brain = std::mem::take(&mut creature.brain);

    let decision = brain.decide(actor, map, rng);
    trace!("{} decided {:?}", actor, decision);

    let creature = map.creature_mut(actor).ok_or(DelveError::UnknownObject(actor))?;
    creature.brain = brain;
    if decision.is_some() {
        creature.next_action = decision;
    }
    Ok(creature.next_action)
}
