//! # Actions
//!
//! Command pattern for every state change a creature can cause.
//!
//! An [`Action`] is validated in full before anything is mutated, so a failed
//! action leaves the map exactly as it was. Hosts that only want to know
//! whether an action would succeed can ask [`Action::is_legal`] instead of
//! matching on errors.

use crate::{DelveError, DelveResult, Direction, GameEvent, ItemKind, Map, ObjectId, Position};
use log::debug;
use serde::{Deserialize, Serialize};

/// A single command issued by a player or an AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Step into the neighboring block
    Move { actor: ObjectId, direction: Direction },
    /// Hit the creature standing in the neighboring block
    Attack { actor: ObjectId, direction: Direction },
    /// Take the item lying on the actor's own block
    PickUp { actor: ObjectId },
}

impl Action {
    pub fn move_to(actor: ObjectId, direction: Direction) -> Self {
        Action::Move { actor, direction }
    }

    pub fn attack(actor: ObjectId, direction: Direction) -> Self {
        Action::Attack { actor, direction }
    }

    pub fn pick_up(actor: ObjectId) -> Self {
        Action::PickUp { actor }
    }

    /// The creature performing the action.
    pub fn actor(&self) -> ObjectId {
        match *self {
            Action::Move { actor, .. } | Action::Attack { actor, .. } | Action::PickUp { actor } => {
                actor
            }
        }
    }

    /// Checks every precondition without touching the map.
    pub fn validate(&self, map: &Map) -> DelveResult<()> {
        match *self {
            Action::Move { actor, direction } => validate_move(map, actor, direction).map(|_| ()),
            Action::Attack { actor, direction } => {
                validate_attack(map, actor, direction).map(|_| ())
            }
            Action::PickUp { actor } => validate_pick_up(map, actor),
        }
    }

    /// Non-throwing form of [`Action::validate`].
    pub fn is_legal(&self, map: &Map) -> bool {
        self.validate(map).is_ok()
    }

    /// Performs the action, returning the events it caused.
    ///
    /// On error nothing has been changed.
    pub fn execute(&self, map: &mut Map) -> DelveResult<Vec<GameEvent>> {
        match *self {
            Action::Move { actor, direction } => execute_move(map, actor, direction),
            Action::Attack { actor, direction } => execute_attack(map, actor, direction),
            Action::PickUp { actor } => execute_pick_up(map, actor),
        }
    }
}

fn actor_position(map: &Map, actor: ObjectId) -> DelveResult<Position> {
    map.creature(actor)
        .map(|creature| creature.position())
        .ok_or(DelveError::UnknownObject(actor))
}

fn validate_move(map: &Map, actor: ObjectId, direction: Direction) -> DelveResult<Position> {
    let from = actor_position(map, actor)?;
    if !map.can_enter(from, direction) {
        return Err(DelveError::MovementBlocked { actor, direction });
    }
    Ok(from.step(direction))
}

fn execute_move(map: &mut Map, actor: ObjectId, direction: Direction) -> DelveResult<Vec<GameEvent>> {
    let to = validate_move(map, actor, direction)?;
    let from = map.relocate_creature(actor, to)?;
    debug!("{} moved {:?} from {:?} to {:?}", actor, direction, from, to);

    Ok(vec![GameEvent::Moved {
        creature: actor,
        from,
        to,
    }])
}

fn validate_attack(map: &Map, actor: ObjectId, direction: Direction) -> DelveResult<ObjectId> {
    let from = actor_position(map, actor)?;
    if !map.is_open(from, direction) {
        return Err(DelveError::InvalidAttack { actor, direction });
    }
    map.neighbor(from, direction)
        .and_then(|pos| map.creature_at(pos))
        .map(|target| target.id())
        .ok_or(DelveError::InvalidAttack { actor, direction })
}

fn execute_attack(
    map: &mut Map,
    actor: ObjectId,
    direction: Direction,
) -> DelveResult<Vec<GameEvent>> {
    let target_id = validate_attack(map, actor, direction)?;
    let attack = map
        .creature(actor)
        .map(|creature| creature.total_attack())
        .ok_or(DelveError::UnknownObject(actor))?;
    let target = map
        .creature_mut(target_id)
        .ok_or(DelveError::UnknownObject(target_id))?;

    let damage = (attack - target.total_defense()).max(0);
    let died = target.apply_damage(damage);
    debug!(
        "{} hit {} for {} damage ({} hp left)",
        actor, target_id, damage, target.current_hp
    );

    let mut events = vec![GameEvent::Attacked {
        attacker: actor,
        target: target_id,
        damage,
    }];
    if died {
        events.push(GameEvent::Died { creature: target_id });
    }
    Ok(events)
}

fn validate_pick_up(map: &Map, actor: ObjectId) -> DelveResult<()> {
    let creature = map.creature(actor).ok_or(DelveError::UnknownObject(actor))?;
    let Some(gear) = creature.gear() else {
        // Only players pick things up; everyone else shrugs
        return Ok(());
    };
    let item = map
        .item_at(creature.position())
        .ok_or(DelveError::NothingToPickUp { actor })?;

    match item.kind {
        ItemKind::Trinket { .. } if !gear.has_room() => Err(DelveError::InventoryFull {
            actor,
            capacity: gear.capacity(),
        }),
        ItemKind::Trinket { .. } | ItemKind::Weapon { .. } | ItemKind::Armor { .. } => Ok(()),
        ItemKind::Unknown { .. } => Err(DelveError::UnknownItemKind { item: item.id() }),
    }
}

fn execute_pick_up(map: &mut Map, actor: ObjectId) -> DelveResult<Vec<GameEvent>> {
    validate_pick_up(map, actor)?;
    let pos = actor_position(map, actor)?;
    if map.creature(actor).and_then(|creature| creature.gear()).is_none() {
        return Ok(Vec::new());
    }

    let item = map
        .take_item(pos)?
        .ok_or(DelveError::NothingToPickUp { actor })?;
    let item_id = item.id();
    let kind = item.kind;

    let gear = map
        .creature_mut(actor)
        .and_then(|creature| creature.gear.as_mut())
        .ok_or(DelveError::UnknownObject(actor))?;
    let dropped = match kind {
        ItemKind::Trinket { .. } => {
            if let Err(item) = gear.stash(item) {
                let capacity = gear.capacity();
                map.place_item(item, pos)?;
                return Err(DelveError::InventoryFull { actor, capacity });
            }
            None
        }
        ItemKind::Weapon { .. } => gear.weapon.replace(item),
        ItemKind::Armor { .. } => gear.armor.replace(item),
        ItemKind::Unknown { .. } => {
            map.place_item(item, pos)?;
            return Err(DelveError::UnknownItemKind { item: item_id });
        }
    };

    match dropped {
        Some(old) => {
            let old_id = old.id();
            map.place_item(old, pos)?;
            debug!("{} swapped {} for {} at {:?}", actor, old_id, item_id, pos);
            Ok(vec![GameEvent::ItemSwapped {
                creature: actor,
                picked: item_id,
                dropped: old_id,
            }])
        }
        None => {
            debug!("{} picked up {} at {:?}", actor, item_id, pos);
            Ok(vec![GameEvent::ItemPickedUp {
                creature: actor,
                item: item_id,
            }])
        }
    }
}
