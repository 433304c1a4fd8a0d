//! # Autoexplore Module
//!
//! Depth-first maze exploration for computer-controlled players.
//!
//! The explorer keeps an explicit stack of the blocks on its current path and
//! a set of every block it has entered. It walks into unexplored neighbors
//! while it can, then backs up along the stack until it finds a block with
//! unexplored neighbors again. Every reachable block is entered exactly once
//! and the walk ends back at the start.

use crate::{Action, Direction, Map, ObjectId, Position};
use log::trace;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// Whether a block on the explorer's path still has anything left to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    /// Entered; neighbors may still be unexplored
    Open,
    /// Fully explored
    Closed,
}

/// A block the explorer has entered.
///
/// Two records are equal when they name the same coordinates, whatever their
/// state.
#[derive(Debug, Clone, Copy)]
pub struct VisitedBlock {
    pub position: Position,
    pub state: VisitState,
}

impl VisitedBlock {
    fn open(position: Position) -> Self {
        Self {
            position,
            state: VisitState::Open,
        }
    }
}

impl PartialEq for VisitedBlock {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for VisitedBlock {}

impl Hash for VisitedBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
    }
}

/// Wall-clock rate limit for AI decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct Throttle {
    /// Minimum time between two actions; None means unlimited
    pub min_interval: Option<Duration>,
    /// Last action execution time for speed control
    pub last_action_time: Option<Instant>,
    /// Ignore the rate limit entirely
    pub bypass: bool,
}

impl Throttle {
    /// A throttle that never holds anything back.
    pub fn unlimited() -> Self {
        Self {
            min_interval: None,
            last_action_time: None,
            bypass: false,
        }
    }

    /// A throttle allowing at most `actions_per_second` actions.
    pub fn per_second(actions_per_second: f64) -> Self {
        let min_interval = (actions_per_second > 0.0 && actions_per_second.is_finite())
            .then(|| Duration::from_secs_f64(1.0 / actions_per_second));
        Self {
            min_interval,
            last_action_time: None,
            bypass: false,
        }
    }

    /// Checks if enough time has passed for the next action.
    pub fn can_perform_action(&self) -> bool {
        if self.bypass {
            return true;
        }
        match (self.min_interval, self.last_action_time) {
            (Some(interval), Some(last_time)) => last_time.elapsed() >= interval,
            _ => true,
        }
    }

    /// Updates the last action time.
    pub fn mark_action_performed(&mut self) {
        self.last_action_time = Some(Instant::now());
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Iterative depth-first explorer.
#[derive(Debug, Clone, PartialEq)]
pub struct DfsExplorer {
    stack: Vec<VisitedBlock>,
    visited: HashSet<VisitedBlock>,
    turning_back: bool,
    /// Rate limit applied to every decision
    pub throttle: Throttle,
}

impl DfsExplorer {
    /// Creates an unthrottled explorer that has not started yet.
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            visited: HashSet::new(),
            turning_back: false,
            throttle: Throttle::unlimited(),
        }
    }

    /// Creates an explorer that acts at most `actions_per_second` times a second.
    pub fn with_rate_limit(actions_per_second: f64) -> Self {
        Self {
            throttle: Throttle::per_second(actions_per_second),
            ..Self::new()
        }
    }

    /// Turns the rate limit off (or back on) without forgetting it.
    pub fn bypass_throttle(&mut self, bypass: bool) {
        self.throttle.bypass = bypass;
    }

    /// Blocks on the current path, from the start to the current block.
    pub fn path(&self) -> &[VisitedBlock] {
        &self.stack
    }

    /// Number of distinct blocks entered so far.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn has_visited(&self, pos: Position) -> bool {
        self.visited.contains(&VisitedBlock::open(pos))
    }

    /// True once the explorer has started and backed all the way out.
    pub fn is_finished(&self) -> bool {
        !self.visited.is_empty() && self.stack.is_empty()
    }

    /// Decides the next step for `actor`, if any.
    pub fn think(&mut self, actor: ObjectId, map: &Map) -> Option<Action> {
        if !self.throttle.can_perform_action() {
            return None;
        }

        let here = map.creature(actor)?.position();
        if self.visited.is_empty() {
            let start = VisitedBlock::open(here);
            self.stack.push(start);
            self.visited.insert(start);
        } else {
            self.follow(actor, here);
        }
        let top = *self.stack.last()?;

        if let Some(direction) = self.unexplored_directions(map, top.position).last().copied() {
            let next = VisitedBlock::open(top.position.step(direction));
            self.turning_back = false;
            self.stack.push(next);
            self.visited.insert(next);
            self.throttle.mark_action_performed();
            return Some(Action::move_to(actor, direction));
        }

        if !self.turning_back {
            trace!("{} reached a dead end at {:?}", actor, top.position);
            self.turning_back = true;
            self.close_top();
            return None;
        }

        let Some(previous) = self.stack.len().checked_sub(2).map(|index| self.stack[index]) else {
            self.close_top();
            self.stack.pop();
            trace!("{} finished exploring", actor);
            return None;
        };
        let direction = Direction::from_delta(previous.position - top.position)?;
        if !map.can_enter(top.position, direction) {
            return None;
        }
        self.close_top();
        self.stack.pop();
        self.throttle.mark_action_performed();
        Some(Action::move_to(actor, direction))
    }

    /// Catches the path up with a move the explorer did not plan itself.
    ///
    /// A one-block detour is pushed onto the path so backing out retraces it.
    /// Anything farther restarts the path from the current block.
    fn follow(&mut self, actor: ObjectId, here: Position) {
        let Some(top) = self.stack.last().copied() else {
            return;
        };
        if top.position == here {
            return;
        }

        trace!("{} was moved from {:?} to {:?}", actor, top.position, here);
        if Direction::from_delta(here - top.position).is_none() {
            self.stack.clear();
        }
        let block = VisitedBlock::open(here);
        self.stack.push(block);
        self.visited.insert(block);
        self.turning_back = false;
    }

    fn close_top(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            top.state = VisitState::Closed;
            self.visited.replace(*top);
        }
    }

    /// Open, unoccupied and unvisited neighbors in North, East, South, West order.
    fn unexplored_directions(&self, map: &Map, pos: Position) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|direction| map.can_enter(pos, *direction))
            .filter(|direction| !self.has_visited(pos.step(*direction)))
            .collect()
    }
}

impl Default for DfsExplorer {
    fn default() -> Self {
        Self::new()
    }
}
