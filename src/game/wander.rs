//! # Wandering
//!
//! The bounded random walker used by monsters and wanderer AI players.
//!
//! A walker strikes out in random directions until it has taken `capacity`
//! steps, then retraces its path exactly back to where it started, and
//! repeats. The tick on which it turns around, in either direction, queues
//! no action.

use crate::{config, Action, Direction, Map, ObjectId};
use log::trace;
use rand::rngs::StdRng;
use rand::Rng;

/// Random walk that always returns home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomWalker {
    path: Vec<Direction>,
    capacity: usize,
    retracing: bool,
}

impl RandomWalker {
    /// Creates a walker whose path capacity is drawn once from `rng`.
    pub fn new(rng: &mut StdRng) -> Self {
        let capacity = rng.gen_range(config::MIN_WALKER_CAPACITY..=config::MAX_WALKER_CAPACITY);
        Self::with_capacity(capacity)
    }

    /// Creates a walker with a fixed path capacity (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            path: Vec::new(),
            capacity: capacity.max(1),
            retracing: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Steps taken away from home that have not been retraced yet.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn is_retracing(&self) -> bool {
        self.retracing
    }

    /// Decides the next step for `actor`, if any.
    pub fn think(&mut self, actor: ObjectId, map: &Map, rng: &mut StdRng) -> Option<Action> {
        let pos = map.creature(actor)?.position();

        if self.retracing {
            let Some(&last) = self.path.last() else {
                trace!("{} is home again", actor);
                self.retracing = false;
                return None;
            };
            let back = last.opposite();
            if !map.can_enter(pos, back) {
                // Someone is standing on the way home; wait for them to leave
                return None;
            }
            self.path.pop();
            return Some(Action::move_to(actor, back));
        }

        if self.path.len() >= self.capacity {
            trace!("{} turns back after {} steps", actor, self.path.len());
            self.retracing = true;
            return None;
        }

        for _ in 0..config::WALKER_SAMPLE_ATTEMPTS {
            let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
            if map.can_enter(pos, direction) {
                self.path.push(direction);
                return Some(Action::move_to(actor, direction));
            }
        }
        None
    }
}
