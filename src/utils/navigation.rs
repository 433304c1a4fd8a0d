//! # Maze Navigation
//!
//! Breadth-first queries over the passages of a [`Map`].
//!
//! These follow open entrances only and ignore creatures, so they describe the
//! shape of the maze rather than who can move where this tick.

use crate::{Direction, Map, Position};
use pathfinding::prelude::{bfs, bfs_reach, dijkstra_all};
use std::collections::{HashMap, HashSet};

/// Neighbors of `pos` joined to it by an open passage.
pub fn passable_neighbors(map: &Map, pos: Position) -> Vec<Position> {
    Direction::ALL
        .into_iter()
        .filter(|direction| map.is_open(pos, *direction))
        .filter_map(|direction| map.neighbor(pos, direction))
        .collect()
}

/// Every block reachable from `start`, `start` included.
///
/// # Examples
///
/// ```
/// use delve::{reachable_positions, Direction, Map, Position};
///
/// let mut map = Map::new(3, 1).unwrap();
/// map.open_passage(Position::new(0, 0), Direction::East).unwrap();
/// assert_eq!(reachable_positions(&map, Position::new(0, 0)).len(), 2);
/// ```
pub fn reachable_positions(map: &Map, start: Position) -> HashSet<Position> {
    if !map.contains(start) {
        return HashSet::new();
    }
    bfs_reach(start, |pos| passable_neighbors(map, *pos)).collect()
}

/// Checks whether every block can be reached from every other.
pub fn is_connected(map: &Map) -> bool {
    reachable_positions(map, Position::origin()).len() == map.block_count()
}

/// The shortest chain of blocks from `from` to `to`, both ends included.
pub fn shortest_path(map: &Map, from: Position, to: Position) -> Option<Vec<Position>> {
    if !map.contains(from) || !map.contains(to) {
        return None;
    }
    bfs(&from, |pos| passable_neighbors(map, *pos), |pos| *pos == to)
}

/// Number of steps from `start` to every block reachable from it.
pub fn path_distances(map: &Map, start: Position) -> HashMap<Position, u32> {
    if !map.contains(start) {
        return HashMap::new();
    }
    let mut distances: HashMap<Position, u32> = dijkstra_all(&start, |pos| {
        passable_neighbors(map, *pos)
            .into_iter()
            .map(|next| (next, 1u32))
    })
    .into_iter()
    .map(|(pos, (_, cost))| (pos, cost))
    .collect();
    distances.insert(start, 0);
    distances
}

/// The reachable block farthest from `start` by maze path.
///
/// Ties go to the smallest position so the answer does not depend on hashing.
pub fn farthest_position(map: &Map, start: Position) -> Option<Position> {
    path_distances(map, start)
        .into_iter()
        .max_by(|(a_pos, a_dist), (b_pos, b_dist)| a_dist.cmp(b_dist).then(b_pos.cmp(a_pos)))
        .map(|(pos, _)| pos)
}
