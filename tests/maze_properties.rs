//! Property tests for generated mazes and their binary encoding.

use delve::{
    deserialize, generate, is_connected, serialize, shortest_path, Direction, DelveResult, Map,
    Position,
};
use proptest::prelude::*;

fn assert_perfect_maze(map: &Map) {
    let blocks = map.block_count();
    assert_eq!(map.open_pair_count(), blocks - 1);
    assert!(map.check_symmetry().is_ok());
    assert!(is_connected(map));
    if blocks > 1 {
        assert!(map.blocks().all(|block| block.open_mask() != 0));
    }
    for pos in map.positions() {
        for direction in Direction::ALL {
            if map.neighbor(pos, direction).is_none() {
                assert!(!map.is_open(pos, direction), "border of {:?} is open", pos);
            }
        }
    }
}

proptest! {
    #[test]
    fn generated_mazes_are_perfect(width in 1u32..=14, height in 1u32..=14, seed in any::<u64>()) {
        let map = generate(width, height, Some(seed)).unwrap();
        prop_assert_eq!(map.width(), width);
        prop_assert_eq!(map.height(), height);
        assert_perfect_maze(&map);
        prop_assert!(map.winning_block().is_some());
    }

    #[test]
    fn seeds_reproduce_mazes(width in 1u32..=10, height in 1u32..=10, seed in any::<u64>()) {
        let a = generate(width, height, Some(seed)).unwrap();
        let b = generate(width, height, Some(seed)).unwrap();
        prop_assert_eq!(serialize(&a), serialize(&b));
    }

    #[test]
    fn encoding_round_trips(width in 1u32..=12, height in 1u32..=12, seed in any::<u64>()) {
        let map = generate(width, height, Some(seed)).unwrap();
        let bytes = serialize(&map);
        let expected_len = 3 + 16 + ((width * height) as usize).div_ceil(2) + 8;
        prop_assert_eq!(bytes.len(), expected_len);

        let decoded = deserialize(&bytes).unwrap();
        prop_assert_eq!(decoded.winning_block(), map.winning_block());
        for pos in map.positions() {
            prop_assert_eq!(decoded.block(pos).unwrap().entrances(), map.block(pos).unwrap().entrances());
        }
        prop_assert_eq!(serialize(&decoded), bytes);
    }

    #[test]
    fn decoder_never_panics_on_noise(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = deserialize(&bytes);
    }
}

#[test]
fn test_known_seed_is_stable_within_a_run() -> DelveResult<()> {
    let first = generate(5, 10, Some(87452))?;
    let second = generate(5, 10, Some(87452))?;
    assert_eq!(first, second);
    assert_perfect_maze(&first);
    Ok(())
}

#[test]
fn test_unique_paths() -> DelveResult<()> {
    let map = generate(9, 7, Some(4))?;
    let corner = Position::new(8, 6);
    let path = shortest_path(&map, Position::origin(), corner).expect("maze is connected");

    // In a tree the path cannot revisit a block
    let mut seen = std::collections::HashSet::new();
    assert!(path.iter().all(|pos| seen.insert(*pos)));
    for pair in path.windows(2) {
        assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
    }
    Ok(())
}

#[test]
fn test_single_block_maze() -> DelveResult<()> {
    let map = generate(1, 1, Some(0))?;
    assert_eq!(map.open_pair_count(), 0);
    assert_eq!(serialize(&map).len(), 3 + 16 + 1 + 8);
    Ok(())
}
