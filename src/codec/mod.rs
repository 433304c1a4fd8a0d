//! # Binary Map Codec
//!
//! The compact `DM` map format.
//!
//! ## Layout
//!
//! All integers are 4-byte little-endian unless noted.
//!
//! 1. Magic `'D' 'M'` and a one-byte format version (currently 1)
//! 2. Width, height, winning block x and y (`-1, -1` when there is none)
//! 3. One nibble per block, x outer and y inner, two blocks per byte with the
//!    first in the low nibble. Bit 0 is North, then East, South and West; a
//!    set bit means the entrance is open
//! 4. Creature count, then per creature in id order: id, name, x, y, a
//!    one-byte kind tag, base hp, attack and defense
//! 5. Item count, then per placed item in id order: id, name, x, y, a
//!    one-byte kind tag and the kind's parameter
//!
//! Names are a length followed by UTF-8 bytes, at most
//! [`MAX_NAME_BYTES`](crate::config::MAX_NAME_BYTES) long.
//!
//! Decoding restores creatures and items under their original ids. Decoded
//! creatures start at full health with nothing queued, and players start
//! with empty gear.

pub mod wire;

use crate::{
    config, AiKind, CreatureBlueprint, CreatureKind, DelveError, DelveResult, Direction, Entrance,
    ItemBlueprint, ItemKind, Map, ObjectId, Position, Stats,
};
use log::debug;
use std::io::{self, Read, Write};
use wire::*;

/// File magic.
pub const MAGIC: &[u8; 2] = b"DM";
/// Format version written by this engine.
pub const VERSION_CURRENT: u8 = 1;

const TAG_MONSTER: u8 = 0;
const TAG_HUMAN: u8 = 1;
const TAG_EXPLORER: u8 = 2;
const TAG_WANDERER: u8 = 3;
const TAG_WEAPON: u8 = 0;
const TAG_ARMOR: u8 = 1;
const TAG_TRINKET: u8 = 2;
const TAG_UNKNOWN: u8 = 255;

/// Smallest possible creature record: id, empty name, x, y, tag, three stats.
const MIN_CREATURE_RECORD: usize = 4 + 4 + 8 + 1 + 12;
/// Smallest possible item record: id, empty name, x, y, tag, parameter.
const MIN_ITEM_RECORD: usize = 4 + 4 + 8 + 1 + 4;

fn creature_tag(kind: CreatureKind) -> u8 {
    match kind {
        CreatureKind::Monster => TAG_MONSTER,
        CreatureKind::HumanPlayer => TAG_HUMAN,
        CreatureKind::AiPlayer(AiKind::Explorer) => TAG_EXPLORER,
        CreatureKind::AiPlayer(AiKind::Wanderer) => TAG_WANDERER,
        CreatureKind::Unknown => TAG_UNKNOWN,
    }
}

fn creature_kind(tag: u8) -> CreatureKind {
    match tag {
        TAG_MONSTER => CreatureKind::Monster,
        TAG_HUMAN => CreatureKind::HumanPlayer,
        TAG_EXPLORER => CreatureKind::AiPlayer(AiKind::Explorer),
        TAG_WANDERER => CreatureKind::AiPlayer(AiKind::Wanderer),
        _ => CreatureKind::Unknown,
    }
}

fn item_tag(kind: ItemKind) -> u8 {
    match kind {
        ItemKind::Weapon { .. } => TAG_WEAPON,
        ItemKind::Armor { .. } => TAG_ARMOR,
        ItemKind::Trinket { .. } => TAG_TRINKET,
        ItemKind::Unknown { .. } => TAG_UNKNOWN,
    }
}

fn item_kind(tag: u8, parameter: i32) -> ItemKind {
    match tag {
        TAG_WEAPON => ItemKind::Weapon { damage: parameter },
        TAG_ARMOR => ItemKind::Armor { defense: parameter },
        TAG_TRINKET => ItemKind::Trinket { value: parameter },
        _ => ItemKind::Unknown { parameter },
    }
}

/// Encodes `map` into the binary map format.
///
/// # Examples
///
/// ```
/// use delve::{serialize, Map};
///
/// let bytes = serialize(&Map::open(4, 4).unwrap());
/// assert_eq!(bytes.len(), 35);
/// assert_eq!(&bytes[..3], b"DM\x01");
/// assert!(bytes[19..27].iter().all(|byte| *byte == 0xFF));
/// ```
pub fn serialize(map: &Map) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(MAGIC);
    write_u8(&mut buf, VERSION_CURRENT);

    write_i32_le(&mut buf, map.width() as i32);
    write_i32_le(&mut buf, map.height() as i32);
    let winning = map.winning_block().unwrap_or(Position::new(-1, -1));
    write_i32_le(&mut buf, winning.x);
    write_i32_le(&mut buf, winning.y);

    let mut grid = vec![0u8; map.block_count().div_ceil(2)];
    for (k, pos) in map.positions().enumerate() {
        let mask = map.block(pos).map_or(0, |block| block.open_mask());
        grid[k / 2] |= if k % 2 == 0 { mask } else { mask << 4 };
    }
    buf.extend_from_slice(&grid);

    write_i32_le(&mut buf, map.creatures().count() as i32);
    for creature in map.creatures() {
        write_u32_le(&mut buf, creature.id().0);
        write_string(&mut buf, &creature.name, config::MAX_NAME_BYTES);
        write_i32_le(&mut buf, creature.position().x);
        write_i32_le(&mut buf, creature.position().y);
        write_u8(&mut buf, creature_tag(creature.kind));
        write_i32_le(&mut buf, creature.stats.hp);
        write_i32_le(&mut buf, creature.stats.attack);
        write_i32_le(&mut buf, creature.stats.defense);
    }

    let placed: Vec<_> = map
        .items()
        .filter_map(|item| item.position().map(|pos| (item, pos)))
        .collect();
    write_i32_le(&mut buf, placed.len() as i32);
    for (item, pos) in placed {
        write_u32_le(&mut buf, item.id().0);
        write_string(&mut buf, &item.name, config::MAX_NAME_BYTES);
        write_i32_le(&mut buf, pos.x);
        write_i32_le(&mut buf, pos.y);
        write_u8(&mut buf, item_tag(item.kind));
        write_i32_le(&mut buf, item.kind.parameter());
    }

    debug!(
        "Encoded {}x{} map into {} bytes",
        map.width(),
        map.height(),
        buf.len()
    );
    buf
}

/// Decodes a map from the binary map format.
///
/// The whole slice must be one map; trailing bytes are an error.
pub fn deserialize(bytes: &[u8]) -> DelveResult<Map> {
    let mut r = bytes;
    let map = decode(&mut r).map_err(|err| match err {
        DelveError::Io(io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof => {
            DelveError::InvalidFormat("unexpected end of data".to_string())
        }
        other => other,
    })?;
    if !r.is_empty() {
        return Err(DelveError::InvalidFormat(format!(
            "{} trailing bytes after the map",
            r.len()
        )));
    }
    debug!(
        "Decoded {}x{} map from {} bytes",
        map.width(),
        map.height(),
        bytes.len()
    );
    Ok(map)
}

/// Writes `map` to `w` in the binary map format.
pub fn write_map<W: Write>(w: &mut W, map: &Map) -> DelveResult<()> {
    w.write_all(&serialize(map))?;
    Ok(())
}

/// Reads a map from `r` until the end of the stream.
pub fn read_map<R: Read>(r: &mut R) -> DelveResult<Map> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    deserialize(&bytes)
}

fn invalid(message: impl Into<String>) -> DelveError {
    DelveError::InvalidFormat(message.into())
}

fn decode(r: &mut &[u8]) -> DelveResult<Map> {
    let magic = read_exact::<2, _>(r)?;
    if &magic != MAGIC {
        return Err(invalid(format!("bad magic {:02x?}", magic)));
    }
    let version = read_u8(r)?;
    if version != VERSION_CURRENT {
        return Err(DelveError::UnsupportedVersion(version));
    }

    let width = read_i32_le(r)?;
    let height = read_i32_le(r)?;
    if width <= 0 || height <= 0 {
        return Err(invalid(format!("map dimensions {}x{} are not positive", width, height)));
    }
    let winning = Position::new(read_i32_le(r)?, read_i32_le(r)?);

    let block_count = width as u64 * height as u64;
    let grid_len = block_count.div_ceil(2);
    if grid_len > r.len() as u64 {
        return Err(invalid("unexpected end of data"));
    }

    let mut map = Map::new(width as u32, height as u32)?;
    let grid = read_bytes(r, grid_len as usize)?;
    let positions: Vec<Position> = map.positions().collect();
    for (k, pos) in positions.into_iter().enumerate() {
        let byte = grid[k / 2];
        let mask = if k % 2 == 0 { byte & 0x0F } else { byte >> 4 };
        for direction in Direction::ALL {
            if mask & (1 << direction.index()) != 0 {
                map.set_entrance(pos, direction, Entrance::Open)?;
            }
        }
    }
    map.check_symmetry()
        .map_err(|err| invalid(err.to_string()))?;

    if winning != Position::new(-1, -1) {
        if !map.contains(winning) {
            return Err(invalid(format!("winning block {:?} is outside the map", winning)));
        }
        map.set_winning_block(Some(winning))?;
    }

    let creature_count = read_count(r, MIN_CREATURE_RECORD, "creature")?;
    for _ in 0..creature_count {
        let id = ObjectId(read_u32_le(r)?);
        let name = read_name(r)?;
        let pos = Position::new(read_i32_le(r)?, read_i32_le(r)?);
        let kind = creature_kind(read_u8(r)?);
        let stats = Stats::new(read_i32_le(r)?, read_i32_le(r)?, read_i32_le(r)?);
        map.restore_creature(id, CreatureBlueprint::new(name, kind, stats), pos)
            .map_err(|err| invalid(format!("creature {}: {}", id, err)))?;
    }

    let item_count = read_count(r, MIN_ITEM_RECORD, "item")?;
    for _ in 0..item_count {
        let id = ObjectId(read_u32_le(r)?);
        let name = read_name(r)?;
        let pos = Position::new(read_i32_le(r)?, read_i32_le(r)?);
        let tag = read_u8(r)?;
        let kind = item_kind(tag, read_i32_le(r)?);
        map.restore_item(id, ItemBlueprint::new(name, kind), pos)
            .map_err(|err| invalid(format!("item {}: {}", id, err)))?;
    }

    Ok(map)
}

/// Reads a record count, rejecting counts the remaining data cannot hold.
fn read_count(r: &mut &[u8], min_record: usize, what: &str) -> DelveResult<usize> {
    let count = read_i32_le(r)?;
    if count < 0 {
        return Err(invalid(format!("negative {} count {}", what, count)));
    }
    let count = count as usize;
    if count.saturating_mul(min_record) > r.len() {
        return Err(invalid("unexpected end of data"));
    }
    Ok(count)
}

fn read_name(r: &mut &[u8]) -> DelveResult<String> {
    let len = read_i32_le(r)?;
    if len < 0 || len as usize > config::MAX_NAME_BYTES {
        return Err(invalid(format!("name length {} out of range", len)));
    }
    let bytes = read_bytes(r, len as usize)?;
    String::from_utf8(bytes).map_err(|_| invalid("name is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate;

    #[test]
    fn test_open_map_layout() {
        let bytes = serialize(&Map::open(4, 4).unwrap());
        assert_eq!(bytes.len(), 35);
        assert_eq!(&bytes[0..3], &[b'D', b'M', 1]);
        assert_eq!(&bytes[3..7], &[4, 0, 0, 0]);
        assert_eq!(&bytes[7..11], &[4, 0, 0, 0]);
        assert_eq!(&bytes[11..19], &[0xFF; 8]);
        assert_eq!(&bytes[19..27], &[0xFF; 8]);
        assert_eq!(&bytes[27..35], &[0; 8]);
    }

    #[test]
    fn test_nibble_order_is_x_outer_low_first() {
        // 1x2: (0,0) then (0,1) share the single grid byte
        let mut map = Map::new(1, 2).unwrap();
        map.open_passage(Position::new(0, 0), Direction::South).unwrap();
        let bytes = serialize(&map);
        assert_eq!(bytes[19], 0b0100 | (0b0001 << 4));

        // 2x1: (0,0) opens East, (1,0) opens West
        let mut map = Map::new(2, 1).unwrap();
        map.open_passage(Position::new(0, 0), Direction::East).unwrap();
        let bytes = serialize(&map);
        assert_eq!(bytes[19], 0b0010 | (0b1000 << 4));
    }

    #[test]
    fn test_odd_block_count_pads_grid() {
        let bytes = serialize(&Map::new(3, 1).unwrap());
        assert_eq!(bytes.len(), 19 + 2 + 8);
        assert_eq!(deserialize(&bytes).unwrap().width(), 3);
    }

    #[test]
    fn test_maze_round_trip() {
        let map = generate(7, 5, Some(31337)).unwrap();
        let decoded = deserialize(&serialize(&map)).unwrap();
        assert_eq!(decoded.width(), 7);
        assert_eq!(decoded.height(), 5);
        assert_eq!(decoded.winning_block(), map.winning_block());
        for pos in map.positions() {
            assert_eq!(
                decoded.block(pos).unwrap().entrances(),
                map.block(pos).unwrap().entrances()
            );
        }
    }

    #[test]
    fn test_occupants_round_trip() {
        let mut map = Map::open(3, 3).unwrap();
        let rat = map
            .spawn_creature(CreatureBlueprint::monster("Rat"), Position::new(1, 1))
            .unwrap();
        let scout = map
            .spawn_creature(
                CreatureBlueprint::ai_player("Scout", AiKind::Wanderer),
                Position::new(2, 2),
            )
            .unwrap();
        let sword = map
            .spawn_item(ItemBlueprint::weapon("Sword", 5), Position::new(1, 1))
            .unwrap();
        let idol = map
            .spawn_item(
                ItemBlueprint::new("Idol", ItemKind::Unknown { parameter: -3 }),
                Position::new(0, 2),
            )
            .unwrap();

        let mut decoded = deserialize(&serialize(&map)).unwrap();
        let decoded_rat = decoded.creature(rat).unwrap();
        assert_eq!(decoded_rat.name, "Rat");
        assert_eq!(decoded_rat.kind, CreatureKind::Monster);
        assert_eq!(decoded_rat.position(), Position::new(1, 1));
        assert_eq!(decoded_rat.stats, Stats::monster());
        assert_eq!(
            decoded.creature(scout).unwrap().kind,
            CreatureKind::AiPlayer(AiKind::Wanderer)
        );
        assert_eq!(decoded.item(sword).unwrap().kind, ItemKind::Weapon { damage: 5 });
        assert_eq!(decoded.item_at(Position::new(0, 2)).unwrap().id(), idol);
        assert_eq!(decoded.creature_at(Position::new(1, 1)).unwrap().id(), rat);

        // New objects never reuse a decoded id
        let bat = decoded
            .spawn_creature(CreatureBlueprint::monster("Bat"), Position::new(0, 0))
            .unwrap();
        assert_eq!(bat, ObjectId(5));
    }

    #[test]
    fn test_long_names_are_truncated() {
        let mut map = Map::new(1, 1).unwrap();
        let long = "é".repeat(40);
        let id = map
            .spawn_creature(CreatureBlueprint::monster(long), Position::origin())
            .unwrap();
        let decoded = deserialize(&serialize(&map)).unwrap();
        let name = &decoded.creature(id).unwrap().name;
        assert_eq!(name.len(), 64);
        assert_eq!(name.chars().count(), 32);
    }

    #[test]
    fn test_empty_name() {
        let mut map = Map::new(1, 1).unwrap();
        let id = map
            .spawn_item(ItemBlueprint::trinket("", 1), Position::origin())
            .unwrap();
        let decoded = deserialize(&serialize(&map)).unwrap();
        assert_eq!(decoded.item(id).unwrap().name, "");
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut bytes = serialize(&Map::new(2, 2).unwrap());
        bytes[0] = b'X';
        assert!(matches!(deserialize(&bytes), Err(DelveError::InvalidFormat(_))));

        let mut bytes = serialize(&Map::new(2, 2).unwrap());
        bytes[2] = 2;
        assert!(matches!(deserialize(&bytes), Err(DelveError::UnsupportedVersion(2))));

        let mut bytes = serialize(&Map::new(2, 2).unwrap());
        bytes[3..7].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(deserialize(&bytes), Err(DelveError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_every_truncation() {
        let mut map = generate(3, 3, Some(5)).unwrap();
        map.spawn_creature(CreatureBlueprint::monster("Rat"), Position::new(1, 1))
            .unwrap();
        map.spawn_item(ItemBlueprint::armor("Vest", 2), Position::new(2, 1))
            .unwrap();
        let bytes = serialize(&map);

        for len in 0..bytes.len() {
            assert!(
                matches!(deserialize(&bytes[..len]), Err(DelveError::InvalidFormat(_))),
                "prefix of {} bytes decoded",
                len
            );
        }
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = serialize(&Map::new(2, 2).unwrap());
        bytes.push(0);
        assert!(matches!(deserialize(&bytes), Err(DelveError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_asymmetric_entrances() {
        let mut bytes = serialize(&Map::new(2, 1).unwrap());
        // (0,0) claims an open East side that (1,0) does not share
        bytes[19] = 0b0010;
        assert!(matches!(deserialize(&bytes), Err(DelveError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_bad_winning_block() {
        let mut bytes = serialize(&Map::new(2, 2).unwrap());
        bytes[11..15].copy_from_slice(&5i32.to_le_bytes());
        bytes[15..19].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(deserialize(&bytes), Err(DelveError::InvalidFormat(_))));
    }

    #[test]
    fn test_rejects_bad_occupants() {
        let mut map = Map::new(2, 1).unwrap();
        map.spawn_creature(CreatureBlueprint::monster("A"), Position::new(0, 0))
            .unwrap();
        map.spawn_creature(CreatureBlueprint::monster("B"), Position::new(1, 0))
            .unwrap();
        let bytes = serialize(&map);
        // Creature records start after header (19), grid (1) and count (4)
        let first = 24;
        let record = 4 + 4 + 1 + 8 + 1 + 12;

        // Second creature moved onto the first one's block
        let mut doubled = bytes.clone();
        doubled[first + record + 9..first + record + 13].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(deserialize(&doubled), Err(DelveError::InvalidFormat(_))));

        // Second creature reusing the first one's id
        let mut duplicate = bytes.clone();
        duplicate[first + record..first + record + 4].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(deserialize(&duplicate), Err(DelveError::InvalidFormat(_))));

        // First creature placed off the map
        let mut outside = bytes.clone();
        outside[first + 9..first + 13].copy_from_slice(&9i32.to_le_bytes());
        assert!(matches!(deserialize(&outside), Err(DelveError::InvalidFormat(_))));

        // Name that is not UTF-8
        let mut garbled = bytes;
        garbled[first + 8] = 0xFF;
        assert!(matches!(deserialize(&garbled), Err(DelveError::InvalidFormat(_))));
    }

    #[test]
    fn test_unknown_tags_decode_as_unknown() {
        let mut map = Map::new(1, 1).unwrap();
        let id = map
            .spawn_creature(CreatureBlueprint::monster("M"), Position::origin())
            .unwrap();
        let mut bytes = serialize(&map);
        // header 19, grid 1, count 4, id 4, name 4+1, x 4, y 4
        bytes[19 + 1 + 4 + 4 + 5 + 8] = 42;
        let decoded = deserialize(&bytes).unwrap();
        assert_eq!(decoded.creature(id).unwrap().kind, CreatureKind::Unknown);
    }

    #[test]
    fn test_stream_helpers() {
        let map = generate(4, 3, Some(8)).unwrap();
        let mut buf = Vec::new();
        write_map(&mut buf, &map).unwrap();
        let decoded = read_map(&mut buf.as_slice()).unwrap();
        assert_eq!(serialize(&decoded), buf);
    }
}
