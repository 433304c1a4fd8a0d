//! # Delve
//!
//! The rules engine of a grid-based dungeon crawler.
//!
//! ## Architecture Overview
//!
//! Delve is a headless engine: hosts query the map, submit actions, call
//! [`Game::step`] on a schedule and persist maps as bytes. The core pieces are:
//!
//! - **Grid Model**: [`Map`], [`MapBlock`] and [`Entrance`], plus the creature
//!   and item arenas owned by the map
//! - **Generation System**: a seeded depth-first backtracker that produces
//!   perfect mazes, and seeded item/encounter factories
//! - **Action System**: command pattern for every state change ([`Action`])
//! - **Creature AI**: a bounded random walker and a depth-first explorer
//! - **Binary Codec**: the compact `DM` map format ([`codec`])
//! - **Session**: a single-owner task that serializes access to a [`Game`]
//!
//! Everything in the core is synchronous and single-threaded. Randomness is
//! always injected as a seeded [`rand::rngs::StdRng`] so that maps and AI
//! behaviour are reproducible.

pub mod codec;
pub mod game;
pub mod generation;
pub mod library;
pub mod session;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use library::*;
pub use session::*;
pub use utils::*;

pub use codec::{deserialize, serialize};

/// Core error type for the Delve engine.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The actor cannot move that way: wall, map edge or occupied block
    #[error("{actor} cannot move {direction:?}: the way is blocked or inaccessible")]
    MovementBlocked { actor: ObjectId, direction: Direction },

    /// There is nothing the actor can attack in that direction
    #[error("{actor} has nothing to attack {direction:?}")]
    InvalidAttack { actor: ObjectId, direction: Direction },

    /// The actor's block holds no item
    #[error("{actor} found nothing to pick up")]
    NothingToPickUp { actor: ObjectId },

    /// The actor's inventory has no spare slot
    #[error("{actor} has a full inventory ({capacity} items)")]
    InventoryFull { actor: ObjectId, capacity: usize },

    /// An item of a kind the pickup rules do not handle
    #[error("{item} has an unknown item kind")]
    UnknownItemKind { item: ObjectId },

    /// Binary map data is malformed
    #[error("Invalid map format: {0}")]
    InvalidFormat(String),

    /// Binary map data was written by an unsupported format version
    #[error("Unsupported map format version {0}")]
    UnsupportedVersion(u8),

    /// No creature or item with this id exists on the map
    #[error("Unknown object {0}")]
    UnknownObject(ObjectId),

    /// A position outside the map was used
    #[error("Position {0:?} is outside the map")]
    OutOfBounds(Position),

    /// The block already holds an object of that kind
    #[error("Position {0:?} is already occupied")]
    Occupied(Position),

    /// The map library holds no map under this name
    #[error("No map named '{0}' in the library")]
    MapNotFound(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// The session task is no longer running
    #[error("Game session has shut down")]
    SessionClosed,
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine configuration constants.
pub mod config {
    /// Longest name, in bytes, the map format stores
    pub const MAX_NAME_BYTES: usize = 64;

    /// Inventory slots every player starts with
    pub const DEFAULT_INVENTORY_CAPACITY: usize = 8;

    /// Smallest path a random walker keeps before retracing
    pub const MIN_WALKER_CAPACITY: usize = 1;

    /// Largest path a random walker keeps before retracing
    pub const MAX_WALKER_CAPACITY: usize = 20;

    /// Random directions a walker samples per tick before giving up
    pub const WALKER_SAMPLE_ATTEMPTS: usize = 8;

    /// Default maze width in blocks
    pub const DEFAULT_MAZE_WIDTH: u32 = 16;

    /// Default maze height in blocks
    pub const DEFAULT_MAZE_HEIGHT: u32 = 12;

    /// Default base stats for a freshly created player (hp, attack, defense)
    pub const DEFAULT_PLAYER_STATS: (i32, i32, i32) = (30, 4, 2);

    /// Default base stats for a freshly created monster (hp, attack, defense)
    pub const DEFAULT_MONSTER_STATS: (i32, i32, i32) = (10, 2, 1);
}
