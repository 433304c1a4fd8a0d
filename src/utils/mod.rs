//! # Utilities Module
//!
//! Graph queries over the maze shared by generation, the library and the CLI.

pub mod navigation;

pub use navigation::*;
