//! Elmsworth library crate — re-exports all modules for integration testing.
//!
//! The binary crate (`main.rs`) is the actual game entry point.
//! This library crate exposes the same modules so that `tests/` integration
//! tests can import game types, systems, and resources without needing a
//! window or GPU.

pub mod shared;
pub mod data;
pub mod world;
pub mod spatial;
pub mod camera;
pub mod player;
pub mod ai;
pub mod clock;
pub mod farming;
pub mod animals;
pub mod render;
pub mod interact;
pub mod save;
