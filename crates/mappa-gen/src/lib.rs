//! Deterministic floor preview generation.
//!
//! Reproduces the engine's floor generator closely enough for an editor
//! preview: the same layout and seed always produce the same grid, so
//! edits to spawn lists can be eyeballed against a stable floor.

mod generator;
pub mod grid;

pub use generator::FloorGenerator;
pub use grid::{
    FLOOR_HEIGHT, FLOOR_WIDTH, FloorGrid, PlacedEnemy, PlacedItem, PlacedTrap, SpawnWarning,
    Terrain, Tile, TileType,
};

use mappa_types::floor::Floor;

/// Generate a preview of `floor` from `seed`. Returns `None` when the
/// layout cannot produce a floor after the internal retry limit.
pub fn generate_floor(floor: &Floor, seed: u32) -> Option<FloorGrid> {
    FloorGenerator::new(floor, seed).generate()
}
