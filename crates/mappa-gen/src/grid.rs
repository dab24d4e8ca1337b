use serde::{Deserialize, Serialize};

use mappa_types::floor::TrapId;
use mappa_types::tile_rule::RoomType;

/// Generated floor dimensions, in tiles.
pub const FLOOR_WIDTH: usize = 56;
pub const FLOOR_HEIGHT: usize = 32;

/// What occupies a generated tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Wall,
    Floor,
    Water,
    PlayerSpawn,
    Enemy,
    Item,
    BuriedItem,
    Trap,
    Stairs,
}

/// Terrain layer of a generated tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Normal,
    Secondary,
}

/// One generated tile.
///
/// `room_id` is -1 on hallway and wall tiles, else the room's small
/// nonnegative id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
    pub room_id: i8,
    pub room_type: RoomType,
    pub terrain: Terrain,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            tile_type: TileType::Wall,
            room_id: -1,
            room_type: RoomType::Hallway,
            terrain: Terrain::Normal,
        }
    }
}

impl Tile {
    pub fn is_walkable(&self) -> bool {
        !matches!(self.tile_type, TileType::Wall | TileType::Water)
    }

    pub fn in_room(&self) -> bool {
        self.room_id >= 0
    }
}

/// A concrete spawn placed during generation, kept alongside the grid so
/// the preview can label tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedEnemy {
    pub x: usize,
    pub y: usize,
    pub md_index: u16,
    pub level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub x: usize,
    pub y: usize,
    pub item_id: u16,
    pub buried: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTrap {
    pub x: usize,
    pub y: usize,
    pub trap: TrapId,
}

/// Fallbacks taken when a spawn roll found no matching table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnWarning {
    /// No monster weight exceeded the roll; kecleon was placed instead.
    MonsterFallback { roll: u16 },
    /// No item matched the category/item rolls; poké was placed instead.
    ItemFallback { roll: u16 },
}

/// The generated preview floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorGrid {
    tiles: Vec<Tile>,
    pub enemies: Vec<PlacedEnemy>,
    pub items: Vec<PlacedItem>,
    pub traps: Vec<PlacedTrap>,
    pub warnings: Vec<SpawnWarning>,
}

impl FloorGrid {
    pub fn new() -> Self {
        Self {
            tiles: vec![Tile::default(); FLOOR_WIDTH * FLOOR_HEIGHT],
            enemies: Vec::new(),
            items: Vec::new(),
            traps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        FLOOR_WIDTH
    }

    pub fn height(&self) -> usize {
        FLOOR_HEIGHT
    }

    pub fn get(&self, x: usize, y: usize) -> &Tile {
        &self.tiles[y * FLOOR_WIDTH + x]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Tile {
        &mut self.tiles[y * FLOOR_WIDTH + x]
    }

    pub fn tiles(&self) -> impl Iterator<Item = ((usize, usize), &Tile)> {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, t)| ((i % FLOOR_WIDTH, i / FLOOR_WIDTH), t))
    }

    /// Orthogonal walkable-neighbor count, used by the dead-end strip.
    pub fn walkable_neighbors(&self, x: usize, y: usize) -> usize {
        let mut n = 0;
        if x > 0 && self.get(x - 1, y).is_walkable() {
            n += 1;
        }
        if x + 1 < FLOOR_WIDTH && self.get(x + 1, y).is_walkable() {
            n += 1;
        }
        if y > 0 && self.get(x, y - 1).is_walkable() {
            n += 1;
        }
        if y + 1 < FLOOR_HEIGHT && self.get(x, y + 1).is_walkable() {
            n += 1;
        }
        n
    }
}

impl Default for FloorGrid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_grid_is_all_wall() {
        let g = FloorGrid::new();
        assert!(g.tiles().all(|(_, t)| t.tile_type == TileType::Wall));
        assert!(g.tiles().all(|(_, t)| t.room_id == -1));
    }

    #[test]
    fn indexing_is_row_major() {
        let mut g = FloorGrid::new();
        g.get_mut(3, 2).tile_type = TileType::Stairs;
        let ((x, y), _) = g
            .tiles()
            .find(|(_, t)| t.tile_type == TileType::Stairs)
            .unwrap();
        assert_eq!((x, y), (3, 2));
    }

    #[test]
    fn walkable_neighbors_counts_orthogonals() {
        let mut g = FloorGrid::new();
        g.get_mut(5, 5).tile_type = TileType::Floor;
        g.get_mut(4, 5).tile_type = TileType::Floor;
        g.get_mut(5, 4).tile_type = TileType::Floor;
        g.get_mut(4, 4).tile_type = TileType::Floor; // diagonal, not counted
        assert_eq!(g.walkable_neighbors(5, 5), 2);
    }
}
