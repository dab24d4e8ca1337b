//! The multi-phase preview generator.
//!
//! Phases consume RNG draws in a fixed order (room grid, connectivity,
//! structure refinement, extra hallways, water, stairs and spawn, enemies,
//! items, traps), so one seed always yields one grid for a given layout.

use mappa_rng::DungeonRng;
use mappa_types::floor::{
    Floor, FloorStructure, ItemCategory, ItemList, KECLEON_MD_INDEX, POKE_ITEM_ID,
    TerrainSettings, TrapId,
};
use mappa_types::tile_rule::RoomType;

use crate::grid::{
    FLOOR_HEIGHT, FLOOR_WIDTH, FloorGrid, PlacedEnemy, PlacedItem, PlacedTrap, SpawnWarning,
    Terrain, Tile, TileType,
};

const CELLS_X: usize = 6;
const CELLS_Y: usize = 3;
const CELL_W: usize = FLOOR_WIDTH / CELLS_X;
const CELL_H: usize = FLOOR_HEIGHT / CELLS_Y;

/// Full regenerations attempted before giving up on a layout.
const RETRY_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    room: Option<Rect>,
    anchor: (usize, usize),
    room_type: RoomType,
    room_id: i8,
    connect_right: bool,
    connect_down: bool,
}

impl Cell {
    fn point(&self) -> (usize, usize) {
        match self.room {
            Some(r) => ((r.x0 + r.x1) / 2, (r.y0 + r.y1) / 2),
            None => self.anchor,
        }
    }
}

pub struct FloorGenerator<'a> {
    floor: &'a Floor,
    rng: DungeonRng,
}

impl<'a> FloorGenerator<'a> {
    pub fn new(floor: &'a Floor, seed: u32) -> Self {
        Self {
            floor,
            rng: DungeonRng::new(seed),
        }
    }

    /// Generate the preview grid, retrying a structurally failed attempt
    /// up to the retry limit. `None` means the layout could not produce a
    /// floor.
    pub fn generate(mut self) -> Option<FloorGrid> {
        for _ in 0..RETRY_LIMIT {
            if let Some(grid) = self.try_generate() {
                return Some(grid);
            }
        }
        log::warn!(
            "floor {} could not be generated after {RETRY_LIMIT} attempts",
            self.floor.layout.floor_number
        );
        None
    }

    fn try_generate(&mut self) -> Option<FloorGrid> {
        let mut grid = FloorGrid::new();

        // Phase 2 fallback: no connectivity means one big monster house.
        if self.floor.layout.floor_connectivity == 0 {
            self.place_monster_house_fallback(&mut grid);
        } else {
            let mut cells = self.plan_cells();
            self.roll_connections(&mut cells);
            self.refine_structure(&mut cells);
            self.carve(&mut grid, &cells);
            if !self.floor.layout.dead_ends {
                strip_dead_ends(&mut grid);
            }
            self.carve_extra_hallways(&mut grid, &cells);
        }

        self.fill_water(&mut grid);
        self.place_stairs_and_spawn(&mut grid)?;
        self.place_enemies(&mut grid);
        self.place_items(&mut grid);
        self.place_traps(&mut grid);
        Some(grid)
    }

    // ------------------------------------------------------ phase 1

    fn plan_cells(&mut self) -> Vec<Cell> {
        let layout = &self.floor.layout;
        let cell_count = CELLS_X * CELLS_Y;

        // Positive density gets a random variation of 0..=2 on top;
        // negative density is an exact count.
        let room_count = if layout.room_density < 0 {
            u32::from(layout.room_density.unsigned_abs())
        } else {
            u32::from(layout.room_density as u8) + self.rng.rand_max(3)
        };
        let room_count = (room_count as usize).min(cell_count);

        let mut is_room = vec![false; cell_count];
        for _ in 0..room_count {
            // Random pick with forward probing keeps the draw count at one
            // per room regardless of collisions.
            let start = self.rng.rand_max(cell_count as u32) as usize;
            for offset in 0..cell_count {
                let idx = (start + offset) % cell_count;
                if !is_room[idx] {
                    is_room[idx] = true;
                    break;
                }
            }
        }

        let mut cells = Vec::with_capacity(cell_count);
        let mut next_room_id: i8 = 0;
        for idx in 0..cell_count {
            let base_x = (idx % CELLS_X) * CELL_W;
            let base_y = (idx / CELLS_X) * CELL_H;
            if is_room[idx] {
                let w = 3 + self.rng.rand_max((CELL_W - 4) as u32) as usize;
                let h = 3 + self.rng.rand_max((CELL_H - 4) as u32) as usize;
                let x0 = base_x + 1 + self.rng.rand_max((CELL_W - 1 - w) as u32) as usize;
                let y0 = base_y + 1 + self.rng.rand_max((CELL_H - 1 - h) as u32) as usize;
                let room = Rect {
                    x0,
                    y0,
                    x1: x0 + w,
                    y1: y0 + h,
                };
                cells.push(Cell {
                    room: Some(room),
                    anchor: ((room.x0 + room.x1) / 2, (room.y0 + room.y1) / 2),
                    room_type: RoomType::Room,
                    room_id: next_room_id,
                    connect_right: false,
                    connect_down: false,
                });
                next_room_id += 1;
            } else {
                let ax = base_x + 1 + self.rng.rand_max((CELL_W - 2) as u32) as usize;
                let ay = base_y + 1 + self.rng.rand_max((CELL_H - 2) as u32) as usize;
                cells.push(Cell {
                    room: None,
                    anchor: (ax, ay),
                    room_type: RoomType::Hallway,
                    room_id: -1,
                    connect_right: false,
                    connect_down: false,
                });
            }
        }
        cells
    }

    // ------------------------------------------------------ phase 2

    fn roll_connections(&mut self, cells: &mut [Cell]) {
        let cell_count = CELLS_X * CELLS_Y;
        for _ in 0..self.floor.layout.floor_connectivity {
            let idx = self.rng.rand_max(cell_count as u32) as usize;
            let dir = self.rng.rand_max(4);
            let (cx, cy) = (idx % CELLS_X, idx / CELLS_X);
            match dir {
                0 if cx + 1 < CELLS_X => cells[idx].connect_right = true,
                1 if cy + 1 < CELLS_Y => cells[idx].connect_down = true,
                2 if cx > 0 => cells[idx - 1].connect_right = true,
                3 if cy > 0 => cells[idx - CELLS_X].connect_down = true,
                _ => {}
            }
        }
    }

    fn place_monster_house_fallback(&mut self, grid: &mut FloorGrid) {
        let w = 20 + self.rng.rand_max(10) as usize;
        let h = 8 + self.rng.rand_max(6) as usize;
        let x0 = (FLOOR_WIDTH - w) / 2;
        let y0 = (FLOOR_HEIGHT - h) / 2;
        paint_room(
            grid,
            Rect {
                x0,
                y0,
                x1: x0 + w,
                y1: y0 + h,
            },
            0,
            RoomType::MonsterHouse,
        );
    }

    // ------------------------------------------------------ phase 3

    fn refine_structure(&mut self, cells: &mut [Cell]) {
        let mid_row = CELLS_Y / 2;
        let mid_col = CELLS_X / 2;
        match self.floor.layout.structure {
            FloorStructure::SingleMonsterHouse | FloorStructure::TwoRoomsOneMonsterHouse => {
                self.mark_random_room(cells, RoomType::MonsterHouse);
            }
            FloorStructure::Ring | FloorStructure::OuterRooms => {
                for cx in 0..CELLS_X - 1 {
                    cells[cx].connect_right = true;
                    cells[(CELLS_Y - 1) * CELLS_X + cx].connect_right = true;
                }
                for cy in 0..CELLS_Y - 1 {
                    cells[cy * CELLS_X].connect_down = true;
                    cells[cy * CELLS_X + CELLS_X - 1].connect_down = true;
                }
            }
            FloorStructure::Crossroads | FloorStructure::Cross => {
                for cx in 0..CELLS_X - 1 {
                    cells[mid_row * CELLS_X + cx].connect_right = true;
                }
                for cy in 0..CELLS_Y - 1 {
                    cells[cy * CELLS_X + mid_col].connect_down = true;
                }
            }
            FloorStructure::Line => {
                for cx in 0..CELLS_X - 1 {
                    cells[mid_row * CELLS_X + cx].connect_right = true;
                }
            }
            FloorStructure::Beetle => {
                for cy in 0..CELLS_Y - 1 {
                    cells[cy * CELLS_X + mid_col].connect_down = true;
                }
            }
            _ => {}
        }

        let layout = &self.floor.layout;
        if self.rng.chance(layout.kecleon_shop_chance) {
            self.mark_random_room(cells, RoomType::KecleonShop);
        }
        if self.rng.chance(layout.monster_house_chance) {
            self.mark_random_room(cells, RoomType::MonsterHouse);
        }
    }

    fn mark_random_room(&mut self, cells: &mut [Cell], room_type: RoomType) {
        let rooms: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.room.is_some() && c.room_type == RoomType::Room)
            .map(|(i, _)| i)
            .collect();
        if rooms.is_empty() {
            return;
        }
        let pick = rooms[self.rng.rand_max(rooms.len() as u32) as usize];
        cells[pick].room_type = room_type;
    }

    fn carve(&self, grid: &mut FloorGrid, cells: &[Cell]) {
        for cell in cells {
            match cell.room {
                Some(rect) => paint_room(grid, rect, cell.room_id, cell.room_type),
                None => carve_hallway_tile(grid, cell.anchor.0, cell.anchor.1),
            }
        }
        for (idx, cell) in cells.iter().enumerate() {
            if cell.connect_right {
                carve_l_path(grid, cell.point(), cells[idx + 1].point(), true);
            }
            if cell.connect_down {
                carve_l_path(grid, cell.point(), cells[idx + CELLS_X].point(), false);
            }
        }
    }

    // ------------------------------------------------------ phase 4

    fn carve_extra_hallways(&mut self, grid: &mut FloorGrid, cells: &[Cell]) {
        let rooms: Vec<&Cell> = cells.iter().filter(|c| c.room.is_some()).collect();
        if rooms.is_empty() {
            return;
        }
        for _ in 0..self.floor.layout.extra_hallway_density {
            let cell = rooms[self.rng.rand_max(rooms.len() as u32) as usize];
            let (mut x, mut y) = cell.point();
            let mut dir = self.rng.rand_max(4);
            let len = 3 + self.rng.rand_max(8) as usize;
            for _ in 0..len {
                // Twisty: one-in-three chance to turn each step.
                if self.rng.one_in(3) {
                    dir = self.rng.rand_max(4);
                }
                let (nx, ny) = step(x, y, dir);
                if nx < 1 || ny < 1 || nx >= FLOOR_WIDTH - 1 || ny >= FLOOR_HEIGHT - 1 {
                    break;
                }
                x = nx;
                y = ny;
                carve_hallway_tile(grid, x, y);
            }
        }
    }

    // ------------------------------------------------------ phase 5

    fn fill_water(&mut self, grid: &mut FloorGrid) {
        if !self
            .floor
            .layout
            .terrain_settings
            .contains(TerrainSettings::HAS_SECONDARY_TERRAIN)
        {
            return;
        }
        for _ in 0..self.floor.layout.water_density {
            let cx = 2 + self.rng.rand_max((FLOOR_WIDTH - 4) as u32) as usize;
            let cy = 2 + self.rng.rand_max((FLOOR_HEIGHT - 4) as u32) as usize;
            let radius = 1 + self.rng.rand_max(3) as usize;
            for y in cy.saturating_sub(radius)..=(cy + radius).min(FLOOR_HEIGHT - 1) {
                for x in cx.saturating_sub(radius)..=(cx + radius).min(FLOOR_WIDTH - 1) {
                    let dist = x.abs_diff(cx) + y.abs_diff(cy);
                    let tile = grid.get_mut(x, y);
                    if dist <= radius && tile.tile_type == TileType::Wall {
                        tile.tile_type = TileType::Water;
                        tile.terrain = Terrain::Secondary;
                    }
                }
            }
        }
    }

    // ------------------------------------------------------ phase 6

    fn place_stairs_and_spawn(&mut self, grid: &mut FloorGrid) -> Option<()> {
        let mut candidates = room_floor_tiles(grid);
        if candidates.len() < 2 {
            return None;
        }
        let (sx, sy) = take_random(&mut self.rng, &mut candidates)?;
        grid.get_mut(sx, sy).tile_type = TileType::Stairs;
        let (px, py) = take_random(&mut self.rng, &mut candidates)?;
        grid.get_mut(px, py).tile_type = TileType::PlayerSpawn;
        Some(())
    }

    // ------------------------------------------------------ phase 7

    fn place_enemies(&mut self, grid: &mut FloorGrid) {
        let density = self.floor.layout.initial_enemy_density;
        let count = if density < 0 {
            u32::from(density.unsigned_abs())
        } else {
            u32::from(density as u8) + self.rng.rand_max(2)
        };

        let mut candidates = room_floor_tiles(grid);
        for _ in 0..count {
            let Some((x, y)) = take_random(&mut self.rng, &mut candidates) else {
                break;
            };
            let roll = self.rng.roll10000();
            let in_monster_house = grid.get(x, y).room_type == RoomType::MonsterHouse;
            let chosen = self.floor.monsters().iter().find(|m| {
                let weight = if in_monster_house {
                    m.monster_house_spawn_weight
                } else {
                    m.main_spawn_weight
                };
                weight > roll
            });
            let (md_index, level) = match chosen {
                Some(m) => (m.md_index, m.level),
                None => {
                    log::warn!("no monster weight beats roll {roll}, spawning kecleon");
                    grid.warnings.push(SpawnWarning::MonsterFallback { roll });
                    (KECLEON_MD_INDEX, 1)
                }
            };
            grid.get_mut(x, y).tile_type = TileType::Enemy;
            grid.enemies.push(PlacedEnemy { x, y, md_index, level });
        }
    }

    // ------------------------------------------------------ phase 8

    fn place_items(&mut self, grid: &mut FloorGrid) {
        // Floor items on open room tiles, guaranteed ones first.
        let floor_list = self.floor.floor_items.clone();
        let mut guaranteed: Vec<u16> = floor_list.guaranteed_items().collect();
        guaranteed.reverse(); // pop from the tail = ascending id order
        let mut candidates = room_floor_tiles(grid);
        for _ in 0..self.floor.layout.item_density {
            let Some((x, y)) = take_random(&mut self.rng, &mut candidates) else {
                break;
            };
            let item_id = match guaranteed.pop() {
                Some(id) => id,
                None => self.roll_item(&floor_list, grid),
            };
            grid.get_mut(x, y).tile_type = TileType::Item;
            grid.items.push(PlacedItem {
                x,
                y,
                item_id,
                buried: false,
            });
        }

        // Buried items inside walls.
        let buried_list = self.floor.buried_items.clone();
        let mut buried_guaranteed: Vec<u16> = buried_list.guaranteed_items().collect();
        buried_guaranteed.reverse();
        let mut wall_candidates: Vec<(usize, usize)> = grid
            .tiles()
            .filter(|(_, t)| t.tile_type == TileType::Wall)
            .map(|(pos, _)| pos)
            .collect();
        for _ in 0..self.floor.layout.buried_item_density {
            let Some((x, y)) = take_random(&mut self.rng, &mut wall_candidates) else {
                break;
            };
            let item_id = match buried_guaranteed.pop() {
                Some(id) => id,
                None => self.roll_item(&buried_list, grid),
            };
            grid.get_mut(x, y).tile_type = TileType::BuriedItem;
            grid.items.push(PlacedItem {
                x,
                y,
                item_id,
                buried: true,
            });
        }
    }

    /// Two-stage roll: category by weight, then an item of that category.
    fn roll_item(&mut self, list: &ItemList, grid: &mut FloorGrid) -> u16 {
        let cat_roll = self.rng.roll10000();
        let category = list
            .categories
            .iter()
            .find(|(_, w)| **w > cat_roll)
            .map(|(c, _)| *c);

        let item_roll = self.rng.roll10000();
        if let Some(category) = category {
            let hit = list.items.iter().find(|(id, w)| {
                !w.is_guaranteed()
                    && w.to_wire() > item_roll
                    && ItemCategory::of_item(**id) == Some(category)
            });
            if let Some((id, _)) = hit {
                return *id;
            }
        }
        log::warn!("no item matched category/item rolls, spawning poké");
        grid.warnings.push(SpawnWarning::ItemFallback { roll: item_roll });
        POKE_ITEM_ID
    }

    // ------------------------------------------------------ phase 9

    fn place_traps(&mut self, grid: &mut FloorGrid) {
        let mut candidates = room_floor_tiles(grid);
        for _ in 0..self.floor.layout.trap_density {
            let Some((x, y)) = take_random(&mut self.rng, &mut candidates) else {
                break;
            };
            let roll = self.rng.roll10000();
            let hit = self
                .floor
                .traps
                .0
                .iter()
                .position(|&w| w > roll)
                .and_then(|idx| TrapId::from_repr(idx as u8));
            if let Some(trap) = hit {
                grid.get_mut(x, y).tile_type = TileType::Trap;
                grid.traps.push(PlacedTrap { x, y, trap });
            }
        }
    }
}

fn paint_room(grid: &mut FloorGrid, rect: Rect, room_id: i8, room_type: RoomType) {
    for y in rect.y0..rect.y1.min(FLOOR_HEIGHT) {
        for x in rect.x0..rect.x1.min(FLOOR_WIDTH) {
            *grid.get_mut(x, y) = Tile {
                tile_type: TileType::Floor,
                room_id,
                room_type,
                terrain: Terrain::Normal,
            };
        }
    }
}

fn carve_hallway_tile(grid: &mut FloorGrid, x: usize, y: usize) {
    let tile = grid.get_mut(x, y);
    if tile.tile_type == TileType::Wall {
        tile.tile_type = TileType::Floor;
        tile.room_id = -1;
        tile.room_type = RoomType::Hallway;
    }
}

/// Carve an L-shaped corridor between two cell points. `horizontal_first`
/// matches the axis of the connection so corridors leave rooms sideways.
fn carve_l_path(grid: &mut FloorGrid, from: (usize, usize), to: (usize, usize), horizontal_first: bool) {
    let (mut x, mut y) = from;
    if horizontal_first {
        while x != to.0 {
            x = if x < to.0 { x + 1 } else { x - 1 };
            carve_hallway_tile(grid, x, y);
        }
        while y != to.1 {
            y = if y < to.1 { y + 1 } else { y - 1 };
            carve_hallway_tile(grid, x, y);
        }
    } else {
        while y != to.1 {
            y = if y < to.1 { y + 1 } else { y - 1 };
            carve_hallway_tile(grid, x, y);
        }
        while x != to.0 {
            x = if x < to.0 { x + 1 } else { x - 1 };
            carve_hallway_tile(grid, x, y);
        }
    }
}

/// Remove hallway tiles with at most one walkable neighbor, repeatedly,
/// until stable. Extra hallways are carved after this pass and may
/// re-introduce dead ends; the game has the same quirk and seeded
/// previews must match it.
fn strip_dead_ends(grid: &mut FloorGrid) {
    loop {
        let doomed: Vec<(usize, usize)> = grid
            .tiles()
            .filter(|((x, y), t)| {
                t.tile_type == TileType::Floor
                    && t.room_id < 0
                    && grid.walkable_neighbors(*x, *y) <= 1
            })
            .map(|(pos, _)| pos)
            .collect();
        if doomed.is_empty() {
            break;
        }
        for (x, y) in doomed {
            *grid.get_mut(x, y) = Tile::default();
        }
    }
}

fn room_floor_tiles(grid: &FloorGrid) -> Vec<(usize, usize)> {
    grid.tiles()
        .filter(|(_, t)| t.tile_type == TileType::Floor && t.room_id >= 0)
        .map(|(pos, _)| pos)
        .collect()
}

fn take_random(rng: &mut DungeonRng, candidates: &mut Vec<(usize, usize)>) -> Option<(usize, usize)> {
    if candidates.is_empty() {
        return None;
    }
    let idx = rng.rand_max(candidates.len() as u32) as usize;
    Some(candidates.swap_remove(idx))
}

fn step(x: usize, y: usize, dir: u32) -> (usize, usize) {
    match dir {
        0 => (x + 1, y),
        1 => (x, y + 1),
        2 => (x.wrapping_sub(1), y),
        _ => (x, y.wrapping_sub(1)),
    }
}
