//! The per-floor spawn model: layout parameters for the generator, the
//! monster spawn list, the 25-slot trap table and the six item lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, FromRepr};

/// Highest cumulative spawn weight; the last nonzero entry of every saved
/// weight list is exactly this value.
pub const MAX_WEIGHT: u16 = 10_000;

/// Wire sentinel for an item that always spawns.
pub const GUARANTEED_SENTINEL: u16 = 0xFFFF;

/// The two kecleon monster entries every floor must carry.
pub const KECLEON_MD_INDEX: u16 = 383;
pub const KECLEON_MD_INDEX_ALT: u16 = 755;
/// The engine's dummy spawn slot, weight 0, always last-but-stable.
pub const DUMMY_MD_INDEX: u16 = 553;

/// Item id forced to full weight when the POKE category is enabled.
pub const POKE_ITEM_ID: u16 = 183;
/// Item id forced to full weight when the LINK_BOX category is enabled.
pub const LINK_BOX_ITEM_ID: u16 = 362;

/// Overall shape of a generated floor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum FloorStructure {
    #[default]
    MediumLarge = 0,
    Small = 1,
    SingleMonsterHouse = 2,
    Ring = 3,
    Crossroads = 4,
    TwoRoomsOneMonsterHouse = 5,
    Line = 6,
    Cross = 7,
    SmallMedium = 8,
    Beetle = 9,
    OuterRooms = 10,
    Medium = 11,
}

/// Floor darkness, in tiles of visibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum DarknessLevel {
    #[default]
    NoDarkness = 0,
    HeavyDarkness = 1,
    LightDarkness = 2,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum Weather {
    #[default]
    Clear = 0,
    Sunny = 1,
    Sandstorm = 2,
    Cloudy = 3,
    Rainy = 4,
    Hail = 5,
    Fog = 6,
    Snow = 7,
    Random = 8,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum HiddenStairsType {
    #[default]
    None = 0,
    SecretBazaar = 1,
    SecretRoom = 2,
    Random = 255,
}

bitflags::bitflags! {
    /// Secondary terrain generation switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct TerrainSettings: u8 {
        const HAS_SECONDARY_TERRAIN     = 0x01;
        const GENERATE_IMPERFECT_ROOMS  = 0x02;
        const UNK3                      = 0x04;
        const UNK4                      = 0x08;
        const UNK5                      = 0x10;
        const UNK6                      = 0x20;
        const UNK7                      = 0x40;
    }
}

/// Every parameter the floor generator consumes, plus the editorial fields
/// carried alongside (`floor_number`, `fixed_floor_id`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FloorLayout {
    pub structure: FloorStructure,
    pub tileset_id: u8,
    pub music_id: u8,
    pub weather: Weather,
    pub fixed_floor_id: u8,
    pub floor_number: u8,
    /// Positive: density with a random variation of 0..=2 added.
    /// Negative: exact room count, no variation.
    pub room_density: i8,
    pub floor_connectivity: u8,
    pub initial_enemy_density: i8,
    pub dead_ends: bool,
    pub item_density: u8,
    pub trap_density: u8,
    pub extra_hallway_density: u8,
    pub buried_item_density: u8,
    pub water_density: u8,
    pub darkness_level: DarknessLevel,
    pub max_coin_amount: u16,
    pub kecleon_shop_chance: u8,
    pub monster_house_chance: u8,
    pub unused_chance: u8,
    pub sticky_item_chance: u8,
    pub empty_monster_house_chance: u8,
    pub hidden_stairs_spawn_chance: u8,
    pub hidden_stairs_type: HiddenStairsType,
    pub kecleon_shop_item_positions: u8,
    pub unk_hidden_stairs: u8,
    pub terrain_settings: TerrainSettings,
    pub iq_booster_boost: i16,
    pub enemy_iq: u16,
}

/// One row of the monster spawn table. Both weights are cumulative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonsterSpawnEntry {
    pub md_index: u16,
    pub level: u8,
    pub main_spawn_weight: u16,
    pub monster_house_spawn_weight: u16,
}

/// Number of trap kinds; the trap weight table always has this length.
pub const TRAP_COUNT: usize = 25;

/// Trap kinds, in trap-table order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumCount, FromRepr,
)]
#[repr(u8)]
pub enum TrapId {
    Unused = 0,
    MudTrap = 1,
    StickyTrap = 2,
    GrimyTrap = 3,
    SummonTrap = 4,
    PitfallTrap = 5,
    WarpTrap = 6,
    GustTrap = 7,
    SpinTrap = 8,
    SlumberTrap = 9,
    SlowTrap = 10,
    SealTrap = 11,
    PoisonTrap = 12,
    SelfdestructTrap = 13,
    ExplosionTrap = 14,
    PpZeroTrap = 15,
    ChestnutTrap = 16,
    WonderTile = 17,
    PokemonTrap = 18,
    SpikedTile = 19,
    StealthRock = 20,
    ToxicSpikes = 21,
    TripTrap = 22,
    RandomTrap = 23,
    GrudgeTrap = 24,
}

/// Cumulative trap spawn weights, one per [`TrapId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapWeights(pub [u16; TRAP_COUNT]);

impl Default for TrapWeights {
    fn default() -> Self {
        Self([0; TRAP_COUNT])
    }
}

impl TrapWeights {
    pub fn get(&self, trap: TrapId) -> u16 {
        self.0[trap as usize]
    }

    pub fn set(&mut self, trap: TrapId, weight: u16) {
        self.0[trap as usize] = weight;
    }
}

/// Item categories of the two-stage item roll. A category owns a fixed
/// range of item ids (see [`ItemCategory::of_item`]).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumCount,
    FromRepr,
)]
#[repr(u8)]
pub enum ItemCategory {
    ThrownPierce = 0,
    ThrownRock = 1,
    Berries = 2,
    Foods = 3,
    HoldItems = 4,
    Tms = 5,
    Poke = 6,
    Evolution = 7,
    OtherItems = 8,
    Orbs = 9,
    LinkBox = 10,
}

/// Item-id ranges owned by each category, ascending and non-overlapping.
const CATEGORY_RANGES: &[(u16, u16, ItemCategory)] = &[
    (1, 8, ItemCategory::ThrownPierce),
    (9, 16, ItemCategory::ThrownRock),
    (17, 68, ItemCategory::Berries),
    (69, 108, ItemCategory::Foods),
    (109, 182, ItemCategory::HoldItems),
    (183, 183, ItemCategory::Poke),
    (184, 225, ItemCategory::Evolution),
    (226, 300, ItemCategory::OtherItems),
    (301, 327, ItemCategory::Orbs),
    (328, 361, ItemCategory::Tms),
    (362, 362, ItemCategory::LinkBox),
    (363, 600, ItemCategory::OtherItems),
];

impl ItemCategory {
    /// The category that owns `item_id`, or `None` for the null item.
    pub fn of_item(item_id: u16) -> Option<ItemCategory> {
        CATEGORY_RANGES
            .iter()
            .find(|(lo, hi, _)| (*lo..=*hi).contains(&item_id))
            .map(|(_, _, cat)| *cat)
    }
}

/// An item spawn weight: cumulative, or the guaranteed sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weight {
    Absolute(u16),
    Guaranteed,
}

impl Weight {
    pub fn from_wire(raw: u16) -> Weight {
        if raw == GUARANTEED_SENTINEL {
            Weight::Guaranteed
        } else {
            Weight::Absolute(raw)
        }
    }

    pub fn to_wire(self) -> u16 {
        match self {
            Weight::Absolute(w) => w,
            Weight::Guaranteed => GUARANTEED_SENTINEL,
        }
    }

    pub fn is_guaranteed(self) -> bool {
        matches!(self, Weight::Guaranteed)
    }
}

/// One of the six per-floor item lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemList {
    /// Cumulative weight per category.
    pub categories: BTreeMap<ItemCategory, u16>,
    /// Cumulative weight or guaranteed marker per item id.
    pub items: BTreeMap<u16, Weight>,
}

impl ItemList {
    /// Item ids marked guaranteed, in ascending id order (the order they
    /// are consumed by the generator).
    pub fn guaranteed_items(&self) -> impl Iterator<Item = u16> + '_ {
        self.items
            .iter()
            .filter(|(_, w)| w.is_guaranteed())
            .map(|(id, _)| *id)
    }
}

/// Which of the six item lists is meant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumCount, FromRepr,
)]
#[repr(u8)]
pub enum ItemListKind {
    Floor = 0,
    Shop = 1,
    MonsterHouse = 2,
    Buried = 3,
    Unk1 = 4,
    Unk2 = 5,
}

#[derive(Debug, thiserror::Error)]
pub enum FloorModelError {
    #[error("monster list is missing forced entry md_index={md_index}")]
    ForcedEntryMissing { md_index: u16 },
    #[error("{field} value {value} exceeds the allowed range 0..={max}")]
    RangeOverflow {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

/// A complete floor definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Floor {
    pub layout: FloorLayout,
    monsters: Vec<MonsterSpawnEntry>,
    pub traps: TrapWeights,
    pub floor_items: ItemList,
    pub shop_items: ItemList,
    pub monster_house_items: ItemList,
    pub buried_items: ItemList,
    pub unk_items1: ItemList,
    pub unk_items2: ItemList,
}

impl Floor {
    pub fn monsters(&self) -> &[MonsterSpawnEntry] {
        &self.monsters
    }

    /// Replace the monster list. Rejects lists missing the two kecleon
    /// entries or the dummy entry; those are engine invariants, not UI
    /// conventions.
    pub fn set_monsters(&mut self, monsters: Vec<MonsterSpawnEntry>) -> Result<(), FloorModelError> {
        for forced in [KECLEON_MD_INDEX, KECLEON_MD_INDEX_ALT, DUMMY_MD_INDEX] {
            if !monsters.iter().any(|m| m.md_index == forced) {
                return Err(FloorModelError::ForcedEntryMissing { md_index: forced });
            }
        }
        self.monsters = monsters;
        Ok(())
    }

    /// Bypass for load/save codecs, which inject the forced entries
    /// themselves before writing.
    pub fn set_monsters_unchecked(&mut self, monsters: Vec<MonsterSpawnEntry>) {
        self.monsters = monsters;
    }

    pub fn item_list(&self, kind: ItemListKind) -> &ItemList {
        match kind {
            ItemListKind::Floor => &self.floor_items,
            ItemListKind::Shop => &self.shop_items,
            ItemListKind::MonsterHouse => &self.monster_house_items,
            ItemListKind::Buried => &self.buried_items,
            ItemListKind::Unk1 => &self.unk_items1,
            ItemListKind::Unk2 => &self.unk_items2,
        }
    }

    pub fn item_list_mut(&mut self, kind: ItemListKind) -> &mut ItemList {
        match kind {
            ItemListKind::Floor => &mut self.floor_items,
            ItemListKind::Shop => &mut self.shop_items,
            ItemListKind::MonsterHouse => &mut self.monster_house_items,
            ItemListKind::Buried => &mut self.buried_items,
            ItemListKind::Unk1 => &mut self.unk_items1,
            ItemListKind::Unk2 => &mut self.unk_items2,
        }
    }

    /// A floor with the forced monster entries and nothing else, used as
    /// the template when repairs or floor-count changes need a fresh floor.
    pub fn template() -> Floor {
        let mut floor = Floor::default();
        floor.monsters = vec![
            MonsterSpawnEntry {
                md_index: KECLEON_MD_INDEX,
                level: 1,
                main_spawn_weight: 0,
                monster_house_spawn_weight: 0,
            },
            MonsterSpawnEntry {
                md_index: KECLEON_MD_INDEX_ALT,
                level: 1,
                main_spawn_weight: 0,
                monster_house_spawn_weight: 0,
            },
            MonsterSpawnEntry {
                md_index: DUMMY_MD_INDEX,
                level: 1,
                main_spawn_weight: 0,
                monster_house_spawn_weight: 0,
            },
        ];
        floor
    }
}

/// An ordered sequence of floors shared by one dungeon group.
pub type FloorList = Vec<Floor>;
