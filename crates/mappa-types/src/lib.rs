pub mod action;
pub mod attributes;
pub mod dungeon;
pub mod entity;
pub mod fixed_floor;
pub mod floor;
pub mod marker;
pub mod tile_rule;

pub use action::{ActionRule, Direction, ENTITY_RULE_ACTION_OFFSET, entity_rule_id_exposable};
pub use attributes::{
    FloorAttr, FloorAttrTable, MissionForbidden, Rank, ReorderPlan, ReorderSlice,
};
pub use dungeon::{
    DOJO_DUNGEONS_FIRST, DOJO_DUNGEONS_LAST, DOJO_MAPPA_INDEX, DungeonDefinition,
    dojo_floor_count, is_dojo_dungeon,
};
pub use entity::{
    EntityRuleContainer, EntityRuleView, EntitySpawnEntry, FixedItemSpawn, FixedMonsterSpawn,
    MonsterSpawnStats, TileSpawn,
};
pub use fixed_floor::FixedFloor;
pub use floor::{
    DUMMY_MD_INDEX, DarknessLevel, Floor, FloorLayout, FloorList, FloorModelError, FloorStructure,
    GUARANTEED_SENTINEL, HiddenStairsType, ItemCategory, ItemList, ItemListKind,
    KECLEON_MD_INDEX, KECLEON_MD_INDEX_ALT, LINK_BOX_ITEM_ID, MAX_WEIGHT, MonsterSpawnEntry,
    POKE_ITEM_ID, TRAP_COUNT, TerrainSettings, TrapId, TrapWeights, Weather, Weight,
};
pub use marker::MapMarkerPlacement;
pub use tile_rule::{FloorType, RoomType, TileRuleType};
