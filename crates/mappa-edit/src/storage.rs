//! Collaborator contracts: typed blob storage, binary patching and patch
//! detection.
//!
//! The editor never touches the ROM container directly. A [`Storage`]
//! implementation owns the blobs and hands out typed copies; mutations go
//! back through `save_*` plus `mark_modified`, and the handful of values
//! living inside the game binaries are written through [`Storage::patch_binary`]
//! closures so the container controls offsets and encodings.

use mappa_types::attributes::{FloorAttrTable, MissionForbidden, Rank};
use mappa_types::dungeon::DungeonDefinition;
use mappa_types::entity::{
    EntityRuleContainer, EntitySpawnEntry, FixedItemSpawn, FixedMonsterSpawn, MonsterSpawnStats,
    TileSpawn,
};
use mappa_types::fixed_floor::FixedFloor;
use mappa_types::floor::FloorList;

/// The owned entity-rule tables of the fixed-floor collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct EntityData {
    pub entities: Vec<EntitySpawnEntry>,
    pub items: Vec<FixedItemSpawn>,
    pub monsters: Vec<FixedMonsterSpawn>,
    pub tiles: Vec<TileSpawn>,
    pub stats: Vec<MonsterSpawnStats>,
}

impl EntityData {
    /// Borrow the tables as a composed lookup.
    pub fn container(&self) -> EntityRuleContainer<'_> {
        EntityRuleContainer::new(
            &self.entities,
            &self.items,
            &self.monsters,
            &self.tiles,
            &self.stats,
        )
    }
}

/// Storage paths the dungeon subsystem reads and writes.
pub mod paths {
    /// The floor-list collection.
    pub const FLOOR_LISTS: &str = "BALANCE/mappa_s.bin";
    /// Derived floor-list index, rebuilt from the collection on save.
    pub const FLOOR_LIST_INDEX: &str = "BALANCE/mappa_gs.bin";
    /// The fixed-floor collection.
    pub const FIXED_FLOORS: &str = "BALANCE/fixed.bin";
    /// Optional per-floor mission rank table.
    pub const FLOOR_RANKS: &str = "BALANCE/f_rank.bin";
    /// Optional per-floor mission-forbidden table.
    pub const MISSION_FORBIDDEN: &str = "BALANCE/f_mforbid.bin";
}

/// Game binaries reachable through [`Storage::patch_binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryName {
    Arm9,
    Overlay10,
    Overlay29,
}

/// ROM patches whose presence changes editor behavior. Never assume one
/// is applied; always ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Patch {
    UnusedDungeonChance,
    ExtractDungeonData,
    ChangeFixedFloorProperties,
    ExpandPokeList,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob {0} is missing from the project")]
    Missing(&'static str),
    #[error("blob {path} could not be decoded: {reason}")]
    Corrupt { path: &'static str, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The typed blob store backing a project.
pub trait Storage {
    fn load_dungeon_definitions(&self) -> Result<Vec<DungeonDefinition>, StorageError>;
    fn load_floor_lists(&self) -> Result<Vec<FloorList>, StorageError>;
    fn load_fixed_floors(&self) -> Result<Vec<FixedFloor>, StorageError>;
    /// `Ok(None)` when the deployment does not carry the table.
    fn load_floor_ranks(&self) -> Result<Option<FloorAttrTable<Rank>>, StorageError>;
    fn load_mission_forbidden(
        &self,
    ) -> Result<Option<FloorAttrTable<MissionForbidden>>, StorageError>;
    fn load_entity_data(&self) -> Result<EntityData, StorageError>;

    fn save_floor_lists(&mut self, lists: &[FloorList]) -> Result<(), StorageError>;
    fn save_fixed_floors(&mut self, floors: &[FixedFloor]) -> Result<(), StorageError>;
    fn save_entity_data(&mut self, data: &EntityData) -> Result<(), StorageError>;
    fn save_floor_ranks(&mut self, table: &FloorAttrTable<Rank>) -> Result<(), StorageError>;
    fn save_mission_forbidden(
        &mut self,
        table: &FloorAttrTable<MissionForbidden>,
    ) -> Result<(), StorageError>;

    /// Record that a path must be re-emitted by the next project save.
    fn mark_modified(&mut self, path: &'static str);

    /// Mutate a game binary in place. The closure receives the full blob;
    /// errors abort the patch with nothing written.
    fn patch_binary(
        &mut self,
        binary: BinaryName,
        patch: &mut dyn FnMut(&mut Vec<u8>) -> Result<(), StorageError>,
    ) -> Result<(), StorageError>;
}

/// Patch-detection collaborator.
pub trait Patches {
    fn is_patch_applied(&self, patch: Patch) -> bool;
}

/// Write the dungeon-definition records into their arm9 table. Used as a
/// [`Storage::patch_binary`] closure body by the orchestrator.
pub fn write_dungeon_records(
    blob: &mut [u8],
    table_offset: usize,
    dungeons: &[DungeonDefinition],
) -> Result<(), StorageError> {
    let needed = dungeons.len() * DungeonDefinition::RECORD_SIZE;
    let Some(table) = blob.get_mut(table_offset..table_offset + needed) else {
        return Err(StorageError::Corrupt {
            path: "arm9",
            reason: format!("dungeon table at {table_offset:#x} does not fit {needed} bytes"),
        });
    };
    for (record, def) in table
        .chunks_exact_mut(DungeonDefinition::RECORD_SIZE)
        .zip(dungeons)
    {
        record.copy_from_slice(&def.to_record());
    }
    Ok(())
}

/// Read the dungeon-definition records back out of an arm9 table.
pub fn read_dungeon_records(
    blob: &[u8],
    table_offset: usize,
    count: usize,
) -> Result<Vec<DungeonDefinition>, StorageError> {
    let needed = count * DungeonDefinition::RECORD_SIZE;
    let Some(table) = blob.get(table_offset..table_offset + needed) else {
        return Err(StorageError::Corrupt {
            path: "arm9",
            reason: format!("dungeon table at {table_offset:#x} does not fit {needed} bytes"),
        });
    };
    Ok(table
        .chunks_exact(DungeonDefinition::RECORD_SIZE)
        .map(|chunk| {
            let mut record = [0u8; DungeonDefinition::RECORD_SIZE];
            record.copy_from_slice(chunk);
            DungeonDefinition::from_record(record)
        })
        .collect())
}
