//! A JSON-backed project directory: the reference [`Storage`] and
//! [`Patches`] implementation the CLI runs against.
//!
//! Real deployments put these blobs inside a ROM container; the CLI works
//! on a directory of JSON files plus raw `.bin` blobs for the game
//! binaries, which is enough to exercise every editor operation.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use mappa_edit::orchestrator::ARM9_DUNGEON_TABLE_OFFSET;
use mappa_edit::{BinaryName, EntityData, Patch, Patches, Storage, StorageError};
use mappa_types::attributes::{FloorAttrTable, MissionForbidden, Rank};
use mappa_types::dungeon::DungeonDefinition;
use mappa_types::fixed_floor::FixedFloor;
use mappa_types::floor::FloorList;

const DUNGEONS_FILE: &str = "dungeons.json";
const FLOOR_LISTS_FILE: &str = "floor_lists.json";
const FIXED_FLOORS_FILE: &str = "fixed_floors.json";
const ENTITY_DATA_FILE: &str = "entity_data.json";
const RANKS_FILE: &str = "ranks.json";
const MISSION_FORBIDDEN_FILE: &str = "mission_forbidden.json";
const PATCHES_FILE: &str = "patches.json";

/// Size a fresh arm9 image is padded to so the dungeon table fits.
const ARM9_MIN_SIZE: usize = ARM9_DUNGEON_TABLE_OFFSET + 0x1000;

pub struct JsonProject {
    root: PathBuf,
    modified: BTreeSet<&'static str>,
}

impl JsonProject {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            modified: BTreeSet::new(),
        }
    }

    pub fn modified_paths(&self) -> &BTreeSet<&'static str> {
        &self.modified
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        file: &'static str,
    ) -> Result<T, StorageError> {
        let text = fs::read_to_string(self.root.join(file))
            .map_err(|_| StorageError::Missing(file))?;
        serde_json::from_str(&text).map_err(|err| StorageError::Corrupt {
            path: file,
            reason: err.to_string(),
        })
    }

    fn read_json_optional<T: serde::de::DeserializeOwned>(
        &self,
        file: &'static str,
    ) -> Result<Option<T>, StorageError> {
        if !self.root.join(file).exists() {
            return Ok(None);
        }
        self.read_json(file).map(Some)
    }

    fn write_json<T: serde::Serialize>(
        &self,
        file: &'static str,
        value: &T,
    ) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(value).map_err(|err| StorageError::Corrupt {
            path: file,
            reason: err.to_string(),
        })?;
        Ok(fs::write(self.root.join(file), text)?)
    }

    fn binary_path(&self, binary: BinaryName) -> PathBuf {
        self.root.join(match binary {
            BinaryName::Arm9 => "arm9.bin",
            BinaryName::Overlay10 => "overlay10.bin",
            BinaryName::Overlay29 => "overlay29.bin",
        })
    }
}

impl Storage for JsonProject {
    fn load_dungeon_definitions(&self) -> Result<Vec<DungeonDefinition>, StorageError> {
        self.read_json(DUNGEONS_FILE)
    }

    fn load_floor_lists(&self) -> Result<Vec<FloorList>, StorageError> {
        self.read_json(FLOOR_LISTS_FILE)
    }

    fn load_fixed_floors(&self) -> Result<Vec<FixedFloor>, StorageError> {
        Ok(self.read_json_optional(FIXED_FLOORS_FILE)?.unwrap_or_default())
    }

    fn load_floor_ranks(&self) -> Result<Option<FloorAttrTable<Rank>>, StorageError> {
        self.read_json_optional(RANKS_FILE)
    }

    fn load_mission_forbidden(
        &self,
    ) -> Result<Option<FloorAttrTable<MissionForbidden>>, StorageError> {
        self.read_json_optional(MISSION_FORBIDDEN_FILE)
    }

    fn load_entity_data(&self) -> Result<EntityData, StorageError> {
        Ok(self.read_json_optional(ENTITY_DATA_FILE)?.unwrap_or_default())
    }

    fn save_floor_lists(&mut self, lists: &[FloorList]) -> Result<(), StorageError> {
        self.write_json(FLOOR_LISTS_FILE, &lists)
    }

    fn save_fixed_floors(&mut self, floors: &[FixedFloor]) -> Result<(), StorageError> {
        self.write_json(FIXED_FLOORS_FILE, &floors)
    }

    fn save_entity_data(&mut self, data: &EntityData) -> Result<(), StorageError> {
        self.write_json(ENTITY_DATA_FILE, data)
    }

    fn save_floor_ranks(&mut self, table: &FloorAttrTable<Rank>) -> Result<(), StorageError> {
        self.write_json(RANKS_FILE, table)
    }

    fn save_mission_forbidden(
        &mut self,
        table: &FloorAttrTable<MissionForbidden>,
    ) -> Result<(), StorageError> {
        self.write_json(MISSION_FORBIDDEN_FILE, table)
    }

    fn mark_modified(&mut self, path: &'static str) {
        log::debug!("marking {path} for re-emit");
        self.modified.insert(path);
    }

    fn patch_binary(
        &mut self,
        binary: BinaryName,
        patch: &mut dyn FnMut(&mut Vec<u8>) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        let path = self.binary_path(binary);
        let mut blob = match fs::read(&path) {
            Ok(blob) => blob,
            // A fresh reference project has no binaries yet; real
            // containers always come pre-sized.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                vec![0; ARM9_MIN_SIZE]
            }
            Err(err) => return Err(err.into()),
        };
        patch(&mut blob)?;
        Ok(fs::write(&path, blob)?)
    }
}

/// Patch detection from a `patches.json` list of applied patch names.
pub struct JsonPatches {
    applied: BTreeSet<String>,
}

impl JsonPatches {
    pub fn open(root: &Path) -> Self {
        let applied = fs::read_to_string(root.join(PATCHES_FILE))
            .ok()
            .and_then(|text| serde_json::from_str::<Vec<String>>(&text).ok())
            .unwrap_or_default()
            .into_iter()
            .collect();
        Self { applied }
    }

    fn name(patch: Patch) -> &'static str {
        match patch {
            Patch::UnusedDungeonChance => "UnusedDungeonChance",
            Patch::ExtractDungeonData => "ExtractDungeonData",
            Patch::ChangeFixedFloorProperties => "ChangeFixedFloorProperties",
            Patch::ExpandPokeList => "ExpandPokeList",
        }
    }
}

impl Patches for JsonPatches {
    fn is_patch_applied(&self, patch: Patch) -> bool {
        self.applied.contains(Self::name(patch))
    }
}
