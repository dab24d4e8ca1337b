//! The dungeon subsystem orchestrator.
//!
//! Owns the single mutable copy of every top-level blob (dungeon records,
//! floor lists, fixed floors, entity tables, attribute tables) and
//! surfaces the operations editors drive. Mutations mark the affected
//! paths dirty; nothing touches persistent storage until [`DungeonEditor::save`].

use std::collections::BTreeSet;

use mappa_data::xml::{self, XmlError, XmlSections};
use mappa_gen::FloorGrid;
use mappa_types::action::ActionRule;
use mappa_types::attributes::{FloorAttrTable, MissionForbidden, Rank, ReorderPlan};
use mappa_types::dungeon::DungeonDefinition;
use mappa_types::fixed_floor::FixedFloor;
use mappa_types::floor::Floor;
use mappa_types::floor::FloorList;

use crate::group::{self, DungeonListEntry, GroupError};
use crate::open_request::{OpenRequest, OpenRequestError, OpenTarget, TreeNode};
use crate::storage::{
    BinaryName, EntityData, Patch, Patches, Storage, StorageError, paths, write_dungeon_records,
};
use crate::validator::{self, DungeonError};

/// Offset of the dungeon-definition table inside arm9.
pub const ARM9_DUNGEON_TABLE_OFFSET: usize = 0x9E924;
/// Offset of the fixed-floor property records inside overlay 10.
pub const OVERLAY10_FIXED_PROPS_OFFSET: usize = 0x4F8;
/// Offset of the fixed-floor dungeon-override bytes inside overlay 29.
pub const OVERLAY29_FIXED_OVERRIDE_OFFSET: usize = 0x56E0;

const MAX_REPAIR_PASSES: usize = 64;

/// Per-fixed-floor properties stored in overlay 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedFloorProperties {
    pub music_id: u16,
    pub moves_enabled: bool,
    pub orbs_enabled: bool,
    pub exit_on_hero_ko: bool,
}

impl FixedFloorProperties {
    pub const RECORD_SIZE: usize = 4;

    pub fn to_record(self) -> [u8; Self::RECORD_SIZE] {
        let mut flags = 0u8;
        if self.moves_enabled {
            flags |= 0x01;
        }
        if self.orbs_enabled {
            flags |= 0x02;
        }
        if self.exit_on_hero_ko {
            flags |= 0x04;
        }
        let music = self.music_id.to_le_bytes();
        [music[0], music[1], flags, 0]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error(transparent)]
    Open(#[from] OpenRequestError),
    #[error("the dungeon model has {} validation findings; repair before regrouping", .0.len())]
    Validation(Vec<DungeonError>),
    #[error("dungeon {0} does not exist")]
    UnknownDungeon(u8),
    #[error("dungeon {dungeon_id} has no floor {floor_id}")]
    UnknownFloor { dungeon_id: u8, floor_id: u8 },
    #[error("fixed floor {0} does not exist")]
    UnknownFixedFloor(u8),
    #[error("the {0:?} patch is not applied to this project")]
    PatchRequired(Patch),
}

/// The orchestrator. Generic over the storage and patch collaborators so
/// tests can run against in-memory fakes.
pub struct DungeonEditor<S: Storage, P: Patches> {
    storage: S,
    patches: P,
    dungeons: Vec<DungeonDefinition>,
    floor_lists: Vec<FloorList>,
    fixed_floors: Vec<FixedFloor>,
    entity_data: EntityData,
    ranks: Option<FloorAttrTable<Rank>>,
    mission_forbidden: Option<FloorAttrTable<MissionForbidden>>,
    invalid_dungeons: BTreeSet<u8>,
    dirty: BTreeSet<&'static str>,
    dungeon_records_dirty: bool,
}

impl<S: Storage, P: Patches> DungeonEditor<S, P> {
    /// Hydrate every blob from storage and run an initial validation so
    /// the UI can tag invalid dungeons.
    pub fn open(storage: S, patches: P) -> Result<Self, EditorError> {
        let dungeons = storage.load_dungeon_definitions()?;
        let floor_lists = storage.load_floor_lists()?;
        let fixed_floors = storage.load_fixed_floors()?;
        let entity_data = storage.load_entity_data()?;
        let ranks = storage.load_floor_ranks()?;
        let mission_forbidden = storage.load_mission_forbidden()?;
        let mut editor = Self {
            storage,
            patches,
            dungeons,
            floor_lists,
            fixed_floors,
            entity_data,
            ranks,
            mission_forbidden,
            invalid_dungeons: BTreeSet::new(),
            dirty: BTreeSet::new(),
            dungeon_records_dirty: false,
        };
        editor.refresh_invalid();
        log::info!(
            "opened dungeon model: {} dungeons, {} floor lists, {} fixed floors ({} invalid dungeons)",
            editor.dungeons.len(),
            editor.floor_lists.len(),
            editor.fixed_floors.len(),
            editor.invalid_dungeons.len()
        );
        Ok(editor)
    }

    pub fn dungeons(&self) -> &[DungeonDefinition] {
        &self.dungeons
    }

    pub fn floor_lists(&self) -> &[FloorList] {
        &self.floor_lists
    }

    pub fn fixed_floors(&self) -> &[FixedFloor] {
        &self.fixed_floors
    }

    pub fn entity_data(&self) -> &EntityData {
        &self.entity_data
    }

    /// Dungeon ids the last validation flagged, for UI tagging.
    pub fn invalid_dungeons(&self) -> &BTreeSet<u8> {
        &self.invalid_dungeons
    }

    /// The grouped dungeon list projection.
    pub fn load_dungeons(&self) -> Vec<DungeonListEntry> {
        group::load_dungeons(&self.dungeons)
    }

    pub fn validate(&self) -> Vec<DungeonError> {
        validator::validate(&self.dungeons, &self.floor_lists)
    }

    /// Repair validation findings until the model is clean or no repair
    /// makes progress. Returns how many repairs were applied.
    pub fn repair_all(&mut self) -> usize {
        let mut applied = 0;
        for _ in 0..MAX_REPAIR_PASSES {
            let errors = validator::validate(&self.dungeons, &self.floor_lists);
            if errors.is_empty() {
                break;
            }
            // One repair per pass; each repair can invalidate the rest of
            // the report.
            let mut progressed = false;
            for error in &errors {
                if validator::repair(error, &mut self.dungeons, &mut self.floor_lists) {
                    applied += 1;
                    progressed = true;
                    break;
                }
            }
            if !progressed {
                break;
            }
            self.taint(paths::FLOOR_LISTS);
            self.taint(paths::FLOOR_LIST_INDEX);
            self.dungeon_records_dirty = true;
        }
        self.refresh_invalid();
        applied
    }

    pub fn floor(&self, dungeon_id: u8, floor_id: u8) -> Result<&Floor, EditorError> {
        let (list_index, floor_index) = self.locate_floor(dungeon_id, floor_id)?;
        Ok(&self.floor_lists[list_index][floor_index])
    }

    /// Mutable floor access. The floor lists are tainted up front; callers
    /// that bail without mutating cost one redundant re-emit, nothing more.
    pub fn floor_mut(&mut self, dungeon_id: u8, floor_id: u8) -> Result<&mut Floor, EditorError> {
        let (list_index, floor_index) = self.locate_floor(dungeon_id, floor_id)?;
        self.taint(paths::FLOOR_LISTS);
        Ok(&mut self.floor_lists[list_index][floor_index])
    }

    /// Change a dungeon's floor count, keeping the attribute tables in
    /// lockstep with the floor list.
    pub fn change_floor_count(&mut self, dungeon_id: u8, new_count: u8) -> Result<(), EditorError> {
        let change =
            group::change_floor_count(&mut self.dungeons, &mut self.floor_lists, dungeon_id, new_count)?;
        let group_index = usize::from(change.mappa_index);
        if change.delta > 0 {
            let count = change.delta as usize;
            if let Some(table) = &mut self.ranks {
                table.extend_nb_floors(group_index, change.at, count, Rank::default());
                self.taint(paths::FLOOR_RANKS);
            }
            if let Some(table) = &mut self.mission_forbidden {
                table.extend_nb_floors(group_index, change.at, count, MissionForbidden::default());
                self.taint(paths::MISSION_FORBIDDEN);
            }
        } else if change.delta < 0 {
            let count = change.delta.unsigned_abs() as usize;
            if let Some(table) = &mut self.ranks {
                table.remove_nb_floors(group_index, change.at, count);
                self.taint(paths::FLOOR_RANKS);
            }
            if let Some(table) = &mut self.mission_forbidden {
                table.remove_nb_floors(group_index, change.at, count);
                self.taint(paths::MISSION_FORBIDDEN);
            }
        }
        self.taint(paths::FLOOR_LISTS);
        self.taint(paths::FLOOR_LIST_INDEX);
        self.dungeon_records_dirty = true;
        self.refresh_invalid();
        Ok(())
    }

    /// Rebuild the floor-list collection around a new partition of the
    /// regular dungeons. Rejected while the model has validation findings.
    pub fn regroup_dungeons(&mut self, new_groups: &[Vec<u8>]) -> Result<(), EditorError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(EditorError::Validation(errors));
        }
        let plan: ReorderPlan =
            group::regroup_dungeons(&mut self.dungeons, &mut self.floor_lists, new_groups)?;
        if let Some(table) = &mut self.ranks {
            table.reorder_floors(&plan);
            self.taint(paths::FLOOR_RANKS);
        }
        if let Some(table) = &mut self.mission_forbidden {
            table.reorder_floors(&plan);
            self.taint(paths::MISSION_FORBIDDEN);
        }
        self.taint(paths::FLOOR_LISTS);
        self.taint(paths::FLOOR_LIST_INDEX);
        self.dungeon_records_dirty = true;
        self.refresh_invalid();
        Ok(())
    }

    /// Taint-track a floor so the save pipeline re-emits dependent files.
    /// `also_index` additionally taints the derived floor-list index.
    pub fn mark_floor_as_modified(
        &mut self,
        dungeon_id: u8,
        floor_id: u8,
        also_index: bool,
    ) -> Result<(), EditorError> {
        self.locate_floor(dungeon_id, floor_id)?;
        self.taint(paths::FLOOR_LISTS);
        if also_index {
            self.taint(paths::FLOOR_LIST_INDEX);
        }
        Ok(())
    }

    /// Import the selected sections of a floor XML document. Transactional:
    /// a failed import leaves the floor untouched.
    pub fn import_from_xml(
        &mut self,
        dungeon_id: u8,
        floor_id: u8,
        document: &str,
        sections: XmlSections,
    ) -> Result<(), EditorError> {
        let (list_index, floor_index) = self.locate_floor(dungeon_id, floor_id)?;
        xml::import_floor(document, &mut self.floor_lists[list_index][floor_index], sections)?;
        self.taint(paths::FLOOR_LISTS);
        self.taint(paths::FLOOR_LIST_INDEX);
        Ok(())
    }

    pub fn export_floor_to_xml(
        &self,
        dungeon_id: u8,
        floor_id: u8,
        sections: XmlSections,
    ) -> Result<String, EditorError> {
        Ok(xml::export_floor(self.floor(dungeon_id, floor_id)?, sections)?)
    }

    pub fn has_floor_ranks(&self) -> bool {
        self.ranks.is_some()
    }

    pub fn has_mission_forbidden(&self) -> bool {
        self.mission_forbidden.is_some()
    }

    /// `None` when the deployment has no rank table or the floor is out of
    /// range.
    pub fn get_floor_rank(&self, dungeon_id: u8, floor_id: u8) -> Option<Rank> {
        let def = self.dungeons.get(usize::from(dungeon_id))?;
        self.ranks.as_ref()?.get(
            usize::from(def.mappa_index),
            usize::from(def.start_after) + usize::from(floor_id),
        )
    }

    /// Returns false (and does nothing) when the rank table is absent.
    pub fn set_floor_rank(&mut self, dungeon_id: u8, floor_id: u8, rank: Rank) -> bool {
        let Some(def) = self.dungeons.get(usize::from(dungeon_id)).copied() else {
            return false;
        };
        let Some(table) = &mut self.ranks else {
            return false;
        };
        table.set(
            usize::from(def.mappa_index),
            usize::from(def.start_after) + usize::from(floor_id),
            rank,
        );
        self.taint(paths::FLOOR_RANKS);
        true
    }

    pub fn get_floor_mf(&self, dungeon_id: u8, floor_id: u8) -> Option<MissionForbidden> {
        let def = self.dungeons.get(usize::from(dungeon_id))?;
        self.mission_forbidden.as_ref()?.get(
            usize::from(def.mappa_index),
            usize::from(def.start_after) + usize::from(floor_id),
        )
    }

    pub fn set_floor_mf(&mut self, dungeon_id: u8, floor_id: u8, mf: MissionForbidden) -> bool {
        let Some(def) = self.dungeons.get(usize::from(dungeon_id)).copied() else {
            return false;
        };
        let Some(table) = &mut self.mission_forbidden else {
            return false;
        };
        table.set(
            usize::from(def.mappa_index),
            usize::from(def.start_after) + usize::from(floor_id),
            mf,
        );
        self.taint(paths::MISSION_FORBIDDEN);
        true
    }

    /// Replace a fixed floor's action grid.
    pub fn save_fixed_floor(
        &mut self,
        fixed_floor_id: u8,
        floor: FixedFloor,
    ) -> Result<(), EditorError> {
        let slot = self
            .fixed_floors
            .get_mut(usize::from(fixed_floor_id))
            .ok_or(EditorError::UnknownFixedFloor(fixed_floor_id))?;
        *slot = floor;
        self.taint(paths::FIXED_FLOORS);
        Ok(())
    }

    /// Replace the entity-rule tables shared by all fixed floors.
    pub fn save_fixed_floor_entity_lists(&mut self, data: EntityData) {
        self.entity_data = data;
        self.taint(paths::FIXED_FLOORS);
    }

    /// Write a fixed floor's property record into overlay 10. Requires the
    /// fixed-floor-properties patch; without it the record layout does not
    /// exist in the binary.
    pub fn save_fixed_floor_properties(
        &mut self,
        fixed_floor_id: u8,
        properties: FixedFloorProperties,
    ) -> Result<(), EditorError> {
        if usize::from(fixed_floor_id) >= self.fixed_floors.len() {
            return Err(EditorError::UnknownFixedFloor(fixed_floor_id));
        }
        if !self.patches.is_patch_applied(Patch::ChangeFixedFloorProperties) {
            return Err(EditorError::PatchRequired(Patch::ChangeFixedFloorProperties));
        }
        let offset = OVERLAY10_FIXED_PROPS_OFFSET
            + usize::from(fixed_floor_id) * FixedFloorProperties::RECORD_SIZE;
        let record = properties.to_record();
        self.storage
            .patch_binary(BinaryName::Overlay10, &mut |blob| {
                let Some(slot) = blob.get_mut(offset..offset + record.len()) else {
                    return Err(StorageError::Corrupt {
                        path: "overlay10",
                        reason: format!("fixed floor property record at {offset:#x} out of range"),
                    });
                };
                slot.copy_from_slice(&record);
                Ok(())
            })?;
        Ok(())
    }

    /// Write a fixed floor's dungeon-override byte into overlay 29.
    pub fn save_fixed_floor_override(
        &mut self,
        fixed_floor_id: u8,
        dungeon_id: u8,
    ) -> Result<(), EditorError> {
        if usize::from(fixed_floor_id) >= self.fixed_floors.len() {
            return Err(EditorError::UnknownFixedFloor(fixed_floor_id));
        }
        let offset = OVERLAY29_FIXED_OVERRIDE_OFFSET + usize::from(fixed_floor_id);
        self.storage
            .patch_binary(BinaryName::Overlay29, &mut |blob| {
                let Some(slot) = blob.get_mut(offset) else {
                    return Err(StorageError::Corrupt {
                        path: "overlay29",
                        reason: format!("fixed floor override byte at {offset:#x} out of range"),
                    });
                };
                *slot = dungeon_id;
                Ok(())
            })?;
        Ok(())
    }

    /// Deterministic preview of a floor. `Ok(None)` when the layout could
    /// not produce a grid within the generator's retry limit.
    pub fn generate_preview(
        &self,
        dungeon_id: u8,
        floor_id: u8,
        seed: u32,
    ) -> Result<Option<FloorGrid>, EditorError> {
        Ok(mappa_gen::generate_floor(self.floor(dungeon_id, floor_id)?, seed))
    }

    /// Resolve a navigation request from another editor.
    pub fn resolve_open_request(&self, request: OpenRequest) -> Result<OpenTarget, OpenRequestError> {
        match request {
            OpenRequest::DungeonList => Ok(OpenTarget {
                node: TreeNode::Root,
                focus: None,
            }),
            OpenRequest::FixedFloor { fixed_floor_id } => {
                if usize::from(fixed_floor_id) >= self.fixed_floors.len() {
                    return Err(OpenRequestError::UnknownFixedFloor(fixed_floor_id));
                }
                Ok(OpenTarget {
                    node: TreeNode::FixedFloor { fixed_floor_id },
                    focus: None,
                })
            }
            OpenRequest::FixedFloorEntity {
                entity_rule_id,
                focus,
            } => {
                let fixed_floor_id = self
                    .find_fixed_floor_with_entity(entity_rule_id)
                    .ok_or(OpenRequestError::UnknownEntityRule(entity_rule_id))?;
                Ok(OpenTarget {
                    node: TreeNode::FixedFloor { fixed_floor_id },
                    focus: Some(focus),
                })
            }
            OpenRequest::DungeonFloor {
                dungeon_id,
                floor_id,
            } => {
                self.locate_floor(dungeon_id, floor_id).map_err(|_| {
                    if usize::from(dungeon_id) >= self.dungeons.len() {
                        OpenRequestError::UnknownDungeon(dungeon_id)
                    } else {
                        OpenRequestError::UnknownFloor {
                            dungeon_id,
                            floor_id,
                        }
                    }
                })?;
                Ok(OpenTarget {
                    node: TreeNode::DungeonFloor {
                        dungeon_id,
                        floor_id,
                    },
                    focus: None,
                })
            }
            OpenRequest::Tileset { tileset_id } => Ok(OpenTarget {
                node: TreeNode::Tileset { tileset_id },
                focus: None,
            }),
            OpenRequest::Music { music_id } => Ok(OpenTarget {
                node: TreeNode::Music { music_id },
                focus: None,
            }),
        }
    }

    /// Persist everything tainted since the last save.
    pub fn save(&mut self) -> Result<(), EditorError> {
        if self.dirty.contains(paths::FLOOR_LISTS) {
            self.storage.save_floor_lists(&self.floor_lists)?;
        }
        if self.dirty.contains(paths::FIXED_FLOORS) {
            self.storage.save_fixed_floors(&self.fixed_floors)?;
            self.storage.save_entity_data(&self.entity_data)?;
        }
        if self.dirty.contains(paths::FLOOR_RANKS)
            && let Some(table) = &self.ranks
        {
            self.storage.save_floor_ranks(table)?;
        }
        if self.dirty.contains(paths::MISSION_FORBIDDEN)
            && let Some(table) = &self.mission_forbidden
        {
            self.storage.save_mission_forbidden(table)?;
        }
        if self.dungeon_records_dirty {
            let dungeons = self.dungeons.clone();
            self.storage.patch_binary(BinaryName::Arm9, &mut |blob| {
                write_dungeon_records(blob, ARM9_DUNGEON_TABLE_OFFSET, &dungeons)
            })?;
            self.dungeon_records_dirty = false;
        }
        self.dirty.clear();
        Ok(())
    }

    fn taint(&mut self, path: &'static str) {
        if self.dirty.insert(path) {
            self.storage.mark_modified(path);
        }
    }

    fn refresh_invalid(&mut self) {
        self.invalid_dungeons = self
            .validate()
            .iter()
            .map(crate::validator::error_dungeon_id)
            .collect();
    }

    fn locate_floor(&self, dungeon_id: u8, floor_id: u8) -> Result<(usize, usize), EditorError> {
        let def = self
            .dungeons
            .get(usize::from(dungeon_id))
            .ok_or(EditorError::UnknownDungeon(dungeon_id))?;
        if floor_id >= def.number_floors {
            return Err(EditorError::UnknownFloor {
                dungeon_id,
                floor_id,
            });
        }
        let list_index = usize::from(def.mappa_index);
        let floor_index = usize::from(def.start_after) + usize::from(floor_id);
        if self
            .floor_lists
            .get(list_index)
            .is_none_or(|list| floor_index >= list.len())
        {
            return Err(EditorError::UnknownFloor {
                dungeon_id,
                floor_id,
            });
        }
        Ok((list_index, floor_index))
    }

    fn find_fixed_floor_with_entity(&self, entity_rule_id: u16) -> Option<u8> {
        if usize::from(entity_rule_id) >= self.entity_data.entities.len() {
            return None;
        }
        self.fixed_floors.iter().position(|floor| {
            floor.actions().iter().any(|action| {
                matches!(action, ActionRule::EntityRule { entity_rule_id: id, .. } if *id == entity_rule_id)
            })
        })
        .map(|idx| idx as u8)
    }
}
