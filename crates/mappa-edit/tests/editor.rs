//! End-to-end orchestrator scenarios against an in-memory project.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mappa_edit::orchestrator::ARM9_DUNGEON_TABLE_OFFSET;
use mappa_edit::storage::{self, paths};
use mappa_edit::{
    BinaryName, DungeonEditor, DungeonListEntry, EditorError, EntityData, Patch, Patches, Storage,
    StorageError,
};
use mappa_types::attributes::{FloorAttrTable, MissionForbidden, Rank};
use mappa_types::dungeon::DungeonDefinition;
use mappa_types::fixed_floor::FixedFloor;
use mappa_types::floor::{Floor, FloorList};

#[derive(Default)]
struct MemProject {
    dungeons: Vec<DungeonDefinition>,
    floor_lists: Vec<FloorList>,
    fixed_floors: Vec<FixedFloor>,
    entity_data: EntityData,
    ranks: Option<FloorAttrTable<Rank>>,
    mission_forbidden: Option<FloorAttrTable<MissionForbidden>>,
    binaries: HashMap<BinaryName, Vec<u8>>,
    modified: Vec<&'static str>,
    saved_lists: Option<Vec<FloorList>>,
    saved_ranks: Option<FloorAttrTable<Rank>>,
}

/// Shared handle so a test can inspect the project after the editor took
/// ownership of the storage.
#[derive(Clone, Default)]
struct MemStorage(Rc<RefCell<MemProject>>);

impl Storage for MemStorage {
    fn load_dungeon_definitions(&self) -> Result<Vec<DungeonDefinition>, StorageError> {
        Ok(self.0.borrow().dungeons.clone())
    }

    fn load_floor_lists(&self) -> Result<Vec<FloorList>, StorageError> {
        Ok(self.0.borrow().floor_lists.clone())
    }

    fn load_fixed_floors(&self) -> Result<Vec<FixedFloor>, StorageError> {
        Ok(self.0.borrow().fixed_floors.clone())
    }

    fn load_floor_ranks(&self) -> Result<Option<FloorAttrTable<Rank>>, StorageError> {
        Ok(self.0.borrow().ranks.clone())
    }

    fn load_mission_forbidden(
        &self,
    ) -> Result<Option<FloorAttrTable<MissionForbidden>>, StorageError> {
        Ok(self.0.borrow().mission_forbidden.clone())
    }

    fn load_entity_data(&self) -> Result<EntityData, StorageError> {
        Ok(self.0.borrow().entity_data.clone())
    }

    fn save_floor_lists(&mut self, lists: &[FloorList]) -> Result<(), StorageError> {
        self.0.borrow_mut().saved_lists = Some(lists.to_vec());
        Ok(())
    }

    fn save_fixed_floors(&mut self, floors: &[FixedFloor]) -> Result<(), StorageError> {
        self.0.borrow_mut().fixed_floors = floors.to_vec();
        Ok(())
    }

    fn save_entity_data(&mut self, data: &EntityData) -> Result<(), StorageError> {
        self.0.borrow_mut().entity_data = data.clone();
        Ok(())
    }

    fn save_floor_ranks(&mut self, table: &FloorAttrTable<Rank>) -> Result<(), StorageError> {
        self.0.borrow_mut().saved_ranks = Some(table.clone());
        Ok(())
    }

    fn save_mission_forbidden(
        &mut self,
        table: &FloorAttrTable<MissionForbidden>,
    ) -> Result<(), StorageError> {
        self.0.borrow_mut().mission_forbidden = Some(table.clone());
        Ok(())
    }

    fn mark_modified(&mut self, path: &'static str) {
        self.0.borrow_mut().modified.push(path);
    }

    fn patch_binary(
        &mut self,
        binary: BinaryName,
        patch: &mut dyn FnMut(&mut Vec<u8>) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        let mut project = self.0.borrow_mut();
        let blob = project.binaries.entry(binary).or_default();
        patch(blob)
    }
}

struct AllPatches;

impl Patches for AllPatches {
    fn is_patch_applied(&self, _patch: Patch) -> bool {
        true
    }
}

struct NoPatches;

impl Patches for NoPatches {
    fn is_patch_applied(&self, _patch: Patch) -> bool {
        false
    }
}

fn def(mappa_index: u8, start_after: u8, n: u8, nig: u8) -> DungeonDefinition {
    DungeonDefinition {
        number_floors: n,
        mappa_index,
        start_after,
        number_floors_in_group: nig,
    }
}

fn floors(n: usize) -> FloorList {
    let mut list = FloorList::new();
    for i in 0..n {
        let mut floor = Floor::template();
        floor.layout.floor_number = (i + 1) as u8;
        list.push(floor);
    }
    list
}

fn project() -> MemStorage {
    let storage = MemStorage::default();
    {
        let mut p = storage.0.borrow_mut();
        p.dungeons = vec![def(0, 0, 3, 3), def(1, 0, 2, 2)];
        p.floor_lists = vec![floors(3), floors(2)];
        p.fixed_floors = vec![FixedFloor::new(8, 8), FixedFloor::new(4, 4)];
        p.ranks = Some(FloorAttrTable::new(vec![vec![0, 1, 2, 3], vec![0, 4, 5]]));
        p.binaries.insert(
            BinaryName::Arm9,
            vec![0u8; ARM9_DUNGEON_TABLE_OFFSET + 64],
        );
    }
    storage
}

#[test]
fn regroup_two_singletons_then_validate_clean() {
    let storage = project();
    let handle = storage.clone();
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();

    editor.regroup_dungeons(&[vec![0, 1]]).unwrap();

    assert_eq!(editor.dungeons()[0], def(2, 0, 3, 5));
    assert_eq!(editor.dungeons()[1], def(2, 3, 2, 5));
    assert_eq!(editor.floor_lists()[2].len(), 5);
    assert!(editor.floor_lists()[0].is_empty());
    assert!(editor.validate().is_empty());
    assert!(editor.invalid_dungeons().is_empty());

    // The projection now shows one group.
    let entries = editor.load_dungeons();
    assert_eq!(entries.len(), 1);
    assert!(matches!(&entries[0], DungeonListEntry::Group(g) if g.members == vec![0, 1]));

    // Rank floors followed their lists: group 2 = old group 0 + old group 1.
    assert_eq!(editor.get_floor_rank(0, 0), Some(Rank::D));
    assert_eq!(editor.get_floor_rank(1, 0), Some(Rank::A));
    assert_eq!(editor.get_floor_rank(1, 1), Some(Rank::S));

    editor.save().unwrap();
    let p = handle.0.borrow();
    let saved = p.saved_lists.as_ref().expect("floor lists persisted");
    assert_eq!(saved[2].len(), 5);
    assert!(p.saved_ranks.is_some(), "reordered rank table persisted");
    let arm9 = &p.binaries[&BinaryName::Arm9];
    let records = storage::read_dungeon_records(arm9, ARM9_DUNGEON_TABLE_OFFSET, 2).unwrap();
    assert_eq!(records[0], def(2, 0, 3, 5));
    assert_eq!(records[1], def(2, 3, 2, 5));
}

#[test]
fn regroup_is_rejected_on_invalid_model() {
    let storage = project();
    storage.0.borrow_mut().dungeons[1].mappa_index = 200;
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();
    let err = editor.regroup_dungeons(&[vec![0, 1]]).unwrap_err();
    assert!(matches!(err, EditorError::Validation(ref e) if !e.is_empty()));
    // The model is untouched.
    assert_eq!(editor.dungeons()[1].mappa_index, 200);
}

#[test]
fn change_floor_count_grows_list_and_rank_table() {
    let storage = project();
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();

    editor.change_floor_count(0, 5).unwrap();

    assert_eq!(editor.dungeons()[0], def(0, 0, 5, 5));
    assert_eq!(editor.floor_lists()[0].len(), 5);
    let numbers: Vec<u8> = editor.floor_lists()[0]
        .iter()
        .map(|f| f.layout.floor_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    // Rank table grew in lockstep with default fill.
    assert_eq!(editor.get_floor_rank(0, 2), Some(Rank::B));
    assert_eq!(editor.get_floor_rank(0, 3), Some(Rank::E));
    assert_eq!(editor.get_floor_rank(0, 4), Some(Rank::E));
    assert!(editor.validate().is_empty());

    editor.change_floor_count(0, 2).unwrap();
    assert_eq!(editor.floor_lists()[0].len(), 2);
    assert_eq!(editor.get_floor_rank(0, 1), Some(Rank::C));
    assert!(editor.validate().is_empty());
}

#[test]
fn orphan_dungeon_is_repaired() {
    let storage = project();
    storage.0.borrow_mut().dungeons[1] = def(200, 0, 2, 2);
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();
    assert!(editor.invalid_dungeons().contains(&1));

    let applied = editor.repair_all();
    assert!(applied >= 1);
    let repaired = editor.dungeons()[1];
    assert_eq!(repaired.start_after, 0);
    assert_eq!(repaired.number_floors, 1);
    assert_eq!(repaired.number_floors_in_group, 1);
    assert_eq!(
        editor.floor_lists()[usize::from(repaired.mappa_index)].len(),
        1
    );
    assert!(editor.validate().is_empty());
    assert!(editor.invalid_dungeons().is_empty());
}

#[test]
fn xml_round_trip_through_the_editor() {
    let storage = project();
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();

    {
        let floor = editor.floor_mut(0, 1).unwrap();
        floor.layout.tileset_id = 42;
        floor.layout.music_id = 7;
    }
    let document = editor
        .export_floor_to_xml(0, 1, mappa_data::xml::XmlSections::all())
        .unwrap();

    editor
        .import_from_xml(1, 0, &document, mappa_data::xml::XmlSections::all())
        .unwrap();
    assert_eq!(editor.floor(1, 0).unwrap().layout.tileset_id, 42);
    assert_eq!(editor.floor(1, 0).unwrap().layout.music_id, 7);
}

#[test]
fn rank_setter_is_gated_on_table_presence() {
    let storage = project();
    storage.0.borrow_mut().ranks = None;
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();
    assert!(!editor.has_floor_ranks());
    assert!(!editor.set_floor_rank(0, 0, Rank::S));
    assert_eq!(editor.get_floor_rank(0, 0), None);
}

#[test]
fn fixed_floor_properties_require_the_patch() {
    let storage = project();
    let mut editor = DungeonEditor::open(storage, NoPatches).unwrap();
    let err = editor
        .save_fixed_floor_properties(0, Default::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::PatchRequired(Patch::ChangeFixedFloorProperties)
    ));
}

#[test]
fn fixed_floor_properties_patch_overlay10() {
    let storage = project();
    storage
        .0
        .borrow_mut()
        .binaries
        .insert(BinaryName::Overlay10, vec![0u8; 0x1000]);
    let handle = storage.clone();
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();

    editor
        .save_fixed_floor_properties(
            1,
            mappa_edit::FixedFloorProperties {
                music_id: 0x0142,
                moves_enabled: true,
                orbs_enabled: false,
                exit_on_hero_ko: true,
            },
        )
        .unwrap();

    let p = handle.0.borrow();
    let blob = &p.binaries[&BinaryName::Overlay10];
    let offset = mappa_edit::orchestrator::OVERLAY10_FIXED_PROPS_OFFSET + 4;
    assert_eq!(&blob[offset..offset + 4], &[0x42, 0x01, 0x05, 0x00]);
}

#[test]
fn mark_floor_as_modified_taints_storage() {
    let storage = project();
    let handle = storage.clone();
    let mut editor = DungeonEditor::open(storage, AllPatches).unwrap();
    editor.mark_floor_as_modified(0, 1, true).unwrap();
    let modified = handle.0.borrow().modified.clone();
    assert!(modified.contains(&paths::FLOOR_LISTS));
    assert!(modified.contains(&paths::FLOOR_LIST_INDEX));

    let err = editor.mark_floor_as_modified(0, 9, false).unwrap_err();
    assert!(matches!(err, EditorError::UnknownFloor { .. }));
}

#[test]
fn preview_generation_runs_from_the_editor() {
    let storage = project();
    {
        let mut p = storage.0.borrow_mut();
        for floor in &mut p.floor_lists[0] {
            floor.layout.room_density = -4;
            floor.layout.floor_connectivity = 10;
        }
    }
    let editor = DungeonEditor::open(storage, AllPatches).unwrap();
    let a = editor.generate_preview(0, 0, 77).unwrap().unwrap();
    let b = editor.generate_preview(0, 0, 77).unwrap().unwrap();
    assert_eq!(a, b);
}
