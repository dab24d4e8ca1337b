//! The dungeon grouping model.
//!
//! Dungeons reference shared floor lists by `mappa_index`; every set of
//! dungeons sharing an index forms a group whose `start_after` ranges
//! partition the list. Groups are derived views over the dungeon records,
//! never stored state.

use std::collections::{BTreeMap, BTreeSet};

use mappa_types::attributes::{ReorderPlan, ReorderSlice};
use mappa_types::dungeon::{DOJO_MAPPA_INDEX, DungeonDefinition, is_dojo_dungeon};
use mappa_types::floor::{Floor, FloorList};

/// Dungeon ids are a u8 space; records past this count are unreachable.
pub const MAX_DUNGEONS: usize = 256;

/// A derived group of dungeons sharing one floor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DungeonGroup {
    /// Lowest member dungeon id; used as the group's display anchor.
    pub base_id: u8,
    /// Member dungeon ids, ordered by ascending `start_after`.
    pub members: Vec<u8>,
    /// `start_after` of each member, parallel to `members`.
    pub start_ids: Vec<u8>,
}

/// One entry of the dungeon list projection: a lone dungeon or a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DungeonListEntry {
    Single(u8),
    Group(DungeonGroup),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("dungeon id {0} appears in more than one group")]
    DuplicateDungeon(u8),
    #[error("dungeon id {0} is missing from the partition")]
    UnassignedDungeon(u8),
    #[error("dungeon id {0} does not exist")]
    UnknownDungeon(u8),
    #[error("dojo dungeon {0} cannot be regrouped or resized")]
    DojoReadOnly(u8),
    #[error("regroup would need more than 255 floor lists")]
    TooManyFloorLists,
    #[error("dungeon table has {0} records; at most {MAX_DUNGEONS} are addressable")]
    TooManyDungeons(usize),
    #[error("dungeon id {dungeon_id} references floors outside its list")]
    FloorRangeOutOfBounds { dungeon_id: u8 },
}

/// Project the dungeon records into the grouped list shown by editors.
///
/// Buckets by `mappa_index` in order of first appearance; a bucket of one
/// yields the bare id, larger buckets yield a [`DungeonGroup`] with members
/// sorted by `start_after`.
pub fn load_dungeons(dungeons: &[DungeonDefinition]) -> Vec<DungeonListEntry> {
    if dungeons.len() > MAX_DUNGEONS {
        log::warn!(
            "dungeon table has {} records; ids past {MAX_DUNGEONS} are unreachable",
            dungeons.len()
        );
    }
    let dungeons = &dungeons[..dungeons.len().min(MAX_DUNGEONS)];
    let mut order: Vec<u8> = Vec::new();
    let mut buckets: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    for (id, def) in dungeons.iter().enumerate() {
        let bucket = buckets.entry(def.mappa_index).or_default();
        if bucket.is_empty() {
            order.push(def.mappa_index);
        }
        bucket.push(id as u8);
    }

    let mut entries = Vec::with_capacity(order.len());
    for mappa_index in order {
        let mut members = buckets.remove(&mappa_index).unwrap_or_default();
        if members.len() == 1 {
            entries.push(DungeonListEntry::Single(members[0]));
            continue;
        }
        members.sort_by_key(|&id| dungeons[id as usize].start_after);
        let start_ids = members
            .iter()
            .map(|&id| dungeons[id as usize].start_after)
            .collect();
        entries.push(DungeonListEntry::Group(DungeonGroup {
            base_id: members.iter().copied().min().unwrap_or_default(),
            members,
            start_ids,
        }));
    }
    entries
}

/// Rebuild the floor-list collection around a new partition of the regular
/// dungeons.
///
/// Every group in `new_groups` gets a fresh list appended to the
/// collection, built by concatenating its members' current floor slices in
/// group order. Drained lists stay in place, emptied, so existing
/// `mappa_index` values of untouched dungeons keep meaning. The dojo list
/// never moves from its fixed index.
///
/// Returns the reorder plan the attribute tables must be replayed with.
pub fn regroup_dungeons(
    dungeons: &mut [DungeonDefinition],
    floor_lists: &mut Vec<FloorList>,
    new_groups: &[Vec<u8>],
) -> Result<ReorderPlan, GroupError> {
    check_partition(dungeons, new_groups)?;

    let old_lists = std::mem::take(floor_lists);
    let drained: BTreeSet<u8> = new_groups
        .iter()
        .flatten()
        .map(|&id| dungeons[id as usize].mappa_index)
        .collect();

    let mut plan: ReorderPlan = Vec::new();
    let mut new_lists: Vec<FloorList> = Vec::new();
    for (index, list) in old_lists.iter().enumerate() {
        if index == usize::from(DOJO_MAPPA_INDEX) || !drained.contains(&(index as u8)) {
            plan.push(vec![(index, 0, list.len())]);
            new_lists.push(list.clone());
        } else {
            plan.push(Vec::new());
            new_lists.push(FloorList::new());
        }
    }

    for group in new_groups {
        let new_index =
            u8::try_from(new_lists.len()).map_err(|_| GroupError::TooManyFloorLists)?;
        let mut combined = FloorList::new();
        let mut slices: Vec<ReorderSlice> = Vec::new();
        let mut offsets = Vec::with_capacity(group.len());
        for &member in group {
            let def = dungeons[member as usize];
            let list = old_lists
                .get(usize::from(def.mappa_index))
                .ok_or(GroupError::FloorRangeOutOfBounds { dungeon_id: member })?;
            let start = usize::from(def.start_after);
            let end = start + usize::from(def.number_floors);
            if end > list.len() {
                return Err(GroupError::FloorRangeOutOfBounds { dungeon_id: member });
            }
            offsets.push(combined.len() as u8);
            combined.extend_from_slice(&list[start..end]);
            slices.push((usize::from(def.mappa_index), start, end));
        }
        restamp_floor_numbers(&mut combined);

        let total = combined.len() as u8;
        for (&member, &offset) in group.iter().zip(&offsets) {
            let def = &mut dungeons[member as usize];
            def.mappa_index = new_index;
            def.start_after = offset;
            def.number_floors_in_group = total;
        }
        plan.push(slices);
        new_lists.push(combined);
    }

    *floor_lists = new_lists;
    Ok(plan)
}

fn check_partition(dungeons: &[DungeonDefinition], new_groups: &[Vec<u8>]) -> Result<(), GroupError> {
    if dungeons.len() > MAX_DUNGEONS {
        return Err(GroupError::TooManyDungeons(dungeons.len()));
    }
    let mut seen = BTreeSet::new();
    for &id in new_groups.iter().flatten() {
        if usize::from(id) >= dungeons.len() {
            return Err(GroupError::UnknownDungeon(id));
        }
        if is_dojo_dungeon(id) {
            return Err(GroupError::DojoReadOnly(id));
        }
        if !seen.insert(id) {
            return Err(GroupError::DuplicateDungeon(id));
        }
    }
    for id in 0..dungeons.len() as u8 {
        if !is_dojo_dungeon(id) && !seen.contains(&id) {
            return Err(GroupError::UnassignedDungeon(id));
        }
    }
    Ok(())
}

/// What [`change_floor_count`] did, for replay into the attribute tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorCountChange {
    pub mappa_index: u8,
    /// 1-based storage index where floors were inserted or removed.
    pub at: usize,
    /// Positive for growth, negative for shrink.
    pub delta: i16,
    /// Storage length of the group after the change (floors + header).
    pub new_storage_len: usize,
}

/// Change a dungeon's floor count in place.
///
/// Growth clones the dungeon's current last floor (or the template when it
/// has none); shrink removes from the dungeon's tail. Sibling dungeons
/// further along the shared list have their `start_after` shifted and all
/// members get the new group total.
pub fn change_floor_count(
    dungeons: &mut [DungeonDefinition],
    floor_lists: &mut [FloorList],
    dungeon_id: u8,
    new_count: u8,
) -> Result<FloorCountChange, GroupError> {
    if dungeons.len() > MAX_DUNGEONS {
        return Err(GroupError::TooManyDungeons(dungeons.len()));
    }
    if is_dojo_dungeon(dungeon_id) {
        return Err(GroupError::DojoReadOnly(dungeon_id));
    }
    let def = *dungeons
        .get(usize::from(dungeon_id))
        .ok_or(GroupError::UnknownDungeon(dungeon_id))?;
    let list = floor_lists
        .get_mut(usize::from(def.mappa_index))
        .ok_or(GroupError::FloorRangeOutOfBounds { dungeon_id })?;
    let start = usize::from(def.start_after);
    let old_count = usize::from(def.number_floors);
    if start + old_count > list.len() {
        return Err(GroupError::FloorRangeOutOfBounds { dungeon_id });
    }

    let delta = i16::from(new_count) - i16::from(def.number_floors);
    if delta > 0 {
        let template = if old_count == 0 {
            Floor::template()
        } else {
            list[start + old_count - 1].clone()
        };
        let at = start + old_count;
        list.splice(at..at, std::iter::repeat_n(template, delta as usize));
    } else if delta < 0 {
        let keep = usize::from(new_count);
        list.drain(start + keep..start + old_count);
    }
    restamp_floor_numbers(list);
    let new_storage_len = list.len() + 1;

    for (id, sibling) in dungeons.iter_mut().enumerate() {
        if sibling.mappa_index != def.mappa_index {
            continue;
        }
        if id as u8 != dungeon_id && sibling.start_after > def.start_after {
            sibling.start_after = (i16::from(sibling.start_after) + delta) as u8;
        }
        sibling.number_floors_in_group =
            (i16::from(sibling.number_floors_in_group) + delta) as u8;
    }
    dungeons[usize::from(dungeon_id)].number_floors = new_count;

    Ok(FloorCountChange {
        mappa_index: def.mappa_index,
        // +1 for the attribute tables' header slot.
        at: start + old_count.min(usize::from(new_count)) + 1,
        delta,
        new_storage_len,
    })
}

fn restamp_floor_numbers(list: &mut [Floor]) {
    for (pos, floor) in list.iter_mut().enumerate() {
        floor.layout.floor_number = (pos + 1) as u8;
    }
}
