//! Dungeon list validation and automatic repair.
//!
//! The validator only reports; repairs are separate functions applied by
//! the orchestrator so a UI can show the report before mutating anything.

use std::collections::BTreeMap;

use mappa_types::dungeon::DungeonDefinition;
use mappa_types::floor::{Floor, FloorList};

/// A structured validation finding. Every kind is repairable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DungeonError {
    #[error("dungeon {dungeon_id} references floor list {mappa_index}, which does not exist")]
    InvalidFloorListReferenced { dungeon_id: u8, mappa_index: u8 },
    #[error("dungeon {dungeon_id} references floors past the end of its list")]
    InvalidFloorReferenced { dungeon_id: u8 },
    #[error("dungeon {dungeon_id} reuses floors of dungeon {reused_of_dungeon_with_id}")]
    FloorReused {
        dungeon_id: u8,
        reused_of_dungeon_with_id: u8,
    },
    #[error("floor list of dungeon {dungeon_id} has unreferenced floors {floors_in_mappa_not_referenced:?}")]
    DungeonMissingFloor {
        dungeon_id: u8,
        floors_in_mappa_not_referenced: Vec<u8>,
    },
    #[error(
        "dungeon {dungeon_id} declares a group total of {actual} floors, expected {expected_floor_count_in_group}"
    )]
    DungeonTotalFloorCountInvalid {
        dungeon_id: u8,
        actual: u8,
        expected_floor_count_in_group: u8,
    },
}

/// The dungeon id of the one known shipping data bug: a single dungeon
/// whose list carries one trailing floor the game never uses.
const TRAILING_UNUSED_FLOOR_DUNGEON: u8 = 61;
const TRAILING_UNUSED_FLOOR_MAPPA: u8 = 52;

/// Validate the dungeon records against the floor-list collection.
///
/// Findings are reported in dungeon-id order, list-level findings against
/// the lowest member id.
pub fn validate(dungeons: &[DungeonDefinition], floor_lists: &[FloorList]) -> Vec<DungeonError> {
    let mut errors = Vec::new();

    let mut groups: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    for (id, def) in dungeons.iter().enumerate() {
        let id = id as u8;
        let Some(list) = floor_lists.get(usize::from(def.mappa_index)) else {
            errors.push(DungeonError::InvalidFloorListReferenced {
                dungeon_id: id,
                mappa_index: def.mappa_index,
            });
            continue;
        };
        if usize::from(def.start_after) + usize::from(def.number_floors) > list.len() {
            errors.push(DungeonError::InvalidFloorReferenced { dungeon_id: id });
            continue;
        }
        groups.entry(def.mappa_index).or_default().push(id);
    }

    for (mappa_index, members) in &groups {
        let list_len = floor_lists[usize::from(*mappa_index)].len();
        let mut members = members.clone();
        members.sort_by_key(|&id| dungeons[usize::from(id)].start_after);

        // Overlap between consecutive ranges.
        let mut covered = vec![false; list_len];
        let mut overlap = false;
        for window in members.windows(2) {
            let a = dungeons[usize::from(window[0])];
            let b = dungeons[usize::from(window[1])];
            if u16::from(b.start_after) < u16::from(a.start_after) + u16::from(a.number_floors) {
                errors.push(DungeonError::FloorReused {
                    dungeon_id: window[1],
                    reused_of_dungeon_with_id: window[0],
                });
                overlap = true;
            }
        }
        for &id in &members {
            let def = dungeons[usize::from(id)];
            let start = usize::from(def.start_after);
            for c in covered.iter_mut().skip(start).take(usize::from(def.number_floors)) {
                *c = true;
            }
        }
        if !overlap {
            let missing: Vec<u8> = covered
                .iter()
                .enumerate()
                .filter(|(_, c)| !**c)
                .map(|(f, _)| f as u8)
                .collect();
            if !missing.is_empty() {
                errors.push(DungeonError::DungeonMissingFloor {
                    dungeon_id: members[0],
                    floors_in_mappa_not_referenced: missing,
                });
            }
        }

        let expected: u16 = members
            .iter()
            .map(|&id| u16::from(dungeons[usize::from(id)].number_floors))
            .sum();
        for &id in &members {
            let def = dungeons[usize::from(id)];
            if u16::from(def.number_floors_in_group) != expected {
                errors.push(DungeonError::DungeonTotalFloorCountInvalid {
                    dungeon_id: id,
                    actual: def.number_floors_in_group,
                    expected_floor_count_in_group: expected as u8,
                });
            }
        }
    }

    errors.sort_by_key(error_dungeon_id);
    errors
}

pub(crate) fn error_dungeon_id(error: &DungeonError) -> u8 {
    match error {
        DungeonError::InvalidFloorListReferenced { dungeon_id, .. }
        | DungeonError::InvalidFloorReferenced { dungeon_id }
        | DungeonError::FloorReused { dungeon_id, .. }
        | DungeonError::DungeonMissingFloor { dungeon_id, .. }
        | DungeonError::DungeonTotalFloorCountInvalid { dungeon_id, .. } => *dungeon_id,
    }
}

/// Apply the standard repair for one finding. Returns false when the
/// finding could not be repaired automatically.
pub fn repair(
    error: &DungeonError,
    dungeons: &mut [DungeonDefinition],
    floor_lists: &mut Vec<FloorList>,
) -> bool {
    match *error {
        DungeonError::InvalidFloorListReferenced { dungeon_id, .. }
        | DungeonError::FloorReused { dungeon_id, .. } => {
            assign_fresh_list(dungeon_id, dungeons, floor_lists)
        }
        DungeonError::InvalidFloorReferenced { dungeon_id } => {
            let def = &mut dungeons[usize::from(dungeon_id)];
            let Some(list) = floor_lists.get_mut(usize::from(def.mappa_index)) else {
                return false;
            };
            if list.is_empty() {
                list.push(Floor::template());
            }
            let available = list.len().saturating_sub(usize::from(def.start_after));
            if available == 0 {
                def.start_after = 0;
                def.number_floors = list.len() as u8;
            } else {
                def.number_floors = available as u8;
            }
            true
        }
        DungeonError::DungeonMissingFloor {
            dungeon_id,
            ref floors_in_mappa_not_referenced,
        } => repair_missing_floor(dungeon_id, floors_in_mappa_not_referenced, dungeons, floor_lists),
        DungeonError::DungeonTotalFloorCountInvalid {
            dungeon_id,
            expected_floor_count_in_group,
            ..
        } => {
            let mappa_index = dungeons[usize::from(dungeon_id)].mappa_index;
            for def in dungeons.iter_mut() {
                if def.mappa_index == mappa_index {
                    def.number_floors_in_group = expected_floor_count_in_group;
                }
            }
            true
        }
    }
}

/// Give a dungeon a brand-new single-floor list of its own.
fn assign_fresh_list(
    dungeon_id: u8,
    dungeons: &mut [DungeonDefinition],
    floor_lists: &mut Vec<FloorList>,
) -> bool {
    let Ok(new_index) = u8::try_from(floor_lists.len()) else {
        return false;
    };
    floor_lists.push(vec![Floor::template()]);
    let def = &mut dungeons[usize::from(dungeon_id)];
    def.mappa_index = new_index;
    def.start_after = 0;
    def.number_floors = 1;
    def.number_floors_in_group = 1;
    true
}

fn repair_missing_floor(
    dungeon_id: u8,
    missing: &[u8],
    dungeons: &mut [DungeonDefinition],
    floor_lists: &mut [FloorList],
) -> bool {
    let def = dungeons[usize::from(dungeon_id)];
    let siblings = dungeons
        .iter()
        .filter(|d| d.mappa_index == def.mappa_index)
        .count();

    // Known data bug: one dungeon ships with a single trailing floor its
    // list never uses. Drop the floor instead of absorbing it.
    if dungeon_id == TRAILING_UNUSED_FLOOR_DUNGEON
        && def.mappa_index == TRAILING_UNUSED_FLOOR_MAPPA
        && siblings == 1
        && missing.len() == 1
    {
        let list = &mut floor_lists[usize::from(def.mappa_index)];
        if usize::from(missing[0]) == list.len() - 1 {
            list.pop();
            return true;
        }
    }

    // General case: absorb the floors into this dungeon, but only when
    // they directly follow its current range without a gap.
    let range_end = u16::from(def.start_after) + u16::from(def.number_floors);
    let consecutive = missing
        .iter()
        .enumerate()
        .all(|(i, &f)| u16::from(f) == range_end + i as u16);
    if !consecutive {
        return false;
    }
    let delta = missing.len() as u8;
    let Some(grown) = def.number_floors.checked_add(delta) else {
        return false;
    };
    let mappa_index = def.mappa_index;
    dungeons[usize::from(dungeon_id)].number_floors = grown;
    for d in dungeons.iter_mut() {
        if d.mappa_index == mappa_index {
            d.number_floors_in_group = d.number_floors_in_group.saturating_add(delta);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(mappa_index: u8, start_after: u8, n: u8, nig: u8) -> DungeonDefinition {
        DungeonDefinition {
            number_floors: n,
            mappa_index,
            start_after,
            number_floors_in_group: nig,
        }
    }

    fn floors(n: usize) -> FloorList {
        vec![Floor::template(); n]
    }

    #[test]
    fn clean_model_validates_clean() {
        let dungeons = vec![def(0, 0, 3, 5), def(0, 3, 2, 5), def(1, 0, 4, 4)];
        let lists = vec![floors(5), floors(4)];
        assert!(validate(&dungeons, &lists).is_empty());
    }

    #[test]
    fn out_of_range_list_is_reported_and_repaired() {
        let mut dungeons = vec![def(199, 0, 3, 3)];
        let mut lists = vec![floors(5)];
        let errors = validate(&dungeons, &lists);
        assert_eq!(
            errors,
            vec![DungeonError::InvalidFloorListReferenced {
                dungeon_id: 0,
                mappa_index: 199
            }]
        );

        assert!(repair(&errors[0], &mut dungeons, &mut lists));
        assert_eq!(dungeons[0], def(1, 0, 1, 1));
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[1].len(), 1);
        assert!(validate(&dungeons, &lists).is_empty());
    }

    #[test]
    fn floor_range_past_list_end() {
        let mut dungeons = vec![def(0, 2, 5, 5)];
        let mut lists = vec![floors(4)];
        let errors = validate(&dungeons, &lists);
        assert_eq!(
            errors,
            vec![DungeonError::InvalidFloorReferenced { dungeon_id: 0 }]
        );

        assert!(repair(&errors[0], &mut dungeons, &mut lists));
        assert_eq!(dungeons[0].number_floors, 2);
        // A follow-up validation still flags the now-uncovered floors 0..2
        // plus the stale group total; repair is iterative by design.
        let errors = validate(&dungeons, &lists);
        assert!(!errors.is_empty());
    }

    #[test]
    fn overlapping_ranges_are_floor_reuse() {
        let dungeons = vec![def(0, 0, 3, 5), def(0, 2, 3, 5)];
        let lists = vec![floors(5)];
        let errors = validate(&dungeons, &lists);
        assert!(errors.contains(&DungeonError::FloorReused {
            dungeon_id: 1,
            reused_of_dungeon_with_id: 0
        }));
    }

    #[test]
    fn uncovered_floors_are_missing() {
        let dungeons = vec![def(0, 0, 2, 2)];
        let lists = vec![floors(4)];
        let errors = validate(&dungeons, &lists);
        assert_eq!(
            errors,
            vec![DungeonError::DungeonMissingFloor {
                dungeon_id: 0,
                floors_in_mappa_not_referenced: vec![2, 3]
            }]
        );
    }

    #[test]
    fn consecutive_trailing_floors_are_absorbed() {
        let mut dungeons = vec![def(0, 0, 2, 2)];
        let mut lists = vec![floors(4)];
        let errors = validate(&dungeons, &lists);
        assert!(repair(&errors[0], &mut dungeons, &mut lists));
        assert_eq!(dungeons[0], def(0, 0, 4, 4));
        assert!(validate(&dungeons, &lists).is_empty());
    }

    #[test]
    fn gap_before_dungeon_range_is_not_absorbed() {
        let dungeons = vec![def(0, 1, 2, 2)];
        let mut lists = vec![floors(3)];
        let errors = validate(&dungeons, &lists);
        let mut dungeons = dungeons;
        assert!(!repair(&errors[0], &mut dungeons, &mut lists));
    }

    #[test]
    fn trailing_unused_floor_special_case_removes_the_floor() {
        let mut dungeons: Vec<DungeonDefinition> = (0..=61).map(|_| def(0, 0, 3, 3)).collect();
        dungeons[61] = def(52, 0, 3, 3);
        let mut lists: Vec<FloorList> = (0..=52).map(|_| floors(3)).collect();
        lists[52] = floors(4);
        let errors = validate(&dungeons, &lists);
        let target = errors
            .iter()
            .find(|e| error_dungeon_id(e) == 61)
            .expect("missing-floor finding for dungeon 61");
        assert!(repair(target, &mut dungeons, &mut lists));
        assert_eq!(lists[52].len(), 3);
        assert_eq!(dungeons[61], def(52, 0, 3, 3));
    }

    #[test]
    fn wrong_group_total_is_rewritten_for_all_members() {
        let mut dungeons = vec![def(0, 0, 3, 9), def(0, 3, 2, 9)];
        let mut lists = vec![floors(5)];
        let errors = validate(&dungeons, &lists);
        assert_eq!(errors.len(), 2);
        assert!(repair(&errors[0], &mut dungeons, &mut lists));
        assert_eq!(dungeons[0].number_floors_in_group, 5);
        assert_eq!(dungeons[1].number_floors_in_group, 5);
        assert!(validate(&dungeons, &lists).is_empty());
    }
}
