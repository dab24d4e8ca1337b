use serde::{Deserialize, Serialize};

/// One fixed-size dungeon record from the game binary.
///
/// Dungeons reference shared floor lists: `mappa_index` selects the list,
/// `start_after` is the offset of this dungeon's first floor within it.
/// For every set of dungeons sharing a `mappa_index`,
/// `number_floors_in_group` must equal the sum of their `number_floors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DungeonDefinition {
    pub number_floors: u8,
    pub mappa_index: u8,
    pub start_after: u8,
    pub number_floors_in_group: u8,
}

impl DungeonDefinition {
    /// Byte layout in the game binary.
    pub const RECORD_SIZE: usize = 4;

    pub fn to_record(self) -> [u8; Self::RECORD_SIZE] {
        [
            self.number_floors,
            self.mappa_index,
            self.start_after,
            self.number_floors_in_group,
        ]
    }

    pub fn from_record(record: [u8; Self::RECORD_SIZE]) -> Self {
        Self {
            number_floors: record[0],
            mappa_index: record[1],
            start_after: record[2],
            number_floors_in_group: record[3],
        }
    }
}

/// First dojo dungeon id.
pub const DOJO_DUNGEONS_FIRST: u8 = 180;
/// Last dojo dungeon id.
pub const DOJO_DUNGEONS_LAST: u8 = 192;
/// The floor list all dojo dungeons share; pinned at this index across
/// regroups.
pub const DOJO_MAPPA_INDEX: u8 = 114;

/// Whether `dungeon_id` is a dojo dungeon (fixed floor counts, read-only).
pub const fn is_dojo_dungeon(dungeon_id: u8) -> bool {
    dungeon_id >= DOJO_DUNGEONS_FIRST && dungeon_id <= DOJO_DUNGEONS_LAST
}

/// Hard-coded floor counts of the dojo dungeons: the regular dojos have 5
/// floors, the rank-up dojo 1, and the final maze 48.
pub const fn dojo_floor_count(dungeon_id: u8) -> Option<u8> {
    if !is_dojo_dungeon(dungeon_id) {
        return None;
    }
    match dungeon_id {
        DOJO_DUNGEONS_LAST => Some(48),
        id if id == DOJO_DUNGEONS_LAST - 1 => Some(1),
        _ => Some(5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trip() {
        let def = DungeonDefinition {
            number_floors: 12,
            mappa_index: 3,
            start_after: 4,
            number_floors_in_group: 30,
        };
        assert_eq!(DungeonDefinition::from_record(def.to_record()), def);
    }

    #[test]
    fn dojo_counts() {
        assert_eq!(dojo_floor_count(DOJO_DUNGEONS_FIRST), Some(5));
        assert_eq!(dojo_floor_count(DOJO_DUNGEONS_LAST - 1), Some(1));
        assert_eq!(dojo_floor_count(DOJO_DUNGEONS_LAST), Some(48));
        assert_eq!(dojo_floor_count(DOJO_DUNGEONS_FIRST - 1), None);
        assert_eq!(dojo_floor_count(DOJO_DUNGEONS_LAST + 1), None);
    }
}
