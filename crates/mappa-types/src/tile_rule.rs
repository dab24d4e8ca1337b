use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, FromRepr};

/// Terrain class a tile rule paints when the fixed floor is stamped into
/// the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloorType {
    Floor,
    Wall,
    Secondary,
    /// Resolved at stamp time depending on the surrounding generated tiles.
    FloorOrWall,
}

/// Room classification a tile rule assigns to its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Room,
    Hallway,
    KecleonShop,
    MonsterHouse,
}

/// Tile-rule kinds of a fixed-floor action.
///
/// Discriminants are the on-disk action values. Values `0..=15` are the
/// base block; values `96..=119` are the reserved extended block, which
/// shares its encoding range with entity rules (entity action values are
/// `entity_rule_id + 16`, see [`crate::action`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumCount, FromRepr,
)]
#[repr(u8)]
pub enum TileRuleType {
    FloorRoom = 0,
    FloorHallway = 1,
    WallRoom = 2,
    WallHallway = 3,
    SecondaryRoom = 4,
    SecondaryHallway = 5,
    WallHallwayImpassable = 6,
    /// Secondary terrain that also voids every tile of its hallway segment.
    SecondaryHallwayVoidAll = 7,
    LeaderSpawn = 8,
    Attendant1Spawn = 9,
    Attendant2Spawn = 10,
    Attendant3Spawn = 11,
    WarpZone = 12,
    FloorOrWallRoom = 13,
    FloorOrWallHallway = 14,
    WarpZoneHallway = 15,

    FloorKecleonShop = 96,
    ItemKecleonShop = 97,
    FloorMonsterHouse = 98,
    EnemyMonsterHouse = 99,
    SecondaryMonsterHouse = 100,
    KeyWall = 101,
    KeyDoorKecleonShop = 102,
    KeyDoorMonsterHouse = 103,
    WallRoomImpassable = 104,
    SecondaryRoomImpassable = 105,
    FloorRoomMover = 106,
    FloorHallwayMover = 107,
    FloorOrWallRoomMover = 108,
    FloorOrWallHallwayMover = 109,
    StairsRoom = 110,
    StairsHallway = 111,
    HiddenStairsRoom = 112,
    ChasmRoom = 113,
    ChasmHallway = 114,
    LavaRoom = 115,
    LavaHallway = 116,
    WaterRoom = 117,
    WaterHallway = 118,
    FloorRoomTreasure = 119,
}

/// First value of the reserved extended tile-rule block.
pub const EXTENDED_RULES_FIRST: u8 = 96;
/// Last value of the reserved extended tile-rule block.
pub const EXTENDED_RULES_LAST: u8 = 119;

impl TileRuleType {
    pub const fn floor_type(self) -> FloorType {
        use TileRuleType::*;
        match self {
            FloorRoom | FloorHallway | LeaderSpawn | Attendant1Spawn | Attendant2Spawn
            | Attendant3Spawn | WarpZone | WarpZoneHallway | FloorKecleonShop
            | ItemKecleonShop | FloorMonsterHouse | EnemyMonsterHouse | FloorRoomMover
            | FloorHallwayMover | StairsRoom | StairsHallway | HiddenStairsRoom
            | FloorRoomTreasure => FloorType::Floor,
            WallRoom | WallHallway | WallHallwayImpassable | KeyWall | KeyDoorKecleonShop
            | KeyDoorMonsterHouse | WallRoomImpassable => FloorType::Wall,
            SecondaryRoom | SecondaryHallway | SecondaryHallwayVoidAll
            | SecondaryMonsterHouse | SecondaryRoomImpassable | ChasmRoom | ChasmHallway
            | LavaRoom | LavaHallway | WaterRoom | WaterHallway => FloorType::Secondary,
            FloorOrWallRoom | FloorOrWallHallway | FloorOrWallRoomMover
            | FloorOrWallHallwayMover => FloorType::FloorOrWall,
        }
    }

    pub const fn room_type(self) -> RoomType {
        use TileRuleType::*;
        match self {
            FloorKecleonShop | ItemKecleonShop | KeyDoorKecleonShop => RoomType::KecleonShop,
            FloorMonsterHouse | EnemyMonsterHouse | SecondaryMonsterHouse
            | KeyDoorMonsterHouse => RoomType::MonsterHouse,
            FloorHallway | WallHallway | SecondaryHallway | WallHallwayImpassable
            | SecondaryHallwayVoidAll | WarpZoneHallway | FloorOrWallHallway
            | FloorHallwayMover | FloorOrWallHallwayMover | StairsHallway | ChasmHallway
            | LavaHallway | WaterHallway => RoomType::Hallway,
            _ => RoomType::Room,
        }
    }

    /// Tiles the pathfinder must never route through, even with abilities
    /// that cross walls or water.
    pub const fn is_impassable(self) -> bool {
        matches!(
            self,
            Self::WallHallwayImpassable
                | Self::WallRoomImpassable
                | Self::SecondaryRoomImpassable
                | Self::KeyWall
        )
    }

    /// Tiles that force absolute movement (conveyor-style) on whatever
    /// stands on them.
    pub const fn is_absolute_mover(self) -> bool {
        matches!(
            self,
            Self::FloorRoomMover
                | Self::FloorHallwayMover
                | Self::FloorOrWallRoomMover
                | Self::FloorOrWallHallwayMover
        )
    }

    /// Spawn markers consumed by the team placement pass, not painted.
    pub const fn is_spawn_marker(self) -> bool {
        matches!(
            self,
            Self::LeaderSpawn
                | Self::Attendant1Spawn
                | Self::Attendant2Spawn
                | Self::Attendant3Spawn
        )
    }

    /// Whether the action value lies in the reserved extended block.
    pub const fn is_extended(self) -> bool {
        self as u8 >= EXTENDED_RULES_FIRST
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn count() {
        assert_eq!(TileRuleType::COUNT, 40);
    }

    #[test]
    fn discriminants() {
        assert_eq!(TileRuleType::FloorRoom as u8, 0);
        assert_eq!(TileRuleType::WarpZoneHallway as u8, 15);
        assert_eq!(TileRuleType::FloorKecleonShop as u8, EXTENDED_RULES_FIRST);
        assert_eq!(TileRuleType::FloorRoomTreasure as u8, EXTENDED_RULES_LAST);
    }

    #[test]
    fn base_and_extended_blocks_are_disjoint() {
        for rule in TileRuleType::iter() {
            let v = rule as u8;
            assert!(v <= 15 || (EXTENDED_RULES_FIRST..=EXTENDED_RULES_LAST).contains(&v));
        }
    }

    #[test]
    fn floor_type_classification() {
        assert_eq!(TileRuleType::FloorRoom.floor_type(), FloorType::Floor);
        assert_eq!(TileRuleType::KeyWall.floor_type(), FloorType::Wall);
        assert_eq!(TileRuleType::WaterRoom.floor_type(), FloorType::Secondary);
        assert_eq!(
            TileRuleType::FloorOrWallHallway.floor_type(),
            FloorType::FloorOrWall
        );
    }

    #[test]
    fn room_type_classification() {
        assert_eq!(TileRuleType::FloorRoom.room_type(), RoomType::Room);
        assert_eq!(TileRuleType::WallHallway.room_type(), RoomType::Hallway);
        assert_eq!(
            TileRuleType::ItemKecleonShop.room_type(),
            RoomType::KecleonShop
        );
        assert_eq!(
            TileRuleType::SecondaryMonsterHouse.room_type(),
            RoomType::MonsterHouse
        );
    }

    #[test]
    fn impassable_rules_are_walls_or_secondary() {
        for rule in TileRuleType::iter().filter(|r| r.is_impassable()) {
            assert_ne!(rule.floor_type(), FloorType::Floor, "{rule:?}");
        }
    }

    #[test]
    fn movers() {
        assert!(TileRuleType::FloorRoomMover.is_absolute_mover());
        assert!(!TileRuleType::FloorRoom.is_absolute_mover());
    }

    #[test]
    fn round_trip() {
        for rule in TileRuleType::iter() {
            assert_eq!(TileRuleType::from_repr(rule as u8), Some(rule));
        }
    }
}
