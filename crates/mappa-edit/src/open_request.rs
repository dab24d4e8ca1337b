//! Cross-editor navigation requests.
//!
//! Other editors (script debugger, item database, map viewer) ask the
//! dungeon subsystem to focus something. The orchestrator resolves a
//! request to a concrete target, or rejects it when the identifier does
//! not exist in the loaded model.

/// What an entity-rule editor should focus after opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFocus {
    Item,
    Monster,
    Tile,
    Stats,
}

/// A navigation request from another editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenRequest {
    /// The dungeon list root.
    DungeonList,
    /// A hand-authored floor by fixed-floor id.
    FixedFloor { fixed_floor_id: u8 },
    /// One entity rule of a fixed floor, with a focus hint.
    FixedFloorEntity { entity_rule_id: u16, focus: EntityFocus },
    /// A floor of a dungeon, both 0-based.
    DungeonFloor { dungeon_id: u8, floor_id: u8 },
    /// The tileset editor of a dungeon.
    Tileset { tileset_id: u8 },
    /// The music assignment of a dungeon.
    Music { music_id: u8 },
}

/// A resolved request: the tree position to select plus an optional focus
/// hint the target editor applies once it is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTarget {
    pub node: TreeNode,
    pub focus: Option<EntityFocus>,
}

/// Positions in the subsystem's navigation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeNode {
    Root,
    FixedFloor { fixed_floor_id: u8 },
    DungeonFloor { dungeon_id: u8, floor_id: u8 },
    Tileset { tileset_id: u8 },
    Music { music_id: u8 },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OpenRequestError {
    #[error("fixed floor {0} does not exist")]
    UnknownFixedFloor(u8),
    #[error("entity rule {0} does not exist")]
    UnknownEntityRule(u16),
    #[error("dungeon {0} does not exist")]
    UnknownDungeon(u8),
    #[error("dungeon {dungeon_id} has no floor {floor_id}")]
    UnknownFloor { dungeon_id: u8, floor_id: u8 },
}
