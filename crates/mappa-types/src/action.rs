use serde::{Deserialize, Serialize};
use strum::{EnumIter, FromRepr};

use crate::tile_rule::{EXTENDED_RULES_FIRST, EXTENDED_RULES_LAST, TileRuleType};

/// Facing directions, clockwise from straight down.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, FromRepr,
)]
#[repr(u8)]
pub enum Direction {
    Down = 0,
    DownRight = 1,
    Right = 2,
    UpRight = 3,
    Up = 4,
    UpLeft = 5,
    Left = 6,
    DownLeft = 7,
}

/// Offset added to an entity-rule id to form its on-disk action value.
pub const ENTITY_RULE_ACTION_OFFSET: u16 = 16;

/// One cell of a fixed-floor action grid.
///
/// `TileRule` and `EntityRule` are the two authored variants; `Direct` is
/// produced only by the preview generator when it stamps concrete terrain
/// that has no authored rule behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionRule {
    TileRule {
        rule: TileRuleType,
        direction: Option<Direction>,
    },
    EntityRule {
        entity_rule_id: u16,
        direction: Option<Direction>,
    },
    Direct {
        tile: TileRuleType,
    },
}

impl ActionRule {
    /// The default cell content: plain room floor, no facing.
    pub const DEFAULT_FLOOR: ActionRule = ActionRule::TileRule {
        rule: TileRuleType::FloorRoom,
        direction: None,
    };

    pub const fn direction(&self) -> Option<Direction> {
        match self {
            ActionRule::TileRule { direction, .. } | ActionRule::EntityRule { direction, .. } => {
                *direction
            }
            ActionRule::Direct { .. } => None,
        }
    }
}

impl Default for ActionRule {
    fn default() -> Self {
        Self::DEFAULT_FLOOR
    }
}

/// Whether an entity-rule id may be offered to the user.
///
/// Entity actions encode as `id + 16`, and the extended tile-rule block
/// reuses part of that range, so ids whose encoded value lands inside
/// `96..=119` cannot be represented on disk as entity rules.
pub const fn entity_rule_id_exposable(id: u16) -> bool {
    let encoded = id + ENTITY_RULE_ACTION_OFFSET;
    encoded < EXTENDED_RULES_FIRST as u16 || encoded > EXTENDED_RULES_LAST as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn direction_round_trip() {
        for d in Direction::iter() {
            assert_eq!(Direction::from_repr(d as u8), Some(d));
        }
    }

    #[test]
    fn default_is_floor_room() {
        assert_eq!(
            ActionRule::default(),
            ActionRule::TileRule {
                rule: TileRuleType::FloorRoom,
                direction: None
            }
        );
    }

    #[test]
    fn shadowed_entity_ids_are_hidden() {
        // 80 + 16 = 96, the first reserved extended value.
        assert!(entity_rule_id_exposable(79));
        assert!(!entity_rule_id_exposable(80));
        assert!(!entity_rule_id_exposable(103));
        assert!(entity_rule_id_exposable(104));
    }

    #[test]
    fn direct_rules_have_no_facing() {
        let direct = ActionRule::Direct {
            tile: TileRuleType::WaterRoom,
        };
        assert_eq!(direct.direction(), None);
    }
}
