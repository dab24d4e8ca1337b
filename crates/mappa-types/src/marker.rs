use serde::{Deserialize, Serialize};

/// Placement of a dungeon's marker on the world map.
///
/// `level_id == -1` means the dungeon is not on the map. A non-negative
/// `reference_id` borrows the coordinates of another marker; dereferencing
/// is single-hop and a marker never references itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMarkerPlacement {
    pub level_id: i16,
    pub reference_id: i16,
    pub x: i16,
    pub y: i16,
}

impl MapMarkerPlacement {
    pub const NOT_ON_MAP: i16 = -1;

    pub fn is_on_map(&self) -> bool {
        self.level_id != Self::NOT_ON_MAP
    }

    /// Effective coordinates: follows `reference_id` exactly once, never
    /// transitively. Out-of-range references fall back to own coordinates.
    pub fn resolve(&self, markers: &[MapMarkerPlacement]) -> (i16, i16) {
        if self.reference_id >= 0
            && let Some(target) = markers.get(self.reference_id as usize)
        {
            return (target.x, target.y);
        }
        (self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(reference_id: i16, x: i16, y: i16) -> MapMarkerPlacement {
        MapMarkerPlacement {
            level_id: 0,
            reference_id,
            x,
            y,
        }
    }

    #[test]
    fn plain_marker_resolves_to_itself() {
        let markers = [marker(-1, 10, 20)];
        assert_eq!(markers[0].resolve(&markers), (10, 20));
    }

    #[test]
    fn reference_is_followed_exactly_one_hop() {
        // 0 -> 1 -> 2: resolving 0 must stop at 1's own coordinates.
        let markers = [marker(1, 0, 0), marker(2, 30, 40), marker(-1, 99, 99)];
        assert_eq!(markers[0].resolve(&markers), (30, 40));
    }

    #[test]
    fn dangling_reference_falls_back() {
        let markers = [marker(7, 5, 6)];
        assert_eq!(markers[0].resolve(&markers), (5, 6));
    }

    #[test]
    fn not_on_map() {
        let m = MapMarkerPlacement {
            level_id: -1,
            reference_id: -1,
            x: 0,
            y: 0,
        };
        assert!(!m.is_on_map());
    }
}
