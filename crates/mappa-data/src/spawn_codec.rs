//! Load/save between the wire spawn tables of a [`Floor`] and the relative
//! edit form the editor works with.
//!
//! Load relativizes the cumulative weights; save sorts rows by their
//! storage key, re-injects the forced monster entries, and renormalizes.
//! Item lists normalize category weights across the whole list but item
//! weights within each category independently.

use mappa_types::floor::{
    DUMMY_MD_INDEX, Floor, FloorModelError, ItemCategory, ItemList, ItemListKind,
    KECLEON_MD_INDEX, KECLEON_MD_INDEX_ALT, LINK_BOX_ITEM_ID, MAX_WEIGHT, MonsterSpawnEntry,
    POKE_ITEM_ID, TRAP_COUNT, TrapId, TrapWeights, Weight,
};
use strum::IntoEnumIterator;

use crate::weights::{normalize, relativize};

/// One editable monster row. Weights are relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonsterRow {
    pub md_index: u16,
    pub level: u8,
    pub weight: u32,
    pub weight_mh: u32,
}

/// The monster list in edit form. The forced entries are remembered here
/// rather than shown as rows, and re-injected on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterEditList {
    pub rows: Vec<MonsterRow>,
    /// `(md_index, level)` of the kecleon entries found at load.
    kecleon: Vec<(u16, u8)>,
}

impl MonsterEditList {
    fn is_forced(md_index: u16) -> bool {
        matches!(md_index, KECLEON_MD_INDEX | KECLEON_MD_INDEX_ALT | DUMMY_MD_INDEX)
    }
}

/// Relativize a floor's monster table into edit rows.
pub fn load_monsters(floor: &Floor) -> MonsterEditList {
    let main: Vec<u16> = floor.monsters().iter().map(|m| m.main_spawn_weight).collect();
    let mh: Vec<u16> = floor
        .monsters()
        .iter()
        .map(|m| m.monster_house_spawn_weight)
        .collect();
    let rel_main = relativize(&main);
    let rel_mh = relativize(&mh);

    let mut rows = Vec::new();
    let mut kecleon = Vec::new();
    for (i, m) in floor.monsters().iter().enumerate() {
        if m.md_index == DUMMY_MD_INDEX {
            continue;
        }
        if MonsterEditList::is_forced(m.md_index) {
            kecleon.push((m.md_index, m.level));
            continue;
        }
        rows.push(MonsterRow {
            md_index: m.md_index,
            level: m.level,
            weight: rel_main[i],
            weight_mh: rel_mh[i],
        });
    }
    // A floor that somehow lost its kecleon entries gets them back with
    // defaults on the next save.
    if kecleon.is_empty() {
        kecleon.push((KECLEON_MD_INDEX, 1));
        kecleon.push((KECLEON_MD_INDEX_ALT, 1));
    }
    MonsterEditList { rows, kecleon }
}

/// Write edit rows back as a cumulative monster table.
pub fn save_monsters(floor: &mut Floor, list: &MonsterEditList) {
    let mut entries: Vec<(u16, u8, u32, u32)> = list
        .rows
        .iter()
        .filter(|r| !MonsterEditList::is_forced(r.md_index))
        .map(|r| (r.md_index, r.level, r.weight, r.weight_mh))
        .collect();
    for &(md_index, level) in &list.kecleon {
        entries.push((md_index, level, 0, 0));
    }
    entries.push((DUMMY_MD_INDEX, 1, 0, 0));
    entries.sort_by_key(|&(md_index, ..)| md_index);

    let main: Vec<(usize, u32)> = entries.iter().enumerate().map(|(i, e)| (i, e.2)).collect();
    let mh: Vec<(usize, u32)> = entries.iter().enumerate().map(|(i, e)| (i, e.3)).collect();
    let main = normalize(&main);
    let mh = normalize(&mh);

    let monsters: Vec<MonsterSpawnEntry> = entries
        .iter()
        .enumerate()
        .map(|(i, &(md_index, level, ..))| MonsterSpawnEntry {
            md_index,
            level,
            main_spawn_weight: main[i].1,
            monster_house_spawn_weight: mh[i].1,
        })
        .collect();
    floor.set_monsters_unchecked(monsters);
}

/// Relativize the trap table into `(trap, weight)` edit rows.
pub fn load_traps(floor: &Floor) -> Vec<(TrapId, u32)> {
    let rel = relativize(&floor.traps.0);
    TrapId::iter().zip(rel).collect()
}

/// Write trap edit rows back as cumulative weights.
pub fn save_traps(floor: &mut Floor, rows: &[(TrapId, u32)]) {
    let keyed: Vec<(u8, u32)> = rows.iter().map(|&(t, w)| (t as u8, w)).collect();
    let mut table = [0u16; TRAP_COUNT];
    for (trap, weight) in normalize(&keyed) {
        table[trap as usize] = weight;
    }
    floor.traps = TrapWeights(table);
}

/// An item list in edit form: relative category weights plus per-item
/// relative weights or guaranteed markers, partitioned by category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemEditList {
    pub categories: Vec<(ItemCategory, u32)>,
    /// `(item_id, weight)` — `None` weight means guaranteed.
    pub items: Vec<(u16, Option<u32>)>,
}

impl ItemEditList {
    /// The rows of one category, as shown by the per-category UI list.
    pub fn rows_of(&self, category: ItemCategory) -> Vec<(u16, Option<u32>)> {
        self.items
            .iter()
            .filter(|(id, _)| ItemCategory::of_item(*id) == Some(category))
            .copied()
            .collect()
    }
}

/// Relativize one of the six item lists into edit form.
pub fn load_item_list(floor: &Floor, kind: ItemListKind) -> ItemEditList {
    let list = floor.item_list(kind);

    let cat_abs: Vec<u16> = ItemCategory::iter()
        .map(|c| list.categories.get(&c).copied().unwrap_or(0))
        .collect();
    let cat_rel = relativize(&cat_abs);
    let categories = ItemCategory::iter().zip(cat_rel).collect();

    // Item weights are cumulative within their category, so relativize
    // each category's subsequence independently.
    let mut items: Vec<(u16, Option<u32>)> = Vec::new();
    for category in ItemCategory::iter() {
        let of_cat: Vec<(u16, u16)> = list
            .items
            .iter()
            .filter(|(id, w)| {
                ItemCategory::of_item(**id) == Some(category) && !w.is_guaranteed()
            })
            .map(|(id, w)| (*id, w.to_wire()))
            .collect();
        let abs: Vec<u16> = of_cat.iter().map(|(_, w)| *w).collect();
        for ((id, _), rel) in of_cat.iter().zip(relativize(&abs)) {
            items.push((*id, Some(rel)));
        }
        items.extend(
            list.items
                .iter()
                .filter(|(id, w)| {
                    ItemCategory::of_item(**id) == Some(category) && w.is_guaranteed()
                })
                .map(|(id, _)| (*id, None)),
        );
    }
    items.sort_by_key(|(id, _)| *id);
    ItemEditList { categories, items }
}

/// Write an item edit list back in cumulative form.
///
/// Guaranteed items are written with the sentinel and excluded from
/// normalization. A weighted POKE category forces the poké item to full
/// weight, a weighted LINK_BOX category the link-box item; those two
/// categories hold exactly one spawnable item each.
pub fn save_item_list(floor: &mut Floor, kind: ItemListKind, edit: &ItemEditList) {
    let mut list = ItemList::default();

    for (category, weight) in normalize(&edit.categories) {
        list.categories.insert(category, weight);
    }

    for category in ItemCategory::iter() {
        let weighted: Vec<(u16, u32)> = edit
            .items
            .iter()
            .filter(|(id, w)| ItemCategory::of_item(*id) == Some(category) && w.is_some())
            .map(|(id, w)| (*id, w.unwrap_or(0)))
            .collect();
        for (id, weight) in normalize(&weighted) {
            list.items.insert(id, Weight::Absolute(weight));
        }
    }
    for (id, weight) in &edit.items {
        if weight.is_none() {
            list.items.insert(*id, Weight::Guaranteed);
        }
    }

    if list.categories.get(&ItemCategory::Poke).copied().unwrap_or(0) > 0 {
        list.items.insert(POKE_ITEM_ID, Weight::Absolute(MAX_WEIGHT));
    }
    if list
        .categories
        .get(&ItemCategory::LinkBox)
        .copied()
        .unwrap_or(0)
        > 0
    {
        list.items
            .insert(LINK_BOX_ITEM_ID, Weight::Absolute(MAX_WEIGHT));
    }

    *floor.item_list_mut(kind) = list;
}

/// Parse a weight field typed by the user. Invalid input yields `None`
/// and the caller leaves the model untouched.
pub fn parse_weight_input(input: &str) -> Option<u32> {
    input.trim().parse().ok()
}

/// Range check for a fixed-width numeric field; overflow is surfaced, not
/// clamped, so the caller can re-prompt.
pub fn check_field_range(
    field: &'static str,
    value: u32,
    max: u32,
) -> Result<u32, FloorModelError> {
    if value > max {
        return Err(FloorModelError::RangeOverflow { field, value, max });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_with_monsters(rows: &[(u16, u8, u16, u16)]) -> Floor {
        let mut floor = Floor::template();
        let monsters = rows
            .iter()
            .map(|&(md_index, level, main, mh)| MonsterSpawnEntry {
                md_index,
                level,
                main_spawn_weight: main,
                monster_house_spawn_weight: mh,
            })
            .collect();
        floor.set_monsters_unchecked(monsters);
        floor
    }

    #[test]
    fn load_hides_forced_entries() {
        let floor = floor_with_monsters(&[
            (1, 5, 5000, 0),
            (KECLEON_MD_INDEX, 1, 0, 0),
            (KECLEON_MD_INDEX_ALT, 1, 0, 0),
            (2, 7, 10000, 10000),
            (DUMMY_MD_INDEX, 1, 0, 0),
        ]);
        let list = load_monsters(&floor);
        assert_eq!(list.rows.len(), 2);
        assert_eq!(list.rows[0].md_index, 1);
        assert_eq!(list.rows[0].weight, 1);
        assert_eq!(list.rows[1].weight, 1);
        assert_eq!(list.rows[1].weight_mh, 1);
    }

    #[test]
    fn save_reinjects_forced_entries_sorted() {
        let floor = floor_with_monsters(&[
            (KECLEON_MD_INDEX, 1, 0, 0),
            (KECLEON_MD_INDEX_ALT, 1, 0, 0),
            (DUMMY_MD_INDEX, 1, 0, 0),
        ]);
        let mut list = load_monsters(&floor);
        list.rows = vec![
            MonsterRow {
                md_index: 600,
                level: 9,
                weight: 1,
                weight_mh: 0,
            },
            MonsterRow {
                md_index: 4,
                level: 3,
                weight: 3,
                weight_mh: 0,
            },
        ];
        let mut floor = floor;
        save_monsters(&mut floor, &list);

        let ids: Vec<u16> = floor.monsters().iter().map(|m| m.md_index).collect();
        assert_eq!(
            ids,
            vec![4, KECLEON_MD_INDEX, DUMMY_MD_INDEX, 600, KECLEON_MD_INDEX_ALT]
        );
        // 3:1 split, cumulative, tail bumped to exactly 10000.
        assert_eq!(floor.monsters()[0].main_spawn_weight, 7500);
        assert_eq!(floor.monsters()[3].main_spawn_weight, 10000);
        assert_eq!(floor.monsters()[1].main_spawn_weight, 0);
    }

    #[test]
    fn save_then_load_round_trips_rows() {
        let floor = floor_with_monsters(&[
            (KECLEON_MD_INDEX, 1, 0, 0),
            (KECLEON_MD_INDEX_ALT, 1, 0, 0),
            (DUMMY_MD_INDEX, 1, 0, 0),
        ]);
        let mut list = load_monsters(&floor);
        list.rows = vec![
            MonsterRow {
                md_index: 10,
                level: 3,
                weight: 1,
                weight_mh: 1,
            },
            MonsterRow {
                md_index: 20,
                level: 4,
                weight: 3,
                weight_mh: 1,
            },
        ];
        let mut floor = floor;
        save_monsters(&mut floor, &list);
        let reloaded = load_monsters(&floor);
        assert_eq!(reloaded.rows, list.rows);
    }

    #[test]
    fn trap_round_trip() {
        let mut floor = Floor::template();
        save_traps(
            &mut floor,
            &[(TrapId::MudTrap, 1), (TrapId::WonderTile, 3)],
        );
        assert_eq!(floor.traps.get(TrapId::MudTrap), 2500);
        assert_eq!(floor.traps.get(TrapId::WonderTile), 10000);
        assert_eq!(floor.traps.get(TrapId::WarpTrap), 0);

        let rows = load_traps(&floor);
        assert_eq!(rows[TrapId::MudTrap as usize], (TrapId::MudTrap, 1));
        assert_eq!(rows[TrapId::WonderTile as usize], (TrapId::WonderTile, 3));
    }

    #[test]
    fn item_save_normalizes_within_category() {
        let mut floor = Floor::template();
        let edit = ItemEditList {
            categories: vec![(ItemCategory::Berries, 1), (ItemCategory::Foods, 1)],
            // 17 and 20 are Berries, 70 is Foods.
            items: vec![(17, Some(1)), (20, Some(1)), (70, Some(2))],
        };
        save_item_list(&mut floor, ItemListKind::Floor, &edit);
        let list = &floor.floor_items;
        assert_eq!(list.items[&17], Weight::Absolute(5000));
        assert_eq!(list.items[&20], Weight::Absolute(10000));
        // Foods normalizes independently of Berries.
        assert_eq!(list.items[&70], Weight::Absolute(10000));
        assert_eq!(list.categories[&ItemCategory::Berries], 5000);
        assert_eq!(list.categories[&ItemCategory::Foods], 10000);
    }

    #[test]
    fn guaranteed_items_keep_sentinel_and_skip_normalization() {
        let mut floor = Floor::template();
        let edit = ItemEditList {
            categories: vec![(ItemCategory::Berries, 1)],
            items: vec![(17, None), (20, Some(4))],
        };
        save_item_list(&mut floor, ItemListKind::Buried, &edit);
        let list = &floor.buried_items;
        assert_eq!(list.items[&17], Weight::Guaranteed);
        assert_eq!(list.items[&20], Weight::Absolute(10000));

        let reloaded = load_item_list(&floor, ItemListKind::Buried);
        assert!(reloaded.items.contains(&(17, None)));
        assert!(reloaded.items.contains(&(20, Some(1))));
    }

    #[test]
    fn poke_category_forces_poke_item() {
        let mut floor = Floor::template();
        let edit = ItemEditList {
            categories: vec![(ItemCategory::Poke, 1), (ItemCategory::LinkBox, 1)],
            items: Vec::new(),
        };
        save_item_list(&mut floor, ItemListKind::Floor, &edit);
        let list = &floor.floor_items;
        assert_eq!(list.items[&POKE_ITEM_ID], Weight::Absolute(MAX_WEIGHT));
        assert_eq!(list.items[&LINK_BOX_ITEM_ID], Weight::Absolute(MAX_WEIGHT));
    }

    #[test]
    fn invalid_numeric_input_is_ignored() {
        assert_eq!(parse_weight_input("12"), Some(12));
        assert_eq!(parse_weight_input(" 7 "), Some(7));
        assert_eq!(parse_weight_input("twelve"), None);
        assert_eq!(parse_weight_input("-3"), None);
        assert_eq!(parse_weight_input(""), None);
    }

    #[test]
    fn overflow_is_reported_with_field_and_range() {
        let err = check_field_range("max_coin_amount", 70_000, u16::MAX as u32).unwrap_err();
        assert!(matches!(
            err,
            FloorModelError::RangeOverflow {
                field: "max_coin_amount",
                value: 70_000,
                max: 65_535,
            }
        ));
        assert_eq!(check_field_range("level", 50, 100).unwrap(), 50);
    }
}
