//! The entity-rule tables of the fixed-floor data: four parallel arrays
//! joined by [`EntitySpawnEntry`], plus the read-only container that
//! resolves a rule id to its composed view.

use serde::{Deserialize, Serialize};

/// An item placed by an entity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixedItemSpawn {
    pub item_id: u16,
    pub quantity: u16,
}

/// A monster placed by an entity rule. `stats_entry` indexes the
/// [`MonsterSpawnStats`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixedMonsterSpawn {
    pub md_index: u16,
    pub stats_entry: u16,
    pub enemy_settings: u8,
}

/// A tile placed by an entity rule: an optional trap plus terrain flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileSpawn {
    pub trap_id: u8,
    pub trap_data: u8,
    pub flags: u16,
}

/// Stat block referenced by [`FixedMonsterSpawn::stats_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonsterSpawnStats {
    pub level: u16,
    pub hp: u16,
    pub exp_yield: u16,
    pub attack: u8,
    pub special_attack: u8,
    pub defense: u8,
    pub special_defense: u8,
}

/// One entity rule: indices into the three spawn tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntitySpawnEntry {
    pub item_id: u16,
    pub monster_id: u16,
    pub tile_id: u16,
}

/// The composed view of one entity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRuleView<'a> {
    pub item: &'a FixedItemSpawn,
    pub monster: &'a FixedMonsterSpawn,
    pub tile: &'a TileSpawn,
    pub stats: &'a MonsterSpawnStats,
}

/// Read-only join over the four parallel entity tables.
///
/// The tables are borrowed from their owner; the container never mutates.
#[derive(Debug, Clone, Copy)]
pub struct EntityRuleContainer<'a> {
    entities: &'a [EntitySpawnEntry],
    items: &'a [FixedItemSpawn],
    monsters: &'a [FixedMonsterSpawn],
    tiles: &'a [TileSpawn],
    stats: &'a [MonsterSpawnStats],
}

impl<'a> EntityRuleContainer<'a> {
    pub fn new(
        entities: &'a [EntitySpawnEntry],
        items: &'a [FixedItemSpawn],
        monsters: &'a [FixedMonsterSpawn],
        tiles: &'a [TileSpawn],
        stats: &'a [MonsterSpawnStats],
    ) -> Self {
        Self {
            entities,
            items,
            monsters,
            tiles,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Resolve entity rule `idx` to its item/monster/tile/stat view.
    /// `None` when the rule or any referenced table entry is out of range.
    pub fn get(&self, idx: usize) -> Option<EntityRuleView<'a>> {
        let entity = self.entities.get(idx)?;
        let monster = self.monsters.get(entity.monster_id as usize)?;
        Some(EntityRuleView {
            item: self.items.get(entity.item_id as usize)?,
            monster,
            tile: self.tiles.get(entity.tile_id as usize)?,
            stats: self.stats.get(monster.stats_entry as usize)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<EntityRuleView<'a>>> + '_ {
        (0..self.len()).map(|idx| self.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (
        Vec<EntitySpawnEntry>,
        Vec<FixedItemSpawn>,
        Vec<FixedMonsterSpawn>,
        Vec<TileSpawn>,
        Vec<MonsterSpawnStats>,
    ) {
        let entities = vec![
            EntitySpawnEntry {
                item_id: 1,
                monster_id: 0,
                tile_id: 0,
            },
            EntitySpawnEntry {
                item_id: 0,
                monster_id: 1,
                tile_id: 1,
            },
        ];
        let items = vec![
            FixedItemSpawn::default(),
            FixedItemSpawn {
                item_id: 55,
                quantity: 1,
            },
        ];
        let monsters = vec![
            FixedMonsterSpawn::default(),
            FixedMonsterSpawn {
                md_index: 383,
                stats_entry: 1,
                enemy_settings: 0,
            },
        ];
        let tiles = vec![
            TileSpawn::default(),
            TileSpawn {
                trap_id: 3,
                trap_data: 0,
                flags: 0,
            },
        ];
        let stats = vec![
            MonsterSpawnStats::default(),
            MonsterSpawnStats {
                level: 30,
                hp: 120,
                exp_yield: 50,
                attack: 40,
                special_attack: 35,
                defense: 28,
                special_defense: 30,
            },
        ];
        (entities, items, monsters, tiles, stats)
    }

    #[test]
    fn get_composes_all_four_tables() {
        let (entities, items, monsters, tiles, stats) = fixture();
        let c = EntityRuleContainer::new(&entities, &items, &monsters, &tiles, &stats);

        let view = c.get(1).expect("entity 1 resolves");
        assert_eq!(view.monster.md_index, 383);
        assert_eq!(view.stats.level, 30);
        assert_eq!(view.tile.trap_id, 3);
        assert_eq!(view.item.item_id, 0);

        let view = c.get(0).expect("entity 0 resolves");
        assert_eq!(view.item.item_id, 55);
        assert_eq!(view.stats.level, 0);
    }

    #[test]
    fn get_out_of_range_is_none() {
        let (entities, items, monsters, tiles, stats) = fixture();
        let c = EntityRuleContainer::new(&entities, &items, &monsters, &tiles, &stats);
        assert!(c.get(2).is_none());
    }

    #[test]
    fn dangling_reference_is_none() {
        let (mut entities, items, monsters, tiles, stats) = fixture();
        entities[0].tile_id = 99;
        let c = EntityRuleContainer::new(&entities, &items, &monsters, &tiles, &stats);
        assert!(c.get(0).is_none());
    }

    #[test]
    fn iter_visits_every_rule() {
        let (entities, items, monsters, tiles, stats) = fixture();
        let c = EntityRuleContainer::new(&entities, &items, &monsters, &tiles, &stats);
        assert_eq!(c.iter().count(), 2);
        assert!(c.iter().all(|v| v.is_some()));
    }
}
