//! XML interchange format for floors.
//!
//! Nine sections, each individually selectable on both export and import:
//! layout, monsters, traps and the six item lists. Import is transactional
//! against the target floor: the whole document is parsed into a staging
//! floor first, and only the selected sections are copied over, so a
//! malformed document never leaves a half-imported floor behind.

use std::collections::HashMap;
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use strum::IntoEnumIterator;

use mappa_types::floor::{
    DUMMY_MD_INDEX, DarknessLevel, Floor, FloorLayout, FloorStructure, HiddenStairsType,
    ItemCategory, ItemList, ItemListKind, KECLEON_MD_INDEX, KECLEON_MD_INDEX_ALT,
    MonsterSpawnEntry, TRAP_COUNT, TerrainSettings, TrapWeights, Weather, Weight,
};

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("xml syntax: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("xml attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("xml write: {0}")]
    Io(#[from] std::io::Error),
    #[error("document has no <Floor> root")]
    MissingRoot,
    #[error("<{element}>: missing attribute `{attr}`")]
    MissingAttr {
        element: &'static str,
        attr: &'static str,
    },
    #[error("<{element}>: invalid value `{value}` for `{attr}`")]
    InvalidValue {
        element: &'static str,
        attr: &'static str,
        value: String,
    },
}

/// Which sections of the document to export or apply on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlSections {
    pub layout: bool,
    pub monsters: bool,
    pub traps: bool,
    pub floor_items: bool,
    pub shop_items: bool,
    pub monster_house_items: bool,
    pub buried_items: bool,
    pub unk_items1: bool,
    pub unk_items2: bool,
}

impl XmlSections {
    pub const fn all() -> Self {
        Self {
            layout: true,
            monsters: true,
            traps: true,
            floor_items: true,
            shop_items: true,
            monster_house_items: true,
            buried_items: true,
            unk_items1: true,
            unk_items2: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            layout: false,
            monsters: false,
            traps: false,
            floor_items: false,
            shop_items: false,
            monster_house_items: false,
            buried_items: false,
            unk_items1: false,
            unk_items2: false,
        }
    }

    fn item_section(&self, kind: ItemListKind) -> bool {
        match kind {
            ItemListKind::Floor => self.floor_items,
            ItemListKind::Shop => self.shop_items,
            ItemListKind::MonsterHouse => self.monster_house_items,
            ItemListKind::Buried => self.buried_items,
            ItemListKind::Unk1 => self.unk_items1,
            ItemListKind::Unk2 => self.unk_items2,
        }
    }
}

fn item_section_tag(kind: ItemListKind) -> &'static str {
    match kind {
        ItemListKind::Floor => "FloorItems",
        ItemListKind::Shop => "ShopItems",
        ItemListKind::MonsterHouse => "MonsterHouseItems",
        ItemListKind::Buried => "BuriedItems",
        ItemListKind::Unk1 => "UnkItems1",
        ItemListKind::Unk2 => "UnkItems2",
    }
}

fn item_section_kind(tag: &[u8]) -> Option<ItemListKind> {
    ItemListKind::iter().find(|&k| item_section_tag(k).as_bytes() == tag)
}

// ---------------------------------------------------------------- export

pub fn export_floor(floor: &Floor, sections: XmlSections) -> Result<String, XmlError> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

    w.write_event(Event::Start(BytesStart::new("Floor")))?;

    if sections.layout {
        w.write_event(Event::Empty(layout_element(&floor.layout)))?;
    }

    if sections.monsters {
        w.write_event(Event::Start(BytesStart::new("Monsters")))?;
        for m in floor.monsters() {
            let mut e = BytesStart::new("Monster");
            e.push_attribute(("id", m.md_index.to_string().as_str()));
            e.push_attribute(("level", m.level.to_string().as_str()));
            e.push_attribute(("weight", m.main_spawn_weight.to_string().as_str()));
            e.push_attribute(("weight2", m.monster_house_spawn_weight.to_string().as_str()));
            w.write_event(Event::Empty(e))?;
        }
        w.write_event(Event::End(BytesEnd::new("Monsters")))?;
    }

    if sections.traps {
        w.write_event(Event::Start(BytesStart::new("Traps")))?;
        for (i, weight) in floor.traps.0.iter().enumerate() {
            let mut e = BytesStart::new("Trap");
            e.push_attribute(("id", i.to_string().as_str()));
            e.push_attribute(("weight", weight.to_string().as_str()));
            w.write_event(Event::Empty(e))?;
        }
        w.write_event(Event::End(BytesEnd::new("Traps")))?;
    }

    for kind in ItemListKind::iter() {
        if !sections.item_section(kind) {
            continue;
        }
        let tag = item_section_tag(kind);
        w.write_event(Event::Start(BytesStart::new(tag)))?;
        let list = floor.item_list(kind);
        for (category, weight) in &list.categories {
            let mut e = BytesStart::new("Category");
            e.push_attribute(("id", (*category as u8).to_string().as_str()));
            e.push_attribute(("weight", weight.to_string().as_str()));
            w.write_event(Event::Empty(e))?;
        }
        for (id, weight) in &list.items {
            let mut e = BytesStart::new("Item");
            e.push_attribute(("id", id.to_string().as_str()));
            match weight {
                Weight::Absolute(v) => e.push_attribute(("weight", v.to_string().as_str())),
                Weight::Guaranteed => e.push_attribute(("guaranteed", "1")),
            }
            w.write_event(Event::Empty(e))?;
        }
        w.write_event(Event::End(BytesEnd::new(tag)))?;
    }

    w.write_event(Event::End(BytesEnd::new("Floor")))?;

    String::from_utf8(w.into_inner()).map_err(|_| XmlError::MissingRoot)
}

fn layout_element(layout: &FloorLayout) -> BytesStart<'static> {
    let mut e = BytesStart::new("FloorLayout");
    let pairs: Vec<(&str, String)> = vec![
        ("structure", (layout.structure as u8).to_string()),
        ("tileset", layout.tileset_id.to_string()),
        ("music", layout.music_id.to_string()),
        ("weather", (layout.weather as u8).to_string()),
        ("fixed_floor", layout.fixed_floor_id.to_string()),
        ("number", layout.floor_number.to_string()),
        ("room_density", layout.room_density.to_string()),
        ("connectivity", layout.floor_connectivity.to_string()),
        (
            "initial_enemy_density",
            layout.initial_enemy_density.to_string(),
        ),
        ("dead_ends", u8::from(layout.dead_ends).to_string()),
        ("item_density", layout.item_density.to_string()),
        ("trap_density", layout.trap_density.to_string()),
        (
            "extra_hallway_density",
            layout.extra_hallway_density.to_string(),
        ),
        (
            "buried_item_density",
            layout.buried_item_density.to_string(),
        ),
        ("water_density", layout.water_density.to_string()),
        ("darkness", (layout.darkness_level as u8).to_string()),
        ("max_coin_amount", layout.max_coin_amount.to_string()),
        (
            "kecleon_shop_chance",
            layout.kecleon_shop_chance.to_string(),
        ),
        (
            "monster_house_chance",
            layout.monster_house_chance.to_string(),
        ),
        ("unused_chance", layout.unused_chance.to_string()),
        ("sticky_item_chance", layout.sticky_item_chance.to_string()),
        (
            "empty_monster_house_chance",
            layout.empty_monster_house_chance.to_string(),
        ),
        (
            "hidden_stairs_chance",
            layout.hidden_stairs_spawn_chance.to_string(),
        ),
        (
            "hidden_stairs_type",
            (layout.hidden_stairs_type as u8).to_string(),
        ),
        (
            "kecleon_shop_item_positions",
            layout.kecleon_shop_item_positions.to_string(),
        ),
        ("unk_hidden_stairs", layout.unk_hidden_stairs.to_string()),
        (
            "terrain_settings",
            layout.terrain_settings.bits().to_string(),
        ),
        ("iq_booster_boost", layout.iq_booster_boost.to_string()),
        ("enemy_iq", layout.enemy_iq.to_string()),
    ];
    for (k, v) in pairs {
        e.push_attribute((k, v.as_str()));
    }
    e
}

// ---------------------------------------------------------------- import

#[derive(Default)]
struct Staging {
    layout: Option<FloorLayout>,
    monsters: Option<Vec<MonsterSpawnEntry>>,
    traps: Option<TrapWeights>,
    items: HashMap<ItemListKind, ItemList>,
}

/// Import selected sections of `xml` into `floor`.
///
/// Sections absent from the document are left untouched even when
/// selected; unrelated fields on the target floor are always preserved.
/// A monsters section missing the kecleon pair or the dummy entry gets
/// them re-added at weight 0, the same injection the save codec performs.
pub fn import_floor(xml: &str, floor: &mut Floor, sections: XmlSections) -> Result<(), XmlError> {
    let staging = parse_document(xml)?;

    if sections.layout
        && let Some(layout) = staging.layout
    {
        floor.layout = layout;
    }
    if sections.monsters
        && let Some(mut monsters) = staging.monsters
    {
        for forced in [KECLEON_MD_INDEX, KECLEON_MD_INDEX_ALT, DUMMY_MD_INDEX] {
            if !monsters.iter().any(|m| m.md_index == forced) {
                monsters.push(MonsterSpawnEntry {
                    md_index: forced,
                    level: 1,
                    main_spawn_weight: 0,
                    monster_house_spawn_weight: 0,
                });
            }
        }
        floor.set_monsters_unchecked(monsters);
    }
    if sections.traps
        && let Some(traps) = staging.traps
    {
        floor.traps = traps;
    }
    for kind in ItemListKind::iter() {
        if sections.item_section(kind)
            && let Some(list) = staging.items.get(&kind)
        {
            *floor.item_list_mut(kind) = list.clone();
        }
    }
    Ok(())
}

fn parse_document(xml: &str) -> Result<Staging, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut staging = Staging::default();
    let mut saw_root = false;
    let mut current_items: Option<ItemListKind> = None;
    let mut in_monsters = false;
    let mut in_traps = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"Floor" => saw_root = true,
                    b"FloorLayout" => staging.layout = Some(parse_layout(&e)?),
                    b"Monsters" => {
                        in_monsters = true;
                        staging.monsters.get_or_insert_with(Vec::new);
                    }
                    b"Traps" => {
                        in_traps = true;
                        staging.traps.get_or_insert_with(TrapWeights::default);
                    }
                    b"Monster" if in_monsters => {
                        let attrs = attrs_map(&e, "Monster")?;
                        let entry = MonsterSpawnEntry {
                            md_index: req(&attrs, "Monster", "id")?,
                            level: req(&attrs, "Monster", "level")?,
                            main_spawn_weight: req(&attrs, "Monster", "weight")?,
                            monster_house_spawn_weight: req(&attrs, "Monster", "weight2")?,
                        };
                        staging
                            .monsters
                            .get_or_insert_with(Vec::new)
                            .push(entry);
                    }
                    b"Trap" if in_traps => {
                        let attrs = attrs_map(&e, "Trap")?;
                        let id: usize = req(&attrs, "Trap", "id")?;
                        let weight: u16 = req(&attrs, "Trap", "weight")?;
                        if id >= TRAP_COUNT {
                            return Err(XmlError::InvalidValue {
                                element: "Trap",
                                attr: "id",
                                value: id.to_string(),
                            });
                        }
                        staging
                            .traps
                            .get_or_insert_with(TrapWeights::default)
                            .0[id] = weight;
                    }
                    b"Category" => {
                        let Some(kind) = current_items else { continue };
                        let attrs = attrs_map(&e, "Category")?;
                        let raw: u8 = req(&attrs, "Category", "id")?;
                        let category = ItemCategory::from_repr(raw).ok_or_else(|| {
                            XmlError::InvalidValue {
                                element: "Category",
                                attr: "id",
                                value: raw.to_string(),
                            }
                        })?;
                        let weight: u16 = req(&attrs, "Category", "weight")?;
                        staging
                            .items
                            .entry(kind)
                            .or_default()
                            .categories
                            .insert(category, weight);
                    }
                    b"Item" => {
                        let Some(kind) = current_items else { continue };
                        let attrs = attrs_map(&e, "Item")?;
                        let id: u16 = req(&attrs, "Item", "id")?;
                        let weight = if attrs.contains_key("guaranteed") {
                            Weight::Guaranteed
                        } else {
                            Weight::Absolute(req(&attrs, "Item", "weight")?)
                        };
                        staging
                            .items
                            .entry(kind)
                            .or_default()
                            .items
                            .insert(id, weight);
                    }
                    tag => {
                        if let Some(kind) = item_section_kind(tag) {
                            current_items = Some(kind);
                            staging.items.entry(kind).or_default();
                        }
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"Monsters" => in_monsters = false,
                b"Traps" => in_traps = false,
                tag if item_section_kind(tag).is_some() => current_items = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(XmlError::MissingRoot);
    }
    Ok(staging)
}

fn parse_layout(e: &BytesStart) -> Result<FloorLayout, XmlError> {
    const EL: &str = "FloorLayout";
    let attrs = attrs_map(e, EL)?;
    Ok(FloorLayout {
        structure: repr_attr(&attrs, EL, "structure", FloorStructure::from_repr)?,
        tileset_id: req(&attrs, EL, "tileset")?,
        music_id: req(&attrs, EL, "music")?,
        weather: repr_attr(&attrs, EL, "weather", Weather::from_repr)?,
        fixed_floor_id: req(&attrs, EL, "fixed_floor")?,
        floor_number: req(&attrs, EL, "number")?,
        room_density: req(&attrs, EL, "room_density")?,
        floor_connectivity: req(&attrs, EL, "connectivity")?,
        initial_enemy_density: req(&attrs, EL, "initial_enemy_density")?,
        dead_ends: req::<u8>(&attrs, EL, "dead_ends")? != 0,
        item_density: req(&attrs, EL, "item_density")?,
        trap_density: req(&attrs, EL, "trap_density")?,
        extra_hallway_density: req(&attrs, EL, "extra_hallway_density")?,
        buried_item_density: req(&attrs, EL, "buried_item_density")?,
        water_density: req(&attrs, EL, "water_density")?,
        darkness_level: repr_attr(&attrs, EL, "darkness", DarknessLevel::from_repr)?,
        max_coin_amount: req(&attrs, EL, "max_coin_amount")?,
        kecleon_shop_chance: req(&attrs, EL, "kecleon_shop_chance")?,
        monster_house_chance: req(&attrs, EL, "monster_house_chance")?,
        unused_chance: req(&attrs, EL, "unused_chance")?,
        sticky_item_chance: req(&attrs, EL, "sticky_item_chance")?,
        empty_monster_house_chance: req(&attrs, EL, "empty_monster_house_chance")?,
        hidden_stairs_spawn_chance: req(&attrs, EL, "hidden_stairs_chance")?,
        hidden_stairs_type: repr_attr(&attrs, EL, "hidden_stairs_type", HiddenStairsType::from_repr)?,
        kecleon_shop_item_positions: req(&attrs, EL, "kecleon_shop_item_positions")?,
        unk_hidden_stairs: req(&attrs, EL, "unk_hidden_stairs")?,
        terrain_settings: TerrainSettings::from_bits_truncate(req(&attrs, EL, "terrain_settings")?),
        iq_booster_boost: req(&attrs, EL, "iq_booster_boost")?,
        enemy_iq: req(&attrs, EL, "enemy_iq")?,
    })
}

fn attrs_map(e: &BytesStart, element: &'static str) -> Result<HashMap<String, String>, XmlError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|_| XmlError::InvalidValue {
                element,
                attr: "?",
                value: key.clone(),
            })?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn req<T: FromStr>(
    attrs: &HashMap<String, String>,
    element: &'static str,
    attr: &'static str,
) -> Result<T, XmlError> {
    let raw = attrs
        .get(attr)
        .ok_or(XmlError::MissingAttr { element, attr })?;
    raw.parse().map_err(|_| XmlError::InvalidValue {
        element,
        attr,
        value: raw.clone(),
    })
}

fn repr_attr<T>(
    attrs: &HashMap<String, String>,
    element: &'static str,
    attr: &'static str,
    from_repr: impl Fn(u8) -> Option<T>,
) -> Result<T, XmlError> {
    let raw: u8 = req(attrs, element, attr)?;
    from_repr(raw).ok_or_else(|| XmlError::InvalidValue {
        element,
        attr,
        value: raw.to_string(),
    })
}
