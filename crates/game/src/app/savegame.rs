use std::collections::BTreeMap;

use engine::{KeyValueStore, Vector2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::generator::ResourceRecord;
use super::levels;

const INVENTORY_KEY: &str = "inventory";
const EQUIPMENT_KEY: &str = "equipment";
const HERO_KEY: &str = "heroPosition";
const LEVEL_KEY: &str = "currentLevel";
const OVERLAY_KEY: &str = "overlaySeen";
const SOUND_KEY: &str = "sound";
const RESOURCE_KEY: &str = "resources";

pub(crate) const EQUIPMENT_SWORD: &str = "sword";
pub(crate) const EQUIPMENT_ROD_PURPLE: &str = "rod_purple";
pub(crate) const EQUIPMENT_ROD_RED: &str = "rod_red";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct InventoryItem {
    pub(crate) name: String,
    pub(crate) amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EquipmentItem {
    pub(crate) name: String,
    pub(crate) active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct HeroSave {
    pub(crate) level_id: String,
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) exp: i32,
    pub(crate) level: u32,
}

type ResourceMap = BTreeMap<String, Vec<ResourceRecord>>;

/// Decodes a stored JSON value, reporting the failing path on mismatch.
/// Malformed or missing values degrade to `None`; callers substitute their
/// documented defaults and never let a parse failure reach the update loop.
fn decode<T: DeserializeOwned>(store: &KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get_raw(key)?;
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(value) => Some(value),
        Err(error) => {
            let path = error.path().to_string();
            warn!(
                key,
                path = %path,
                error = %error.into_inner(),
                "save_value_malformed"
            );
            None
        }
    }
}

fn encode<T: Serialize>(store: &mut KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set_raw(key, raw),
        Err(error) => warn!(key, error = %error, "save_value_encode_failed"),
    }
}

pub(crate) fn save_inventory(store: &mut KeyValueStore, items: &[InventoryItem]) {
    encode(store, INVENTORY_KEY, &items);
}

pub(crate) fn load_inventory(store: &KeyValueStore) -> Vec<InventoryItem> {
    decode(store, INVENTORY_KEY).unwrap_or_default()
}

/// Increments the named item's count, creating the entry on first pickup,
/// and returns the updated list.
pub(crate) fn add_inventory_item(store: &mut KeyValueStore, name: &str) -> Vec<InventoryItem> {
    let mut items = load_inventory(store);
    match items.iter_mut().find(|item| item.name == name) {
        Some(existing) => existing.amount = existing.amount.saturating_add(1),
        None => items.push(InventoryItem {
            name: name.to_string(),
            amount: 1,
        }),
    }
    save_inventory(store, &items);
    items
}

pub(crate) fn save_equipment(store: &mut KeyValueStore, items: &[EquipmentItem]) {
    encode(store, EQUIPMENT_KEY, &items);
}

pub(crate) fn load_equipment(store: &KeyValueStore) -> Vec<EquipmentItem> {
    decode(store, EQUIPMENT_KEY).unwrap_or_default()
}

pub(crate) fn is_in_equipment(store: &KeyValueStore, name: &str) -> bool {
    load_equipment(store).iter().any(|item| item.name == name)
}

/// Adds a newly collected piece of equipment (inactive) unless owned
/// already, and returns the updated list.
pub(crate) fn add_equipment_item(store: &mut KeyValueStore, name: &str) -> Vec<EquipmentItem> {
    let mut items = load_equipment(store);
    if !items.iter().any(|item| item.name == name) {
        let active = items.is_empty();
        items.push(EquipmentItem {
            name: name.to_string(),
            active,
        });
        save_equipment(store, &items);
    }
    items
}

/// Rotates the active flag to the next owned item and returns the updated
/// list (empty when nothing is owned).
pub(crate) fn cycle_active_equipment(store: &mut KeyValueStore) -> Vec<EquipmentItem> {
    let mut items = load_equipment(store);
    if items.is_empty() {
        return items;
    }
    let current = items.iter().position(|item| item.active).unwrap_or(0);
    let next = (current + 1) % items.len();
    for (index, item) in items.iter_mut().enumerate() {
        item.active = index == next;
    }
    save_equipment(store, &items);
    items
}

pub(crate) fn active_equipment_name(store: &KeyValueStore) -> Option<String> {
    load_equipment(store)
        .into_iter()
        .find(|item| item.active)
        .map(|item| item.name)
}

pub(crate) fn save_hero(store: &mut KeyValueStore, hero: &HeroSave) {
    encode(store, HERO_KEY, hero);
}

/// The persisted hero position, but only when it was saved for the expected
/// level; positions from another level fall back to the provided default.
pub(crate) fn load_hero_position(
    store: &KeyValueStore,
    expected_level_id: &str,
    default: Vector2,
) -> Vector2 {
    match decode::<HeroSave>(store, HERO_KEY) {
        Some(hero) if hero.level_id == expected_level_id => Vector2::new(hero.x, hero.y),
        _ => default,
    }
}

/// Experience and hero level, independent of which level they were saved
/// on. Defaults to a fresh hero.
pub(crate) fn load_hero_progress(store: &KeyValueStore) -> (i32, u32) {
    match decode::<HeroSave>(store, HERO_KEY) {
        Some(hero) => (hero.exp, hero.level),
        None => (0, 0),
    }
}

pub(crate) fn save_level(store: &mut KeyValueStore, level_id: &str) {
    encode(store, LEVEL_KEY, &level_id);
}

pub(crate) fn load_level(store: &KeyValueStore) -> Option<String> {
    decode(store, LEVEL_KEY)
}

pub(crate) fn save_sound(store: &mut KeyValueStore, enabled: bool) {
    encode(store, SOUND_KEY, &enabled);
}

pub(crate) fn load_sound(store: &KeyValueStore) -> bool {
    decode(store, SOUND_KEY).unwrap_or(false)
}

pub(crate) fn save_overlay_seen(store: &mut KeyValueStore, seen: bool) {
    encode(store, OVERLAY_KEY, &seen);
}

pub(crate) fn load_overlay_seen(store: &KeyValueStore) -> bool {
    decode(store, OVERLAY_KEY).unwrap_or(false)
}

/// Replaces the override list persisted for one level; other levels'
/// entries are untouched.
pub(crate) fn save_level_resources(
    store: &mut KeyValueStore,
    level_id: &str,
    records: &[ResourceRecord],
) {
    let mut all: ResourceMap = decode(store, RESOURCE_KEY).unwrap_or_default();
    all.insert(level_id.to_string(), records.to_vec());
    encode(store, RESOURCE_KEY, &all);
}

pub(crate) fn load_level_resources(store: &KeyValueStore, level_id: &str) -> Vec<ResourceRecord> {
    decode::<ResourceMap>(store, RESOURCE_KEY)
        .and_then(|mut all| all.remove(level_id))
        .unwrap_or_default()
}

/// Updates the override matching the record's kind and exact coordinates,
/// or appends a new one.
pub(crate) fn upsert_resource_override(records: &mut Vec<ResourceRecord>, record: ResourceRecord) {
    match records
        .iter_mut()
        .find(|existing| existing.kind == record.kind && existing.x == record.x && existing.y == record.y)
    {
        Some(existing) => existing.hp = record.hp,
        None => records.push(record),
    }
}

/// Reconciles freshly generated defaults with persisted overrides: a
/// persisted record with matching kind and exact coordinates supersedes the
/// generated hit points; everything else stands. Stable under repeated
/// application. Depleted records (hp <= 0) stay in the list so the
/// depletion itself persists; spawning filters them out.
pub(crate) fn merge_resources(
    generated: &[ResourceRecord],
    persisted: &[ResourceRecord],
) -> Vec<ResourceRecord> {
    generated
        .iter()
        .map(|default| {
            persisted
                .iter()
                .find(|saved| {
                    saved.kind == default.kind && saved.x == default.x && saved.y == default.y
                })
                .map(|saved| ResourceRecord {
                    hp: saved.hp,
                    ..*default
                })
                .unwrap_or(*default)
        })
        .collect()
}

/// First-run contents of the store.
pub(crate) fn init_defaults(store: &mut KeyValueStore) {
    save_overlay_seen(store, false);
    save_sound(store, true);
    save_level(store, levels::MEADOW);
    save_level_resources(store, levels::MEADOW, &[]);
    save_level_resources(store, levels::CAVERN, &[]);
    save_equipment(
        store,
        &[EquipmentItem {
            name: EQUIPMENT_SWORD.to_string(),
            active: true,
        }],
    );
}

pub(crate) fn clear_all(store: &mut KeyValueStore) {
    store.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::generator::ResourceKind;

    fn record(kind: ResourceKind, x: i32, y: i32, hp: i32) -> ResourceRecord {
        ResourceRecord { kind, x, y, hp }
    }

    #[test]
    fn inventory_round_trips_and_increments() {
        let mut store = KeyValueStore::in_memory();
        assert!(load_inventory(&store).is_empty());

        add_inventory_item(&mut store, "tree");
        add_inventory_item(&mut store, "tree");
        let items = add_inventory_item(&mut store, "stone");

        assert_eq!(
            items,
            vec![
                InventoryItem {
                    name: "tree".to_string(),
                    amount: 2
                },
                InventoryItem {
                    name: "stone".to_string(),
                    amount: 1
                },
            ]
        );
        assert_eq!(load_inventory(&store), items);
    }

    #[test]
    fn malformed_values_degrade_to_defaults() {
        let mut store = KeyValueStore::in_memory();
        store.set_raw(INVENTORY_KEY, "{ not valid json".to_string());
        store.set_raw(HERO_KEY, "[1, 2, 3]".to_string());
        store.set_raw(SOUND_KEY, "\"loud\"".to_string());

        assert!(load_inventory(&store).is_empty());
        assert_eq!(
            load_hero_position(&store, levels::MEADOW, Vector2::new(16.0, 16.0)),
            Vector2::new(16.0, 16.0)
        );
        assert!(!load_sound(&store));
    }

    #[test]
    fn hero_position_applies_only_to_its_own_level() {
        let mut store = KeyValueStore::in_memory();
        save_hero(
            &mut store,
            &HeroSave {
                level_id: levels::CAVERN.to_string(),
                x: 96.0,
                y: 16.0,
                exp: 12,
                level: 1,
            },
        );

        let fallback = Vector2::new(176.0, 48.0);
        assert_eq!(
            load_hero_position(&store, levels::CAVERN, fallback),
            Vector2::new(96.0, 16.0)
        );
        assert_eq!(load_hero_position(&store, levels::MEADOW, fallback), fallback);
        assert_eq!(load_hero_progress(&store), (12, 1));
    }

    #[test]
    fn resources_are_partitioned_per_level() {
        let mut store = KeyValueStore::in_memory();
        save_level_resources(
            &mut store,
            levels::MEADOW,
            &[record(ResourceKind::Tree, 64, 48, 2)],
        );
        save_level_resources(
            &mut store,
            levels::CAVERN,
            &[record(ResourceKind::Stone, 96, 96, 1)],
        );

        assert_eq!(
            load_level_resources(&store, levels::MEADOW),
            vec![record(ResourceKind::Tree, 64, 48, 2)]
        );
        assert_eq!(
            load_level_resources(&store, levels::CAVERN),
            vec![record(ResourceKind::Stone, 96, 96, 1)]
        );
        assert!(load_level_resources(&store, "nowhere").is_empty());
    }

    #[test]
    fn merge_prefers_persisted_hp_on_exact_match_only() {
        let generated = vec![
            record(ResourceKind::Tree, 64, 48, 3),
            record(ResourceKind::Bush, 80, 48, 2),
        ];
        let persisted = vec![
            record(ResourceKind::Tree, 64, 48, 1),
            // Same kind, different coordinates: must not apply.
            record(ResourceKind::Bush, 80, 64, 0),
            // Coordinates of the tree but a different kind: must not apply.
            record(ResourceKind::Stone, 64, 48, 9),
        ];

        let merged = merge_resources(&generated, &persisted);
        assert_eq!(
            merged,
            vec![
                record(ResourceKind::Tree, 64, 48, 1),
                record(ResourceKind::Bush, 80, 48, 2),
            ]
        );
    }

    #[test]
    fn merge_is_stable_under_repeated_application() {
        let generated = vec![
            record(ResourceKind::Tree, 64, 48, 3),
            record(ResourceKind::Stone, 96, 96, 4),
        ];
        let persisted = vec![record(ResourceKind::Stone, 96, 96, 0)];

        let once = merge_resources(&generated, &persisted);
        let twice = merge_resources(&generated, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn upsert_updates_matching_override_and_appends_new_ones() {
        let mut overrides = vec![record(ResourceKind::Tree, 64, 48, 3)];

        upsert_resource_override(&mut overrides, record(ResourceKind::Tree, 64, 48, 2));
        assert_eq!(overrides, vec![record(ResourceKind::Tree, 64, 48, 2)]);

        upsert_resource_override(&mut overrides, record(ResourceKind::Bush, 16, 16, 1));
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn equipment_cycles_through_owned_items() {
        let mut store = KeyValueStore::in_memory();
        init_defaults(&mut store);
        assert_eq!(active_equipment_name(&store).as_deref(), Some(EQUIPMENT_SWORD));

        add_equipment_item(&mut store, EQUIPMENT_ROD_PURPLE);
        let cycled = cycle_active_equipment(&mut store);
        assert!(cycled
            .iter()
            .any(|item| item.name == EQUIPMENT_ROD_PURPLE && item.active));
        assert_eq!(
            active_equipment_name(&store).as_deref(),
            Some(EQUIPMENT_ROD_PURPLE)
        );

        let cycled_again = cycle_active_equipment(&mut store);
        assert!(cycled_again
            .iter()
            .any(|item| item.name == EQUIPMENT_SWORD && item.active));
    }

    #[test]
    fn init_defaults_then_clear_all_resets_the_store() {
        let mut store = KeyValueStore::in_memory();
        init_defaults(&mut store);
        assert_eq!(load_level(&store).as_deref(), Some(levels::MEADOW));
        assert!(load_sound(&store));
        assert!(!load_overlay_seen(&store));

        clear_all(&mut store);
        assert!(load_level(&store).is_none());
        assert!(load_equipment(&store).is_empty());
    }
}
