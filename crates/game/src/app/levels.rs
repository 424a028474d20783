use engine::{
    grid_cells, AnimationSet, Behavior, CollisionField, DrawLayer, DrawList, FrameTimeline,
    KeyValueStore, NodeId, NodeSpec, SceneCtx, SceneTree, SignalName, SignalPayload, Vector2,
};
use tracing::info;

use super::defs::GeneratorTuning;
use super::generator::{generate_resources, GeneratorConfig};
use super::hero::Hero;
use super::npc::Npc;
use super::resources::{CollectibleItem, ResourceNode};
use super::savegame::{self, EQUIPMENT_ROD_PURPLE, EQUIPMENT_ROD_RED};
use super::signals::{CHANGE_LEVEL, HERO_EXITS, HERO_POSITION};
use super::sprite::{push_frame, SpriteNode};

pub(crate) const MEADOW: &str = "meadow";
pub(crate) const CAVERN: &str = "cavern";

pub(crate) type SaveLoadResult<T> = Result<T, String>;

/// World extent of a level in pixels; matches the ground sheets.
const LEVEL_WIDTH: f32 = 320.0;
const LEVEL_HEIGHT: f32 = 180.0;

pub(crate) struct LevelSpec {
    pub(crate) id: &'static str,
    pub(crate) sky_sheet: &'static str,
    pub(crate) ground_sheet: &'static str,
    pub(crate) default_hero_spawn: Vector2,
    pub(crate) exit_position: Vector2,
    pub(crate) next_level: &'static str,
    pub(crate) next_entry: Vector2,
}

const MEADOW_SPEC: LevelSpec = LevelSpec {
    id: MEADOW,
    sky_sheet: "sky",
    ground_sheet: "ground",
    default_hero_spawn: Vector2 { x: 176.0, y: 48.0 },
    exit_position: Vector2 { x: 160.0, y: 48.0 },
    next_level: CAVERN,
    next_entry: Vector2 { x: 96.0, y: 16.0 },
};

const CAVERN_SPEC: LevelSpec = LevelSpec {
    id: CAVERN,
    sky_sheet: "cave_sky",
    ground_sheet: "cave_ground",
    default_hero_spawn: Vector2 { x: 96.0, y: 16.0 },
    exit_position: Vector2 { x: 80.0, y: 16.0 },
    next_level: MEADOW,
    next_entry: Vector2 { x: 176.0, y: 48.0 },
};

/// Resolves a persisted level identifier; anything unknown falls back to the
/// starting meadow.
pub(crate) fn spec(level_id: &str) -> &'static LevelSpec {
    match level_id {
        CAVERN => &CAVERN_SPEC,
        _ => &MEADOW_SPEC,
    }
}

fn walls_for(level_id: &str) -> CollisionField {
    let mut walls = CollisionField::new();
    // Screen-edge borders, one tile outside the playable area.
    walls.insert_segment(Vector2::new(320.0, 16.0), Vector2::new(320.0, 144.0));
    walls.insert_segment(Vector2::new(-16.0, 16.0), Vector2::new(-16.0, 144.0));
    walls.insert_segment(Vector2::new(0.0, 0.0), Vector2::new(304.0, 0.0));
    walls.insert_segment(Vector2::new(0.0, 160.0), Vector2::new(304.0, 160.0));

    if level_id == MEADOW {
        // Water pools and the house doorway tile.
        for x in MEADOW_WATER_XS {
            walls.insert(Vector2::new(x, MEADOW_WATER_Y));
        }
        walls.insert(Vector2::new(224.0, 64.0));
    }

    walls
}

const MEADOW_WATER_XS: [f32; 4] = [112.0, 128.0, 144.0, 160.0];
const MEADOW_WATER_Y: f32 = 80.0;

fn water_animation() -> AnimationSet {
    let timeline = FrameTimeline::new(800.0, &[(0.0, 0), (200.0, 1), (400.0, 2), (600.0, 3)])
        .expect("static timeline is valid");
    AnimationSet::new(vec![("flow", timeline)]).expect("static animation set is valid")
}

/// The level node itself: owns the static collision field and the exit
/// wiring. The hero consults the field through the collision capability.
pub(crate) struct LevelBody {
    walls: CollisionField,
    next_level: &'static str,
    next_entry: Vector2,
}

impl Behavior for LevelBody {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        ctx.bus.on(HERO_EXITS, id);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        _payload: &SignalPayload,
        _id: NodeId,
        ctx: &mut SceneCtx<'_>,
    ) {
        if name != HERO_EXITS {
            return;
        }
        ctx.emit(
            CHANGE_LEVEL,
            &SignalPayload::KeyAt {
                key: self.next_level,
                position: self.next_entry,
            },
        );
    }

    fn collision(&self) -> Option<&CollisionField> {
        Some(&self.walls)
    }
}

/// Floor-layer marker tile; stepping exactly onto it leaves the level.
struct ExitDoor;

impl Behavior for ExitDoor {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        ctx.bus.on(HERO_POSITION, id);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        payload: &SignalPayload,
        id: NodeId,
        ctx: &mut SceneCtx<'_>,
    ) {
        if name != HERO_POSITION {
            return;
        }
        let SignalPayload::Position(hero) = payload else {
            return;
        };
        let Some(position) = ctx.tree.position(id) else {
            return;
        };
        if hero.x.round() == position.x && hero.y.round() == position.y {
            ctx.emit(HERO_EXITS, &SignalPayload::None);
        }
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        push_frame(out, "exit", 0, 16, 16, 1, origin);
    }
}

/// Builds the full subtree for one level under `parent` and returns the
/// level node plus the resolved hero spawn: persisted position for this
/// level first, then the entry handed over by the previous level, then the
/// level default.
pub(crate) fn build_level(
    tree: &mut SceneTree,
    store: &mut KeyValueStore,
    tuning: &GeneratorTuning,
    parent: NodeId,
    level_id: &str,
    entry: Option<Vector2>,
) -> SaveLoadResult<(NodeId, Vector2)> {
    let spec = spec(level_id);
    let level = tree
        .add_child(
            parent,
            NodeSpec::at(Vector2::ZERO),
            Box::new(LevelBody {
                walls: walls_for(spec.id),
                next_level: spec.next_level,
                next_entry: spec.next_entry,
            }),
        )
        .ok_or_else(|| "scene root is gone".to_string())?;

    let _ = tree.add_child(
        level,
        NodeSpec::at(Vector2::ZERO).layer(DrawLayer::Floor),
        Box::new(SpriteNode::new(
            spec.ground_sheet,
            LEVEL_WIDTH as u32,
            LEVEL_HEIGHT as u32,
        )),
    );
    let _ = tree.add_child(
        level,
        NodeSpec::at(spec.exit_position).layer(DrawLayer::Floor),
        Box::new(ExitDoor),
    );

    if spec.id == MEADOW {
        // Animated water surfaces over the impassable pool cells.
        for x in MEADOW_WATER_XS {
            let _ = tree.add_child(
                level,
                NodeSpec::at(Vector2::new(x, MEADOW_WATER_Y)).layer(DrawLayer::Floor),
                Box::new(
                    SpriteNode::new("water_anim", 16, 16)
                        .with_sheet_columns(4)
                        .with_animations(water_animation()),
                ),
            );
        }
    }

    if spec.id == CAVERN {
        let _ = tree.add_child(
            level,
            NodeSpec::at(Vector2::new(grid_cells(5), grid_cells(5))).solid(),
            Box::new(Npc::new(
                "Watch the ceiling. The stones down here have opinions.",
                0,
            )),
        );
        let _ = tree.add_child(
            level,
            NodeSpec::at(Vector2::new(grid_cells(10), grid_cells(4))).solid(),
            Box::new(Npc::new("I have been looking for the way out for days!", 2)),
        );
    }

    if spec.id == MEADOW && !savegame::is_in_equipment(store, EQUIPMENT_ROD_PURPLE) {
        let _ = tree.add_child(
            level,
            NodeSpec::at(Vector2::new(grid_cells(7), grid_cells(6))),
            Box::new(CollectibleItem::new(EQUIPMENT_ROD_PURPLE)),
        );
    }
    if spec.id == CAVERN && !savegame::is_in_equipment(store, EQUIPMENT_ROD_RED) {
        let _ = tree.add_child(
            level,
            NodeSpec::at(Vector2::new(grid_cells(10), grid_cells(6))),
            Box::new(CollectibleItem::new(EQUIPMENT_ROD_RED)),
        );
    }

    let config = GeneratorConfig {
        seed: tuning.seed,
        level_id: spec.id.to_string(),
        width: LEVEL_WIDTH,
        height: LEVEL_HEIGHT,
        tile_size: 16.0,
        densities: tuning.densities,
        path_zones: tuning.path_zones.clone(),
        border: tuning.border,
    };
    let generated = generate_resources(&config);
    let persisted = savegame::load_level_resources(store, spec.id);
    let merged = savegame::merge_resources(&generated, &persisted);
    let mut spawned_resources = 0usize;
    for record in merged.into_iter().filter(|record| record.hp > 0) {
        let _ = tree.add_child(
            level,
            NodeSpec::at(Vector2::new(record.x as f32, record.y as f32)).solid(),
            Box::new(ResourceNode::new(record.kind, record.hp)),
        );
        spawned_resources += 1;
    }

    let fallback = entry.unwrap_or(spec.default_hero_spawn);
    let spawn = savegame::load_hero_position(store, spec.id, fallback);
    let (exp, hero_level) = savegame::load_hero_progress(store);
    tree.add_child(
        level,
        NodeSpec::at(spawn),
        Box::new(Hero::new(spec.id, spawn, exp, hero_level)),
    )
    .ok_or_else(|| "level node vanished during build".to_string())?;

    info!(
        level = spec.id,
        resources = spawned_resources,
        hero_x = spawn.x,
        hero_y = spawn.y,
        "level_built"
    );
    Ok((level, spawn))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_ids_fall_back_to_the_meadow() {
        assert_eq!(spec("meadow").id, MEADOW);
        assert_eq!(spec("cavern").id, CAVERN);
        assert_eq!(spec("no-such-level").id, MEADOW);
    }

    #[test]
    fn borders_surround_the_playable_area() {
        let walls = walls_for(MEADOW);
        assert!(walls.is_blocked(Vector2::new(-16.0, 48.0)));
        assert!(walls.is_blocked(Vector2::new(320.0, 48.0)));
        assert!(walls.is_blocked(Vector2::new(160.0, 0.0)));
        assert!(walls.is_blocked(Vector2::new(160.0, 160.0)));
        assert!(!walls.is_blocked(Vector2::new(160.0, 48.0)));
    }

    #[test]
    fn meadow_water_is_impassable_but_the_cavern_floor_is_open() {
        assert!(walls_for(MEADOW).is_blocked(Vector2::new(128.0, 80.0)));
        assert!(!walls_for(CAVERN).is_blocked(Vector2::new(128.0, 80.0)));
    }

    #[test]
    fn level_exit_targets_form_a_cycle() {
        assert_eq!(spec(MEADOW).next_level, CAVERN);
        assert_eq!(spec(CAVERN).next_level, MEADOW);
        assert!(spec(MEADOW)
            .next_entry
            .matches(spec(CAVERN).default_hero_spawn));
    }
}
