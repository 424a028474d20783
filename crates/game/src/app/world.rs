use engine::{
    Behavior, DrawLayer, NodeId, NodeSpec, SceneCtx, SignalName, SignalPayload, Vector2,
};
use tracing::warn;

use super::camera::CameraRig;
use super::defs::LevelDefs;
use super::dialogue::TextBox;
use super::generator::{ResourceKind, ResourceRecord};
use super::hud::{EquipmentHud, ExpHud, InventoryHud};
use super::levels::{self, build_level};
use super::resources::CollectibleItem;
use super::savegame;
use super::signals::{
    CHANGE_LEVEL, HERO_ATTACK_ACTION, HERO_REQUESTS_ACTION, LEVEL_CHANGED, RESOURCE_DESTROYED,
    TEXTBOX_END, TEXTBOX_START,
};

const TEXTBOX_POSITION: Vector2 = Vector2 { x: 32.0, y: 112.0 };
const INVENTORY_HUD_POSITION: Vector2 = Vector2 { x: 4.0, y: 4.0 };
const EQUIPMENT_HUD_POSITION: Vector2 = Vector2 { x: 296.0, y: 4.0 };
const EXP_HUD_POSITION: Vector2 = Vector2 { x: 4.0, y: 26.0 };

/// Root node behavior: spawns the camera and HUD, owns the active level
/// subtree, and wires the cross-entity flows (dialogue requests, combat on
/// harvestables, level transitions).
pub(crate) struct WorldRoot {
    defs: LevelDefs,
    level_id: String,
    level_node: Option<NodeId>,
    saved_resources: Vec<ResourceRecord>,
    textbox: Option<NodeId>,
}

impl WorldRoot {
    pub(crate) fn new(defs: LevelDefs) -> Self {
        Self {
            defs,
            level_id: levels::MEADOW.to_string(),
            level_node: None,
            saved_resources: Vec::new(),
            textbox: None,
        }
    }

    /// Tears down the current level subtree (if any) and builds the next
    /// one. Persists the level identifier and announces the hero spawn so
    /// the camera can recenter.
    fn enter_level(
        &mut self,
        root: NodeId,
        ctx: &mut SceneCtx<'_>,
        level_id: &str,
        entry: Option<Vector2>,
    ) {
        let spec = levels::spec(level_id);
        if let Some(old) = self.level_node.take() {
            ctx.destroy(old);
        }

        let tuning = self.defs.tuning_for(spec.id);
        match build_level(ctx.tree, ctx.store, &tuning, root, spec.id, entry) {
            Ok((level, spawn)) => {
                self.level_node = Some(level);
                self.level_id = spec.id.to_string();
                self.saved_resources = savegame::load_level_resources(ctx.store, spec.id);
                savegame::save_level(ctx.store, spec.id);
                ctx.emit(LEVEL_CHANGED, &SignalPayload::Position(spawn));
            }
            Err(error) => warn!(level = spec.id, error = %error, "level_build_failed"),
        }
    }

    fn open_dialogue(&mut self, root: NodeId, target: NodeId, ctx: &mut SceneCtx<'_>) {
        if self.textbox.is_some() {
            return;
        }
        let Some(content) = ctx
            .tree
            .behavior_mut(target)
            .and_then(|behavior| behavior.dialogue())
        else {
            return;
        };

        self.textbox = ctx.tree.add_child(
            root,
            NodeSpec::at(TEXTBOX_POSITION).layer(DrawLayer::Hud),
            Box::new(TextBox::new(content)),
        );
        if self.textbox.is_some() {
            ctx.emit(TEXTBOX_START, &SignalPayload::None);
        }
    }

    /// Applies one hit to a harvestable target, persists the override, and
    /// on depletion removes the node, drops its collectible and announces
    /// the destruction.
    fn resolve_attack(&mut self, target: NodeId, ctx: &mut SceneCtx<'_>) {
        let Some(position) = ctx.tree.position(target) else {
            return;
        };
        let Some((kind_key, remaining)) = ctx
            .tree
            .behavior_mut(target)
            .and_then(|behavior| behavior.harvestable())
            .map(|harvestable| {
                let remaining = harvestable.apply_damage(1);
                (harvestable.kind(), remaining)
            })
        else {
            return;
        };
        let Some(kind) = ResourceKind::from_key(kind_key) else {
            warn!(kind = kind_key, "attacked_harvestable_with_unknown_kind");
            return;
        };

        savegame::upsert_resource_override(
            &mut self.saved_resources,
            ResourceRecord {
                kind,
                x: position.x as i32,
                y: position.y as i32,
                hp: remaining,
            },
        );
        savegame::save_level_resources(ctx.store, &self.level_id, &self.saved_resources);

        if remaining <= 0 {
            let parent = ctx.tree.parent_of(target);
            ctx.destroy(target);
            if let Some(parent) = parent {
                let _ = ctx.tree.add_child(
                    parent,
                    NodeSpec::at(position),
                    Box::new(CollectibleItem::new(kind.key())),
                );
            }
            ctx.emit(RESOURCE_DESTROYED, &SignalPayload::Key(kind.key()));
        }
    }
}

impl Behavior for WorldRoot {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        let _ = ctx
            .tree
            .add_child(id, NodeSpec::at(Vector2::ZERO), Box::new(CameraRig));
        let _ = ctx.tree.add_child(
            id,
            NodeSpec::at(INVENTORY_HUD_POSITION).layer(DrawLayer::Hud),
            Box::new(InventoryHud::default()),
        );
        let _ = ctx.tree.add_child(
            id,
            NodeSpec::at(EQUIPMENT_HUD_POSITION).layer(DrawLayer::Hud),
            Box::new(EquipmentHud::default()),
        );
        let _ = ctx.tree.add_child(
            id,
            NodeSpec::at(EXP_HUD_POSITION).layer(DrawLayer::Hud),
            Box::new(ExpHud::default()),
        );

        ctx.bus.on(CHANGE_LEVEL, id);
        ctx.bus.on(HERO_REQUESTS_ACTION, id);
        ctx.bus.on(HERO_ATTACK_ACTION, id);
        ctx.bus.on(TEXTBOX_END, id);

        let level_id = savegame::load_level(ctx.store).unwrap_or_else(|| levels::MEADOW.to_string());
        self.enter_level(id, ctx, &level_id, None);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        payload: &SignalPayload,
        id: NodeId,
        ctx: &mut SceneCtx<'_>,
    ) {
        match name {
            name if name == CHANGE_LEVEL => {
                let SignalPayload::KeyAt { key, position } = payload else {
                    return;
                };
                self.enter_level(id, ctx, key, Some(*position));
            }
            name if name == HERO_REQUESTS_ACTION => {
                let SignalPayload::Node(target) = payload else {
                    return;
                };
                self.open_dialogue(id, *target, ctx);
            }
            name if name == HERO_ATTACK_ACTION => {
                let SignalPayload::Node(target) = payload else {
                    return;
                };
                self.resolve_attack(*target, ctx);
            }
            name if name == TEXTBOX_END => {
                if let Some(textbox) = self.textbox.take() {
                    ctx.destroy(textbox);
                }
            }
            _ => {}
        }
    }
}
