use engine::{
    Behavior, DialogueContent, DrawList, Harvestable, NodeId, SceneCtx, SceneTree, SignalName,
    SignalPayload, Vector2,
};

use super::generator::ResourceKind;
use super::savegame::{EQUIPMENT_ROD_PURPLE, EQUIPMENT_ROD_RED, EQUIPMENT_SWORD};
use super::signals::{HERO_PICKS_UP_ITEM, HERO_POSITION};
use super::sprite::push_frame;

pub(crate) const SHADOW_SHEET: &str = "shadow";
pub(crate) const COLLECTIBLE_SHEET: &str = "collectible";
const COLLECTIBLE_COLUMNS: u32 = 20;

impl ResourceKind {
    fn sheet(self) -> &'static str {
        match self {
            ResourceKind::Tree => "tree",
            ResourceKind::Bush => "bush",
            ResourceKind::Stone => "stone",
        }
    }

    /// Frame size and draw offset relative to the node's tile position.
    fn sprite_layout(self) -> (u32, u32, Vector2) {
        match self {
            ResourceKind::Tree => (16, 32, Vector2::new(0.0, -15.0)),
            ResourceKind::Bush => (16, 16, Vector2::new(0.0, -1.0)),
            ResourceKind::Stone => (16, 16, Vector2::new(0.0, -1.0)),
        }
    }

    fn examine_text(self) -> &'static str {
        match self {
            ResourceKind::Tree => "An old tree. The trunk looks like it would split cleanly.",
            ResourceKind::Bush => "A dense little bush. Something rustles inside.",
            ResourceKind::Stone => "A weathered stone, heavier than it looks.",
        }
    }
}

/// Icon index inside the collectible sheet.
pub(crate) fn collectible_frame(key: &str) -> u16 {
    match key {
        "bush" => 0,
        "tree" => 1,
        "stone" => 2,
        key if key == EQUIPMENT_ROD_PURPLE => 10,
        key if key == EQUIPMENT_ROD_RED => 11,
        key if key == EQUIPMENT_SWORD => 12,
        _ => 0,
    }
}

/// A harvestable world object (tree, bush, stone): solid, damageable, and
/// examinable. Spawned from merged generator records; the owning root
/// destroys it and persists the depletion when its hit points reach zero.
pub(crate) struct ResourceNode {
    kind: ResourceKind,
    hp: i32,
}

impl ResourceNode {
    pub(crate) fn new(kind: ResourceKind, hp: i32) -> Self {
        Self { kind, hp }
    }
}

impl Harvestable for ResourceNode {
    fn kind(&self) -> &'static str {
        self.kind.key()
    }

    fn hit_points(&self) -> i32 {
        self.hp
    }

    fn apply_damage(&mut self, amount: i32) -> i32 {
        self.hp -= amount;
        self.hp
    }
}

impl Behavior for ResourceNode {
    fn harvestable(&mut self) -> Option<&mut dyn Harvestable> {
        Some(self)
    }

    fn dialogue(&self) -> Option<DialogueContent> {
        Some(DialogueContent {
            portrait_frame: 1,
            text: self.kind.examine_text().to_string(),
        })
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        push_frame(
            out,
            SHADOW_SHEET,
            0,
            32,
            32,
            1,
            origin.offset(-8.0, -16.0),
        );
        let (width, height, offset) = self.kind.sprite_layout();
        push_frame(
            out,
            self.kind.sheet(),
            0,
            width,
            height,
            1,
            origin.offset(offset.x, offset.y),
        );
    }
}

/// A pickup lying on a tile. When the hero's emitted position lands exactly
/// on it, it unsubscribes itself, leaves the scene and announces the pickup.
pub(crate) struct CollectibleItem {
    key: &'static str,
}

impl CollectibleItem {
    pub(crate) fn new(key: &'static str) -> Self {
        Self { key }
    }
}

impl Behavior for CollectibleItem {
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
        if hero.x.round() != position.x || hero.y.round() != position.y {
            return;
        }

        // Unsubscribe first so a nested emission cannot re-trigger the
        // pickup while this node is going away.
        ctx.bus.unsubscribe_all(id);
        ctx.destroy(id);
        ctx.emit(
            HERO_PICKS_UP_ITEM,
            &SignalPayload::KeyAt {
                key: self.key,
                position,
            },
        );
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        push_frame(
            out,
            COLLECTIBLE_SHEET,
            collectible_frame(self.key),
            16,
            16,
            COLLECTIBLE_COLUMNS,
            origin.offset(0.0, -5.0),
        );
    }
}
