use engine::{
    Behavior, DrawList, NodeId, SceneCtx, SceneTree, SignalName, SignalPayload, Vector2,
};

use super::generator::ResourceKind;
use super::resources::{collectible_frame, COLLECTIBLE_SHEET};
use super::savegame::{
    self, EquipmentItem, InventoryItem, EQUIPMENT_ROD_PURPLE, EQUIPMENT_ROD_RED,
};
use super::signals::{HERO_CHANGE_EQUIPMENT, HERO_EXP_CHANGED, HERO_PICKS_UP_ITEM};
use super::sprite::push_frame;

const ITEM_FRAME_SHEET: &str = "item_frame";
const SLOT_SIZE: f32 = 20.0;
const EXP_SEGMENT_WIDTH: f32 = 2.0;
const EXP_SEGMENTS_SHOWN: i32 = 10;

/// Collected-resource counter strip. Mirrors the persisted inventory and
/// keeps it current as pickups arrive.
#[derive(Default)]
pub(crate) struct InventoryHud {
    items: Vec<InventoryItem>,
}

impl Behavior for InventoryHud {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        self.items = savegame::load_inventory(ctx.store);
        ctx.bus.on(HERO_PICKS_UP_ITEM, id);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        payload: &SignalPayload,
        _id: NodeId,
        ctx: &mut SceneCtx<'_>,
    ) {
        if name != HERO_PICKS_UP_ITEM {
            return;
        }
        let SignalPayload::KeyAt { key, .. } = payload else {
            return;
        };
        if ResourceKind::from_key(key).is_none() {
            return;
        }
        self.items = savegame::add_inventory_item(ctx.store, key);
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        for (index, item) in self.items.iter().enumerate() {
            let slot = origin.offset(index as f32 * SLOT_SIZE, 0.0);
            push_frame(out, ITEM_FRAME_SHEET, 0, 20, 20, 1, slot);
            push_frame(
                out,
                COLLECTIBLE_SHEET,
                collectible_frame(&item.name),
                16,
                16,
                20,
                slot.offset(2.0, 2.0),
            );
        }
    }
}

/// Experience readout under the inventory strip. Seeds itself from the
/// persisted hero progress and follows exp-changed signals afterwards.
#[derive(Default)]
pub(crate) struct ExpHud {
    exp: i32,
}

impl Behavior for ExpHud {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        self.exp = savegame::load_hero_progress(ctx.store).0;
        ctx.bus.on(HERO_EXP_CHANGED, id);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        payload: &SignalPayload,
        _id: NodeId,
        _ctx: &mut SceneCtx<'_>,
    ) {
        if name != HERO_EXP_CHANGED {
            return;
        }
        if let SignalPayload::Amount(exp) = payload {
            self.exp = *exp;
        }
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        push_frame(out, "exp_background", 0, 24, 8, 1, origin);
        let segments = self.exp.max(0).min(EXP_SEGMENTS_SHOWN);
        for segment in 0..segments {
            push_frame(
                out,
                "exp",
                0,
                2,
                8,
                1,
                origin.offset(2.0 + segment as f32 * EXP_SEGMENT_WIDTH, 0.0),
            );
        }
    }
}

/// Shows the active piece of equipment and owns the equipment save state:
/// rod pickups add entries, the equipment action cycles the active one.
#[derive(Default)]
pub(crate) struct EquipmentHud {
    items: Vec<EquipmentItem>,
}

impl EquipmentHud {
    fn active(&self) -> Option<&EquipmentItem> {
        self.items.iter().find(|item| item.active)
    }
}

impl Behavior for EquipmentHud {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        self.items = savegame::load_equipment(ctx.store);
        ctx.bus.on(HERO_PICKS_UP_ITEM, id);
        ctx.bus.on(HERO_CHANGE_EQUIPMENT, id);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        payload: &SignalPayload,
        _id: NodeId,
        ctx: &mut SceneCtx<'_>,
    ) {
        match name {
            name if name == HERO_PICKS_UP_ITEM => {
                let SignalPayload::KeyAt { key, .. } = payload else {
                    return;
                };
                if *key != EQUIPMENT_ROD_PURPLE && *key != EQUIPMENT_ROD_RED {
                    return;
                }
                self.items = savegame::add_equipment_item(ctx.store, key);
            }
            name if name == HERO_CHANGE_EQUIPMENT => {
                self.items = savegame::cycle_active_equipment(ctx.store);
            }
            _ => {}
        }
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        let Some(active) = self.active() else {
            return;
        };
        push_frame(out, ITEM_FRAME_SHEET, 0, 20, 20, 1, origin);
        push_frame(
            out,
            COLLECTIBLE_SHEET,
            collectible_frame(&active.name),
            16,
            16,
            20,
            origin.offset(2.0, 2.0),
        );
    }
}
