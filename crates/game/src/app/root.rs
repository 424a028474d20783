use engine::{
    advance_scene, draw_children_ordered, draw_subtree, DrawCommand, DrawLayer, DrawList, Game,
    InputSnapshot, KeyValueStore, SceneTree, SignalBus, SrcRect, Vector2, CANVAS_HEIGHT,
    CANVAS_WIDTH,
};

use super::defs::LevelDefs;
use super::levels;
use super::savegame;
use super::world::WorldRoot;

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];

/// The composed application: scene tree rooted in `WorldRoot`, the signal
/// bus, and the persistent store. Frame order is sky backdrop, world pass
/// under the camera offset (the root node's position), then the HUD pass.
pub(crate) struct GladeGame {
    tree: SceneTree,
    bus: SignalBus,
    store: KeyValueStore,
}

impl GladeGame {
    pub(crate) fn new(store: KeyValueStore, defs: LevelDefs) -> Self {
        Self {
            tree: SceneTree::new(Box::new(WorldRoot::new(defs))),
            bus: SignalBus::new(),
            store,
        }
    }

    #[cfg(test)]
    pub(crate) fn tree(&self) -> &SceneTree {
        &self.tree
    }

    #[cfg(test)]
    pub(crate) fn tree_mut(&mut self) -> &mut SceneTree {
        &mut self.tree
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &KeyValueStore {
        &self.store
    }
}

impl Game for GladeGame {
    fn update(&mut self, delta_ms: f32, input: &InputSnapshot) {
        advance_scene(&mut self.tree, &mut self.bus, input, &mut self.store, delta_ms);
    }

    fn compose(&mut self, frame: &mut DrawList) {
        let level_id =
            savegame::load_level(&self.store).unwrap_or_else(|| levels::MEADOW.to_string());
        let spec = levels::spec(&level_id);

        frame.set_clear_color(CLEAR_COLOR);
        frame.push(DrawCommand {
            sheet: spec.sky_sheet,
            src: SrcRect {
                x: 0,
                y: 0,
                width: CANVAS_WIDTH,
                height: CANVAS_HEIGHT,
            },
            dest: Vector2::ZERO,
        });

        let root = self.tree.root();
        let camera_offset = self.tree.position(root).unwrap_or(Vector2::ZERO);
        for child in draw_children_ordered(&self.tree, root) {
            if self.tree.draw_layer(child) != DrawLayer::Hud {
                draw_subtree(&self.tree, child, camera_offset, frame);
            }
        }
        for child in self.tree.children_of(root) {
            if self.tree.draw_layer(child) == DrawLayer::Hud {
                draw_subtree(&self.tree, child, Vector2::ZERO, frame);
            }
        }
    }
}
