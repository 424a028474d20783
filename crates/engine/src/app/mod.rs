mod animation;
mod collision;
mod input;
mod loop_runner;
mod math;
mod motion;
mod rendering;
mod scene;
mod signals;
mod store;

pub use animation::{AnimationError, AnimationSet, FrameSequencer, FrameTimeline};
pub use collision::CollisionField;
pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, Game, LoopConfig};
pub use math::{grid_cells, Direction, Vector2, TILE_SIZE};
pub use motion::move_towards;
pub use rendering::{
    DrawCommand, DrawList, Renderer, SrcRect, CANVAS_HEIGHT, CANVAS_WIDTH,
};
pub use scene::{
    advance_scene, draw_children_ordered, draw_subtree, emit_signal, Behavior, DialogueContent,
    DrawLayer, Group, Harvestable, NodeId, NodeSpec, SceneCtx, SceneTree,
};
pub use signals::{SignalBus, SignalName, SignalPayload};
pub use store::{KeyValueStore, StoreError};
