use engine::{
    Behavior, DialogueContent, DrawList, InputAction, NodeId, SceneCtx, SceneTree, SignalPayload,
    Vector2,
};

use super::signals::TEXTBOX_END;
use super::sprite::push_frame;

const TEXTBOX_SHEET: &str = "textbox";
const PORTRAITS_SHEET: &str = "portraits";
const PORTRAITS_COLUMNS: u32 = 4;
const BOX_WIDTH: u32 = 256;
const BOX_HEIGHT: u32 = 64;

/// HUD dialogue box. Text layout itself is the UI layer's concern; this node
/// shows the box and portrait, and closes on the next interact press. The
/// start/end signals around its lifetime are what lock and unlock the hero.
pub(crate) struct TextBox {
    content: DialogueContent,
}

impl TextBox {
    pub(crate) fn new(content: DialogueContent) -> Self {
        Self { content }
    }
}

impl Behavior for TextBox {
    fn step(&mut self, _delta_ms: f32, _id: NodeId, ctx: &mut SceneCtx<'_>) {
        if ctx.input.just_pressed(InputAction::Interact) {
            ctx.emit(TEXTBOX_END, &SignalPayload::None);
        }
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        push_frame(out, TEXTBOX_SHEET, 0, BOX_WIDTH, BOX_HEIGHT, 1, origin);
        push_frame(
            out,
            PORTRAITS_SHEET,
            self.content.portrait_frame,
            16,
            16,
            PORTRAITS_COLUMNS,
            origin.offset(6.0, 6.0),
        );
    }
}
