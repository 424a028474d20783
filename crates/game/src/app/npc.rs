use engine::{Behavior, DialogueContent, DrawList, NodeId, SceneTree, Vector2};

use super::resources::SHADOW_SHEET;
use super::sprite::push_frame;

const NPC_SHEET: &str = "knight";
const NPC_SHEET_COLUMNS: u32 = 3;
const NPC_IDLE_FRAME: u16 = 1;

/// A stationary talker. Solidity comes from the node spec; the interaction
/// itself runs through the dialogue capability.
pub(crate) struct Npc {
    text: String,
    portrait_frame: u16,
}

impl Npc {
    pub(crate) fn new(text: impl Into<String>, portrait_frame: u16) -> Self {
        Self {
            text: text.into(),
            portrait_frame,
        }
    }
}

impl Behavior for Npc {
    fn dialogue(&self) -> Option<DialogueContent> {
        Some(DialogueContent {
            portrait_frame: self.portrait_frame,
            text: self.text.clone(),
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
            origin.offset(-8.0, -18.0),
        );
        push_frame(
            out,
            NPC_SHEET,
            NPC_IDLE_FRAME,
            32,
            32,
            NPC_SHEET_COLUMNS,
            origin.offset(-8.0, -19.0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npc_hands_out_its_dialogue() {
        let npc = Npc::new("Mind the loose stones down here.", 0);
        let content = npc.dialogue().expect("dialogue");
        assert_eq!(content.portrait_frame, 0);
        assert_eq!(content.text, "Mind the loose stones down here.");
    }
}
