use engine::{
    AnimationSet, Behavior, DrawCommand, DrawList, NodeId, SceneCtx, SceneTree, SrcRect, Vector2,
};

/// Source rectangle of frame `frame` inside a sheet laid out as a grid of
/// `h_frames` columns.
pub(crate) fn frame_src(frame: u16, frame_width: u32, frame_height: u32, h_frames: u32) -> SrcRect {
    let columns = h_frames.max(1);
    let column = frame as u32 % columns;
    let row = frame as u32 / columns;
    SrcRect {
        x: column * frame_width,
        y: row * frame_height,
        width: frame_width,
        height: frame_height,
    }
}

pub(crate) fn push_frame(
    out: &mut DrawList,
    sheet: &'static str,
    frame: u16,
    frame_width: u32,
    frame_height: u32,
    h_frames: u32,
    dest: Vector2,
) {
    out.push(DrawCommand {
        sheet,
        src: frame_src(frame, frame_width, frame_height, h_frames),
        dest,
    });
}

/// A standalone drawable node: one frame of a sheet, optionally advanced by
/// its own animation set. Entities with richer logic (hero, resources) draw
/// their sprites directly instead of nesting one of these.
pub(crate) struct SpriteNode {
    sheet: &'static str,
    frame_width: u32,
    frame_height: u32,
    h_frames: u32,
    frame: u16,
    animations: Option<AnimationSet>,
}

impl SpriteNode {
    pub(crate) fn new(sheet: &'static str, frame_width: u32, frame_height: u32) -> Self {
        Self {
            sheet,
            frame_width,
            frame_height,
            h_frames: 1,
            frame: 0,
            animations: None,
        }
    }

    pub(crate) fn with_sheet_columns(mut self, h_frames: u32) -> Self {
        self.h_frames = h_frames.max(1);
        self
    }

    pub(crate) fn with_frame(mut self, frame: u16) -> Self {
        self.frame = frame;
        self
    }

    pub(crate) fn with_animations(mut self, animations: AnimationSet) -> Self {
        self.frame = animations.frame();
        self.animations = Some(animations);
        self
    }
}

impl Behavior for SpriteNode {
    fn step(&mut self, delta_ms: f32, _id: NodeId, _ctx: &mut SceneCtx<'_>) {
        if let Some(animations) = &mut self.animations {
            animations.step(delta_ms);
            self.frame = animations.frame();
        }
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        push_frame(
            out,
            self.sheet,
            self.frame,
            self.frame_width,
            self.frame_height,
            self.h_frames,
            origin,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_src_walks_columns_then_rows() {
        assert_eq!(
            frame_src(0, 32, 32, 3),
            SrcRect {
                x: 0,
                y: 0,
                width: 32,
                height: 32
            }
        );
        assert_eq!(
            frame_src(2, 32, 32, 3),
            SrcRect {
                x: 64,
                y: 0,
                width: 32,
                height: 32
            }
        );
        assert_eq!(
            frame_src(4, 32, 32, 3),
            SrcRect {
                x: 32,
                y: 32,
                width: 32,
                height: 32
            }
        );
    }

    #[test]
    fn single_column_sheet_stacks_frames_vertically() {
        assert_eq!(
            frame_src(3, 16, 16, 1),
            SrcRect {
                x: 0,
                y: 48,
                width: 16,
                height: 16
            }
        );
    }
}
