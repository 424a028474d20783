mod renderer;

pub use renderer::Renderer;

use super::math::Vector2;

/// Logical canvas size in pixels; the window scales this up with aspect
/// preserved.
pub const CANVAS_WIDTH: u32 = 320;
pub const CANVAS_HEIGHT: u32 = 180;

/// Source rectangle inside a sprite sheet, in sheet pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One blit request: `(handle, sourceRect, destRect)` with the destination
/// given by its top-left corner on the logical canvas. The composer is
/// agnostic to the rasterization backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub sheet: &'static str,
    pub src: SrcRect,
    pub dest: Vector2,
}

/// The frame's ordered draw commands, composed by the game and consumed by
/// the renderer. Order is paint order: later commands draw over earlier
/// ones.
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
    clear_color: [u8; 4],
}

impl DrawList {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            clear_color: [0, 0, 0, 255],
        }
    }

    pub fn reset(&mut self) {
        self.commands.clear();
        self.clear_color = [0, 0, 0, 255];
    }

    pub fn set_clear_color(&mut self, color: [u8; 4]) {
        self.clear_color = color;
    }

    pub fn clear_color(&self) -> [u8; 4] {
        self.clear_color
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_list_preserves_paint_order() {
        let mut list = DrawList::new();
        list.push(DrawCommand {
            sheet: "ground",
            src: SrcRect {
                x: 0,
                y: 0,
                width: 16,
                height: 16,
            },
            dest: Vector2::ZERO,
        });
        list.push(DrawCommand {
            sheet: "hero",
            src: SrcRect {
                x: 32,
                y: 0,
                width: 32,
                height: 32,
            },
            dest: Vector2::new(8.0, -19.0),
        });

        let sheets: Vec<&str> = list.commands().iter().map(|command| command.sheet).collect();
        assert_eq!(sheets, vec!["ground", "hero"]);
    }

    #[test]
    fn reset_drops_commands_and_clear_color() {
        let mut list = DrawList::new();
        list.set_clear_color([1, 2, 3, 255]);
        list.push(DrawCommand {
            sheet: "hero",
            src: SrcRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            },
            dest: Vector2::ZERO,
        });

        list.reset();
        assert!(list.commands().is_empty());
        assert_eq!(list.clear_color(), [0, 0, 0, 255]);
    }
}
