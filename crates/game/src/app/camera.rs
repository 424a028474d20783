use engine::{
    Behavior, NodeId, SceneCtx, SignalName, SignalPayload, Vector2, CANVAS_HEIGHT, CANVAS_WIDTH,
};

use super::signals::{HERO_POSITION, LEVEL_CHANGED};

const TARGET_HALF_SIZE: f32 = 8.0;

/// Keeps the world centered on the hero by writing the camera offset into
/// the root node's position; the world draw pass starts from that offset.
pub(crate) struct CameraRig;

impl Behavior for CameraRig {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        ctx.bus.on(HERO_POSITION, id);
        ctx.bus.on(LEVEL_CHANGED, id);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        payload: &SignalPayload,
        _id: NodeId,
        ctx: &mut SceneCtx<'_>,
    ) {
        if name != HERO_POSITION && name != LEVEL_CHANGED {
            return;
        }
        let SignalPayload::Position(target) = payload else {
            return;
        };
        let root = ctx.tree.root();
        ctx.tree.set_position(root, center_on(*target));
    }
}

pub(crate) fn center_on(target: Vector2) -> Vector2 {
    let half_width = CANVAS_WIDTH as f32 / 2.0 - TARGET_HALF_SIZE;
    let half_height = CANVAS_HEIGHT as f32 / 2.0 - TARGET_HALF_SIZE;
    Vector2::new(-target.x + half_width, -target.y + half_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centering_on_the_origin_uses_half_canvas_minus_half_sprite() {
        assert!(center_on(Vector2::ZERO).matches(Vector2::new(152.0, 82.0)));
    }

    #[test]
    fn centering_negates_the_target_position() {
        let offset = center_on(Vector2::new(176.0, 48.0));
        assert!(offset.matches(Vector2::new(-24.0, 34.0)));
    }
}
