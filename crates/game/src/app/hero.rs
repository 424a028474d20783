use engine::{
    move_towards, AnimationSet, Behavior, Direction, DrawList, FrameTimeline, Group, InputAction,
    NodeId, NodeSpec, SceneCtx, SceneTree, SignalName, SignalPayload, Vector2,
};
use tracing::warn;

use super::generator::ResourceKind;
use super::resources::{collectible_frame, COLLECTIBLE_SHEET, SHADOW_SHEET};
use super::savegame::{self, HeroSave};
use super::signals::{
    HERO_ATTACK_ACTION, HERO_CHANGE_EQUIPMENT, HERO_EXP_CHANGED, HERO_PICKS_UP_ITEM,
    HERO_POSITION, HERO_REQUESTS_ACTION, RESOURCE_DESTROYED, TEXTBOX_END, TEXTBOX_START,
};
use super::sprite::{push_frame, SpriteNode};

const HERO_SHEET: &str = "hero";
const HERO_SHEET_COLUMNS: u32 = 3;
/// Pixels per fixed tick.
const HERO_SPEED: f32 = 1.0;
const PICKUP_LOCK_RESOURCE_MS: f32 = 200.0;
const PICKUP_LOCK_ITEM_MS: f32 = 1000.0;
const MAX_HERO_LEVEL: u32 = 100;

const ATTACK_FX_DURATION_MS: f32 = 480.0;

fn standing_timeline(root_frame: u16) -> FrameTimeline {
    FrameTimeline::new(400.0, &[(0.0, root_frame)]).expect("static timeline is valid")
}

fn walking_timeline(root_frame: u16) -> FrameTimeline {
    FrameTimeline::new(
        400.0,
        &[
            (0.0, root_frame + 1),
            (100.0, root_frame),
            (200.0, root_frame + 1),
            (300.0, root_frame + 2),
        ],
    )
    .expect("static timeline is valid")
}

fn pickup_timeline() -> FrameTimeline {
    FrameTimeline::new(400.0, &[(0.0, 12)]).expect("static timeline is valid")
}

fn hero_animations() -> AnimationSet {
    AnimationSet::new(vec![
        ("stand_down", standing_timeline(1)),
        ("stand_right", standing_timeline(4)),
        ("stand_up", standing_timeline(7)),
        ("stand_left", standing_timeline(10)),
        ("walk_down", walking_timeline(0)),
        ("walk_right", walking_timeline(3)),
        ("walk_up", walking_timeline(6)),
        ("walk_left", walking_timeline(9)),
        ("pick_up_down", pickup_timeline()),
    ])
    .expect("static animation set is valid")
}

fn stand_key(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "stand_up",
        Direction::Down => "stand_down",
        Direction::Left => "stand_left",
        Direction::Right => "stand_right",
    }
}

fn walk_key(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "walk_up",
        Direction::Down => "walk_down",
        Direction::Left => "walk_left",
        Direction::Right => "walk_right",
    }
}

/// Exp needed to leave `level`, or `None` at the cap.
fn next_level_threshold(level: u32) -> Option<i32> {
    (level < MAX_HERO_LEVEL).then(|| ((level + 1) * 10) as i32)
}

/// The player avatar: tile-quantized movement gated by the level's static
/// walls and solid siblings, directional walk/stand animations, interact and
/// attack actions against the faced neighbor tile, pickup celebration lock,
/// and exp progression. Movement commits persist the destination.
pub(crate) struct Hero {
    level_id: String,
    facing: Direction,
    destination: Vector2,
    animations: AnimationSet,
    locked: bool,
    pickup_time_ms: f32,
    pickup_shell: Option<NodeId>,
    exp: i32,
    hero_level: u32,
    last_emitted: Option<Vector2>,
}

impl Hero {
    pub(crate) fn new(level_id: &str, spawn: Vector2, exp: i32, hero_level: u32) -> Self {
        Self {
            level_id: level_id.to_string(),
            facing: Direction::Down,
            destination: spawn,
            animations: hero_animations(),
            locked: false,
            pickup_time_ms: 0.0,
            pickup_shell: None,
            exp,
            hero_level,
            last_emitted: None,
        }
    }

    fn faced_neighbor_target(&self, id: NodeId, ctx: &mut SceneCtx<'_>) -> Option<NodeId> {
        let position = ctx.tree.position(id)?;
        let parent = ctx.tree.parent_of(id)?;
        ctx.tree
            .child_at_position(parent, position.to_neighbor(self.facing), Some(id))
    }

    fn handle_actions(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        if ctx.input.just_pressed(InputAction::Interact) {
            if let Some(target) = self.faced_neighbor_target(id, ctx) {
                ctx.emit(HERO_REQUESTS_ACTION, &SignalPayload::Node(target));
            }
        }

        if ctx.input.just_pressed(InputAction::Attack) {
            self.spawn_attack_fx(id, ctx);
            if let Some(target) = self.faced_neighbor_target(id, ctx) {
                let is_harvestable = ctx
                    .tree
                    .behavior_mut(target)
                    .map(|behavior| behavior.harvestable().is_some())
                    .unwrap_or(false);
                if is_harvestable {
                    ctx.emit(HERO_ATTACK_ACTION, &SignalPayload::Node(target));
                }
            }
        }

        if ctx.input.just_pressed(InputAction::CycleEquipment) {
            ctx.emit(HERO_CHANGE_EQUIPMENT, &SignalPayload::None);
        }
    }

    fn spawn_attack_fx(&self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        let Some(sheet) = savegame::active_equipment_name(ctx.store).map(weapon_sheet) else {
            return;
        };
        let offset = match self.facing {
            Direction::Right => Vector2::new(12.0, -8.0),
            Direction::Left => Vector2::new(-28.0, -8.0),
            Direction::Up => Vector2::new(-8.0, -28.0),
            Direction::Down => Vector2::new(-8.0, 8.0),
        };
        let _ = ctx
            .tree
            .add_child(id, NodeSpec::at(offset), Box::new(AttackFx::new(sheet)));
    }

    fn try_move(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        let Some(direction) = ctx.input.primary_direction() else {
            self.animations.play(stand_key(self.facing), 0.0);
            return;
        };

        // Exactly one axis changes per proposal.
        let next = self.destination.to_neighbor(direction);
        self.animations.play(walk_key(direction), 0.0);
        self.facing = direction;

        let Some(level) = ctx.tree.parent_of(id) else {
            return;
        };
        // Missing collision data reads as "movement denied", never as free.
        let walls_clear = ctx
            .tree
            .behavior_mut(level)
            .and_then(|behavior| behavior.collision())
            .map(|walls| !walls.is_blocked(next));
        if walls_clear != Some(true) {
            return;
        }
        if ctx.tree.solid_sibling_at(id, next) {
            return;
        }

        self.destination = next;
        savegame::save_hero(
            ctx.store,
            &HeroSave {
                level_id: self.level_id.clone(),
                x: next.x,
                y: next.y,
                exp: self.exp,
                level: self.hero_level,
            },
        );
    }

    fn try_emit_position(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        let Some(position) = ctx.tree.position(id) else {
            return;
        };
        if self
            .last_emitted
            .is_some_and(|last| last.matches(position))
        {
            return;
        }
        self.last_emitted = Some(position);
        ctx.emit(HERO_POSITION, &SignalPayload::Position(position));
    }

    fn work_on_pickup(&mut self, delta_ms: f32, ctx: &mut SceneCtx<'_>) {
        self.animations.play("pick_up_down", 0.0);
        self.pickup_time_ms -= delta_ms;
        if self.pickup_time_ms <= 0.0 {
            if let Some(shell) = self.pickup_shell.take() {
                ctx.destroy(shell);
            }
        }
    }

    fn start_pickup(&mut self, id: NodeId, key: &'static str, position: Vector2, ctx: &mut SceneCtx<'_>) {
        // Land exactly on the item tile.
        self.destination = position;
        self.pickup_time_ms = if ResourceKind::from_key(key).is_some() {
            PICKUP_LOCK_RESOURCE_MS
        } else {
            PICKUP_LOCK_ITEM_MS
        };

        let Some(shell) = ctx
            .tree
            .add_child(id, NodeSpec::at(Vector2::ZERO), Box::new(Group))
        else {
            return;
        };
        let _ = ctx.tree.add_child(
            shell,
            NodeSpec::at(Vector2::new(0.0, -19.0)),
            Box::new(
                SpriteNode::new(COLLECTIBLE_SHEET, 16, 16)
                    .with_sheet_columns(20)
                    .with_frame(collectible_frame(key)),
            ),
        );
        self.pickup_shell = Some(shell);
    }

    fn gain_exp(&mut self, id: NodeId, kind: ResourceKind, ctx: &mut SceneCtx<'_>) {
        self.exp += kind.xp_reward();

        if let Some(threshold) = next_level_threshold(self.hero_level) {
            if self.exp >= threshold {
                self.hero_level += 1;
                self.exp = 0;
            }
        }

        let position = ctx.tree.position(id).unwrap_or(self.destination);
        savegame::save_hero(
            ctx.store,
            &HeroSave {
                level_id: self.level_id.clone(),
                x: position.x,
                y: position.y,
                exp: self.exp,
                level: self.hero_level,
            },
        );
        ctx.emit(HERO_EXP_CHANGED, &SignalPayload::Amount(self.exp));
    }
}

impl Behavior for Hero {
    fn ready(&mut self, id: NodeId, ctx: &mut SceneCtx<'_>) {
        ctx.bus.on(HERO_PICKS_UP_ITEM, id);
        ctx.bus.on(RESOURCE_DESTROYED, id);
        ctx.bus.on(TEXTBOX_START, id);
        ctx.bus.on(TEXTBOX_END, id);
    }

    fn step(&mut self, delta_ms: f32, id: NodeId, ctx: &mut SceneCtx<'_>) {
        self.animations.step(delta_ms);

        if self.locked {
            self.animations.play(stand_key(self.facing), 0.0);
            return;
        }

        if self.pickup_time_ms > 0.0 {
            self.work_on_pickup(delta_ms, ctx);
            return;
        }

        self.handle_actions(id, ctx);

        let Some(mut position) = ctx.tree.position(id) else {
            return;
        };
        let distance = move_towards(&mut position, self.destination, HERO_SPEED);
        ctx.tree.set_position(id, position);
        if distance <= 0.0 {
            self.try_move(id, ctx);
        }

        self.try_emit_position(id, ctx);
    }

    fn on_signal(
        &mut self,
        name: SignalName,
        payload: &SignalPayload,
        id: NodeId,
        ctx: &mut SceneCtx<'_>,
    ) {
        match name {
            name if name == HERO_PICKS_UP_ITEM => {
                let SignalPayload::KeyAt { key, position } = payload else {
                    return;
                };
                self.start_pickup(id, *key, *position, ctx);
            }
            name if name == RESOURCE_DESTROYED => {
                let SignalPayload::Key(key) = payload else {
                    return;
                };
                let Some(kind) = ResourceKind::from_key(key) else {
                    warn!(key = %key, "resource_destroyed_with_unknown_kind");
                    return;
                };
                self.gain_exp(id, kind, ctx);
            }
            name if name == TEXTBOX_START => self.locked = true,
            name if name == TEXTBOX_END => self.locked = false,
            _ => {}
        }
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
            HERO_SHEET,
            self.animations.frame(),
            32,
            32,
            HERO_SHEET_COLUMNS,
            origin.offset(-8.0, -19.0),
        );
    }
}

fn weapon_sheet(name: String) -> &'static str {
    match name.as_str() {
        "rod_purple" => "rod_purple",
        "rod_red" => "rod_red",
        _ => "sword",
    }
}

/// Short-lived swing visual spawned per attack press; removes itself after
/// one cycle.
struct AttackFx {
    sheet: &'static str,
    animations: AnimationSet,
    elapsed_ms: f32,
}

impl AttackFx {
    fn new(sheet: &'static str) -> Self {
        let timeline = FrameTimeline::new(
            ATTACK_FX_DURATION_MS,
            &[
                (0.0, 0),
                (120.0, 1),
                (200.0, 2),
                (260.0, 3),
                (380.0, 4),
            ],
        )
        .expect("static timeline is valid");
        Self {
            sheet,
            animations: AnimationSet::new(vec![("slash", timeline)])
                .expect("static animation set is valid"),
            elapsed_ms: 0.0,
        }
    }
}

impl Behavior for AttackFx {
    fn step(&mut self, delta_ms: f32, id: NodeId, ctx: &mut SceneCtx<'_>) {
        self.animations.step(delta_ms);
        self.elapsed_ms += delta_ms;
        if self.elapsed_ms >= ATTACK_FX_DURATION_MS {
            ctx.destroy(id);
        }
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, origin: Vector2, out: &mut DrawList) {
        push_frame(out, self.sheet, self.animations.frame(), 32, 32, 5, origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_step_by_ten_per_level_until_the_cap() {
        assert_eq!(next_level_threshold(0), Some(10));
        assert_eq!(next_level_threshold(4), Some(50));
        assert_eq!(next_level_threshold(99), Some(1000));
        assert_eq!(next_level_threshold(100), None);
    }

    #[test]
    fn animation_keys_cover_every_direction() {
        let mut animations = hero_animations();
        for direction in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ] {
            animations.play(walk_key(direction), 0.0);
            assert_eq!(animations.active_key(), walk_key(direction));
            animations.play(stand_key(direction), 0.0);
            assert_eq!(animations.active_key(), stand_key(direction));
        }
    }

    #[test]
    fn standing_frames_match_the_sheet_rows() {
        let mut animations = hero_animations();
        animations.play("stand_right", 0.0);
        assert_eq!(animations.frame(), 4);
        animations.play("stand_left", 0.0);
        assert_eq!(animations.frame(), 10);
    }
}
