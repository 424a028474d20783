use std::collections::HashMap;

use tracing::warn;

use super::collision::CollisionField;
use super::input::InputSnapshot;
use super::math::Vector2;
use super::rendering::DrawList;
use super::signals::{SignalBus, SignalName, SignalPayload};
use super::store::KeyValueStore;

/// Handle into the scene tree. Ids are allocated monotonically and never
/// reused, so a stale handle simply stops resolving after its node dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Coarse depth tag. `YSort` siblings order by ascending y (higher y draws
/// later, in front); `Floor` always draws beneath all siblings; `Hud` is
/// excluded from the world pass and drawn by the application afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawLayer {
    #[default]
    YSort,
    Floor,
    Hud,
}

#[derive(Debug, Clone, Copy)]
pub struct NodeSpec {
    pub position: Vector2,
    pub is_solid: bool,
    pub draw_layer: DrawLayer,
}

impl NodeSpec {
    pub fn at(position: Vector2) -> Self {
        Self {
            position,
            is_solid: false,
            draw_layer: DrawLayer::YSort,
        }
    }

    pub fn solid(mut self) -> Self {
        self.is_solid = true;
        self
    }

    pub fn layer(mut self, layer: DrawLayer) -> Self {
        self.draw_layer = layer;
        self
    }
}

/// Examine/talk content exposed by entities that respond to the hero's
/// action request.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueContent {
    pub portrait_frame: u16,
    pub text: String,
}

/// Capability of entities that can be damaged and harvested. Queried through
/// `Behavior::harvestable` instead of matching on concrete entity types.
pub trait Harvestable {
    fn kind(&self) -> &'static str;
    fn hit_points(&self) -> i32;
    /// Applies damage and returns the remaining hit points.
    fn apply_damage(&mut self, amount: i32) -> i32;
}

/// Per-entity logic attached to a node. All hooks default to no-ops so plain
/// container nodes stay trivial.
pub trait Behavior {
    fn ready(&mut self, _id: NodeId, _ctx: &mut SceneCtx<'_>) {}

    fn step(&mut self, _delta_ms: f32, _id: NodeId, _ctx: &mut SceneCtx<'_>) {}

    fn on_signal(
        &mut self,
        _name: SignalName,
        _payload: &SignalPayload,
        _id: NodeId,
        _ctx: &mut SceneCtx<'_>,
    ) {
    }

    fn draw(&self, _id: NodeId, _tree: &SceneTree, _origin: Vector2, _out: &mut DrawList) {}

    fn harvestable(&mut self) -> Option<&mut dyn Harvestable> {
        None
    }

    fn dialogue(&self) -> Option<DialogueContent> {
        None
    }

    /// Static collision data owned by this node (levels). Absence means
    /// movement is denied, never that everything is free.
    fn collision(&self) -> Option<&CollisionField> {
        None
    }
}

/// Behavior-less node used for grouping children (pickup shells, wrappers).
pub struct Group;

impl Behavior for Group {}

struct NodeSlot {
    position: Vector2,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    is_solid: bool,
    draw_layer: DrawLayer,
    ready_called: bool,
    /// `None` while the behavior is checked out for a lifecycle or signal
    /// call on this node.
    behavior: Option<Box<dyn Behavior>>,
}

/// Arena-backed entity tree. The parent exclusively owns its children via
/// the ordered id list; a child holds only a non-owning back-reference used
/// for detachment and sibling queries.
pub struct SceneTree {
    nodes: HashMap<NodeId, NodeSlot>,
    root: NodeId,
    next_id: u64,
    /// Emissions whose owner was checked out when they arrived; delivered
    /// right after that owner's current hook returns.
    pending_deliveries: Vec<(NodeId, SignalName, SignalPayload)>,
}

impl SceneTree {
    pub fn new(root_behavior: Box<dyn Behavior>) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            NodeSlot {
                position: Vector2::ZERO,
                parent: None,
                children: Vec::new(),
                is_solid: false,
                draw_layer: DrawLayer::YSort,
                ready_called: false,
                behavior: Some(root_behavior),
            },
        );
        Self {
            nodes,
            root,
            next_id: 0,
            pending_deliveries: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts a new node as the last child of `parent`. Returns `None` when
    /// the parent is gone, which callers treat as "the subtree died under
    /// us" rather than an error.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        spec: NodeSpec,
        behavior: Box<dyn Behavior>,
    ) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(
            id,
            NodeSlot {
                position: spec.position,
                parent: Some(parent),
                children: Vec::new(),
                is_solid: spec.is_solid,
                draw_layer: spec.draw_layer,
                ready_called: false,
                behavior: Some(behavior),
            },
        );
        if let Some(parent_slot) = self.nodes.get_mut(&parent) {
            parent_slot.children.push(id);
        }
        Some(id)
    }

    /// Detaches and destroys `child` if it is currently a child of `parent`;
    /// otherwise a no-op.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId, bus: &mut SignalBus) {
        let is_child = self
            .nodes
            .get(&child)
            .is_some_and(|slot| slot.parent == Some(parent));
        if is_child {
            self.destroy(child, bus);
        }
    }

    /// Recursively destroys the subtree rooted at `id`: children first, then
    /// the node itself, purging every SignalBus subscription it owned and
    /// detaching it from its parent. Idempotent; destroying an absent node
    /// is a no-op and never corrupts sibling lists.
    pub fn destroy(&mut self, id: NodeId, bus: &mut SignalBus) {
        if id == self.root {
            warn!("refusing to destroy the scene root");
            return;
        }
        let Some(slot) = self.nodes.get(&id) else {
            return;
        };
        let children = slot.children.clone();
        let parent = slot.parent;

        for child in children {
            self.destroy(child, bus);
        }
        bus.unsubscribe_all(id);
        self.pending_deliveries.retain(|(owner, _, _)| *owner != id);
        if let Some(parent) = parent {
            if let Some(parent_slot) = self.nodes.get_mut(&parent) {
                parent_slot.children.retain(|existing| *existing != id);
            }
        }
        self.nodes.remove(&id);
    }

    pub fn position(&self, id: NodeId) -> Option<Vector2> {
        self.nodes.get(&id).map(|slot| slot.position)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vector2) {
        if let Some(slot) = self.nodes.get_mut(&id) {
            slot.position = position;
        }
    }

    pub fn is_solid(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|slot| slot.is_solid)
    }

    pub fn draw_layer(&self, id: NodeId) -> DrawLayer {
        self.nodes
            .get(&id)
            .map(|slot| slot.draw_layer)
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|slot| slot.parent)
    }

    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    pub fn behavior_mut(&mut self, id: NodeId) -> Option<&mut (dyn Behavior + 'static)> {
        self.nodes
            .get_mut(&id)
            .and_then(|slot| slot.behavior.as_deref_mut())
    }

    fn behavior_ref(&self, id: NodeId) -> Option<&dyn Behavior> {
        self.nodes
            .get(&id)
            .and_then(|slot| slot.behavior.as_deref())
    }

    /// Whether any sibling of `id` is solid and occupies exactly `position`.
    /// Re-derived from live state on every query.
    pub fn solid_sibling_at(&self, id: NodeId, position: Vector2) -> bool {
        let Some(parent) = self.parent_of(id) else {
            return false;
        };
        self.nodes
            .get(&parent)
            .map(|parent_slot| {
                parent_slot.children.iter().any(|&sibling| {
                    sibling != id
                        && self.nodes.get(&sibling).is_some_and(|slot| {
                            slot.is_solid && slot.position.matches(position)
                        })
                })
            })
            .unwrap_or(false)
    }

    /// First child of `parent` sitting exactly at `position`, excluding
    /// `exclude` (typically the querying entity itself).
    pub fn child_at_position(
        &self,
        parent: NodeId,
        position: Vector2,
        exclude: Option<NodeId>,
    ) -> Option<NodeId> {
        let parent_slot = self.nodes.get(&parent)?;
        parent_slot
            .children
            .iter()
            .copied()
            .find(|&child| {
                Some(child) != exclude
                    && self
                        .nodes
                        .get(&child)
                        .is_some_and(|slot| slot.position.matches(position))
            })
    }

    fn is_checked_out(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|slot| slot.behavior.is_none())
    }

    fn take_behavior(&mut self, id: NodeId) -> Option<Box<dyn Behavior>> {
        self.nodes.get_mut(&id).and_then(|slot| slot.behavior.take())
    }

    fn put_behavior(&mut self, id: NodeId, behavior: Box<dyn Behavior>) {
        match self.nodes.get_mut(&id) {
            Some(slot) if slot.behavior.is_none() => slot.behavior = Some(behavior),
            // Node was destroyed while its behavior was checked out.
            _ => {}
        }
    }

    fn ready_called(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|slot| slot.ready_called)
    }

    fn mark_ready_called(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(&id) {
            slot.ready_called = true;
        }
    }
}

/// Mutable world access handed to behavior hooks: the tree, the signal bus,
/// this tick's input snapshot, and the persistent store.
pub struct SceneCtx<'a> {
    pub tree: &'a mut SceneTree,
    pub bus: &'a mut SignalBus,
    pub input: &'a InputSnapshot,
    pub store: &'a mut KeyValueStore,
}

impl SceneCtx<'_> {
    /// Synchronously delivers `name` to every subscriber in subscription
    /// order. A callback that emits again recurses on this same stack; no
    /// subscribers is a no-op.
    pub fn emit(&mut self, name: SignalName, payload: &SignalPayload) {
        dispatch_signal(self.tree, self.bus, self.input, self.store, name, payload);
    }

    pub fn destroy(&mut self, id: NodeId) {
        self.tree.destroy(id, self.bus);
    }
}

/// One fixed tick over the whole tree: depth-first, children before self,
/// `ready` exactly once on the first tick after insertion and before that
/// tick's `step`.
pub fn advance_scene(
    tree: &mut SceneTree,
    bus: &mut SignalBus,
    input: &InputSnapshot,
    store: &mut KeyValueStore,
    delta_ms: f32,
) {
    let root = tree.root();
    step_node(tree, bus, input, store, root, delta_ms);
}

fn step_node(
    tree: &mut SceneTree,
    bus: &mut SignalBus,
    input: &InputSnapshot,
    store: &mut KeyValueStore,
    id: NodeId,
    delta_ms: f32,
) {
    // Children captured up front: nodes added during this tick first step on
    // the next one, nodes destroyed mid-tick are skipped.
    let children = tree.children_of(id);
    for child in children {
        if tree.contains(child) {
            step_node(tree, bus, input, store, child, delta_ms);
        }
    }

    let Some(mut behavior) = tree.take_behavior(id) else {
        return;
    };
    let first_tick = !tree.ready_called(id);
    if first_tick {
        tree.mark_ready_called(id);
    }
    {
        let mut ctx = SceneCtx {
            tree: &mut *tree,
            bus: &mut *bus,
            input,
            store: &mut *store,
        };
        if first_tick {
            behavior.ready(id, &mut ctx);
        }
        behavior.step(delta_ms, id, &mut ctx);
    }
    tree.put_behavior(id, behavior);
    flush_pending_for(tree, bus, input, store, id);
}

/// Synchronous signal delivery from outside any behavior hook (startup
/// wiring, tests). Inside a hook, use `SceneCtx::emit`.
pub fn emit_signal(
    tree: &mut SceneTree,
    bus: &mut SignalBus,
    input: &InputSnapshot,
    store: &mut KeyValueStore,
    name: SignalName,
    payload: &SignalPayload,
) {
    dispatch_signal(tree, bus, input, store, name, payload);
}

fn dispatch_signal(
    tree: &mut SceneTree,
    bus: &mut SignalBus,
    input: &InputSnapshot,
    store: &mut KeyValueStore,
    name: SignalName,
    payload: &SignalPayload,
) {
    let targets = bus.subscribers_of(name);
    for (subscription_id, owner) in targets {
        if !bus.is_live(subscription_id) {
            continue;
        }
        // An owner whose behavior is checked out (it sits somewhere on the
        // current step/dispatch stack) gets the delivery deferred until its
        // running hook returns, still within the same tick. An owner without
        // a slot was destroyed mid-emission and is skipped.
        let Some(mut behavior) = tree.take_behavior(owner) else {
            if tree.is_checked_out(owner) {
                tree.pending_deliveries.push((owner, name, *payload));
            }
            continue;
        };
        {
            let mut ctx = SceneCtx {
                tree: &mut *tree,
                bus: &mut *bus,
                input,
                store: &mut *store,
            };
            behavior.on_signal(name, payload, owner, &mut ctx);
        }
        tree.put_behavior(owner, behavior);
        flush_pending_for(tree, bus, input, store, owner);
    }
}

/// Delivers emissions that arrived for `id` while its behavior was checked
/// out. Runs right after the checkout returns; deliveries that queue further
/// self-targeted emissions drain in the same pass.
fn flush_pending_for(
    tree: &mut SceneTree,
    bus: &mut SignalBus,
    input: &InputSnapshot,
    store: &mut KeyValueStore,
    id: NodeId,
) {
    loop {
        let Some(index) = tree
            .pending_deliveries
            .iter()
            .position(|(owner, _, _)| *owner == id)
        else {
            return;
        };
        let (_, name, payload) = tree.pending_deliveries.remove(index);
        if !tree.contains(id) {
            continue;
        }
        let Some(mut behavior) = tree.take_behavior(id) else {
            return;
        };
        {
            let mut ctx = SceneCtx {
                tree: &mut *tree,
                bus: &mut *bus,
                input,
                store: &mut *store,
            };
            behavior.on_signal(name, &payload, id, &mut ctx);
        }
        tree.put_behavior(id, behavior);
    }
}

/// Draws `id` and its subtree with offsets accumulated from the given base.
pub fn draw_subtree(tree: &SceneTree, id: NodeId, offset: Vector2, out: &mut DrawList) {
    let Some(position) = tree.position(id) else {
        return;
    };
    let origin = Vector2::new(offset.x + position.x, offset.y + position.y);
    if let Some(behavior) = tree.behavior_ref(id) {
        behavior.draw(id, tree, origin, out);
    }
    for child in draw_children_ordered(tree, id) {
        draw_subtree(tree, child, origin, out);
    }
}

/// Stable depth ordering of `id`'s children: every `Floor` child draws
/// before (beneath) every non-`Floor` child; the rest draw in ascending y so
/// entities lower on screen occlude those above.
pub fn draw_children_ordered(tree: &SceneTree, id: NodeId) -> Vec<NodeId> {
    let mut children = tree.children_of(id);
    children.sort_by(|&a, &b| {
        let rank = |node: NodeId| match tree.draw_layer(node) {
            DrawLayer::Floor => 0u8,
            DrawLayer::YSort | DrawLayer::Hud => 1u8,
        };
        rank(a).cmp(&rank(b)).then_with(|| {
            let ay = tree.position(a).map(|p| p.y).unwrap_or(0.0);
            let by = tree.position(b).map(|p| p.y).unwrap_or(0.0);
            ay.partial_cmp(&by).unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    children
}
