use super::math::Vector2;
use super::scene::NodeId;

pub type SignalName = &'static str;

/// Structural payloads carried on the bus. Signal meaning lives in the
/// emitting/consuming entities; the bus only transports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalPayload {
    None,
    Position(Vector2),
    Node(NodeId),
    Key(&'static str),
    KeyAt {
        key: &'static str,
        position: Vector2,
    },
    Amount(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Subscription {
    id: u64,
    name: SignalName,
    owner: NodeId,
}

/// Publish/subscribe registry. Created once at startup and passed explicitly
/// to everything that needs it; delivery order is subscription order.
/// Dispatch itself lives in the scene module, which owns the subscribers'
/// behaviors.
#[derive(Debug, Default)]
pub struct SignalBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, name: SignalName, owner: NodeId) -> u64 {
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id: self.next_id,
            name,
            owner,
        });
        self.next_id
    }

    /// Removes exactly one subscription.
    pub fn off(&mut self, id: u64) {
        self.subscriptions.retain(|stored| stored.id != id);
    }

    /// Removes every subscription owned by `owner`. Called on node
    /// destruction so torn-down entities never receive callbacks.
    pub fn unsubscribe_all(&mut self, owner: NodeId) {
        self.subscriptions.retain(|stored| stored.owner != owner);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Snapshot of (id, owner) pairs for `name`, in subscription order.
    pub(crate) fn subscribers_of(&self, name: SignalName) -> Vec<(u64, NodeId)> {
        self.subscriptions
            .iter()
            .filter(|stored| stored.name == name)
            .map(|stored| (stored.id, stored.owner))
            .collect()
    }

    /// Whether a subscription still exists; emission snapshots may outlive
    /// removals performed by earlier callbacks in the same emission.
    pub(crate) fn is_live(&self, id: u64) -> bool {
        self.subscriptions.iter().any(|stored| stored.id == id)
    }
}
