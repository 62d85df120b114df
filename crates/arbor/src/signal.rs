//! Per-node change-notification channel.

use std::collections::BTreeMap;
use std::fmt;

use crate::flags::Flags;
use crate::id::NodeId;

/// Identifier returned by [`Signal::connect`].
pub type ObserverId = u64;

type Observer = Box<dyn FnMut(&SignalEvent) + Send + Sync>;

/// Kind of notification sent by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeSignal {
    /// An update bracket closed on the sender.
    Updated,
    /// The sender is being detached from its parent.
    Deleting,
    /// The sender is being torn down.
    Destroying,
}

/// Payload delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEvent {
    pub sender: NodeId,
    pub kind: NodeSignal,
    /// Flag snapshot at emission time; the change descriptor for `Updated`.
    pub changes: Flags,
    /// Unique path of the sender at emission time.
    pub path: String,
}

/// Ordered set of observers.
#[derive(Default)]
pub struct Signal {
    next_id: ObserverId,
    observers: BTreeMap<ObserverId, Observer>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&SignalEvent) + Send + Sync + 'static,
    {
        self.next_id = self.next_id.saturating_add(1);
        let id = self.next_id;
        self.observers.insert(id, Box::new(observer));
        id
    }

    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn disconnect_all(&mut self) {
        self.observers.clear();
    }

    pub fn emit(&mut self, event: &SignalEvent) {
        for observer in self.observers.values_mut() {
            observer(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("observers", &self.observers.len())
            .finish()
    }
}
