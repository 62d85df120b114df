//! Per-node state flags.
//!
//! Flags live in an [`AtomicU32`] shared through an `Arc`, so any thread can
//! read them race-free while the owning tree mutates unrelated bits. A
//! [`StateHandle`] keeps observing the state after the node is destroyed.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

bitflags::bitflags! {
    /// Independent state bits carried by every node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        /// Inside an open update bracket.
        const UPDATING = 1 << 0;
        /// Embedded field node rather than a tree child.
        const IS_FIELD = 1 << 1;
        /// Brackets opened here do not propagate into the subtree.
        const ONLY_SELF_UPDATE = 1 << 2;
        const CHILD_ADDED = 1 << 3;
        const CHILD_MOVED = 1 << 4;
        const CHILD_DELETED = 1 << 5;
        const CHILDREN_DELETED = 1 << 6;
        /// Detached from its parent. Cleared only by re-attachment.
        const NODE_DELETED = 1 << 7;
        /// Torn down. Never cleared.
        const NODE_DESTROYED = 1 << 8;
        const PROP_UPDATED = 1 << 9;
        const FIELD_UPDATED = 1 << 10;
        const NODE_COPIED = 1 << 11;

        /// Change bits reset when a bracket opens and after it notifies.
        const TRANSIENT = Self::CHILD_ADDED.bits()
            | Self::CHILD_MOVED.bits()
            | Self::CHILD_DELETED.bits()
            | Self::CHILDREN_DELETED.bits()
            | Self::PROP_UPDATED.bits()
            | Self::FIELD_UPDATED.bits()
            | Self::NODE_COPIED.bits();

        /// Bits that trigger a deletion-manager drain at bracket close.
        const ANY_CHILD_DELETED = Self::CHILD_DELETED.bits() | Self::CHILDREN_DELETED.bits();
    }
}

/// Closed lifecycle view over [`Flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Live,
    Updating,
    Deleted,
    Destroyed,
}

impl Lifecycle {
    pub fn of(flags: Flags) -> Self {
        if flags.contains(Flags::NODE_DESTROYED) {
            Lifecycle::Destroyed
        } else if flags.contains(Flags::NODE_DELETED) {
            Lifecycle::Deleted
        } else if flags.contains(Flags::UPDATING) {
            Lifecycle::Updating
        } else {
            Lifecycle::Live
        }
    }
}

/// Atomic flag cell owned by a node.
#[derive(Debug, Default)]
pub(crate) struct NodeState {
    bits: AtomicU32,
}

impl NodeState {
    pub(crate) fn with(flags: Flags) -> Self {
        Self {
            bits: AtomicU32::new(flags.bits()),
        }
    }

    pub(crate) fn load(&self) -> Flags {
        Flags::from_bits_retain(self.bits.load(Ordering::Acquire))
    }

    pub(crate) fn contains(&self, flags: Flags) -> bool {
        self.load().contains(flags)
    }

    pub(crate) fn intersects(&self, flags: Flags) -> bool {
        self.load().intersects(flags)
    }

    pub(crate) fn set(&self, flags: Flags) {
        self.bits.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub(crate) fn clear(&self, flags: Flags) {
        self.bits.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    pub(crate) fn set_state(&self, on: bool, flags: Flags) {
        if on {
            self.set(flags);
        } else {
            self.clear(flags);
        }
    }
}

/// Thread-safe, cloneable read handle to a node's flags.
#[derive(Debug, Clone)]
pub struct StateHandle(pub(crate) Arc<NodeState>);

impl StateHandle {
    pub fn flags(&self) -> Flags {
        self.0.load()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::of(self.flags())
    }

    pub fn is_updating(&self) -> bool {
        self.0.contains(Flags::UPDATING)
    }

    pub fn is_deleted(&self) -> bool {
        self.0.contains(Flags::NODE_DELETED)
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.contains(Flags::NODE_DESTROYED)
    }

    /// Whether both handles observe the same node.
    pub fn same_node(&self, other: &StateHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
