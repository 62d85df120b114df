//! Node handles.

use std::fmt;

/// Stable handle to a node slot in a [`Tree`](crate::Tree).
///
/// A handle pairs the slot index with the slot generation at allocation time.
/// Freeing a slot bumps its generation, so a handle to a destroyed node never
/// aliases whatever node reuses the slot later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) fn new(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    /// Slot index inside the arena.
    pub fn index(self) -> u32 {
        self.idx
    }

    /// Slot generation this handle was issued for.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.idx, self.generation)
    }
}
