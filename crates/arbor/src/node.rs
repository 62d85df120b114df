//! Node records stored in the arena.

use indexmap::IndexMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::flags::{Flags, NodeState, StateHandle};
use crate::id::NodeId;
use crate::registry::TypeInfo;
use crate::signal::Signal;
use crate::value::{PropValue, Props};

/// Serializable weak reference to a node, stored as its unique path.
///
/// The cached target is only trusted after an explicit resolution step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PtrPath {
    pub(crate) path: String,
    pub(crate) target: Option<NodeId>,
}

impl PtrPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Target of the last successful resolution.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn reset(&mut self) {
        self.path.clear();
        self.target = None;
    }

    /// Replace an `old` path prefix with `new`. Returns whether it applied.
    pub fn rebase(&mut self, old: &str, new: &str) -> bool {
        match arbor_path::rebase(&self.path, old, new) {
            Some(path) => {
                self.path = path;
                true
            }
            None => false,
        }
    }
}

/// Value of a declared field on a node.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Embedded field node, owned by the holder.
    Node(NodeId),
    Ref(PtrPath),
    Value(PropValue),
}

impl FieldValue {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            FieldValue::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_ref_path(&self) -> Option<&PtrPath> {
        match self {
            FieldValue::Ref(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&PropValue> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// A tree node.
///
/// Nodes are owned by a [`Tree`](crate::Tree) and addressed by [`NodeId`].
/// Mutation goes through the tree so that parent links, unique names and
/// update brackets stay consistent.
#[derive(Debug)]
pub struct Node {
    pub(crate) type_info: Arc<TypeInfo>,
    pub(crate) name: String,
    pub(crate) unique_name: String,
    pub(crate) props: Props,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) fields: IndexMap<String, FieldValue>,
    pub(crate) state: Arc<NodeState>,
    pub(crate) signal: Signal,
    index_hint: AtomicUsize,
}

impl Node {
    pub(crate) fn new(type_info: Arc<TypeInfo>, name: &str, flags: Flags) -> Self {
        Self {
            type_info,
            name: name.to_string(),
            unique_name: arbor_path::sanitize_name(name).into_owned(),
            props: Props::new(),
            parent: None,
            children: Vec::new(),
            fields: IndexMap::new(),
            state: Arc::new(NodeState::with(flags)),
            signal: Signal::new(),
            index_hint: AtomicUsize::new(0),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_info.name
    }

    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.type_info
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Embedded field nodes in declaration order.
    pub fn field_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.fields.values().filter_map(FieldValue::as_node)
    }

    pub fn flags(&self) -> Flags {
        self.state.load()
    }

    pub fn state(&self) -> StateHandle {
        StateHandle(self.state.clone())
    }

    pub fn is_field(&self) -> bool {
        self.state.contains(Flags::IS_FIELD)
    }

    pub fn is_updating(&self) -> bool {
        self.state.contains(Flags::UPDATING)
    }

    pub fn only_self_update(&self) -> bool {
        self.state.contains(Flags::ONLY_SELF_UPDATE)
    }

    pub fn is_deleted(&self) -> bool {
        self.state.contains(Flags::NODE_DELETED)
    }

    pub fn observer_count(&self) -> usize {
        self.signal.len()
    }

    pub(crate) fn index_hint(&self) -> usize {
        self.index_hint.load(Ordering::Relaxed)
    }

    pub(crate) fn set_index_hint(&self, idx: usize) {
        self.index_hint.store(idx, Ordering::Relaxed);
    }
}

/// Position of `target` in `items`, searching outward from `hint`.
pub(crate) fn index_near(items: &[NodeId], target: NodeId, hint: usize) -> Option<usize> {
    let len = items.len();
    if len == 0 {
        return None;
    }
    let start = hint.min(len - 1);
    if items[start] == target {
        return Some(start);
    }
    let mut lo = start;
    let mut hi = start + 1;
    loop {
        let mut moved = false;
        if lo > 0 {
            lo -= 1;
            moved = true;
            if items[lo] == target {
                return Some(lo);
            }
        }
        if hi < len {
            moved = true;
            if items[hi] == target {
                return Some(hi);
            }
            hi += 1;
        }
        if !moved {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<NodeId> {
        (0..n).map(|i| NodeId::new(i, 0)).collect()
    }

    #[test]
    fn test_index_near_finds_everywhere() {
        let items = ids(7);
        for hint in 0..10 {
            for (i, id) in items.iter().enumerate() {
                assert_eq!(index_near(&items, *id, hint), Some(i));
            }
        }
    }

    #[test]
    fn test_index_near_missing() {
        assert_eq!(index_near(&ids(3), NodeId::new(9, 0), 1), None);
        assert_eq!(index_near(&[], NodeId::new(0, 0), 0), None);
    }

    #[test]
    fn test_ptr_path_rebase() {
        let mut p = PtrPath::new("/r/a/b");
        assert!(p.rebase("/r/a", "/r/c"));
        assert_eq!(p.path(), "/r/c/b");
        assert!(!p.rebase("/x", "/y"));
        p.reset();
        assert!(p.is_empty());
    }

    #[test]
    fn test_new_node_sanitizes_unique_name() {
        let node = Node::new(Arc::new(TypeInfo::node("T")), "a.b", Flags::empty());
        assert_eq!(node.name(), "a.b");
        assert_eq!(node.unique_name(), "a_b");
    }
}
