//! Node arena.
//!
//! A [`Tree`] owns every node it creates, roots and orphans included. Slots
//! are recycled through a free list; each reuse bumps the slot generation so
//! stale [`NodeId`]s are rejected with [`TreeError::SelfNotInitialized`].

use log::warn;
use std::sync::Arc;

use crate::config::TreeConfig;
use crate::deletion::DeletionManager;
use crate::error::{Result, TreeError};
use crate::flags::{Flags, StateHandle};
use crate::id::NodeId;
use crate::node::{index_near, FieldValue, Node, PtrPath};
use crate::registry::{FieldKind, Registry, TypeInfo};
use crate::value::PropValue;

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of nodes sharing a registry and a deletion manager.
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    registry: Arc<dyn Registry>,
    deletion: Arc<DeletionManager>,
    config: TreeConfig,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Tree {
    /// New tree using the process-wide deletion manager.
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self::with_config(registry, TreeConfig::default())
    }

    pub fn with_config(registry: Arc<dyn Registry>, config: TreeConfig) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            registry,
            deletion: DeletionManager::global().clone(),
            config,
        }
    }

    /// Bind this tree to a specific deletion manager.
    pub fn with_deletion_manager(mut self, manager: Arc<DeletionManager>) -> Self {
        self.deletion = manager;
        self
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    pub fn deletion_manager(&self) -> &Arc<DeletionManager> {
        &self.deletion
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of live nodes, embedded field nodes included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live nodes without a parent.
    pub fn roots(&self) -> Vec<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let node = slot.node.as_ref()?;
                (node.parent.is_none()).then(|| NodeId::new(idx as u32, slot.generation))
            })
            .collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        match self.slots.get(id.idx as usize) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => Ok(node),
            _ => Err(TreeError::SelfNotInitialized(id)),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        match self.slots.get_mut(id.idx as usize) {
            Some(Slot {
                generation,
                node: Some(node),
            }) if *generation == id.generation => Ok(node),
            _ => Err(TreeError::SelfNotInitialized(id)),
        }
    }

    pub fn state(&self, id: NodeId) -> Result<StateHandle> {
        Ok(self.node(id)?.state())
    }

    pub fn flags(&self, id: NodeId) -> Result<Flags> {
        Ok(self.node(id)?.flags())
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.node = Some(node);
            return NodeId::new(idx, slot.generation);
        }
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(idx, 0)
    }

    /// Remove a node from its slot, invalidating every handle to it.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.idx);
        Some(node)
    }

    // ── Construction ───────────────────────────────────────────────────────

    /// Create an unparented node of type `ty`, with its embedded field nodes.
    ///
    /// The whole type is validated first, so a failure allocates nothing.
    pub fn create(&mut self, ty: &str, name: &str) -> Result<NodeId> {
        let info = self.check_type(ty)?;
        Ok(self.instantiate(info, name, Flags::empty()))
    }

    pub(crate) fn check_type(&self, ty: &str) -> Result<Arc<TypeInfo>> {
        let mut stack = Vec::new();
        self.check_type_inner(ty, &mut stack)
    }

    fn check_type_inner(&self, ty: &str, stack: &mut Vec<String>) -> Result<Arc<TypeInfo>> {
        if !self.registry.is_node_type(ty) {
            return Err(TreeError::CapabilityMissing(format!(
                "{ty} is not a registered node type"
            )));
        }
        if stack.iter().any(|t| t == ty) {
            return Err(TreeError::CapabilityMissing(format!(
                "{ty} embeds itself through node fields"
            )));
        }
        let info = self
            .registry
            .lookup(ty)
            .ok_or_else(|| TreeError::CapabilityMissing(ty.to_string()))?;
        stack.push(ty.to_string());
        for decl in self.registry.fields(ty) {
            if let FieldKind::Node(field_ty) = &decl.kind {
                self.check_type_inner(field_ty, stack).map_err(|e| match e {
                    TreeError::CapabilityMissing(msg) => {
                        TreeError::CapabilityMissing(format!("{ty}.{}: {msg}", decl.name))
                    }
                    other => other,
                })?;
            }
        }
        stack.pop();
        Ok(info)
    }

    fn instantiate(&mut self, info: Arc<TypeInfo>, name: &str, flags: Flags) -> NodeId {
        let decls = self.registry.fields(&info.name);
        let id = self.alloc(Node::new(info, name, flags));
        for decl in decls {
            let value = match decl.kind {
                FieldKind::Node(field_ty) => {
                    // validated by check_type
                    let Some(field_info) = self.registry.lookup(&field_ty) else {
                        warn!("field type {field_ty} vanished from the registry");
                        continue;
                    };
                    let fid = self.instantiate(field_info, &decl.name, Flags::IS_FIELD);
                    if let Ok(field) = self.node_mut(fid) {
                        field.parent = Some(id);
                    }
                    FieldValue::Node(fid)
                }
                FieldKind::Ref => FieldValue::Ref(PtrPath::default()),
                FieldKind::Value(default) => FieldValue::Value(PropValue::Json(default)),
            };
            if let Ok(node) = self.node_mut(id) {
                node.fields.insert(decl.name, value);
            }
        }
        id
    }

    // ── Children ───────────────────────────────────────────────────────────

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    pub fn num_children(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.children.len())
    }

    pub fn child(&self, id: NodeId, idx: usize) -> Result<NodeId> {
        let children = &self.node(id)?.children;
        children.get(idx).copied().ok_or(TreeError::InvalidIndex {
            index: idx,
            len: children.len(),
        })
    }

    /// First child named `name`, searching outward from `start`.
    pub fn child_by_name(&self, id: NodeId, name: &str, start: usize) -> Result<Option<NodeId>> {
        self.child_where(id, start, |n| n.name == name)
    }

    pub fn child_by_unique_name(
        &self,
        id: NodeId,
        name: &str,
        start: usize,
    ) -> Result<Option<NodeId>> {
        self.child_where(id, start, |n| n.unique_name == name)
    }

    fn child_where<F>(&self, id: NodeId, start: usize, pred: F) -> Result<Option<NodeId>>
    where
        F: Fn(&Node) -> bool,
    {
        let children = &self.node(id)?.children;
        if children.is_empty() {
            return Ok(None);
        }
        let start = start.min(children.len() - 1);
        let matches = |kid: &NodeId| self.node(*kid).map(&pred).unwrap_or(false);
        let (before, after) = children.split_at(start);
        Ok(after
            .iter()
            .chain(before.iter().rev())
            .find(|kid| matches(kid))
            .copied())
    }

    /// Position of `id` among its parent's children, or `None` for roots
    /// and embedded fields.
    pub fn index_in_parent(&self, id: NodeId) -> Result<Option<usize>> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Ok(None);
        };
        let found = index_near(&self.node(parent)?.children, id, node.index_hint());
        if let Some(idx) = found {
            node.set_index_hint(idx);
        }
        Ok(found)
    }

    // ── Ancestry ───────────────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn is_root(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.parent.is_none())
    }

    pub fn root(&self, id: NodeId) -> Result<NodeId> {
        let mut cur = id;
        while let Some(parent) = self.node(cur)?.parent {
            cur = parent;
        }
        Ok(cur)
    }

    /// Levels above `id` at which `ancestor` sits (0 for the parent).
    pub fn ancestor_level(&self, id: NodeId, ancestor: NodeId) -> Result<Option<usize>> {
        let mut level = 0;
        let mut cur = self.node(id)?.parent;
        while let Some(p) = cur {
            if p == ancestor {
                return Ok(Some(level));
            }
            level += 1;
            cur = self.node(p)?.parent;
        }
        Ok(None)
    }

    pub fn has_ancestor(&self, id: NodeId, ancestor: NodeId) -> Result<bool> {
        Ok(self.ancestor_level(id, ancestor)?.is_some())
    }

    pub fn parent_by_name(&self, id: NodeId, name: &str) -> Result<Option<NodeId>> {
        let mut cur = self.node(id)?.parent;
        while let Some(p) = cur {
            let node = self.node(p)?;
            if node.name == name {
                return Ok(Some(p));
            }
            cur = node.parent;
        }
        Ok(None)
    }

    /// Nearest ancestor of type `ty`, or embedding `ty` when `embeds`.
    pub fn parent_by_type(&self, id: NodeId, ty: &str, embeds: bool) -> Result<Option<NodeId>> {
        let mut cur = self.node(id)?.parent;
        while let Some(p) = cur {
            let node = self.node(p)?;
            let hit = if embeds {
                self.registry.embeds(node.type_name(), ty)
            } else {
                node.type_name() == ty
            };
            if hit {
                return Ok(Some(p));
            }
            cur = node.parent;
        }
        Ok(None)
    }

    /// The first non-field ancestor above the nearest field boundary.
    ///
    /// For a node living inside an embedded field this is the tree node that
    /// owns the field; `None` when no field boundary lies above `id`.
    pub fn field_root(&self, id: NodeId) -> Result<Option<NodeId>> {
        let mut got_field = false;
        let mut cur = self.node(id)?.parent;
        while let Some(p) = cur {
            let node = self.node(p)?;
            if !got_field {
                got_field = node.is_field();
            } else if !node.is_field() {
                return Ok(Some(p));
            }
            cur = node.parent;
        }
        Ok(None)
    }

    pub(crate) fn set_flags(&self, id: NodeId, flags: Flags) -> Result<()> {
        self.node(id)?.state.set(flags);
        Ok(())
    }

    pub(crate) fn clear_flags(&self, id: NodeId, flags: Flags) -> Result<()> {
        self.node(id)?.state.clear(flags);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDecl, TypeRegistry};
    use serde_json::json;

    fn tree() -> Tree {
        let reg = TypeRegistry::new();
        reg.register(TypeInfo::node("Leaf"));
        reg.register(
            TypeInfo::node("Widget")
                .field(FieldDecl::node("style", "Leaf"))
                .field(FieldDecl::reference("buddy"))
                .field(FieldDecl::value("size", json!(3))),
        );
        reg.register(TypeInfo::node("Loop").field(FieldDecl::node("me", "Loop")));
        reg.register(TypeInfo::node("Broken").field(FieldDecl::node("bad", "Missing")));
        Tree::new(Arc::new(reg))
    }

    #[test]
    fn test_create_with_fields() {
        let mut t = tree();
        let w = t.create("Widget", "w").unwrap();
        let node = t.node(w).unwrap();
        assert_eq!(node.type_name(), "Widget");
        let style = node.field("style").and_then(FieldValue::as_node).unwrap();
        assert_eq!(node.field("size").and_then(FieldValue::as_value).unwrap().get(), json!(3));
        assert!(node.field("buddy").and_then(FieldValue::as_ref_path).unwrap().is_empty());
        let sn = t.node(style).unwrap();
        assert!(sn.is_field());
        assert_eq!(sn.parent(), Some(w));
        assert_eq!(sn.name(), "style");
        assert_eq!(t.len(), 2);
        assert_eq!(t.roots(), vec![w]);
    }

    #[test]
    fn test_create_rejects_bad_types() {
        let mut t = tree();
        assert!(matches!(t.create("Missing", "x"), Err(TreeError::CapabilityMissing(_))));
        assert!(matches!(t.create("Loop", "x"), Err(TreeError::CapabilityMissing(_))));
        assert!(matches!(t.create("Broken", "x"), Err(TreeError::CapabilityMissing(_))));
        assert!(t.is_empty());
    }

    #[test]
    fn test_stale_handle_after_release() {
        let mut t = tree();
        let a = t.create("Leaf", "a").unwrap();
        assert!(t.release(a).is_some());
        let b = t.create("Leaf", "b").unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(matches!(t.node(a), Err(TreeError::SelfNotInitialized(_))));
        assert_eq!(t.node(b).unwrap().name(), "b");
    }
}
