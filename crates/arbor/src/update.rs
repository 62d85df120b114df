//! Update brackets and notification.
//!
//! Every mutation runs between [`Tree::update_start`] and
//! [`Tree::update_end`]. Opening a bracket marks the whole subtree as
//! updating; a nested open anywhere inside it returns a `false` token and
//! its close is a no-op. Only the outermost close notifies, once, at the
//! node that opened it.
//!
//! ```
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use arbor::{Tree, TypeInfo, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! registry.register(TypeInfo::node("Item"));
//! let mut tree = Tree::new(Arc::new(registry));
//! let root = tree.create("Item", "root").unwrap();
//!
//! let count = Arc::new(AtomicUsize::new(0));
//! let c = count.clone();
//! tree.connect(root, move |_| { c.fetch_add(1, Ordering::SeqCst); }).unwrap();
//!
//! let outer = tree.update_start(root);
//! let inner = tree.update_start(root);
//! assert!(outer && !inner);
//! tree.update_end(root, inner);
//! tree.update_end(root, outer);
//! assert_eq!(count.load(Ordering::SeqCst), 1);
//! ```

use log::warn;

use crate::error::Result;
use crate::flags::Flags;
use crate::id::NodeId;
use crate::signal::{NodeSignal, ObserverId, SignalEvent};
use crate::tree::Tree;

impl Tree {
    /// Open an update bracket at `id`.
    ///
    /// Returns `false` when the node is already updating, is destroyed, or
    /// the handle is stale; pass the token back to [`Tree::update_end`].
    pub fn update_start(&mut self, id: NodeId) -> bool {
        let Ok(node) = self.node(id) else {
            return false;
        };
        if node.state.intersects(Flags::UPDATING | Flags::NODE_DESTROYED) {
            return false;
        }
        if node.only_self_update() {
            node.state.clear(Flags::TRANSIENT);
            node.state.set(Flags::UPDATING);
            return true;
        }
        let marked = self.walk_down_me_first(id, |k, _| match self.node(k) {
            Ok(n) if !n.is_updating() => {
                n.state.clear(Flags::TRANSIENT);
                n.state.set(Flags::UPDATING);
                true
            }
            _ => false,
        });
        if let Err(e) = marked {
            warn!("update_start: walk below {id} failed: {e}");
        }
        true
    }

    /// Close a bracket and emit one `Updated` notification at `id`.
    ///
    /// Deleted nodes close without notifying; destroyed or stale handles
    /// are ignored.
    pub fn update_end(&mut self, id: NodeId, token: bool) {
        self.finish_update(id, token, true);
    }

    /// Close a bracket without notifying.
    pub fn update_end_silent(&mut self, id: NodeId, token: bool) {
        self.finish_update(id, token, false);
    }

    fn finish_update(&mut self, id: NodeId, token: bool, notify: bool) {
        if !token {
            return;
        }
        let Ok(node) = self.node(id) else {
            return;
        };
        if node.state.contains(Flags::NODE_DESTROYED) {
            return;
        }
        // a detached node closes its bracket but stays quiet
        let notify = notify && !node.state.contains(Flags::NODE_DELETED);
        let scope = self.update_scope(id);
        let drain = scope.iter().any(|k| {
            self.node(*k)
                .map(|n| n.state.intersects(Flags::ANY_CHILD_DELETED))
                .unwrap_or(false)
        });
        if drain {
            self.deletion_manager().drain_and_destroy();
        }
        for k in &scope {
            if let Err(e) = self.clear_flags(*k, Flags::UPDATING) {
                warn!("update_end: {k} left the bracket early: {e}");
            }
        }
        if notify {
            if let Err(e) = self.emit(id, NodeSignal::Updated) {
                warn!("update_end: no Updated signal for {id}: {e}");
            }
        }
        if let Err(e) = self.clear_flags(id, Flags::TRANSIENT) {
            warn!("update_end: cannot clear change flags of {id}: {e}");
        }
    }

    fn update_scope(&self, id: NodeId) -> Vec<NodeId> {
        match self.node(id) {
            Ok(n) if n.only_self_update() => vec![id],
            Ok(_) => self.subtree(id).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Clear `Updating` over the bracket scope without notifying.
    ///
    /// Used on a subtree detached in the middle of its parent's bracket.
    pub fn update_reset(&mut self, id: NodeId) {
        for k in self.update_scope(id) {
            if let Err(e) = self.clear_flags(k, Flags::UPDATING) {
                warn!("update_reset: {k}: {e}");
            }
        }
    }

    /// Notify immediately unless a bracket is open. Returns whether it did.
    pub fn update_signal(&mut self, id: NodeId) -> bool {
        match self.node(id) {
            Ok(n) if !n.state.intersects(Flags::UPDATING | Flags::NODE_DESTROYED) => {}
            _ => return false,
        }
        self.emit(id, NodeSignal::Updated).is_ok()
    }

    pub fn set_only_self_update(&mut self, id: NodeId, on: bool) -> Result<()> {
        self.node(id)?.state.set_state(on, Flags::ONLY_SELF_UPDATE);
        Ok(())
    }

    pub(crate) fn emit(&mut self, id: NodeId, kind: NodeSignal) -> Result<()> {
        if self.node(id)?.signal.is_empty() {
            return Ok(());
        }
        let path = self.unique_path(id)?;
        let node = self.node_mut(id)?;
        let event = SignalEvent {
            sender: id,
            kind,
            changes: node.state.load(),
            path,
        };
        node.signal.emit(&event);
        Ok(())
    }

    // ── Observers ──────────────────────────────────────────────────────────

    pub fn connect<F>(&mut self, id: NodeId, observer: F) -> Result<ObserverId>
    where
        F: FnMut(&SignalEvent) + Send + Sync + 'static,
    {
        Ok(self.node_mut(id)?.signal.connect(observer))
    }

    pub fn disconnect(&mut self, id: NodeId, observer: ObserverId) -> Result<bool> {
        Ok(self.node_mut(id)?.signal.disconnect(observer))
    }

    /// Drop every observer in the subtree, field nodes included.
    pub fn disconnect_all(&mut self, id: NodeId) -> Result<()> {
        for k in self.subtree(id)? {
            self.node_mut(k)?.signal.disconnect_all();
        }
        Ok(())
    }

    /// Propagate the parent's `Updating` state into a newly attached subtree.
    pub(crate) fn inherit_updating(&mut self, parent: NodeId, kid: NodeId) -> Result<()> {
        let p = self.node(parent)?;
        if p.only_self_update() {
            return Ok(());
        }
        let updating = p.is_updating();
        for k in self.subtree(kid)? {
            self.node(k)?.state.set_state(updating, Flags::UPDATING);
        }
        Ok(())
    }
}
