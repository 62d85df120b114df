//! Deferred deletion.
//!
//! Deleting with `destroy = true` moves the subtree out of its arena into an
//! owned [`DeletedSubtree`] and queues it on a [`DeletionManager`]. Teardown
//! happens later, in [`DeletionManager::drain_and_destroy`], which every
//! outermost update bracket runs when a child was deleted inside it.
//! Destroying a root has no bracket to wait for and drains at once.
//!
//! Bundles are owned values, so each one is destroyed exactly once no matter
//! how many threads enqueue or drain concurrently.

use log::debug;
use std::mem;
use std::sync::{Arc, Mutex, OnceLock};

use arbor_path::PathStep;

use crate::flags::{Flags, NodeState, StateHandle};
use crate::id::NodeId;
use crate::node::FieldValue;
use crate::signal::{NodeSignal, Signal, SignalEvent};
use crate::tree::Tree;

/// A subtree detached from its arena and awaiting teardown.
#[derive(Debug)]
pub struct DeletedSubtree {
    id: NodeId,
    type_name: String,
    name: String,
    unique_name: String,
    path: String,
    state: Arc<NodeState>,
    signal: Signal,
    fields: Vec<DeletedSubtree>,
    children: Vec<DeletedSubtree>,
}

impl DeletedSubtree {
    /// The handle the node had while it was live.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// Unique path at the moment of deletion.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> StateHandle {
        StateHandle(self.state.clone())
    }

    /// Nodes in the bundle, embedded fields included. Never zero: the
    /// bundle always holds at least its own root.
    pub fn node_count(&self) -> usize {
        1 + self.fields.iter().map(DeletedSubtree::node_count).sum::<usize>()
            + self.children.iter().map(DeletedSubtree::node_count).sum::<usize>()
    }

    fn disconnect_all(&mut self) {
        self.signal.disconnect_all();
        for sub in self.fields.iter_mut().chain(self.children.iter_mut()) {
            sub.disconnect_all();
        }
    }

    /// Tear down this node and its fields; queue the children.
    ///
    /// Returns the number of nodes destroyed here.
    fn destroy(mut self, manager: &DeletionManager) -> usize {
        let event = SignalEvent {
            sender: self.id,
            kind: NodeSignal::Destroying,
            changes: self.state.load(),
            path: mem::take(&mut self.path),
        };
        self.signal.emit(&event);
        self.disconnect_all();
        let mut count = 1;
        for field in mem::take(&mut self.fields) {
            count += field.destroy(manager);
        }
        let children = mem::take(&mut self.children);
        if !children.is_empty() {
            manager.enqueue(children);
        }
        self.state.set(Flags::NODE_DESTROYED);
        count
    }
}

/// Multi-producer queue of subtrees pending destruction.
#[derive(Debug, Default)]
pub struct DeletionManager {
    queue: Mutex<Vec<DeletedSubtree>>,
}

static GLOBAL: OnceLock<Arc<DeletionManager>> = OnceLock::new();

impl DeletionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide manager used by trees that were not given one.
    pub fn global() -> &'static Arc<DeletionManager> {
        GLOBAL.get_or_init(|| Arc::new(DeletionManager::new()))
    }

    pub fn enqueue<I>(&self, items: I)
    where
        I: IntoIterator<Item = DeletedSubtree>,
    {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.extend(items);
    }

    /// Subtrees currently queued.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Destroy everything queued, including children queued by the
    /// teardown itself. Returns the number of nodes destroyed.
    ///
    /// The lock is held only to swap the queue out, so teardown may enqueue
    /// and other threads may drain at the same time.
    pub fn drain_and_destroy(&self) -> usize {
        let mut total = 0;
        loop {
            let batch = {
                let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
                mem::take(&mut *queue)
            };
            if batch.is_empty() {
                break;
            }
            for item in batch {
                total += item.destroy(self);
            }
        }
        if total > 0 {
            debug!("deletion manager destroyed {total} nodes");
        }
        total
    }
}

impl Tree {
    /// Move the subtree at `id` out of the arena.
    ///
    /// `path` is the unique path the node had before it was detached.
    pub(crate) fn extract(&mut self, id: NodeId, path: String) -> Option<DeletedSubtree> {
        let node = self.release(id)?;
        node.state.set(Flags::NODE_DELETED);
        let mut fields = Vec::new();
        for (name, value) in &node.fields {
            if let FieldValue::Node(fid) = value {
                let fpath = arbor_path::join(&path, &PathStep::Field(name.clone()));
                fields.extend(self.extract(*fid, fpath));
            }
        }
        let mut children = Vec::with_capacity(node.children.len());
        for kid in &node.children {
            let kpath = match self.node(*kid) {
                Ok(k) => arbor_path::join(&path, &PathStep::Child(k.unique_name.clone())),
                Err(_) => continue,
            };
            children.extend(self.extract(*kid, kpath));
        }
        Some(DeletedSubtree {
            id,
            type_name: node.type_info.name.clone(),
            name: node.name,
            unique_name: node.unique_name,
            path,
            state: node.state,
            signal: node.signal,
            fields,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDecl, TypeInfo, TypeRegistry};
    use std::sync::Mutex as StdMutex;

    fn tree(manager: Arc<DeletionManager>) -> Tree {
        let reg = TypeRegistry::new();
        reg.register(TypeInfo::node("Leaf"));
        reg.register(TypeInfo::node("Box").field(FieldDecl::node("inner", "Leaf")));
        Tree::new(Arc::new(reg)).with_deletion_manager(manager)
    }

    #[test]
    fn test_extract_and_destroy_counts() {
        let manager = Arc::new(DeletionManager::new());
        let mut t = tree(manager.clone());
        let b = t.create("Box", "b").unwrap();
        let l = t.create("Leaf", "l").unwrap();
        t.node_mut(b).unwrap().children.push(l);
        t.node_mut(l).unwrap().parent = Some(b);
        let state = t.state(l).unwrap();
        let bundle = t.extract(b, "/b".to_string()).unwrap();
        assert_eq!(bundle.node_count(), 3);
        assert!(t.is_empty());
        assert!(state.is_deleted());
        manager.enqueue([bundle]);
        assert_eq!(manager.pending(), 1);
        assert_eq!(manager.drain_and_destroy(), 3);
        assert!(state.is_destroyed());
        assert_eq!(manager.pending(), 0);
    }

    #[test]
    fn test_destroying_signal_once() {
        let manager = Arc::new(DeletionManager::new());
        let mut t = tree(manager.clone());
        let l = t.create("Leaf", "l").unwrap();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let s = seen.clone();
        t.node_mut(l)
            .unwrap()
            .signal
            .connect(move |ev| s.lock().unwrap().push((ev.kind, ev.path.clone())));
        manager.enqueue(t.extract(l, "/l".to_string()));
        manager.drain_and_destroy();
        manager.drain_and_destroy();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(NodeSignal::Destroying, "/l".to_string())]
        );
    }

    #[test]
    fn test_global_is_singleton() {
        assert!(Arc::ptr_eq(DeletionManager::global(), DeletionManager::global()));
    }
}
