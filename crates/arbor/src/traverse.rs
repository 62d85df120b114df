//! Tree traversal.
//!
//! Visitors receive the node handle and its depth relative to the start
//! node. Embedded field nodes are walked like children, ahead of them.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread;

use crate::error::Result;
use crate::id::NodeId;
use crate::tree::Tree;

impl Tree {
    /// Embedded field nodes followed by tree children.
    pub(crate) fn descendants_of(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.node(id)?;
        let mut out: Vec<NodeId> = node.field_nodes().collect();
        out.extend_from_slice(&node.children);
        Ok(out)
    }

    /// Visit `start`, then its fields, then its children, depth first.
    ///
    /// Returning `false` from the visitor skips the rest of that branch
    /// only; siblings are still visited.
    pub fn walk_down_me_first<F>(&self, start: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(NodeId, usize) -> bool,
    {
        self.node(start)?;
        let mut stack = vec![(start, 0usize)];
        while let Some((id, level)) = stack.pop() {
            if !visit(id, level) {
                continue;
            }
            let Ok(next) = self.descendants_of(id) else {
                continue;
            };
            stack.extend(next.into_iter().rev().map(|k| (k, level + 1)));
        }
        Ok(())
    }

    /// Post-order walk: children and fields first, `start` last.
    ///
    /// `gate` decides per child whether to descend into (and visit) it.
    pub fn walk_down_depth_first<G, F>(&self, start: NodeId, mut gate: G, mut visit: F) -> Result<()>
    where
        G: FnMut(NodeId, usize) -> bool,
        F: FnMut(NodeId, usize),
    {
        self.node(start)?;
        self.depth_first_inner(start, 0, &mut gate, &mut visit);
        Ok(())
    }

    fn depth_first_inner<G, F>(&self, id: NodeId, level: usize, gate: &mut G, visit: &mut F)
    where
        G: FnMut(NodeId, usize) -> bool,
        F: FnMut(NodeId, usize),
    {
        let node = match self.node(id) {
            Ok(n) => n,
            Err(_) => return,
        };
        let kids = node.children.iter().copied().chain(node.field_nodes());
        for kid in kids.collect::<Vec<_>>() {
            if gate(kid, level + 1) {
                self.depth_first_inner(kid, level + 1, gate, visit);
            }
        }
        visit(id, level);
    }

    /// Level-order walk below `start` (which is not visited).
    ///
    /// Each level is finished before the next begins. A node for which the
    /// visitor returns `false` is not expanded; its siblings are.
    pub fn walk_down_breadth_first<F>(&self, start: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(NodeId, usize) -> bool,
    {
        let mut queue = VecDeque::new();
        queue.push_back((start, 0usize));
        self.node(start)?;
        while let Some((id, level)) = queue.pop_front() {
            let Ok(next) = self.descendants_of(id) else {
                continue;
            };
            for kid in next {
                if visit(kid, level + 1) {
                    queue.push_back((kid, level + 1));
                }
            }
        }
        Ok(())
    }

    /// Visit `start` and then each ancestor up to the root.
    ///
    /// Returns `false` if the visitor stopped the walk.
    pub fn walk_up<F>(&self, start: NodeId, mut visit: F) -> Result<bool>
    where
        F: FnMut(NodeId, usize) -> bool,
    {
        let mut cur = Some(start);
        let mut level = 0;
        while let Some(id) = cur {
            let node = self.node(id)?;
            if !visit(id, level) {
                return Ok(false);
            }
            level += 1;
            cur = node.parent;
        }
        Ok(true)
    }

    /// Like [`Tree::walk_up`] but starting at the parent.
    pub fn walk_up_parent<F>(&self, start: NodeId, mut visit: F) -> Result<bool>
    where
        F: FnMut(NodeId, usize) -> bool,
    {
        match self.node(start)?.parent {
            Some(parent) => self.walk_up(parent, |id, level| visit(id, level)),
            None => Ok(true),
        }
    }

    /// All nodes of the subtree in me-first order, field nodes included.
    pub fn subtree(&self, start: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.walk_down_me_first(start, |id, _| {
            out.push(id);
            true
        })?;
        Ok(out)
    }

    /// Run `visit` on every node of the subtree on scoped worker threads.
    ///
    /// Returns once every worker has joined. Results arrive in no particular
    /// order.
    pub fn par_walk<F, R>(&self, start: NodeId, visit: F) -> Result<Vec<(NodeId, R)>>
    where
        F: Fn(&Tree, NodeId) -> R + Sync,
        R: Send,
    {
        let ids = self.subtree(start)?;
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(ids.len())
            .max(1);
        let chunk = ids.len().div_ceil(workers).max(1);
        let visit = &visit;
        let (tx, rx) = mpsc::channel();
        thread::scope(|s| {
            for part in ids.chunks(chunk) {
                let tx = tx.clone();
                s.spawn(move || {
                    for &id in part {
                        if tx.send((id, visit(self, id))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);
        Ok(rx.into_iter().collect())
    }
}
