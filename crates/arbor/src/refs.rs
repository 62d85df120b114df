//! Path references between nodes.
//!
//! A reference field stores the target's unique path. The cached target is
//! refreshed by [`Tree::resolve_ref_paths`], which runs after copying and
//! decoding, once the whole tree is in place.

use log::warn;

use crate::error::{Result, TreeError};
use crate::id::NodeId;
use crate::node::{FieldValue, PtrPath};
use crate::tree::Tree;

impl Tree {
    fn ref_slot(&mut self, id: NodeId, field: &str) -> Result<&mut PtrPath> {
        match self.node_mut(id)?.fields.get_mut(field) {
            Some(FieldValue::Ref(p)) => Ok(p),
            _ => Err(TreeError::NoSuchField(format!("{field} is not a reference field"))),
        }
    }

    /// Point reference field `field` at `target`, or clear it with `None`.
    pub fn set_ref(&mut self, id: NodeId, field: &str, target: Option<NodeId>) -> Result<()> {
        let path = match target {
            Some(t) => Some(self.unique_path(t)?),
            None => None,
        };
        let slot = self.ref_slot(id, field)?;
        match path {
            Some(path) => {
                slot.path = path;
                slot.target = target;
            }
            None => slot.reset(),
        }
        Ok(())
    }

    pub fn ref_path(&self, id: NodeId, field: &str) -> Result<&PtrPath> {
        self.node(id)?
            .fields
            .get(field)
            .and_then(FieldValue::as_ref_path)
            .ok_or_else(|| TreeError::NoSuchField(format!("{field} is not a reference field")))
    }

    /// Look the reference up by path from the root of `id`.
    pub fn resolve_ref(&self, id: NodeId, field: &str) -> Result<NodeId> {
        let path = self.ref_path(id, field)?;
        if path.is_empty() {
            return Err(TreeError::PathNotFound(String::new()));
        }
        let root = self.root(id)?;
        self.resolve_path(root, path.path())
    }

    /// Refresh every stored unique path in the subtree from its cached
    /// target, so later renames do not break references.
    pub(crate) fn capture_ref_paths(&mut self, start: NodeId) -> Result<()> {
        for k in self.subtree(start)? {
            let targets: Vec<(String, NodeId)> = self
                .node(k)?
                .fields
                .iter()
                .filter_map(|(name, v)| Some((name.clone(), v.as_ref_path()?.target?)))
                .collect();
            for (name, target) in targets {
                let Ok(path) = self.unique_path(target) else {
                    continue;
                };
                if let Some(FieldValue::Ref(p)) = self.node_mut(k)?.fields.get_mut(&name) {
                    p.path = path;
                }
            }
        }
        Ok(())
    }

    /// Swap an `old` path prefix for `new` in every reference of the subtree.
    pub(crate) fn rebase_ref_paths(&mut self, start: NodeId, old: &str, new: &str) -> Result<()> {
        for k in self.subtree(start)? {
            for value in self.node_mut(k)?.fields.values_mut() {
                if let FieldValue::Ref(p) = value {
                    if p.rebase(old, new) {
                        p.target = None;
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve every non-empty reference in the subtree against its root.
    ///
    /// All references are attempted; failures are logged and reported
    /// together.
    pub fn resolve_ref_paths(&mut self, start: NodeId) -> Result<()> {
        let root = self.root(start)?;
        let mut failed = Vec::new();
        for k in self.subtree(start)? {
            let paths: Vec<(String, String)> = self
                .node(k)?
                .fields
                .iter()
                .filter_map(|(name, v)| {
                    let p = v.as_ref_path()?;
                    (!p.is_empty()).then(|| (name.clone(), p.path.clone()))
                })
                .collect();
            for (name, path) in paths {
                let target = match self.resolve_path(root, &path) {
                    Ok(t) => Some(t),
                    Err(e) => {
                        warn!("cannot resolve reference {name} = {path}: {e}");
                        failed.push(path);
                        None
                    }
                };
                if let Some(FieldValue::Ref(p)) = self.node_mut(k)?.fields.get_mut(&name) {
                    p.target = target;
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(TreeError::UnresolvedRefs {
                node: start,
                paths: failed,
            })
        }
    }
}
