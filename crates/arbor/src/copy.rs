//! Copy and clone.
//!
//! Copying reshapes the destination's children after the source's
//! `(type, unique name)` list, reusing matching children, then copies
//! properties and fields and recurses pairwise. Path references are
//! re-linked afterwards and resolved against the destination's root.

use log::warn;

use crate::children::TypeAndName;
use crate::error::{Result, TreeError};
use crate::flags::Flags;
use crate::id::NodeId;
use crate::node::{FieldValue, PtrPath};
use crate::registry::CopyPolicy;
use crate::tree::Tree;

impl Tree {
    /// Make `dst` a copy of `src`.
    ///
    /// Both must have the same type, and neither may be an ancestor of the
    /// other. Properties are copied shallowly: plain values are cloned,
    /// shared cells stay aliased. Fails with [`TreeError::UnresolvedRefs`]
    /// after an otherwise complete copy if some reference paths do not
    /// resolve in the destination tree.
    pub fn copy_from(&mut self, dst: NodeId, src: NodeId) -> Result<()> {
        let same_root = self.root(dst)? == self.root(src)?;
        self.copy_inner(dst, src, same_root)
    }

    fn copy_inner(&mut self, dst: NodeId, src: NodeId, rebase: bool) -> Result<()> {
        if dst == src {
            self.node(dst)?;
            return Ok(());
        }
        let (dst_ty, src_ty) = (self.node(dst)?.type_name(), self.node(src)?.type_name());
        if dst_ty != src_ty {
            warn!("copy_from: cannot copy a {src_ty} into a {dst_ty}");
            return Err(TreeError::TypeMismatch {
                expected: dst_ty.to_string(),
                found: src_ty.to_string(),
            });
        }
        if self.has_ancestor(dst, src)? || self.has_ancestor(src, dst)? {
            return Err(TreeError::Cycle(format!(
                "cannot copy between {} and {}",
                self.unique_path(src)?,
                self.unique_path(dst)?
            )));
        }

        let token = self.update_start(dst);
        self.capture_ref_paths(src)?;
        let copied = self.copy_raw(dst, src);
        if let Err(e) = self.set_flags(dst, Flags::NODE_COPIED) {
            warn!("copy_from: cannot flag {dst} as copied: {e}");
        }
        self.update_end(dst, token);
        copied?;

        if rebase {
            let old = self.unique_path(src)?;
            let new = self.unique_path(dst)?;
            self.rebase_ref_paths(dst, &old, &new)?;
        }
        self.resolve_ref_paths(dst)
    }

    /// Structure, properties and fields; no bracket, no reference fix-up.
    fn copy_raw(&mut self, dst: NodeId, src: NodeId) -> Result<()> {
        let src_node = self.node(src)?;
        let shape: Vec<TypeAndName> = src_node
            .children
            .iter()
            .map(|k| -> Result<TypeAndName> {
                let k = self.node(*k)?;
                Ok(TypeAndName::new(k.type_name(), k.unique_name.clone()))
            })
            .collect::<Result<_>>()?;
        let src_kids = src_node.children.clone();
        let props = src_node.props.clone();
        let fields: Vec<(String, FieldValue)> = src_node
            .fields
            .iter()
            .map(|(name, v)| (name.clone(), v.clone()))
            .collect();
        let policies: Vec<CopyPolicy> = {
            let decls = self.registry().fields(src_node.type_name());
            fields
                .iter()
                .map(|(name, _)| {
                    decls
                        .iter()
                        .find(|d| d.name == *name)
                        .map(|d| d.copy)
                        .unwrap_or(CopyPolicy::Assign)
                })
                .collect()
        };

        self.reconcile_children(dst, &shape, true)?;
        self.node_mut(dst)?.props = props;

        for ((name, value), policy) in fields.into_iter().zip(policies) {
            if policy == CopyPolicy::Skip {
                continue;
            }
            match value {
                FieldValue::Node(src_field) => {
                    if let Some(dst_field) = self.field_node(dst, &name)? {
                        self.copy_raw(dst_field, src_field)?;
                    }
                }
                FieldValue::Ref(p) => {
                    if let Some(FieldValue::Ref(slot)) = self.node_mut(dst)?.fields.get_mut(&name) {
                        *slot = PtrPath::new(p.path);
                    }
                }
                FieldValue::Value(v) => {
                    let v = if policy == CopyPolicy::DeepCopy {
                        v.deep_copy()?
                    } else {
                        v
                    };
                    if let Some(FieldValue::Value(slot)) = self.node_mut(dst)?.fields.get_mut(&name) {
                        *slot = v;
                    }
                }
            }
        }

        let dst_kids = self.node(dst)?.children.clone();
        for (dk, sk) in dst_kids.into_iter().zip(src_kids) {
            let (name, unique) = {
                let s = self.node(sk)?;
                (s.name.clone(), s.unique_name.clone())
            };
            let d = self.node_mut(dk)?;
            d.name = name;
            d.unique_name = unique;
            self.copy_raw(dk, sk)?;
        }
        Ok(())
    }

    /// A new root of `src`'s type and name holding a copy of `src`.
    ///
    /// References into `src`'s subtree are re-linked to the clone. On
    /// [`TreeError::UnresolvedRefs`] the clone is kept and the error names
    /// it; on any other failure it is destroyed.
    pub fn clone_node(&mut self, src: NodeId) -> Result<NodeId> {
        let (ty, name) = {
            let s = self.node(src)?;
            (s.type_name().to_string(), s.name.clone())
        };
        let dst = self.create(&ty, &name)?;
        match self.copy_inner(dst, src, true) {
            Ok(()) => Ok(dst),
            Err(e @ TreeError::UnresolvedRefs { .. }) => Err(e),
            Err(e) => {
                if let Err(teardown) = self.destroy(dst) {
                    warn!("clone_node: cannot tear down failed clone {dst}: {teardown}");
                }
                Err(e)
            }
        }
    }
}
