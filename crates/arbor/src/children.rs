//! Child-list management.
//!
//! Adding, inserting, moving and deleting children, sibling unique names,
//! and reconciliation of a child list against a target `(type, name)`
//! shape. Each public operation validates its inputs before touching the
//! tree and runs inside an update bracket on the parent.

use arbor_path::sanitize_name;
use log::{debug, warn};
use std::collections::HashSet;

use crate::error::{Result, TreeError};
use crate::flags::Flags;
use crate::id::NodeId;
use crate::node::index_near;
use crate::signal::NodeSignal;
use crate::tree::Tree;
use crate::value::PropValue;

/// Property naming the default type for new children.
pub const CHILD_TYPE_PROP: &str = "ChildType";

/// One entry of a target child shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeAndName {
    pub type_name: String,
    pub name: String,
}

impl TypeAndName {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

/// Compute sibling unique names.
///
/// Up to `limit` siblings, existing unique names are kept when free; empty
/// ones become `{prefix}_{i:03}` (or `c{i:03}` without a prefix) and
/// collisions get an `_{i:03}` suffix, widened until free. Above `limit`
/// every sibling is renamed `{name}_{i}` with the index zero-padded to at
/// least five digits.
pub(crate) fn uniquify_names(
    names: &[String],
    uniques: &[String],
    prefix: Option<&str>,
    limit: usize,
) -> Vec<String> {
    let size = names.len();
    if size > limit {
        let width = match size {
            s if s > 9_999_999 => 10,
            s if s > 999_999 => 7,
            s if s > 99_999 => 6,
            _ => 5,
        };
        return names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}_{:0width$}", sanitize_name(name), i))
            .collect();
    }
    let mut taken: HashSet<String> = HashSet::with_capacity(size);
    let mut out = Vec::with_capacity(size);
    for (i, unique) in uniques.iter().enumerate() {
        let mut u = if unique.is_empty() {
            match prefix {
                Some(p) if !p.is_empty() => format!("{p}_{i:03}"),
                _ => format!("c{i:03}"),
            }
        } else {
            unique.clone()
        };
        if taken.contains(&u) {
            let mut width = 3;
            loop {
                let candidate = format!("{u}_{i:0width$}");
                if !taken.contains(&candidate) {
                    u = candidate;
                    break;
                }
                width += 1;
            }
        }
        taken.insert(u.clone());
        out.push(u);
    }
    out
}

/// Match existing children to a target shape.
///
/// Returns, per target slot, the index of the existing child to reuse.
/// Positions are matched first, then names within the remainder.
pub(crate) fn plan_reconcile(
    existing: &[TypeAndName],
    target: &[TypeAndName],
) -> Vec<Option<usize>> {
    let mut used = vec![false; existing.len()];
    let mut plan: Vec<Option<usize>> = vec![None; target.len()];
    for (i, want) in target.iter().enumerate() {
        if existing.get(i) == Some(want) {
            plan[i] = Some(i);
            used[i] = true;
        }
    }
    for (i, want) in target.iter().enumerate() {
        if plan[i].is_some() {
            continue;
        }
        let found = existing
            .iter()
            .enumerate()
            .find(|(j, have)| !used[*j] && *have == want)
            .map(|(j, _)| j);
        if let Some(j) = found {
            used[j] = true;
            plan[i] = Some(j);
        }
    }
    plan
}

impl Tree {
    // ── Naming ─────────────────────────────────────────────────────────────

    /// Set name and unique name, re-uniquifying siblings.
    ///
    /// Returns `false` if the name was already `name`.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let node = self.node_mut(id)?;
        if node.name == name {
            return Ok(false);
        }
        node.name = name.to_string();
        node.unique_name = sanitize_name(name).into_owned();
        if let Some(parent) = node.parent {
            if !node.state.contains(Flags::IS_FIELD) {
                self.uniquify_children(parent)?;
            }
        }
        Ok(true)
    }

    /// Set only the user-facing name.
    pub fn set_name_raw(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.node_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Set the unique name (separators are replaced), without checking
    /// siblings.
    pub fn set_unique_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.node_mut(id)?.unique_name = sanitize_name(name).into_owned();
        Ok(())
    }

    /// Make the unique names of `id`'s children pairwise distinct.
    pub fn uniquify_children(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let prefix = node.parent.map(|_| node.unique_name.clone());
        let mut names = Vec::with_capacity(node.children.len());
        let mut uniques = Vec::with_capacity(node.children.len());
        for kid in &node.children {
            let k = self.node(*kid)?;
            names.push(k.name.clone());
            uniques.push(k.unique_name.clone());
        }
        let kids = node.children.clone();
        let fresh = uniquify_names(
            &names,
            &uniques,
            prefix.as_deref(),
            self.config().uniquify_preserve_limit,
        );
        for (kid, unique) in kids.into_iter().zip(fresh) {
            self.node_mut(kid)?.unique_name = unique;
        }
        Ok(())
    }

    /// Re-uniquify the children of `id` only if two of them share a unique
    /// name. Returns whether it did.
    pub(crate) fn uniquify_collisions(&mut self, id: NodeId) -> Result<bool> {
        let clash = {
            let node = self.node(id)?;
            let mut seen = HashSet::with_capacity(node.children.len());
            let mut clash = false;
            for kid in &node.children {
                if !seen.insert(self.node(*kid)?.unique_name.as_str()) {
                    clash = true;
                    break;
                }
            }
            clash
        };
        if clash {
            debug!("colliding unique names under {id}, re-uniquifying");
            self.uniquify_children(id)?;
        }
        Ok(clash)
    }

    // ── Adding ─────────────────────────────────────────────────────────────

    pub fn add_child(&mut self, parent: NodeId, kid: NodeId) -> Result<()> {
        let at = self.node(parent)?.children.len();
        let at = match self.node(kid)?.parent {
            Some(p) if p == parent => at - 1,
            _ => at,
        };
        self.insert_child(parent, kid, at)
    }

    /// Insert `kid` at position `at` of `parent`'s children.
    ///
    /// `at` indexes the final sequence, after `kid` left any previous
    /// position. A kid that had a parent is moved rather than added.
    pub fn insert_child(&mut self, parent: NodeId, kid: NodeId, at: usize) -> Result<()> {
        self.check_attach(parent, kid)?;
        let len = self.node(parent)?.children.len();
        let len_after = match self.node(kid)?.parent {
            Some(p) if p == parent => len - 1,
            _ => len,
        };
        if at > len_after {
            return Err(TreeError::InvalidIndex {
                index: at,
                len: len_after,
            });
        }
        let token = self.update_start(parent);
        self.attach(parent, kid, at)?;
        self.set_flags(parent, Flags::CHILD_ADDED)?;
        if self.node(kid)?.unique_name.is_empty() {
            let name = self.node(kid)?.name.clone();
            self.set_unique_name(kid, &name)?;
        }
        self.uniquify_children(parent)?;
        self.update_end(parent, token);
        Ok(())
    }

    /// Reject stale handles, embedded fields and cycles.
    fn check_attach(&self, parent: NodeId, kid: NodeId) -> Result<()> {
        self.node(parent)?;
        let k = self.node(kid)?;
        if k.is_field() {
            return Err(TreeError::EmbeddedField(kid));
        }
        let mut cycle = false;
        self.walk_up(parent, |id, _| {
            cycle = id == kid;
            !cycle
        })?;
        if cycle {
            let msg = format!(
                "cannot add {} under its own descendant {}",
                self.unique_path(kid)?,
                self.unique_path(parent)?
            );
            warn!("{msg}");
            return Err(TreeError::Cycle(msg));
        }
        Ok(())
    }

    /// Link `kid` under `parent` at `at`, detaching it from any old parent.
    fn attach(&mut self, parent: NodeId, kid: NodeId, at: usize) -> Result<()> {
        match self.node(kid)?.parent {
            Some(old) if old == parent => {
                let p = self.node_mut(parent)?;
                p.children.retain(|c| *c != kid);
                self.set_flags(kid, Flags::CHILD_MOVED)?;
            }
            Some(old) => {
                let tok = self.update_start(old);
                if let Ok(o) = self.node_mut(old) {
                    o.children.retain(|c| *c != kid);
                    o.state.set(Flags::CHILD_DELETED);
                }
                self.update_end(old, tok);
                self.set_flags(kid, Flags::CHILD_MOVED)?;
            }
            None => self.set_flags(kid, Flags::CHILD_ADDED)?,
        }
        let p = self.node_mut(parent)?;
        let at = at.min(p.children.len());
        p.children.insert(at, kid);
        let k = self.node_mut(kid)?;
        k.parent = Some(parent);
        k.set_index_hint(at);
        k.state.clear(Flags::NODE_DELETED);
        self.inherit_updating(parent, kid)
    }

    /// New child of type `ty`, or the default child type when `None`.
    pub fn add_new_child(&mut self, parent: NodeId, ty: Option<&str>, name: &str) -> Result<NodeId> {
        let at = self.node(parent)?.children.len();
        self.insert_new_child(parent, ty, at, name)
    }

    pub fn insert_new_child(
        &mut self,
        parent: NodeId,
        ty: Option<&str>,
        at: usize,
        name: &str,
    ) -> Result<NodeId> {
        let ty = self.child_type_for(parent, ty)?;
        self.check_insert_index(parent, at)?;
        let kid = self.create(&ty, name)?;
        self.insert_child(parent, kid, at)?;
        Ok(kid)
    }

    /// New child whose name is used verbatim as its unique name.
    pub fn insert_new_child_unique(
        &mut self,
        parent: NodeId,
        ty: Option<&str>,
        at: usize,
        name: &str,
    ) -> Result<NodeId> {
        let ty = self.child_type_for(parent, ty)?;
        self.check_insert_index(parent, at)?;
        let kid = self.create(&ty, name)?;
        let token = self.update_start(parent);
        self.attach(parent, kid, at)?;
        self.set_flags(parent, Flags::CHILD_ADDED)?;
        self.update_end(parent, token);
        Ok(kid)
    }

    fn check_insert_index(&self, parent: NodeId, at: usize) -> Result<()> {
        let len = self.node(parent)?.children.len();
        if at > len {
            return Err(TreeError::InvalidIndex { index: at, len });
        }
        Ok(())
    }

    /// Resolve the type for a new child of `parent`: explicit, then the
    /// `ChildType` property (local or type default), then the parent's type.
    fn child_type_for(&self, parent: NodeId, ty: Option<&str>) -> Result<String> {
        if let Some(ty) = ty {
            return Ok(ty.to_string());
        }
        let from_prop = self
            .prop_inherit(parent, CHILD_TYPE_PROP, false, true)?
            .and_then(|v| v.get().as_str().map(str::to_string));
        match from_prop {
            Some(ty) => Ok(ty),
            None => Ok(self.node(parent)?.type_name().to_string()),
        }
    }

    /// Set the default type for children created without one.
    pub fn set_child_type(&mut self, id: NodeId, ty: &str) -> Result<()> {
        self.check_type(ty)?;
        self.set_prop(id, CHILD_TYPE_PROP, PropValue::from(ty))
    }

    /// Replace the child at `idx` with `kid`; the old child becomes an
    /// orphan root.
    pub fn set_child(&mut self, parent: NodeId, idx: usize, kid: NodeId, name: Option<&str>) -> Result<()> {
        let old = self.child(parent, idx)?;
        self.check_attach(parent, kid)?;
        let token = self.update_start(parent);
        if old != kid {
            self.delete_child_at(parent, idx, false)?;
            let len = self.node(parent)?.children.len();
            let len_after = match self.node(kid)?.parent {
                Some(p) if p == parent => len - 1,
                _ => len,
            };
            self.attach(parent, kid, idx.min(len_after))?;
            self.set_flags(parent, Flags::CHILD_ADDED)?;
        }
        if let Some(name) = name {
            self.set_name_raw(kid, name)?;
            self.set_unique_name(kid, name)?;
        } else if self.node(kid)?.unique_name.is_empty() {
            let name = self.node(kid)?.name.clone();
            self.set_unique_name(kid, &name)?;
        }
        self.uniquify_children(parent)?;
        self.update_end(parent, token);
        Ok(())
    }

    pub fn move_child(&mut self, parent: NodeId, from: usize, to: usize) -> Result<()> {
        let len = self.node(parent)?.children.len();
        for index in [from, to] {
            if index >= len {
                return Err(TreeError::InvalidIndex { index, len });
            }
        }
        let token = self.update_start(parent);
        let p = self.node_mut(parent)?;
        let kid = p.children.remove(from);
        p.children.insert(to, kid);
        p.state.set(Flags::CHILD_MOVED);
        self.update_end(parent, token);
        Ok(())
    }

    /// Grow or shrink the child list to `n`, naming new children
    /// `{stub}{index}`. Returns whether anything changed.
    pub fn set_n_children(&mut self, id: NodeId, n: usize, ty: Option<&str>, stub: &str) -> Result<bool> {
        let mut size = self.node(id)?.children.len();
        if size == n {
            return Ok(false);
        }
        let ty = self.child_type_for(id, ty)?;
        self.check_type(&ty)?;
        let token = self.update_start(id);
        while size > n {
            size -= 1;
            self.delete_child_at(id, size, true)?;
        }
        while size < n {
            self.insert_new_child_unique(id, Some(&ty), size, &format!("{stub}{size}"))?;
            size += 1;
        }
        self.update_end(id, token);
        Ok(true)
    }

    // ── Deleting ───────────────────────────────────────────────────────────

    /// Detach the child at `idx`.
    ///
    /// The child is marked deleted and gets a `Deleting` notification while
    /// still linked. With `destroy` it is queued for teardown, otherwise it
    /// is left as an orphan root.
    pub fn delete_child_at(&mut self, parent: NodeId, idx: usize, destroy: bool) -> Result<()> {
        let kid = self.child(parent, idx)?;
        let token = self.update_start(parent);
        self.set_flags(parent, Flags::CHILD_DELETED)?;
        let path = self.detach_for_delete(kid)?;
        self.node_mut(parent)?.children.remove(idx);
        if destroy {
            let bundle = self.extract(kid, path);
            self.deletion_manager().enqueue(bundle);
        }
        self.update_end(parent, token);
        Ok(())
    }

    /// Mark, notify and unlink `kid`. Returns its unique path from before
    /// the unlink. The caller removes it from the parent's child list.
    fn detach_for_delete(&mut self, kid: NodeId) -> Result<String> {
        self.set_flags(kid, Flags::NODE_DELETED)?;
        self.emit_deleting(kid);
        let path = self.unique_path(kid)?;
        self.node_mut(kid)?.parent = None;
        self.update_reset(kid);
        Ok(path)
    }

    /// Returns `false` if `kid` is not a child of `parent`.
    pub fn delete_child(&mut self, parent: NodeId, kid: NodeId, destroy: bool) -> Result<bool> {
        let hint = self.node(kid)?.index_hint();
        match index_near(&self.node(parent)?.children, kid, hint) {
            Some(idx) => {
                self.delete_child_at(parent, idx, destroy)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete_child_by_name(&mut self, parent: NodeId, name: &str, destroy: bool) -> Result<Option<NodeId>> {
        let Some(kid) = self.child_by_name(parent, name, 0)? else {
            return Ok(None);
        };
        self.delete_child(parent, kid, destroy)?;
        Ok(Some(kid))
    }

    /// Detach every child, queueing them in one batch when `destroy`.
    pub fn delete_children(&mut self, parent: NodeId, destroy: bool) -> Result<()> {
        let kids = self.node(parent)?.children.clone();
        let token = self.update_start(parent);
        self.set_flags(parent, Flags::CHILDREN_DELETED)?;
        let mut paths = Vec::with_capacity(kids.len());
        for kid in &kids {
            paths.push(self.detach_for_delete(*kid)?);
        }
        self.node_mut(parent)?.children.clear();
        if destroy {
            let mut batch = Vec::with_capacity(kids.len());
            for (kid, path) in kids.into_iter().zip(paths) {
                batch.extend(self.extract(kid, path));
            }
            self.deletion_manager().enqueue(batch);
        }
        self.update_end(parent, token);
        Ok(())
    }

    fn emit_deleting(&mut self, id: NodeId) {
        if let Err(e) = self.emit(id, NodeSignal::Deleting) {
            warn!("delete: no Deleting signal for {id}: {e}");
        }
    }

    /// Delete `id` from its parent, or tear down a root right away.
    pub fn delete(&mut self, id: NodeId, destroy: bool) -> Result<()> {
        let node = self.node(id)?;
        if node.is_field() {
            return Err(TreeError::EmbeddedField(id));
        }
        match node.parent {
            Some(parent) => {
                self.delete_child(parent, id, destroy)?;
            }
            None if destroy => {
                let path = self.unique_path(id)?;
                self.set_flags(id, Flags::NODE_DELETED)?;
                self.emit_deleting(id);
                self.update_reset(id);
                let bundle = self.extract(id, path);
                // no parent bracket will close over a root
                self.deletion_manager().enqueue(bundle);
                self.deletion_manager().drain_and_destroy();
            }
            None => {}
        }
        Ok(())
    }

    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        self.delete(id, true)
    }

    // ── Reconcile ──────────────────────────────────────────────────────────

    /// Make the child list match `config` in type, name and order.
    ///
    /// Children already matching are kept, missing ones are created and
    /// surplus ones destroyed. With `unique_names`, names are compared
    /// against unique names and new children take the name verbatim as
    /// their unique name, unless that collides with a sibling. Returns
    /// whether anything changed.
    pub fn reconcile_children(
        &mut self,
        parent: NodeId,
        config: &[TypeAndName],
        unique_names: bool,
    ) -> Result<bool> {
        let existing: Vec<TypeAndName> = {
            let p = self.node(parent)?;
            let mut out = Vec::with_capacity(p.children.len());
            for kid in &p.children {
                let k = self.node(*kid)?;
                let name = if unique_names { &k.unique_name } else { &k.name };
                out.push(TypeAndName::new(k.type_name(), name.clone()));
            }
            out
        };
        let plan = plan_reconcile(&existing, config);
        let unchanged = existing.len() == config.len()
            && plan.iter().enumerate().all(|(i, p)| *p == Some(i));
        if unchanged {
            return Ok(false);
        }
        for (want, slot) in config.iter().zip(&plan) {
            if slot.is_none() {
                self.check_type(&want.type_name)?;
            }
        }
        debug!(
            "reconciling {} children of {} to {} entries",
            existing.len(),
            self.unique_path(parent)?,
            config.len()
        );

        let token = self.update_start(parent);
        let old_kids = self.node(parent)?.children.clone();
        let mut reused = vec![false; old_kids.len()];
        let mut next = Vec::with_capacity(config.len());
        for (want, slot) in config.iter().zip(&plan) {
            match slot {
                Some(j) => {
                    reused[*j] = true;
                    next.push(old_kids[*j]);
                }
                None => {
                    let kid = self.create(&want.type_name, &want.name)?;
                    self.set_flags(kid, Flags::CHILD_ADDED)?;
                    next.push(kid);
                }
            }
        }
        let mut batch = Vec::new();
        for (kid, keep) in old_kids.iter().zip(&reused) {
            if !*keep {
                self.set_flags(parent, Flags::CHILD_DELETED)?;
                let path = self.detach_for_delete(*kid)?;
                batch.extend(self.extract(*kid, path));
            }
        }
        self.deletion_manager().enqueue(batch);
        for (i, kid) in next.iter().enumerate() {
            let k = self.node_mut(*kid)?;
            k.parent = Some(parent);
            k.set_index_hint(i);
        }
        for kid in &next {
            self.inherit_updating(parent, *kid)?;
        }
        self.node_mut(parent)?.children = next;
        self.set_flags(parent, Flags::CHILD_ADDED)?;
        if unique_names {
            self.uniquify_collisions(parent)?;
        } else {
            self.uniquify_children(parent)?;
        }
        self.update_end(parent, token);
        Ok(true)
    }
}
