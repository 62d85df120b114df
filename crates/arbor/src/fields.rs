//! Declared fields.
//!
//! Node fields are pseudo-children owned by their holder; value fields hold
//! a [`PropValue`] and are set by name. Reference fields live in
//! [`refs`](crate::refs).

use log::warn;

use crate::error::{Result, TreeError};
use crate::flags::Flags;
use crate::id::NodeId;
use crate::node::FieldValue;
use crate::tree::Tree;
use crate::value::PropValue;

impl Tree {
    pub fn field(&self, id: NodeId, name: &str) -> Result<Option<&FieldValue>> {
        Ok(self.node(id)?.fields.get(name))
    }

    /// The embedded node behind field `name`, if it is a node field.
    pub fn field_node(&self, id: NodeId, name: &str) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.fields.get(name).and_then(FieldValue::as_node))
    }

    pub fn field_value(&self, id: NodeId, name: &str) -> Result<Option<&PropValue>> {
        Ok(self.node(id)?.fields.get(name).and_then(FieldValue::as_value))
    }

    /// Assign a value field by name and notify.
    ///
    /// Returns `Ok(false)` with a warning when the node has no such value
    /// field.
    pub fn set_field(&mut self, id: NodeId, name: &str, value: impl Into<PropValue>) -> Result<bool> {
        let value = value.into();
        match self.node(id)?.fields.get(name) {
            Some(FieldValue::Value(_)) => {}
            Some(_) => {
                return Err(TreeError::NoSuchField(format!(
                    "{name} is not a value field of {}",
                    self.unique_path(id)?
                )))
            }
            None => {
                warn!("set_field: {} has no field {name}", self.unique_path(id)?);
                return Ok(false);
            }
        }
        let token = self.update_start(id);
        if let Some(slot) = self.node_mut(id)?.fields.get_mut(name) {
            *slot = FieldValue::Value(value);
        }
        self.set_flags(id, Flags::FIELD_UPDATED)?;
        self.update_end(id, token);
        Ok(true)
    }

    /// Set field `name` on `id` and every descendant that has it.
    pub fn set_field_down(&mut self, id: NodeId, name: &str, value: impl Into<PropValue>) -> Result<()> {
        let value = value.into();
        let token = self.update_start(id);
        for k in self.subtree(id)? {
            if matches!(self.node(k)?.fields.get(name), Some(FieldValue::Value(_))) {
                self.set_field(k, name, value.clone())?;
            }
        }
        self.update_end(id, token);
        Ok(())
    }

    /// Set field `name` on `id` and every ancestor that has it.
    pub fn set_field_up(&mut self, id: NodeId, name: &str, value: impl Into<PropValue>) -> Result<()> {
        let value = value.into();
        let mut chain = Vec::new();
        self.walk_up(id, |k, _| {
            chain.push(k);
            true
        })?;
        let root = chain.last().copied().unwrap_or(id);
        let token = self.update_start(root);
        for k in chain {
            if matches!(self.node(k)?.fields.get(name), Some(FieldValue::Value(_))) {
                self.set_field(k, name, value.clone())?;
            }
        }
        self.update_end(root, token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDecl, TypeInfo, TypeRegistry};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tree() -> Tree {
        let reg = TypeRegistry::new();
        reg.register(TypeInfo::node("Leaf"));
        reg.register(
            TypeInfo::node("W")
                .field(FieldDecl::node("style", "Leaf"))
                .field(FieldDecl::reference("buddy"))
                .field(FieldDecl::value("size", json!(1))),
        );
        Tree::new(Arc::new(reg))
    }

    #[test]
    fn test_set_field_notifies_once() {
        let mut t = tree();
        let w = t.create("W", "w").unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        t.connect(w, move |ev| {
            assert!(ev.changes.contains(Flags::FIELD_UPDATED));
            h.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert!(t.set_field(w, "size", 4i64).unwrap());
        assert_eq!(t.field_value(w, "size").unwrap().unwrap().get(), json!(4));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_field_missing_or_wrong_kind() {
        let mut t = tree();
        let w = t.create("W", "w").unwrap();
        assert!(!t.set_field(w, "nope", 1i64).unwrap());
        assert!(matches!(t.set_field(w, "style", 1i64), Err(TreeError::NoSuchField(_))));
        assert!(matches!(t.set_field(w, "buddy", 1i64), Err(TreeError::NoSuchField(_))));
    }

    #[test]
    fn test_set_field_down_and_up() {
        let mut t = tree();
        let a = t.create("W", "a").unwrap();
        let b = t.create("W", "b").unwrap();
        let leaf = t.create("Leaf", "leaf").unwrap();
        t.add_child(a, b).unwrap();
        t.add_child(b, leaf).unwrap();
        t.set_field_down(a, "size", 7i64).unwrap();
        assert_eq!(t.field_value(a, "size").unwrap().unwrap().get(), json!(7));
        assert_eq!(t.field_value(b, "size").unwrap().unwrap().get(), json!(7));
        t.set_field_up(leaf, "size", 9i64).unwrap();
        assert_eq!(t.field_value(a, "size").unwrap().unwrap().get(), json!(9));
        assert_eq!(t.field_value(b, "size").unwrap().unwrap().get(), json!(9));
    }

    #[test]
    fn test_field_node_lookup() {
        let mut t = tree();
        let w = t.create("W", "w").unwrap();
        let style = t.field_node(w, "style").unwrap().unwrap();
        assert_eq!(t.parent(style).unwrap(), Some(w));
        assert_eq!(t.field_node(w, "size").unwrap(), None);
    }
}
