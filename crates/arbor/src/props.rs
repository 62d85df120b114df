//! Node properties.

use crate::error::Result;
use crate::flags::Flags;
use crate::id::NodeId;
use crate::tree::Tree;
use crate::value::{deep_copy_props, PropValue, Props};

impl Tree {
    pub fn prop(&self, id: NodeId, key: &str) -> Result<Option<&PropValue>> {
        Ok(self.node(id)?.props.get(key))
    }

    pub fn set_prop(&mut self, id: NodeId, key: &str, value: impl Into<PropValue>) -> Result<()> {
        self.node_mut(id)?.props.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Set a property, mark `PropUpdated` and notify unless a bracket is open.
    pub fn set_prop_update(&mut self, id: NodeId, key: &str, value: impl Into<PropValue>) -> Result<()> {
        self.set_flags(id, Flags::PROP_UPDATED)?;
        self.set_prop(id, key, value)?;
        self.update_signal(id);
        Ok(())
    }

    /// Merge `props` into the node's map.
    pub fn set_props(&mut self, id: NodeId, props: Props, update: bool) -> Result<()> {
        self.node_mut(id)?.props.extend(props);
        if update {
            self.set_flags(id, Flags::PROP_UPDATED)?;
            self.update_signal(id);
        }
        Ok(())
    }

    /// Set a property on each direct child.
    pub fn set_prop_children(&mut self, id: NodeId, key: &str, value: impl Into<PropValue>) -> Result<()> {
        let value = value.into();
        for kid in self.node(id)?.children.clone() {
            self.set_prop(kid, key, value.clone())?;
        }
        Ok(())
    }

    pub fn delete_prop(&mut self, id: NodeId, key: &str) -> Result<Option<PropValue>> {
        Ok(self.node_mut(id)?.props.shift_remove(key))
    }

    pub fn delete_all_props(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.props.clear();
        Ok(())
    }

    /// Look a property up locally, then (with `inherit`) along the parent
    /// chain, then (with `fallback_to_type`) in the type defaults.
    ///
    /// The first hit wins; absence is `Ok(None)`.
    pub fn prop_inherit(
        &self,
        id: NodeId,
        key: &str,
        inherit: bool,
        fallback_to_type: bool,
    ) -> Result<Option<PropValue>> {
        let node = self.node(id)?;
        if let Some(v) = node.props.get(key) {
            return Ok(Some(v.clone()));
        }
        if inherit {
            if let Some(parent) = node.parent {
                if let Some(v) = self.prop_inherit(parent, key, inherit, fallback_to_type)? {
                    return Ok(Some(v));
                }
            }
        }
        if fallback_to_type {
            return Ok(self
                .registry()
                .type_prop(node.type_name(), key)
                .map(PropValue::Json));
        }
        Ok(None)
    }

    /// Copy `src`'s properties into `dst`.
    ///
    /// Shallow copies keep shared cells aliased; deep copies do not.
    pub fn copy_props_from(&mut self, dst: NodeId, src: NodeId, deep: bool) -> Result<()> {
        let src_props = &self.node(src)?.props;
        let copied = if deep {
            deep_copy_props(src_props)?
        } else {
            src_props.clone()
        };
        self.node_mut(dst)?.props.extend(copied);
        Ok(())
    }
}
