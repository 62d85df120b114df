//! Node paths.
//!
//! `path` joins plain names, `unique_path` joins unique names. Tree children
//! are separated by `/` and embedded fields by `.`, so the unique path of
//! every node resolves back to it.

use arbor_path::{
    format_path, parse_path, strip_prefix, PathStep, CHILD_SEPARATOR, FIELD_SEPARATOR,
};

use crate::error::{Result, TreeError};
use crate::id::NodeId;
use crate::tree::Tree;

impl Tree {
    fn steps(&self, id: NodeId, stop: Option<NodeId>, unique: bool) -> Result<Vec<PathStep>> {
        let mut steps = Vec::new();
        let mut cur = Some(id);
        while let Some(k) = cur {
            if Some(k) == stop {
                break;
            }
            let node = self.node(k)?;
            let name = if unique { &node.unique_name } else { &node.name };
            let step = if node.is_field() && node.parent.is_some() {
                PathStep::Field(name.clone())
            } else {
                PathStep::Child(name.clone())
            };
            steps.push(step);
            cur = node.parent;
        }
        steps.reverse();
        Ok(steps)
    }

    pub fn path(&self, id: NodeId) -> Result<String> {
        Ok(format_path(&self.steps(id, None, false)?))
    }

    pub fn unique_path(&self, id: NodeId) -> Result<String> {
        Ok(format_path(&self.steps(id, None, true)?))
    }

    /// Path of `id` below `ancestor`, which itself is not included.
    ///
    /// Falls back to the full path when `ancestor` is not above `id`.
    pub fn path_from(&self, id: NodeId, ancestor: NodeId) -> Result<String> {
        Ok(format_path(&self.steps(id, Some(ancestor), false)?))
    }

    pub fn unique_path_from(&self, id: NodeId, ancestor: NodeId) -> Result<String> {
        Ok(format_path(&self.steps(id, Some(ancestor), true)?))
    }

    /// Find the node addressed by a unique path, starting at `from`.
    ///
    /// For a non-root `from` the path may be absolute (it then has to run
    /// through `from`). From a root, a leading step naming the root itself
    /// is skipped, so both `/root/a` and `/a` resolve to child `a`.
    pub fn resolve_path(&self, from: NodeId, path: &str) -> Result<NodeId> {
        let from_node = self.node(from)?;
        let mut rest = path.trim().trim_matches('"');
        if from_node.parent.is_some() {
            let own = self.unique_path(from)?;
            if let Some(stripped) = strip_prefix(rest, &own) {
                rest = stripped;
            }
        }
        // a leading field step is relative to `from`
        let relative;
        if rest.starts_with(FIELD_SEPARATOR) {
            relative = format!("{CHILD_SEPARATOR}{rest}");
            rest = &relative;
        }
        let mut steps = parse_path(rest)?;
        if from_node.parent.is_none() {
            if let Some(PathStep::Child(first)) = steps.first() {
                if *first == from_node.unique_name {
                    steps.remove(0);
                }
            }
        }
        let mut cur = from;
        for step in &steps {
            let next = match step {
                PathStep::Child(name) if name.is_empty() => continue,
                PathStep::Child(name) => self.child_by_unique_name(cur, name, 0)?,
                PathStep::Field(name) => self.field_node(cur, name)?,
            };
            cur = next.ok_or_else(|| TreeError::PathNotFound(path.to_string()))?;
        }
        Ok(cur)
    }
}
