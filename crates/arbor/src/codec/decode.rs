//! Tree body decoder.

use log::warn;
use serde_json::{Map, Value};

use crate::children::TypeAndName;
use crate::error::{Result, TreeError};
use crate::id::NodeId;
use crate::node::{FieldValue, PtrPath};
use crate::tree::Tree;
use crate::value::{PropValue, Props};

fn decode_err(msg: impl Into<String>) -> TreeError {
    let msg = msg.into();
    warn!("decode: {msg}");
    TreeError::Decode(msg)
}

fn as_object<'a>(v: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    v.as_object()
        .ok_or_else(|| decode_err(format!("{what} is not an object")))
}

fn str_entry<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(decode_err(format!("\"{key}\" is not a string"))),
    }
}

fn child_shape(children: &[Value]) -> Result<Vec<TypeAndName>> {
    children
        .iter()
        .map(|c| -> Result<TypeAndName> {
            let obj = as_object(c, "child")?;
            let ty = str_entry(obj, "type")?
                .ok_or_else(|| decode_err("child without \"type\""))?;
            let name = match str_entry(obj, "unique_name")? {
                Some(u) => u,
                None => str_entry(obj, "name")?.unwrap_or_default(),
            };
            Ok(TypeAndName::new(ty, name))
        })
        .collect()
}

/// Fills `id` from `body`. Parent links and references are left to the
/// caller's fix-up pass.
fn decode_node(tree: &mut Tree, id: NodeId, body: &Value) -> Result<()> {
    let obj = as_object(body, "node body")?;
    if let Some(name) = str_entry(obj, "name")? {
        tree.set_name_raw(id, name)?;
    }
    if let Some(unique) = str_entry(obj, "unique_name")? {
        tree.set_unique_name(id, unique)?;
    }

    if let Some(props) = obj.get("props") {
        let props: Props = as_object(props, "\"props\"")?
            .iter()
            .map(|(k, v)| (k.clone(), PropValue::Json(v.clone())))
            .collect();
        tree.node_mut(id)?.props = props;
    }

    if let Some(fields) = obj.get("fields") {
        for (name, v) in as_object(fields, "\"fields\"")? {
            match tree.node(id)?.fields.get(name).cloned() {
                Some(FieldValue::Node(field)) => decode_node(tree, field, v)?,
                Some(FieldValue::Ref(_)) => {
                    let path = match v {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        _ => return Err(decode_err(format!("reference {name} is not a path"))),
                    };
                    if let Some(slot) = tree.node_mut(id)?.fields.get_mut(name) {
                        *slot = FieldValue::Ref(PtrPath::new(path));
                    }
                }
                Some(FieldValue::Value(_)) => {
                    if let Some(slot) = tree.node_mut(id)?.fields.get_mut(name) {
                        *slot = FieldValue::Value(PropValue::Json(v.clone()));
                    }
                }
                None => {
                    let ty = tree.node(id)?.type_name().to_string();
                    return Err(decode_err(format!("{ty} has no field {name}")));
                }
            }
        }
    }

    let children = match obj.get("children") {
        None => &[][..],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => return Err(decode_err("\"children\" is not an array")),
    };
    let shape = child_shape(children)?;
    tree.reconcile_children(id, &shape, true)?;
    let kids = tree.children(id)?.to_vec();
    for (kid, body) in kids.into_iter().zip(children) {
        decode_node(tree, kid, body)?;
    }
    if tree.uniquify_collisions(id)? {
        warn!("decode: repeated unique names under {id} were renamed");
    }
    Ok(())
}

/// Re-point every parent link in the subtree from the child lists and
/// field tables.
fn relink_parents(tree: &mut Tree, start: NodeId) -> Result<()> {
    for id in tree.subtree(start)? {
        let node = tree.node(id)?;
        let owned: Vec<NodeId> = node.children.iter().copied().chain(node.field_nodes()).collect();
        for (i, kid) in owned.into_iter().enumerate() {
            let k = tree.node_mut(kid)?;
            k.parent = Some(id);
            k.set_index_hint(i);
        }
    }
    Ok(())
}

/// Decodes `body` into the existing node `id` inside one update bracket,
/// then re-links parents and resolves references.
pub fn decode_body(tree: &mut Tree, id: NodeId, body: &Value) -> Result<()> {
    let token = tree.update_start(id);
    let decoded = decode_node(tree, id, body);
    tree.update_end(id, token);
    decoded?;
    relink_parents(tree, id)?;
    tree.resolve_ref_paths(id)
}
