//! Tree body encoder.

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::id::NodeId;
use crate::node::FieldValue;
use crate::tree::Tree;

fn encode_field(tree: &Tree, value: &FieldValue) -> Result<Value> {
    Ok(match value {
        FieldValue::Node(id) => encode_node(tree, *id)?,
        // a live target wins over a stale stored path
        FieldValue::Ref(p) => match p.target().map(|t| tree.unique_path(t)) {
            Some(Ok(path)) => json!(path),
            _ => json!(p.path()),
        },
        FieldValue::Value(v) => serde_json::to_value(v)?,
    })
}

fn encode_node(tree: &Tree, id: NodeId) -> Result<Value> {
    let node = tree.node(id)?;
    let mut fields = Map::new();
    for (name, value) in node.fields() {
        fields.insert(name.clone(), encode_field(tree, value)?);
    }
    let mut children = Vec::with_capacity(node.children().len());
    for kid in node.children() {
        let mut body = encode_node(tree, *kid)?;
        if let Value::Object(obj) = &mut body {
            obj.insert("type".to_string(), json!(tree.node(*kid)?.type_name()));
        }
        children.push(body);
    }
    Ok(json!({
        "name": node.name(),
        "unique_name": node.unique_name(),
        "props": serde_json::to_value(node.props())?,
        "fields": fields,
        "children": children,
    }))
}

/// Encodes the subtree at `id` as a body value, without the type header.
pub fn encode_body(tree: &Tree, id: NodeId) -> Result<Value> {
    encode_node(tree, id)
}
