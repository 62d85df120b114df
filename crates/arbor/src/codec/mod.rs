//! JSON tree codec.
//!
//! A tree file is one header line naming the root type,
//!
//! ```text
//! {"root-type": "Demo"}
//! ```
//!
//! followed by the body of the root: an object with `name`, `unique_name`,
//! `props`, `fields` and `children`, each child also carrying its `type`.
//! The body alone ([`encode_body`] / [`decode_body`]) is used when the
//! surrounding structure already knows the type.
//!
//! ```
//! use std::sync::Arc;
//! use arbor::{decode_tree, encode_tree, Tree, TypeInfo, TypeRegistry};
//!
//! let registry = Arc::new(TypeRegistry::new());
//! registry.register(TypeInfo::node("Demo"));
//! let mut tree = Tree::new(registry.clone());
//! let root = tree.create("Demo", "root").unwrap();
//! tree.add_new_child(root, None, "a").unwrap();
//!
//! let bytes = encode_tree(&tree, root, false).unwrap();
//! assert!(bytes.starts_with(b"{\"root-type\": \"Demo\"}\n"));
//!
//! let mut other = Tree::new(registry);
//! let loaded = decode_tree(&mut other, &bytes).unwrap();
//! assert_eq!(other.num_children(loaded).unwrap(), 1);
//! ```

mod decode;
mod encode;

pub use decode::decode_body;
pub use encode::encode_body;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::warn;
use serde_json::Value;

use crate::error::{Result, TreeError};
use crate::id::NodeId;
use crate::tree::Tree;

/// Header key naming the root type.
pub const ROOT_TYPE_KEY: &str = "root-type";

fn header(ty: &str) -> Result<String> {
    Ok(format!("{{\"{ROOT_TYPE_KEY}\": {}}}\n", serde_json::to_string(ty)?))
}

/// Splits off and parses the header line, returning the root type and the
/// remaining body bytes.
fn parse_header(bytes: &[u8]) -> Result<(String, &[u8])> {
    let end = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| TreeError::Decode("missing header line".to_string()))?;
    let head: Value = serde_json::from_slice(&bytes[..end])
        .map_err(|e| TreeError::Decode(format!("bad header: {e}")))?;
    let ty = head
        .get(ROOT_TYPE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| TreeError::Decode(format!("header has no \"{ROOT_TYPE_KEY}\"")))?;
    Ok((ty.to_string(), &bytes[end + 1..]))
}

/// Header line plus body of the subtree at `root`.
pub fn encode_tree(tree: &Tree, root: NodeId, pretty: bool) -> Result<Vec<u8>> {
    let mut out = header(tree.node(root)?.type_name())?.into_bytes();
    let body = encode_body(tree, root)?;
    if pretty {
        serde_json::to_writer_pretty(&mut out, &body)?;
    } else {
        serde_json::to_writer(&mut out, &body)?;
    }
    Ok(out)
}

/// Builds a new root from encoded bytes.
///
/// The partially built root is destroyed on failure, except when only
/// reference resolution failed: the tree is complete then and the error
/// names the new root.
pub fn decode_tree(tree: &mut Tree, bytes: &[u8]) -> Result<NodeId> {
    let (ty, body) = parse_header(bytes)?;
    let body: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("decode: bad body: {e}");
        TreeError::Decode(format!("bad body: {e}"))
    })?;
    let root = tree.create(&ty, "")?;
    match decode_body(tree, root, &body) {
        Ok(()) => Ok(root),
        Err(e @ TreeError::UnresolvedRefs { .. }) => Err(e),
        Err(e) => {
            if let Err(teardown) = tree.destroy(root) {
                warn!("decode: cannot tear down partial root {root}: {teardown}");
            }
            Err(e)
        }
    }
}

pub fn write_tree<W: Write>(tree: &Tree, root: NodeId, pretty: bool, mut w: W) -> Result<()> {
    w.write_all(&encode_tree(tree, root, pretty)?)?;
    w.flush()?;
    Ok(())
}

pub fn read_tree<R: Read>(tree: &mut Tree, mut r: R) -> Result<NodeId> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    decode_tree(tree, &bytes)
}

/// Writes the subtree to `path`, pretty-printed per the tree's config.
pub fn save_tree(tree: &Tree, root: NodeId, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    write_tree(tree, root, tree.config().pretty_json, BufWriter::new(file))
}

pub fn open_tree(tree: &mut Tree, path: impl AsRef<Path>) -> Result<NodeId> {
    let file = File::open(path)?;
    read_tree(tree, BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDecl, TypeInfo, TypeRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> Arc<TypeRegistry> {
        let reg = TypeRegistry::new();
        reg.register(TypeInfo::node("Leaf"));
        reg.register(
            TypeInfo::node("Demo")
                .field(FieldDecl::node("style", "Leaf"))
                .field(FieldDecl::reference("buddy"))
                .field(FieldDecl::value("size", json!(1))),
        );
        Arc::new(reg)
    }

    #[test]
    fn test_header_exact() {
        assert_eq!(header("Demo").unwrap(), "{\"root-type\": \"Demo\"}\n");
        let (ty, rest) = parse_header(b"{\"root-type\": \"Demo\"}\n{}").unwrap();
        assert_eq!(ty, "Demo");
        assert_eq!(rest, b"{}");
    }

    #[test]
    fn test_bad_headers() {
        let mut t = Tree::new(registry());
        for bytes in [&b"no newline"[..], &b"[1]\n{}"[..], &b"{\"other\": 1}\n{}"[..]] {
            assert!(matches!(decode_tree(&mut t, bytes), Err(TreeError::Decode(_))));
        }
        assert!(matches!(
            decode_tree(&mut t, b"{\"root-type\": \"Nope\"}\n{}"),
            Err(TreeError::CapabilityMissing(_))
        ));
        assert!(t.is_empty());
    }

    #[test]
    fn test_tree_survives_round_trip() {
        let reg = registry();
        let mut t = Tree::new(reg.clone());
        let root = t.create("Demo", "root").unwrap();
        let a = t.add_new_child(root, None, "a").unwrap();
        let leaf = t.add_new_child(a, Some("Leaf"), "leaf").unwrap();
        t.set_prop(a, "color", "red").unwrap();
        t.set_field(a, "size", 3i64).unwrap();
        t.set_ref(root, "buddy", Some(leaf)).unwrap();
        let style = t.field_node(a, "style").unwrap().unwrap();
        t.set_prop(style, "weight", 700i64).unwrap();

        for pretty in [false, true] {
            let bytes = encode_tree(&t, root, pretty).unwrap();
            let mut u = Tree::new(reg.clone());
            let r = decode_tree(&mut u, &bytes).unwrap();
            assert_eq!(u.node(r).unwrap().name(), "root");
            let ua = u.child(r, 0).unwrap();
            assert_eq!(u.parent(ua).unwrap(), Some(r));
            assert_eq!(u.prop(ua, "color").unwrap().unwrap().get(), json!("red"));
            assert_eq!(u.field_value(ua, "size").unwrap().unwrap().get(), json!(3));
            let ustyle = u.field_node(ua, "style").unwrap().unwrap();
            assert_eq!(u.prop(ustyle, "weight").unwrap().unwrap().get(), json!(700));
            let uleaf = u.child(ua, 0).unwrap();
            assert_eq!(u.node(uleaf).unwrap().type_name(), "Leaf");
            assert_eq!(u.resolve_ref(r, "buddy").unwrap(), uleaf);
            assert_eq!(u.ref_path(r, "buddy").unwrap().target(), Some(uleaf));
        }
    }

    #[test]
    fn test_decode_body_into_existing() {
        let reg = registry();
        let mut t = Tree::new(reg);
        let root = t.create("Demo", "root").unwrap();
        t.add_new_child(root, None, "old").unwrap();
        let body = json!({
            "name": "root",
            "props": {"k": 1},
            "children": [{"type": "Leaf", "name": "n.1"}],
        });
        decode_body(&mut t, root, &body).unwrap();
        let kid = t.child(root, 0).unwrap();
        assert_eq!(t.num_children(root).unwrap(), 1);
        assert_eq!(t.node(kid).unwrap().name(), "n.1");
        assert_eq!(t.node(kid).unwrap().unique_name(), "n_1");
        assert_eq!(t.prop(root, "k").unwrap().unwrap().get(), json!(1));
    }

    #[test]
    fn test_decode_bad_body_destroys_root() {
        let mut t = Tree::new(registry());
        let bytes = b"{\"root-type\": \"Demo\"}\n{\"children\": 5}";
        assert!(matches!(decode_tree(&mut t, bytes), Err(TreeError::Decode(_))));
        assert!(t.is_empty());
    }
}
