#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use arbor::{
    DeletionManager, FieldDecl, NodeId, SignalEvent, Tree, TypeInfo, TypeRegistry,
};
use serde_json::json;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Registry shared by the integration tests.
///
/// `Demo` nodes carry an embedded `Style` field, a path reference and a
/// value field; `Leaf` is a bare node type; `Plain` is not node-capable.
pub fn registry() -> Arc<TypeRegistry> {
    let reg = TypeRegistry::new();
    reg.register(TypeInfo::node("Leaf"));
    reg.register(TypeInfo::node("Style").prop("color", json!("black")));
    reg.register(
        TypeInfo::node("Demo")
            .field(FieldDecl::node("style", "Style"))
            .field(FieldDecl::reference("target"))
            .field(FieldDecl::value("size", json!(0))),
    );
    reg.register(TypeInfo::new("Plain"));
    Arc::new(reg)
}

/// Tree with its own deletion manager, so tests do not share a queue.
pub fn tree() -> Tree {
    init_logger();
    Tree::new(registry()).with_deletion_manager(Arc::new(DeletionManager::new()))
}

/// Collects every event an observer receives.
pub fn record(tree: &mut Tree, id: NodeId) -> Arc<Mutex<Vec<SignalEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    tree.connect(id, move |ev| sink.lock().unwrap().push(ev.clone()))
        .unwrap();
    events
}

/// Asserts the parent/child links of the whole subtree agree.
pub fn assert_consistent(tree: &Tree, root: NodeId) {
    for id in tree.subtree(root).unwrap() {
        let node = tree.node(id).unwrap();
        for (i, kid) in node.children().iter().enumerate() {
            let k = tree.node(*kid).unwrap();
            assert_eq!(k.parent(), Some(id), "child {kid} of {id}");
            assert!(!k.is_field());
            assert_eq!(tree.index_in_parent(*kid).unwrap(), Some(i));
        }
        for field in node.field_nodes() {
            assert_eq!(tree.node(field).unwrap().parent(), Some(id));
        }
    }
}
