mod common;

use std::sync::Arc;

use arbor::{
    decode_tree, encode_tree, open_tree, read_tree, save_tree, write_tree, DeletionManager,
    Tree, TreeConfig, TreeError, TypeInfo, TypeRegistry,
};
use common::{assert_consistent, registry, tree};

#[test]
fn two_node_demo_round_trip() {
    let reg = TypeRegistry::new();
    reg.register(TypeInfo::node("Demo"));
    let reg = Arc::new(reg);
    let mut t = Tree::new(reg.clone());
    let root = t.create("Demo", "root").unwrap();
    t.add_new_child(root, None, "a").unwrap();

    let bytes = encode_tree(&t, root, false).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    let (head, _) = text.split_at(text.find('\n').unwrap() + 1);
    assert_eq!(head, "{\"root-type\": \"Demo\"}\n");

    let mut u = Tree::new(reg);
    let loaded = decode_tree(&mut u, &bytes).unwrap();
    assert_eq!(u.num_children(loaded).unwrap(), 1);
    let a = u.child(loaded, 0).unwrap();
    assert_eq!(u.node(a).unwrap().name(), "a");
    assert_eq!(u.parent(a).unwrap(), Some(loaded));
    assert_consistent(&u, loaded);
}

#[test]
fn references_survive_reload() {
    let mut t = tree();
    let root = t.create("Demo", "root").unwrap();
    let a = t.add_new_child(root, None, "a").unwrap();
    let b = t.add_new_child(a, None, "b").unwrap();
    t.set_ref(b, "target", Some(a)).unwrap();
    // renaming after set_ref is picked up through the cached target
    t.set_name(a, "renamed").unwrap();

    let mut buf = Vec::new();
    write_tree(&t, root, true, &mut buf).unwrap();
    let mut u = tree();
    let loaded = read_tree(&mut u, buf.as_slice()).unwrap();
    let ua = u.child(loaded, 0).unwrap();
    let ub = u.child(ua, 0).unwrap();
    assert_eq!(u.ref_path(ub, "target").unwrap().path(), "/root/renamed");
    assert_eq!(u.resolve_ref(ub, "target").unwrap(), ua);
}

#[test]
fn dangling_reference_keeps_loaded_tree() {
    let mut t = tree();
    let root = t.create("Demo", "root").unwrap();
    let bytes = br#"{"root-type": "Demo"}
{"name": "root", "fields": {"target": "/root/missing"}, "children": []}"#;
    match decode_tree(&mut t, bytes) {
        Err(TreeError::UnresolvedRefs { node, paths }) => {
            assert_ne!(node, root);
            assert_eq!(paths, vec!["/root/missing".to_string()]);
            assert_eq!(t.node(node).unwrap().name(), "root");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn repeated_unique_names_are_renamed_on_load() {
    let mut t = tree();
    let bytes = br#"{"root-type": "Demo"}
{"name": "root", "unique_name": "root", "children": [
  {"type": "Leaf", "name": "x", "unique_name": "x"},
  {"type": "Leaf", "name": "x", "unique_name": "x"}
]}"#;
    let root = decode_tree(&mut t, bytes).unwrap();
    let kids = t.children(root).unwrap().to_vec();
    assert_eq!(kids.len(), 2);
    assert_eq!(t.node(kids[0]).unwrap().unique_name(), "x");
    assert_eq!(t.node(kids[1]).unwrap().unique_name(), "x_001");
    for kid in kids {
        let path = t.unique_path(kid).unwrap();
        assert_eq!(t.resolve_path(root, &path).unwrap(), kid);
    }
    assert_consistent(&t, root);
}

#[test]
fn unknown_child_type_fails_cleanly() {
    let mut t = tree();
    let bytes = br#"{"root-type": "Demo"}
{"name": "root", "children": [{"type": "Plain", "name": "p"}]}"#;
    assert!(matches!(
        decode_tree(&mut t, bytes),
        Err(TreeError::CapabilityMissing(_))
    ));
    assert!(t.roots().is_empty());
}

#[test]
fn save_and_open_file() {
    let path = std::env::temp_dir().join(format!("arbor-codec-{}.json", std::process::id()));
    let cfg = TreeConfig {
        pretty_json: false,
        ..TreeConfig::default()
    };
    let mut t = Tree::with_config(registry(), cfg)
        .with_deletion_manager(Arc::new(DeletionManager::new()));
    let root = t.create("Demo", "root").unwrap();
    t.add_new_child(root, Some("Leaf"), "leaf").unwrap();
    save_tree(&t, root, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);

    let mut u = tree();
    let loaded = open_tree(&mut u, &path).unwrap();
    assert_eq!(u.node(u.child(loaded, 0).unwrap()).unwrap().type_name(), "Leaf");
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(open_tree(&mut u, &path), Err(TreeError::Io(_))));
}
