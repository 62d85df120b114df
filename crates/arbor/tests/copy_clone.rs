mod common;

use arbor::{encode_body, Flags, PropValue, TreeError};
use common::{assert_consistent, record, tree};
use serde_json::json;

#[test]
fn clone_is_structurally_equal_but_distinct() {
    let mut t = tree();
    let src = t.create("Demo", "src").unwrap();
    let a = t.add_new_child(src, None, "a").unwrap();
    t.add_new_child(a, Some("Leaf"), "leaf").unwrap();
    t.set_prop(a, "label", "hello").unwrap();
    t.set_field(a, "size", 3i64).unwrap();

    let copy = t.clone_node(src).unwrap();
    assert_ne!(copy, src);
    assert!(t.is_root(copy).unwrap());
    assert_eq!(encode_body(&t, copy).unwrap(), encode_body(&t, src).unwrap());
    assert_consistent(&t, copy);

    let ca = t.child(copy, 0).unwrap();
    assert_ne!(ca, a);
    t.set_prop(ca, "label", "changed").unwrap();
    assert_eq!(t.prop(a, "label").unwrap(), Some(&PropValue::from("hello")));
}

#[test]
fn clone_aliases_shared_values() {
    let mut t = tree();
    let src = t.create("Demo", "src").unwrap();
    t.set_prop(src, "plain", json!({"n": 1})).unwrap();
    t.set_prop(src, "shared", PropValue::shared(json!({"n": 1}))).unwrap();

    let copy = t.clone_node(src).unwrap();

    // replacing or editing a plain value on the clone leaves the source alone
    t.set_prop(copy, "plain", json!({"n": 2})).unwrap();
    assert_eq!(t.prop(src, "plain").unwrap().unwrap().get(), json!({"n": 1}));

    // a shared cell is aliased by the shallow copy
    let cell = t.prop(copy, "shared").unwrap().unwrap().as_shared().unwrap().clone();
    cell.set(json!({"n": 2}));
    assert_eq!(t.prop(src, "shared").unwrap().unwrap().get(), json!({"n": 2}));

    // a deep property copy breaks the alias
    let other = t.create("Demo", "other").unwrap();
    t.copy_props_from(other, src, true).unwrap();
    cell.set(json!({"n": 3}));
    assert_eq!(t.prop(other, "shared").unwrap().unwrap().get(), json!({"n": 2}));
}

#[test]
fn copy_from_notifies_once_with_copied_flag() {
    let mut t = tree();
    let src = t.create("Demo", "src").unwrap();
    for name in ["a", "b", "c"] {
        t.add_new_child(src, None, name).unwrap();
    }
    let dst = t.create("Demo", "dst").unwrap();
    t.add_new_child(dst, None, "stale").unwrap();
    let events = record(&mut t, dst);
    t.copy_from(dst, src).unwrap();
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].changes.contains(Flags::NODE_COPIED));
    assert_eq!(t.num_children(dst).unwrap(), 3);
    assert_eq!(t.deletion_manager().pending(), 0);
}

#[test]
fn copy_type_mismatch_is_rejected() {
    let mut t = tree();
    let a = t.create("Demo", "a").unwrap();
    let b = t.create("Leaf", "b").unwrap();
    match t.copy_from(a, b) {
        Err(TreeError::TypeMismatch { expected, found }) => {
            assert_eq!(expected, "Demo");
            assert_eq!(found, "Leaf");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(t.clone_node(a), Ok(_)));
}
