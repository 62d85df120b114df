//! arbor: a reflectively-typed tree-of-objects runtime.
//!
//! Nodes live in a [`Tree`] arena and are addressed by generation-checked
//! [`NodeId`] handles. Each node has a registered type, a name plus a
//! sibling-unique name, an ordered child list, a property map with parent
//! and type inheritance, and the fields its type declares. Mutations are
//! batched by update brackets into one notification per outermost bracket,
//! and destroyed subtrees are torn down later by a [`DeletionManager`].
//!
//! ```
//! use std::sync::Arc;
//! use arbor::{Tree, TypeInfo, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! registry.register(TypeInfo::node("Item"));
//! let mut tree = Tree::new(Arc::new(registry));
//!
//! let root = tree.create("Item", "root").unwrap();
//! let a = tree.add_new_child(root, None, "x").unwrap();
//! let b = tree.add_new_child(root, None, "x").unwrap();
//! assert_eq!(tree.node(b).unwrap().unique_name(), "x_001");
//! assert_eq!(tree.unique_path(a).unwrap(), "/root/x");
//! assert_eq!(tree.resolve_path(root, "/root/x_001").unwrap(), b);
//! ```

mod children;
mod codec;
mod config;
mod copy;
mod deletion;
mod error;
mod fields;
mod flags;
mod id;
mod node;
mod path;
mod props;
mod refs;
mod registry;
mod signal;
mod traverse;
mod tree;
mod update;
mod value;

pub use children::{TypeAndName, CHILD_TYPE_PROP};
pub use codec::{
    decode_body, decode_tree, encode_body, encode_tree, open_tree, read_tree, save_tree,
    write_tree, ROOT_TYPE_KEY,
};
pub use config::{TreeConfig, UNIQUIFY_PRESERVE_NAME_LIMIT};
pub use deletion::{DeletedSubtree, DeletionManager};
pub use error::{Result, TreeError};
pub use flags::{Flags, Lifecycle, StateHandle};
pub use id::NodeId;
pub use node::{FieldValue, Node, PtrPath};
pub use registry::{CopyPolicy, FieldDecl, FieldKind, Registry, TypeInfo, TypeRegistry, NODE_TYPE};
pub use signal::{NodeSignal, ObserverId, SignalEvent};
pub use tree::Tree;
pub use value::{deep_copy_props, PropValue, Props, SharedValue};
