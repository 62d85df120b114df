//! Type registry.
//!
//! Nodes carry a type name resolved through a [`Registry`]. A type declares
//! the types it embeds, type-level default properties, and its fields. A
//! type is node-capable when it is, or transitively embeds, [`NODE_TYPE`].
//!
//! ```
//! use arbor::{FieldDecl, Registry, TypeInfo, TypeRegistry};
//! use serde_json::json;
//!
//! let registry = TypeRegistry::new();
//! registry.register(TypeInfo::node("Style").prop("color", json!("red")));
//! registry.register(
//!     TypeInfo::node("Button")
//!         .field(FieldDecl::node("style", "Style"))
//!         .field(FieldDecl::value("label", json!(""))),
//! );
//! assert!(registry.is_node_type("Button"));
//! assert_eq!(registry.type_prop("Style", "color"), Some(json!("red")));
//! ```

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// Name of the base node type, always registered.
pub const NODE_TYPE: &str = "Node";

/// Embedded types are followed at most this deep.
const MAX_EMBED_DEPTH: usize = 64;

/// Kind of a declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// An embedded node of the given type, walked like a pseudo-child.
    Node(String),
    /// A path reference to another node.
    Ref,
    /// A plain value with its default.
    Value(Value),
}

/// How `copy_from` treats a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyPolicy {
    Skip,
    /// Recurse into the nested node.
    Follow,
    /// Clone the value; shared cells stay aliased.
    Assign,
    /// Serialization round trip; shared cells are broken.
    DeepCopy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldKind,
    pub copy: CopyPolicy,
}

impl FieldDecl {
    pub fn node(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Node(type_name.into()),
            copy: CopyPolicy::Follow,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Ref,
            copy: CopyPolicy::Assign,
        }
    }

    pub fn value(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Value(default),
            copy: CopyPolicy::Assign,
        }
    }

    pub fn with_copy(mut self, copy: CopyPolicy) -> Self {
        self.copy = copy;
        self
    }
}

/// Description of a registered type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeInfo {
    pub name: String,
    pub embeds: Vec<String>,
    pub props: IndexMap<String, Value>,
    pub fields: Vec<FieldDecl>,
}

impl TypeInfo {
    /// A plain type that embeds nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A type embedding [`NODE_TYPE`].
    pub fn node(name: impl Into<String>) -> Self {
        Self::new(name).embeds(NODE_TYPE)
    }

    pub fn embeds(mut self, base: impl Into<String>) -> Self {
        self.embeds.push(base.into());
        self
    }

    pub fn prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }
}

/// Type lookup service used by the tree.
///
/// Only [`Registry::lookup`] is required. The provided queries follow
/// embedded types and treat unknown types as "not found".
pub trait Registry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<TypeInfo>>;

    /// Does `ty` equal or transitively embed `base`?
    fn embeds(&self, ty: &str, base: &str) -> bool {
        fn visit<R: Registry + ?Sized>(r: &R, ty: &str, base: &str, depth: usize) -> bool {
            if ty == base {
                return true;
            }
            if depth >= MAX_EMBED_DEPTH {
                return false;
            }
            match r.lookup(ty) {
                Some(info) => info.embeds.iter().any(|e| visit(r, e, base, depth + 1)),
                None => false,
            }
        }
        self.lookup(ty).is_some() && visit(self, ty, base, 0)
    }

    fn is_node_type(&self, ty: &str) -> bool {
        self.embeds(ty, NODE_TYPE)
    }

    /// Type-level default property; the type itself wins over embedded types.
    fn type_prop(&self, ty: &str, key: &str) -> Option<Value> {
        fn visit<R: Registry + ?Sized>(r: &R, ty: &str, key: &str, depth: usize) -> Option<Value> {
            if depth >= MAX_EMBED_DEPTH {
                return None;
            }
            let info = r.lookup(ty)?;
            if let Some(v) = info.props.get(key) {
                return Some(v.clone());
            }
            info.embeds.iter().find_map(|e| visit(r, e, key, depth + 1))
        }
        visit(self, ty, key, 0)
    }

    /// All fields of `ty`, embedded types' fields first.
    fn fields(&self, ty: &str) -> Vec<FieldDecl> {
        fn visit<R: Registry + ?Sized>(r: &R, ty: &str, out: &mut Vec<FieldDecl>, depth: usize) {
            if depth >= MAX_EMBED_DEPTH {
                return;
            }
            let Some(info) = r.lookup(ty) else { return };
            for base in &info.embeds {
                visit(r, base, out, depth + 1);
            }
            for decl in &info.fields {
                match out.iter_mut().find(|d| d.name == decl.name) {
                    Some(existing) => *existing = decl.clone(),
                    None => out.push(decl.clone()),
                }
            }
        }
        let mut out = Vec::new();
        visit(self, ty, &mut out, 0);
        out
    }
}

/// Registry backed by an ordered map behind a lock.
#[derive(Debug)]
pub struct TypeRegistry {
    types: RwLock<IndexMap<String, Arc<TypeInfo>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        types.insert(NODE_TYPE.to_string(), Arc::new(TypeInfo::new(NODE_TYPE)));
        Self {
            types: RwLock::new(types),
        }
    }

    /// Register or replace a type.
    pub fn register(&self, info: TypeInfo) -> Arc<TypeInfo> {
        let info = Arc::new(info);
        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        types.insert(info.name.clone(), info.clone());
        info
    }

    pub fn names(&self) -> Vec<String> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.keys().cloned().collect()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for TypeRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<TypeInfo>> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> TypeRegistry {
        let r = TypeRegistry::new();
        r.register(TypeInfo::node("Base").prop("k", json!(1)).field(FieldDecl::value("v", json!(0))));
        r.register(
            TypeInfo::new("Derived")
                .embeds("Base")
                .field(FieldDecl::reference("target"))
                .field(FieldDecl::value("v", json!(9))),
        );
        r.register(TypeInfo::new("Plain"));
        r
    }

    #[test]
    fn test_node_always_registered() {
        let r = TypeRegistry::new();
        assert!(r.is_node_type(NODE_TYPE));
        assert_eq!(r.names(), vec![NODE_TYPE.to_string()]);
    }

    #[test]
    fn test_transitive_embeds() {
        let r = registry();
        assert!(r.is_node_type("Derived"));
        assert!(r.embeds("Derived", "Base"));
        assert!(!r.is_node_type("Plain"));
        assert!(!r.is_node_type("Missing"));
    }

    #[test]
    fn test_type_prop_follows_embeds() {
        let r = registry();
        assert_eq!(r.type_prop("Derived", "k"), Some(json!(1)));
        assert_eq!(r.type_prop("Derived", "nope"), None);
    }

    #[test]
    fn test_fields_override_by_name() {
        let r = registry();
        let fields = r.fields("Derived");
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["v", "target"]);
        assert_eq!(fields[0].kind, FieldKind::Value(json!(9)));
    }

    #[test]
    fn test_default_copy_policies() {
        assert_eq!(FieldDecl::node("a", "Node").copy, CopyPolicy::Follow);
        assert_eq!(FieldDecl::reference("r").copy, CopyPolicy::Assign);
        assert_eq!(
            FieldDecl::value("v", json!(1)).with_copy(CopyPolicy::DeepCopy).copy,
            CopyPolicy::DeepCopy
        );
    }

    #[test]
    fn test_embed_loop_terminates() {
        let r = TypeRegistry::new();
        r.register(TypeInfo::new("A").embeds("B"));
        r.register(TypeInfo::new("B").embeds("A"));
        assert!(!r.is_node_type("A"));
        assert!(r.fields("A").is_empty());
    }
}
