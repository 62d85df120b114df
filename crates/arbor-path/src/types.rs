//! Type definitions for tree paths.

use std::fmt;

/// Separator introducing a tree child step.
pub const CHILD_SEPARATOR: char = '/';

/// Separator introducing an embedded field step.
pub const FIELD_SEPARATOR: char = '.';

/// A step in a tree path.
///
/// Tree children are introduced by `/`, embedded fields by `.`, so
/// `/root/panel.style/x` walks `root`, its child `panel`, the `style` field of
/// `panel`, and finally the child `x` of that field node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// A tree child, addressed by name (unique name for unique paths).
    Child(String),
    /// An embedded field, addressed by field name.
    Field(String),
}

impl PathStep {
    /// The name carried by this step.
    pub fn name(&self) -> &str {
        match self {
            PathStep::Child(name) | PathStep::Field(name) => name,
        }
    }

    /// Whether this step addresses an embedded field.
    pub fn is_field(&self) -> bool {
        matches!(self, PathStep::Field(_))
    }

    /// The separator written in front of this step.
    pub fn separator(&self) -> char {
        match self {
            PathStep::Child(_) => CHILD_SEPARATOR,
            PathStep::Field(_) => FIELD_SEPARATOR,
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.separator(), self.name())
    }
}

/// A parsed tree path.
pub type Path = Vec<PathStep>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_accessors() {
        let child = PathStep::Child("a".to_string());
        let field = PathStep::Field("style".to_string());
        assert_eq!(child.name(), "a");
        assert!(!child.is_field());
        assert!(field.is_field());
        assert_eq!(child.separator(), '/');
        assert_eq!(field.separator(), '.');
    }

    #[test]
    fn test_step_display() {
        assert_eq!(PathStep::Child("a".to_string()).to_string(), "/a");
        assert_eq!(PathStep::Field("f".to_string()).to_string(), ".f");
    }
}
