//! Tree configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};

/// Default sibling count up to which unique names preserve the user name.
pub const UNIQUIFY_PRESERVE_NAME_LIMIT: usize = 100;

/// Tunables for a [`Tree`](crate::Tree).
///
/// ```
/// use arbor::TreeConfig;
///
/// let cfg = TreeConfig::from_toml_str("uniquify_preserve_limit = 10").unwrap();
/// assert_eq!(cfg.uniquify_preserve_limit, 10);
/// assert!(cfg.pretty_json);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Above this many siblings every unique name is rewritten with an
    /// index suffix instead of preserving the user name.
    pub uniquify_preserve_limit: usize,
    /// Indent bodies written by `save_tree`.
    pub pretty_json: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            uniquify_preserve_limit: UNIQUIFY_PRESERVE_NAME_LIMIT,
            pretty_json: true,
        }
    }
}

impl TreeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| TreeError::Decode(format!("config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty() {
        assert_eq!(TreeConfig::from_toml_str("").unwrap(), TreeConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let cfg = TreeConfig::from_toml_str(
            "uniquify_preserve_limit = 5\npretty_json = false\n",
        )
        .unwrap();
        assert_eq!(cfg.uniquify_preserve_limit, 5);
        assert!(!cfg.pretty_json);
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            TreeConfig::from_toml_str("pretty_json = 3"),
            Err(TreeError::Decode(_))
        ));
    }
}
