use std::path::Path;

use anyhow::{Context, Result};
use serde::{Serialize, Deserialize};

use crate::types::StateSetSelector;

/// Per-import options.
///
/// Every field has a default so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub state_set: StateSetSelector,
    /// Treat `divN` elements as ordinary content.
    pub ignore_division_markers: bool,
    /// `None` detects the policy from the header's `step refunit="line"`.
    pub use_line_count_for_divisions: Option<bool>,
    /// Only divisions without child divisions get verses.
    pub only_leaf_divisions_readable: bool,
    /// When set, only these tags open divisions, e.g. `["div1", "div2"]`.
    pub explicit_division_tags: Option<Vec<String>>,
    pub overwrite_existing: bool,
    /// Create a level-1 division for content or verses found before any boundary.
    pub auto_create_divisions: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            state_set: StateSetSelector::MergeAll,
            ignore_division_markers: false,
            use_line_count_for_divisions: None,
            only_leaf_divisions_readable: false,
            explicit_division_tags: None,
            overwrite_existing: false,
            auto_create_divisions: true,
        }
    }
}

impl ImportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse import config")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read import config: {:?}", path))?;
        Self::from_json_str(&json)
    }

    /// Is `tag` allowed to open a division, given it looks like `divN`?
    pub fn division_tag_allowed(&self, tag: &str) -> bool {
        if self.ignore_division_markers {
            return false;
        }
        match &self.explicit_division_tags {
            Some(tags) => tags.iter().any(|t| t == tag),
            None => true,
        }
    }
}
