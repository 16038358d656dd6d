use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Which of the document's declared State Sets drives segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "SelectorRepr", into = "String")]
pub enum StateSetSelector {
    /// Zero-based index into the declared `refsDecl` schemes.
    Index(usize),
    /// Flatten every declared scheme into one State Set.
    #[default]
    MergeAll,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid state set selector: {0}")]
pub struct ParseStateSetSelectorError(String);

impl FromStr for StateSetSelector {
    type Err = ParseStateSetSelectorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "*" | "all" => Ok(StateSetSelector::MergeAll),
            t => t.parse::<usize>()
                .map(StateSetSelector::Index)
                .map_err(|_| ParseStateSetSelectorError(s.to_string())),
        }
    }
}

impl fmt::Display for StateSetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSetSelector::Index(n) => write!(f, "{}", n),
            StateSetSelector::MergeAll => write!(f, "*"),
        }
    }
}

impl From<StateSetSelector> for String {
    fn from(s: StateSetSelector) -> String {
        s.to_string()
    }
}

// JSON config files may give the selector as a number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorRepr {
    Index(usize),
    Text(String),
}

impl TryFrom<SelectorRepr> for StateSetSelector {
    type Error = ParseStateSetSelectorError;

    fn try_from(r: SelectorRepr) -> std::result::Result<Self, Self::Error> {
        match r {
            SelectorRepr::Index(n) => Ok(StateSetSelector::Index(n)),
            SelectorRepr::Text(s) => s.parse(),
        }
    }
}

/// Counts reported after a Work has been segmented or saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub title: String,
    pub slug: Option<String>,
    pub divisions: usize,
    pub readable_divisions: usize,
    pub verses: usize,
    pub anomalies: usize,
}
