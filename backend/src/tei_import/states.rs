//! Segmentation schemes declared in a document's `encodingDesc`.
//!
//! ```xml
//! <encodingDesc>
//!   <refsDecl doctype="TEI.2">
//!     <state unit="book" n="chunk"/>
//!     <state unit="section"/>
//!   </refsDecl>
//!   <refsDecl doctype="TEI.2">
//!     <state unit="card" n="chunk"/>
//!   </refsDecl>
//! </encodingDesc>
//! ```
//!
//! Each `refsDecl` is one [`StateSet`]. A `state` with an `n` label is a
//! division boundary ("chunk"), one without is a verse boundary.

use serde::Serialize;

use crate::tei_import::errors::ConfigurationError;
use crate::tei_import::markup::Node;
use crate::types::StateSetSelector;

/// Units that always open a division when they are part of the active set.
pub const CHUNK_TYPES: &[&str] = &["card"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    pub unit: String,
    pub chunk_label: Option<String>,
    /// 1-based nesting level.
    pub level: i32,
}

impl State {
    pub fn new(unit: &str, chunk_label: Option<&str>, level: i32) -> Self {
        State {
            unit: unit.to_string(),
            chunk_label: chunk_label.map(str::to_string),
            level,
        }
    }

    pub fn is_chunk(&self) -> bool {
        self.chunk_label.is_some() || CHUNK_TYPES.contains(&self.unit.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateSet {
    pub states: Vec<State>,
}

impl StateSet {
    pub fn new(states: Vec<State>) -> Self {
        StateSet { states }
    }

    pub fn find(&self, unit: &str) -> Option<&State> {
        self.states.iter().find(|s| s.unit == unit)
    }

    pub fn find_ignore_case(&self, unit: &str) -> Option<&State> {
        let unit = unit.to_lowercase();
        self.states.iter().find(|s| s.unit.to_lowercase() == unit)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    /// Flatten several sets into one. A unit declared twice keeps its first declaration.
    pub fn merge(sets: &[StateSet]) -> StateSet {
        let mut merged = StateSet::default();
        for state in sets.iter().flat_map(|s| s.iter()) {
            if merged.find(&state.unit).is_none() {
                merged.states.push(state.clone());
            }
        }
        merged
    }
}

/// The `state` declarations under one node, levels by position unless a `level` attribute is given.
pub fn read_states(refs_decl: &Node) -> Result<Vec<State>, ConfigurationError> {
    refs_decl.find_all("state")
        .into_iter()
        .enumerate()
        .map(|(i, node)| {
            let position = i + 1;
            let unit = node.attr("unit")
                .filter(|u| !u.trim().is_empty())
                .ok_or(ConfigurationError::MalformedState { position })?;

            let level = match node.attr("level") {
                Some(l) => l.trim().parse::<i32>()
                    .ok()
                    .filter(|l| *l >= 1)
                    .ok_or_else(|| ConfigurationError::BadStateLevel {
                        unit: unit.to_string(),
                        level: l.to_string(),
                    })?,
                None => position as i32,
            };

            Ok(State::new(unit.trim(), node.attr("n"), level))
        })
        .collect()
}

/// Every State Set the document declares, in document order.
///
/// A document with `state` declarations directly under `encodingDesc` and no
/// `refsDecl` is read as a single set.
pub fn resolve_state_sets(doc: &Node) -> Result<Vec<StateSet>, ConfigurationError> {
    let encoding_desc = doc.find_first("encodingDesc")
        .ok_or(ConfigurationError::MissingEncodingDesc)?;

    let refs = encoding_desc.find_all("refsDecl");
    if refs.is_empty() {
        let states = read_states(encoding_desc)?;
        if states.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![StateSet::new(states)]);
    }

    refs.into_iter()
        .map(|r| read_states(r).map(StateSet::new))
        .collect()
}

pub fn select_state_set(sets: &[StateSet], selector: StateSetSelector) -> Result<StateSet, ConfigurationError> {
    match selector {
        StateSetSelector::MergeAll => Ok(StateSet::merge(sets)),
        StateSetSelector::Index(index) => sets.get(index)
            .cloned()
            .ok_or(ConfigurationError::StateSetOutOfRange { index, available: sets.len() }),
    }
}

/// Resolve and select in one step.
pub fn active_state_set(doc: &Node, selector: StateSetSelector) -> Result<StateSet, ConfigurationError> {
    let sets = resolve_state_sets(doc)?;
    select_state_set(&sets, selector)
}
