//! Error taxonomy of the segmentation engine.
//!
//! Fatal errors are [`ImportError`]. Recoverable problems are collected as
//! [`StructuralAnomaly`] values and returned next to the built Work.

use serde::Serialize;
use thiserror::Error;

use crate::logger;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },
    #[error("Unexpected closing tag </{0}>")]
    UnexpectedEnd(String),
    #[error("Element <{0}> is never closed")]
    Unclosed(String),
    #[error("Document has no <{0}> element")]
    MissingElement(String),
}

/// The State Set could not be resolved. Aborts the import before anything is saved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Document has no encodingDesc")]
    MissingEncodingDesc,
    #[error("State set index {index} is out of range, the document declares {available}")]
    StateSetOutOfRange { index: usize, available: usize },
    #[error("State declaration #{position} has no unit attribute")]
    MalformedState { position: usize },
    #[error("State '{unit}' has a non-numeric level '{level}'")]
    BadStateLevel { unit: String, level: String },
    #[error("Document has no body")]
    MissingBody,
}

/// Misuse of a content buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccumulationError {
    #[error("No content buffer is open")]
    NotOpen,
    #[error("Buffer node handle belongs to buffer generation {handle}, the open buffer is generation {current}")]
    StaleHandle { handle: u32, current: u32 },
    #[error("Buffer node {0} does not exist")]
    UnknownNode(usize),
}

/// Fatal import failure, with enough context to report or resume.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to parse \"{work_title}\": {source}")]
    Markup {
        work_title: String,
        #[source]
        source: MarkupError,
    },
    #[error("Configuration error in \"{work_title}\": {source}")]
    Configuration {
        work_title: String,
        #[source]
        source: ConfigurationError,
    },
    #[error("Accumulation error in \"{work_title}\" after {last_boundary}: {source}")]
    Accumulation {
        work_title: String,
        last_boundary: String,
        #[source]
        source: AccumulationError,
    },
}

impl ImportError {
    pub fn work_title(&self) -> &str {
        match self {
            ImportError::Markup { work_title, .. } => work_title,
            ImportError::Configuration { work_title, .. } => work_title,
            ImportError::Accumulation { work_title, .. } => work_title,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    /// A shallower boundary found no open ancestor at its level and was attached at the root.
    NoAncestorAtLevel,
    /// A boundary was more than one level deeper than the open division.
    SkippedLevel,
    /// A verse marker appeared before any division and auto-creation is off.
    VerseWithoutDivision,
    /// Text appeared before any division and auto-creation is off.
    ContentWithoutDivision,
    /// A verse marker had no `n` label; the verse count was used.
    MissingVerseIndicator,
    /// A line marker's `n` label could not be read as a line number.
    BadLineNumber,
}

/// A non-fatal problem that was repaired during segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralAnomaly {
    pub kind: AnomalyKind,
    /// Sequence number of the division being built when the anomaly was seen.
    pub division_sequence: Option<i32>,
    pub message: String,
}

impl StructuralAnomaly {
    pub fn new(kind: AnomalyKind, division_sequence: Option<i32>, message: String) -> Self {
        logger::warn(&format!("{:?}: {}", kind, message));
        StructuralAnomaly { kind, division_sequence, message }
    }
}
