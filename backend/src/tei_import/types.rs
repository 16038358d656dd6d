use serde::Serialize;

use crate::tei_import::errors::StructuralAnomaly;

/// Work-level metadata read from the `teiHeader`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkInfo {
    pub title: String,
    pub language: Option<String>,
    pub authors: Vec<String>,
    pub editors: Vec<String>,
    /// The header's reference declaration counts by line.
    pub line_numbered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Division {
    /// 1-based, strictly increasing in document order across the Work.
    pub sequence_number: i32,
    pub level: i32,
    pub descriptor: String,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub title_slug: String,
    pub division_type: Option<String>,
    pub readable_unit: bool,
    /// Arena index of the parent division, `None` for the Work itself.
    pub parent: Option<usize>,
    pub original_content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verse {
    /// Arena index of the owning division.
    pub division: usize,
    /// 1-based within the division.
    pub sequence_number: i32,
    pub indicator: String,
    pub content: String,
    pub original_content: String,
}

/// Result of segmenting one document, ready to be persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportedWork {
    pub work: WorkInfo,
    pub divisions: Vec<Division>,
    pub verses: Vec<Verse>,
    pub diagnostics: Vec<StructuralAnomaly>,
}

impl ImportedWork {
    pub fn verses_of(&self, division: usize) -> impl Iterator<Item = &Verse> {
        self.verses.iter().filter(move |v| v.division == division)
    }

    /// Chain of arena indexes from the division up to its top-level ancestor.
    pub fn ancestors(&self, division: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cur = self.divisions.get(division).and_then(|d| d.parent);
        while let Some(idx) = cur {
            chain.push(idx);
            cur = self.divisions.get(idx).and_then(|d| d.parent);
        }
        chain
    }

    pub fn readable_count(&self) -> usize {
        self.divisions.iter().filter(|d| d.readable_unit).count()
    }
}
