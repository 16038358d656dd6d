//! The mutable cursor shared by the division walk and the verse replay.

use std::collections::BTreeMap;

use crate::tei_import::accumulator::ContentBuffer;
use crate::tei_import::errors::{AnomalyKind, StructuralAnomaly};
use crate::tei_import::line_number::LineCounter;
use crate::tei_import::types::{Division, Verse};

/// Import-scoped state. Nothing here outlives one document.
#[derive(Debug, Default)]
pub struct ImportContext {
    /// Division arena; `Division::parent` indexes into it.
    pub divisions: Vec<Division>,
    pub verses: Vec<Verse>,
    pub current_division: Option<usize>,
    pub current_verse: Option<usize>,
    /// Buffer of whichever division or verse is open.
    pub buffer: ContentBuffer,
    pub lines: LineCounter,
    pub diagnostics: Vec<StructuralAnomaly>,
    level_counts: BTreeMap<i32, i32>,
    verses_in_division: i32,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more division at `level` and return the new count.
    pub fn increment_level(&mut self, level: i32) -> i32 {
        let count = self.level_counts.entry(level).or_insert(0);
        *count += 1;
        *count
    }

    pub fn level_count(&self, level: i32) -> i32 {
        self.level_counts.get(&level).copied().unwrap_or(0)
    }

    pub fn current_division(&self) -> Option<&Division> {
        self.current_division.and_then(|i| self.divisions.get(i))
    }

    pub fn current_sequence(&self) -> Option<i32> {
        self.current_division().map(|d| d.sequence_number)
    }

    pub fn next_division_sequence(&self) -> i32 {
        self.divisions.len() as i32 + 1
    }

    /// For each division, whether any other division names it as parent.
    pub fn parent_flags(&self) -> Vec<bool> {
        let mut flags = vec![false; self.divisions.len()];
        for d in &self.divisions {
            if let Some(p) = d.parent {
                flags[p] = true;
            }
        }
        flags
    }

    /// Record a repaired problem against the division currently being built.
    pub fn anomaly(&mut self, kind: AnomalyKind, message: String) {
        let seq = self.current_sequence();
        self.diagnostics.push(StructuralAnomaly::new(kind, seq, message));
    }

    /// Make `index` the division whose verses are being extracted.
    pub fn enter_division(&mut self, index: usize) {
        self.current_division = Some(index);
        self.current_verse = None;
        self.verses_in_division = 0;
    }

    pub fn verses_in_division(&self) -> i32 {
        self.verses_in_division
    }

    /// Append a verse to the current division and mark it readable.
    ///
    /// Returns `None` if no division is current.
    pub fn push_verse(&mut self, indicator: String) -> Option<usize> {
        let division = self.current_division?;
        self.verses_in_division += 1;
        self.verses.push(Verse {
            division,
            sequence_number: self.verses_in_division,
            indicator,
            content: String::new(),
            original_content: String::new(),
        });
        self.divisions[division].readable_unit = true;

        let index = self.verses.len() - 1;
        self.current_verse = Some(index);
        Some(index)
    }

    /// Human-readable description of the last boundary, for error reports.
    pub fn last_boundary(&self) -> String {
        match self.current_division() {
            Some(d) => match self.current_verse.and_then(|v| self.verses.get(v)) {
                Some(v) => format!(
                    "verse {} ({}) of division {} ({})",
                    v.sequence_number, v.indicator, d.sequence_number, d.descriptor
                ),
                None => format!("division {} ({})", d.sequence_number, d.descriptor),
            },
            None => "the start of the document".to_string(),
        }
    }
}
