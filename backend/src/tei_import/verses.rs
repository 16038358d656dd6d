//! Verse extraction.
//!
//! Replays each division's stored markup and cuts it at the verse
//! milestones of the active State Set.

use thiserror::Error;

use crate::logger;
use crate::tei_import::accumulator::BufNodeId;
use crate::tei_import::errors::{AccumulationError, AnomalyKind, MarkupError};
use crate::tei_import::import_context::ImportContext;
use crate::tei_import::markup::{parse_document, Node, NodeKind};
use crate::tei_import::normalize::TextNormalizer;
use crate::tei_import::segmenter::{is_excluded, CHAPTER_TAG};
use crate::tei_import::states::StateSet;

/// Root element of a verse's stored markup.
pub const VERSE_TAG: &str = "verse";

#[derive(Error, Debug)]
pub enum VerseError {
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    Accumulation(#[from] AccumulationError),
}

pub struct VerseExtractor<'a> {
    states: &'a StateSet,
    normalizer: &'a dyn TextNormalizer,
    language: Option<&'a str>,
    only_leaf_divisions: bool,
}

impl<'a> VerseExtractor<'a> {
    pub fn new(states: &'a StateSet, normalizer: &'a dyn TextNormalizer) -> Self {
        VerseExtractor {
            states,
            normalizer,
            language: None,
            only_leaf_divisions: false,
        }
    }

    pub fn with_language(mut self, language: Option<&'a str>) -> Self {
        self.language = language;
        self
    }

    /// Skip divisions that contain other divisions.
    pub fn only_leaf_divisions(mut self, enabled: bool) -> Self {
        self.only_leaf_divisions = enabled;
        self
    }

    /// Extract verses for every division in `ctx`. Returns the number created.
    pub fn run(&self, ctx: &mut ImportContext) -> Result<usize, VerseError> {
        let before = ctx.verses.len();

        let is_parent = if self.only_leaf_divisions { ctx.parent_flags() } else { Vec::new() };

        for index in 0..ctx.divisions.len() {
            if is_parent.get(index).copied().unwrap_or(false) {
                continue;
            }
            self.extract_division(index, ctx)?;
        }

        Ok(ctx.verses.len() - before)
    }

    pub fn extract_division(&self, index: usize, ctx: &mut ImportContext) -> Result<(), VerseError> {
        if ctx.divisions[index].original_content.is_empty() {
            return Ok(());
        }

        let doc = parse_document(&ctx.divisions[index].original_content)?;
        let root = doc.children.iter()
            .find(|c| c.is(CHAPTER_TAG))
            .ok_or_else(|| MarkupError::MissingElement(CHAPTER_TAG.to_string()))?;

        ctx.enter_division(index);
        self.walk(root, None, ctx)?;
        self.close_verse(ctx)?;

        logger::debug(&format!(
            "Division {}: {} verses",
            ctx.divisions[index].sequence_number,
            ctx.verses_in_division()
        ));

        Ok(())
    }

    fn is_verse_marker(&self, node: &Node) -> bool {
        node.is("milestone")
            && node.attr("unit")
                .and_then(|u| self.states.find(u))
                .map(|s| !s.is_chunk())
                .unwrap_or(false)
    }

    fn close_verse(&self, ctx: &mut ImportContext) -> Result<(), AccumulationError> {
        if let Some(v) = ctx.current_verse {
            ctx.verses[v].original_content = ctx.buffer.close()?;
        }
        Ok(())
    }

    fn start_verse(&self, ctx: &mut ImportContext, indicator: String) -> Result<BufNodeId, AccumulationError> {
        self.close_verse(ctx)?;
        ctx.push_verse(indicator).ok_or(AccumulationError::NotOpen)?;
        Ok(ctx.buffer.open(VERSE_TAG))
    }

    /// Same contract as the division walk: returns the new verse root if a
    /// verse was opened below `node`.
    ///
    /// `parent` is `None` until the first verse opens; content before it is
    /// only kept if it holds text, which opens a verse itself.
    fn walk(&self, node: &Node, parent: Option<BufNodeId>, ctx: &mut ImportContext) -> Result<Option<BufNodeId>, AccumulationError> {
        let mut parent = parent;
        let mut new_root = None;

        for child in &node.children {
            match child.kind {
                NodeKind::Comment | NodeKind::ProcessingInstruction | NodeKind::Document => continue,

                NodeKind::Text => {
                    let text = child.text.as_deref().unwrap_or("");
                    if !text.trim().is_empty() {
                        if ctx.current_verse.is_none() {
                            let root = self.start_verse(ctx, String::new())?;
                            parent = Some(root);
                            new_root = Some(root);
                        }
                        if let Some(v) = ctx.current_verse {
                            let normalized = self.normalizer.normalize(text, self.language);
                            ctx.verses[v].content.push_str(&normalized);
                        }
                    }
                    if let Some(p) = parent {
                        ctx.buffer.append_shallow(p, child)?;
                    }
                }

                NodeKind::Element => {
                    if is_excluded(child) {
                        continue;
                    }

                    if self.is_verse_marker(child) {
                        let indicator = match child.attr("n") {
                            Some(n) => n.to_string(),
                            None => {
                                let fallback = (ctx.verses_in_division() + 1).to_string();
                                ctx.anomaly(
                                    AnomalyKind::MissingVerseIndicator,
                                    format!("verse marker without a label, using {}", fallback),
                                );
                                fallback
                            }
                        };
                        let root = self.start_verse(ctx, indicator)?;
                        parent = Some(root);
                        new_root = Some(root);
                        continue;
                    }

                    let copy = match parent {
                        Some(p) => Some(ctx.buffer.append_shallow(p, child)?),
                        None => None,
                    };
                    if let Some(r) = self.walk(child, copy, ctx)? {
                        parent = Some(r);
                        new_root = Some(r);
                    }
                }
            }
        }

        Ok(new_root)
    }
}
