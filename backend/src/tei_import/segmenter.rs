//! Division tree builder.
//!
//! One pre-order walk over `<body>`. Each node is classified against the
//! active [`StateSet`]:
//!
//! - `divN` elements open a division at level N (or at the level of a state
//!   named like the element's `type`)
//! - chunk milestones open a division at their state's level
//! - verse milestones make sure a division is open and are kept as content
//!   for the verse replay
//! - everything else is copied into the open buffer
//!
//! A division's buffer is closed when the next division opens, or at the end.

use lazy_static::lazy_static;
use regex::Regex;

use crate::helpers::slugify;
use crate::import_settings::ImportConfig;
use crate::logger;
use crate::tei_import::accumulator::BufNodeId;
use crate::tei_import::errors::{AccumulationError, AnomalyKind};
use crate::tei_import::import_context::ImportContext;
use crate::tei_import::markup::{Node, NodeKind};
use crate::tei_import::normalize::TextNormalizer;
use crate::tei_import::states::{State, StateSet};
use crate::tei_import::types::Division;

lazy_static! {
    static ref RE_DIV_TAG: Regex = Regex::new(r"^div(\d+)$").unwrap();
}

/// Root element of a division's stored markup.
pub const CHAPTER_TAG: &str = "chapter";

/// How deep below a `divN` the heading is looked for.
const HEAD_SEARCH_DEPTH: usize = 5;

/// Headings, title notes and tables of contents never reach division or verse content.
pub fn is_excluded(node: &Node) -> bool {
    match node.tag_name() {
        "head" => true,
        "note" => node.attr("type") == Some("title"),
        "list" => node.attr("type") == Some("toc"),
        _ => false,
    }
}

pub fn is_line_marker(node: &Node) -> bool {
    node.is("l") || (node.is("milestone") && node.attr("unit") == Some("line"))
}

/// The first `head` within a division, not looking into nested divisions or past milestones.
pub fn find_heading(node: &Node) -> Option<&Node> {
    find_heading_at(node, 0)
}

fn find_heading_at(node: &Node, depth: usize) -> Option<&Node> {
    if depth >= HEAD_SEARCH_DEPTH {
        return None;
    }
    for child in node.element_children() {
        if child.is("head") {
            return Some(child);
        }
        if child.is("milestone") || RE_DIV_TAG.is_match(child.tag_name()) {
            continue;
        }
        if let Some(h) = find_heading_at(child, depth + 1) {
            return Some(h);
        }
    }
    None
}

enum Boundary<'s> {
    Nesting(i32),
    Chunk(&'s State),
    Verse(&'s State),
    Content,
}

/// Attributes of a division about to be opened.
#[derive(Debug, Default)]
struct NewDivision {
    level: i32,
    descriptor: Option<String>,
    title: Option<String>,
    original_title: Option<String>,
    division_type: Option<String>,
}

pub struct Segmenter<'a> {
    states: &'a StateSet,
    config: &'a ImportConfig,
    normalizer: &'a dyn TextNormalizer,
    language: Option<&'a str>,
    use_line_count: bool,
}

impl<'a> Segmenter<'a> {
    pub fn new(states: &'a StateSet, config: &'a ImportConfig, normalizer: &'a dyn TextNormalizer) -> Self {
        Segmenter {
            states,
            config,
            normalizer,
            language: None,
            use_line_count: false,
        }
    }

    pub fn with_language(mut self, language: Option<&'a str>) -> Self {
        self.language = language;
        self
    }

    /// Title divisions by the lines they span instead of their headings.
    pub fn with_line_count(mut self, enabled: bool) -> Self {
        self.use_line_count = enabled;
        self
    }

    /// Build the division tree for `body` into `ctx`.
    pub fn run(&self, body: &Node, ctx: &mut ImportContext) -> Result<(), AccumulationError> {
        // Content before the first boundary collects here until a division claims it.
        let root = ctx.buffer.open(CHAPTER_TAG);
        self.walk(body, root, ctx)?;
        self.close_current(ctx)
    }

    fn nesting_level(&self, node: &Node) -> Option<i32> {
        let caps = RE_DIV_TAG.captures(node.tag_name())?;
        if !self.config.division_tag_allowed(node.tag_name()) {
            return None;
        }
        caps[1].parse::<i32>().ok()
    }

    fn classify(&self, node: &Node) -> Boundary<'a> {
        if !node.is_element() {
            return Boundary::Content;
        }
        if let Some(level) = self.nesting_level(node) {
            return Boundary::Nesting(level);
        }
        if node.is("milestone") {
            let states: &'a StateSet = self.states;
            if let Some(state) = node.attr("unit").and_then(|u| states.find(u)) {
                if state.is_chunk() {
                    return Boundary::Chunk(state);
                }
                return Boundary::Verse(state);
            }
        }
        Boundary::Content
    }

    /// Visit the children of `node`, copying content under `parent`.
    ///
    /// Returns the root of a new buffer if a division was opened somewhere
    /// below, so the caller continues there.
    fn walk(&self, node: &Node, parent: BufNodeId, ctx: &mut ImportContext) -> Result<Option<BufNodeId>, AccumulationError> {
        let mut parent = parent;
        let mut new_root = None;

        for child in &node.children {
            match self.classify(child) {
                Boundary::Nesting(tag_level) => {
                    let root = self.open_nesting_division(child, tag_level, ctx)?;
                    parent = root;
                    new_root = Some(root);

                    if let Some(r) = self.walk(child, root, ctx)? {
                        parent = r;
                        new_root = Some(r);
                    }
                }

                Boundary::Chunk(state) => {
                    let root = self.start_division(ctx, NewDivision {
                        level: state.level,
                        descriptor: child.attr("n").map(str::to_string),
                        division_type: Some(state.unit.clone()),
                        ..Default::default()
                    })?;
                    parent = root;
                    new_root = Some(root);
                }

                Boundary::Verse(state) => {
                    if ctx.current_division.is_none() {
                        self.claim_pending_for_verse(ctx, &state.unit);
                    }
                    if is_line_marker(child) {
                        self.observe_line(child, ctx);
                    }
                    // Kept for the verse replay.
                    ctx.buffer.append_shallow(parent, child)?;
                }

                Boundary::Content => {
                    match child.kind {
                        NodeKind::Comment | NodeKind::ProcessingInstruction => continue,
                        NodeKind::Element if is_excluded(child) => continue,
                        _ => {}
                    }
                    if is_line_marker(child) {
                        self.observe_line(child, ctx);
                    }

                    let copy = ctx.buffer.append_shallow(parent, child)?;
                    if child.is_element() && !child.children.is_empty() {
                        if let Some(r) = self.walk(child, copy, ctx)? {
                            parent = r;
                            new_root = Some(r);
                        }
                    }
                }
            }
        }

        Ok(new_root)
    }

    fn observe_line(&self, marker: &Node, ctx: &mut ImportContext) {
        if let Err(e) = ctx.lines.observe(marker.attr("n")) {
            if self.use_line_count {
                ctx.anomaly(AnomalyKind::BadLineNumber, e.to_string());
            }
        }
    }

    fn open_nesting_division(&self, div: &Node, tag_level: i32, ctx: &mut ImportContext) -> Result<BufNodeId, AccumulationError> {
        let division_type = div.attr("type").map(str::to_string);

        // A state named like the division type decides its level.
        let level = division_type.as_deref()
            .and_then(|t| self.states.find_ignore_case(t))
            .map(|s| s.level)
            .unwrap_or(tag_level);

        let original_title = find_heading(div)
            .map(|h| h.text_content().trim().to_string())
            .filter(|t| !t.is_empty());

        let title = original_title.as_deref()
            .map(|t| self.normalizer.normalize(t, self.language).trim().to_string())
            .filter(|t| !t.is_empty());

        self.start_division(ctx, NewDivision {
            level,
            descriptor: div.attr("n").map(str::to_string),
            title,
            original_title,
            division_type,
        })
    }

    /// Close the open division and open a new one with a fresh buffer.
    /// Line counting starts over at every top-level division.
    fn start_division(&self, ctx: &mut ImportContext, new: NewDivision) -> Result<BufNodeId, AccumulationError> {
        self.close_current(ctx)?;

        let index = self.create_division(ctx, new);
        ctx.current_division = Some(index);

        if ctx.divisions[index].parent.is_none() {
            ctx.lines.rebase();
        }

        Ok(ctx.buffer.open(CHAPTER_TAG))
    }

    /// A verse marker arrived before any division: the pending buffer becomes a level-1 division.
    fn claim_pending_for_verse(&self, ctx: &mut ImportContext, unit: &str) {
        if self.config.auto_create_divisions {
            logger::debug(&format!("Creating a division for '{}' markers found before any division", unit));
            let index = self.create_division(ctx, NewDivision { level: 1, ..Default::default() });
            ctx.current_division = Some(index);
        } else {
            ctx.anomaly(
                AnomalyKind::VerseWithoutDivision,
                format!("'{}' marker appears before any division", unit),
            );
        }
    }

    /// Finalize the open division, or decide what happens to content seen before any division.
    fn close_current(&self, ctx: &mut ImportContext) -> Result<(), AccumulationError> {
        let index = match ctx.current_division {
            Some(i) => i,
            None => {
                if !ctx.buffer.is_open() {
                    return Ok(());
                }
                if !ctx.buffer.has_content() {
                    ctx.buffer.discard();
                    return Ok(());
                }
                if !self.config.auto_create_divisions {
                    ctx.anomaly(
                        AnomalyKind::ContentWithoutDivision,
                        "text before the first division was dropped".to_string(),
                    );
                    ctx.buffer.discard();
                    ctx.lines.close_unit();
                    return Ok(());
                }
                let i = self.create_division(ctx, NewDivision { level: 1, ..Default::default() });
                ctx.current_division = Some(i);
                i
            }
        };

        let content = ctx.buffer.close()?;
        let range = ctx.lines.close_unit();

        let division = &mut ctx.divisions[index];
        division.original_content = content;

        if self.use_line_count {
            if let Some(range) = range {
                let title = range.title();
                division.title_slug = slugify(&title);
                division.title = Some(title);
            }
        }

        Ok(())
    }

    /// Find the parent for a division at `level`, repairing out-of-order levels.
    fn resolve_parent(&self, ctx: &mut ImportContext, level: i32) -> Option<usize> {
        let cur = ctx.current_division?;
        let cur_level = ctx.divisions[cur].level;

        if level == cur_level {
            return ctx.divisions[cur].parent;
        }
        if level == cur_level + 1 {
            return Some(cur);
        }
        if level > cur_level + 1 {
            ctx.anomaly(
                AnomalyKind::SkippedLevel,
                format!("level {} division follows a level {} division", level, cur_level),
            );
            return Some(cur);
        }

        let mut walker = Some(cur);
        while let Some(idx) = walker {
            if ctx.divisions[idx].level == level {
                return ctx.divisions[idx].parent;
            }
            walker = ctx.divisions[idx].parent;
        }

        ctx.anomaly(
            AnomalyKind::NoAncestorAtLevel,
            format!("no open division at level {}, attaching division {} at the root", level, ctx.next_division_sequence()),
        );
        None
    }

    fn create_division(&self, ctx: &mut ImportContext, new: NewDivision) -> usize {
        let level = new.level.max(1);
        let parent = self.resolve_parent(ctx, level);
        let ordinal = ctx.increment_level(level);

        let descriptor = new.descriptor
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| ordinal.to_string());

        let title_slug = new.title.as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&descriptor));

        let sequence_number = ctx.next_division_sequence();

        logger::debug(&format!(
            "Making division {} at level {} (descriptor {}, parent {:?})",
            sequence_number, level, descriptor, parent.map(|p| ctx.divisions[p].sequence_number)
        ));

        ctx.divisions.push(Division {
            sequence_number,
            level,
            descriptor,
            title: new.title,
            original_title: new.original_title,
            title_slug,
            division_type: new.division_type,
            readable_unit: false,
            parent,
            original_content: String::new(),
        });

        ctx.divisions.len() - 1
    }
}
