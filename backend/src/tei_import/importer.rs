use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::import_settings::ImportConfig;
use crate::logger;
use crate::tei_import::encoding::read_markup_file;
use crate::tei_import::errors::{ConfigurationError, ImportError};
use crate::tei_import::header::read_work_info;
use crate::tei_import::import_context::ImportContext;
use crate::tei_import::markup::{parse_document, Node};
use crate::tei_import::normalize::{IdentityNormalizer, TextNormalizer};
use crate::tei_import::segmenter::Segmenter;
use crate::tei_import::states::{active_state_set, StateSet};
use crate::tei_import::types::ImportedWork;
use crate::tei_import::verses::{VerseError, VerseExtractor};

/// Segments TEI documents into divisions and verses.
///
/// The importer is stateless between documents, so one instance can be
/// shared by several worker threads.
pub struct TeiImporter {
    config: ImportConfig,
    normalizer: Box<dyn TextNormalizer>,
}

impl TeiImporter {
    pub fn new(config: ImportConfig) -> Self {
        TeiImporter {
            config,
            normalizer: Box::new(IdentityNormalizer),
        }
    }

    pub fn with_normalizer<N: TextNormalizer + 'static>(mut self, normalizer: N) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Read, decode and segment a file. The file stem is the fallback title.
    pub fn import_file(&self, path: &Path) -> Result<ImportedWork> {
        let content = read_markup_file(path)?;
        let fallback = path.file_stem().and_then(|s| s.to_str());
        let imported = self.import_str(&content, fallback)
            .with_context(|| format!("Failed to import {:?}", path))?;
        Ok(imported)
    }

    /// Segment a document held in memory.
    pub fn import_str(&self, content: &str, fallback_title: Option<&str>) -> Result<ImportedWork, ImportError> {
        let doc = parse_document(content).map_err(|source| ImportError::Markup {
            work_title: fallback_title.unwrap_or("Untitled").to_string(),
            source,
        })?;
        self.import_document(&doc, fallback_title)
    }

    /// Segment an already parsed document.
    pub fn import_document(&self, doc: &Node, fallback_title: Option<&str>) -> Result<ImportedWork, ImportError> {
        let work = read_work_info(doc, fallback_title);
        let config_error = |source: ConfigurationError| ImportError::Configuration {
            work_title: work.title.clone(),
            source,
        };

        let states = active_state_set(doc, self.config.state_set).map_err(config_error)?;
        let body = doc.find_first("body").ok_or(ConfigurationError::MissingBody).map_err(config_error)?;

        let use_line_count = self.config.use_line_count_for_divisions.unwrap_or(work.line_numbered);

        logger::info(&format!(
            "Importing \"{}\" with state set {} ({} states), line titles: {}",
            work.title, self.config.state_set, states.len(), use_line_count
        ));

        let mut ctx = ImportContext::new();
        self.segment(body, &states, work.language.as_deref(), use_line_count, &mut ctx)
            .map_err(|e| self.contextualize(e, &work.title, &ctx))?;

        logger::info(&format!(
            "Imported {} divisions, {} verses of \"{}\" ({} anomalies)",
            ctx.divisions.len(), ctx.verses.len(), work.title, ctx.diagnostics.len()
        ));

        Ok(ImportedWork {
            work,
            divisions: ctx.divisions,
            verses: ctx.verses,
            diagnostics: ctx.diagnostics,
        })
    }

    fn segment(&self, body: &Node, states: &StateSet, language: Option<&str>, use_line_count: bool, ctx: &mut ImportContext) -> Result<(), VerseError> {
        Segmenter::new(states, &self.config, self.normalizer.as_ref())
            .with_language(language)
            .with_line_count(use_line_count)
            .run(body, ctx)?;

        VerseExtractor::new(states, self.normalizer.as_ref())
            .with_language(language)
            .only_leaf_divisions(self.config.only_leaf_divisions_readable)
            .run(ctx)?;

        Ok(())
    }

    fn contextualize(&self, e: VerseError, work_title: &str, ctx: &ImportContext) -> ImportError {
        let work_title = work_title.to_string();
        match e {
            VerseError::Markup(source) => ImportError::Markup { work_title, source },
            VerseError::Accumulation(source) => ImportError::Accumulation {
                work_title,
                last_boundary: ctx.last_boundary(),
                source,
            },
        }
    }
}

/// Declared State Sets of a document, for inspection.
pub fn declared_state_sets(content: &str) -> Result<Vec<StateSet>> {
    let doc = parse_document(content)?;
    let sets = crate::tei_import::states::resolve_state_sets(&doc)?;
    Ok(sets)
}

/// All `*.xml` files under `dir`, sorted by path.
pub fn find_markup_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|x| x.eq_ignore_ascii_case("xml")).unwrap_or(false))
        .collect();
    files.sort();
    files
}
