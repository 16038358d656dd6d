use std::fs;
use std::path::PathBuf;

use dotenvy::dotenv;

use folio_backend::import_settings::ImportConfig;
use folio_backend::logger;
use folio_backend::tei_import::markup::{Node, NodeKind};
use folio_backend::tei_import::segmenter::is_excluded;
use folio_backend::tei_import::{ImportedWork, TeiImporter};

pub fn test_setup() {
    dotenv().ok();
    logger::init_logger(&std::env::temp_dir().join("folio-test-logs"));
}

pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

#[allow(dead_code)]
pub fn read_fixture(name: &str) -> String {
    fs::read_to_string(data_path(name)).unwrap()
}

#[allow(dead_code)]
pub fn import_fixture(name: &str, config: ImportConfig) -> ImportedWork {
    TeiImporter::new(config).import_file(&data_path(name)).unwrap()
}

/// Text of a node without the parts the importer leaves out.
#[allow(dead_code)]
pub fn visible_text(node: &Node) -> String {
    match node.kind {
        NodeKind::Text => return node.text.clone().unwrap_or_default(),
        NodeKind::Comment | NodeKind::ProcessingInstruction => return String::new(),
        _ => {}
    }
    node.children.iter()
        .filter(|c| !(c.is_element() && is_excluded(c)))
        .map(visible_text)
        .collect::<Vec<String>>()
        .join("")
}

#[allow(dead_code)]
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}
