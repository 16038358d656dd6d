//! Work metadata from the `teiHeader`.

use crate::helpers::{collapse_whitespace, split_names};
use crate::tei_import::markup::Node;
use crate::tei_import::types::WorkInfo;

/// Boilerplate some digitized titles carry.
const TITLE_BOILERPLATE: &str = "(Greek). Machine readable text";

pub fn clean_title(title: &str) -> String {
    collapse_whitespace(title.replace(TITLE_BOILERPLATE, "").trim())
}

/// The first `title` that is not a sub-title.
pub fn title_from_header(header: &Node) -> Option<String> {
    header.find_all("title")
        .into_iter()
        .find(|t| t.attr("type") != Some("sub"))
        .map(|t| clean_title(&t.text_content()))
        .filter(|t| !t.is_empty())
}

pub fn title_from_bibl_struct(bibl_struct: &Node) -> Option<String> {
    bibl_struct.find_first("title")
        .map(|t| clean_title(&t.text_content()))
        .filter(|t| !t.is_empty())
}

pub fn language(header: &Node) -> Option<String> {
    header.find_first("language")
        .map(|l| l.text_content().trim().to_string())
        .filter(|l| !l.is_empty())
}

/// Author of the first `biblStruct`, else the first `author` anywhere in the header.
pub fn authors(header: &Node) -> Vec<String> {
    let from_bibl = header.find_first("biblStruct")
        .and_then(|b| b.find_first("author"));

    from_bibl.or_else(|| header.find_first("author"))
        .map(|a| collapse_whitespace(a.text_content().trim()))
        .filter(|a| !a.is_empty())
        .into_iter()
        .collect()
}

/// Every `editor` in header order, with multi-name credits split and duplicates dropped.
pub fn editors(header: &Node) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for editor in header.find_all("editor") {
        for name in split_names(&editor.text_content()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// True if the first `step` declares line references.
pub fn uses_line_numbers(header: &Node) -> bool {
    header.find_first("step")
        .map(|s| s.attr("refunit") == Some("line"))
        .unwrap_or(false)
}

/// Read everything the importer needs from the document.
///
/// `fallback_title` is used when neither the header nor a `biblStruct` has a title.
pub fn read_work_info(doc: &Node, fallback_title: Option<&str>) -> WorkInfo {
    let Some(header) = doc.find_first("teiHeader") else {
        return WorkInfo {
            title: fallback_title.unwrap_or("Untitled").to_string(),
            ..Default::default()
        };
    };

    let title = title_from_header(header)
        .or_else(|| header.find_first("biblStruct").and_then(title_from_bibl_struct))
        .or_else(|| fallback_title.map(str::to_string))
        .unwrap_or_else(|| "Untitled".to_string());

    WorkInfo {
        title,
        language: language(header),
        authors: authors(header),
        editors: editors(header),
        line_numbered: uses_line_numbers(header),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tei_import::markup::parse_document;

    const DOC: &str = r#"<TEI.2><teiHeader>
<fileDesc>
  <titleStmt>
    <title type="sub">A subtitle</title>
    <title>Plutarch's Moralia (Greek). Machine readable text</title>
    <author>Plutarch</author>
    <editor role="editor">Harold Cherniss and William C. Helmbold</editor>
  </titleStmt>
  <sourceDesc><biblStruct><monogr>
    <author>Plutarchus</author>
    <title>Moralia</title>
    <editor>William C. Helmbold</editor>
  </monogr></biblStruct></sourceDesc>
</fileDesc>
<encodingDesc><refsDecl><step refunit="line" from="1"/></refsDecl></encodingDesc>
<profileDesc><langUsage><language id="greek">Greek</language></langUsage></profileDesc>
</teiHeader><text><body/></text></TEI.2>"#;

    #[test]
    fn test_read_work_info() {
        let doc = parse_document(DOC).unwrap();
        let info = read_work_info(&doc, None);

        assert_eq!(info.title, "Plutarch's Moralia");
        assert_eq!(info.language.as_deref(), Some("Greek"));
        assert_eq!(info.authors, vec!["Plutarchus".to_string()]);
        assert_eq!(info.editors, vec!["Harold Cherniss".to_string(), "William C. Helmbold".to_string()]);
        assert!(info.line_numbered);
    }

    #[test]
    fn test_missing_header_uses_fallback_title() {
        let doc = parse_document("<TEI.2><text><body/></text></TEI.2>").unwrap();
        let info = read_work_info(&doc, Some("hom.il"));
        assert_eq!(info.title, "hom.il");
        assert!(info.authors.is_empty());
        assert!(!info.line_numbered);
    }

    #[test]
    fn test_step_with_other_unit() {
        let doc = parse_document(r#"<teiHeader><refsDecl><step refunit="book"/><step refunit="line"/></refsDecl></teiHeader>"#).unwrap();
        assert!(!uses_line_numbers(&doc.children[0]));
    }
}
