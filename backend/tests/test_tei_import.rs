use folio_backend::import_settings::ImportConfig;
use folio_backend::tei_import::markup::parse_document;
use folio_backend::tei_import::{AnomalyKind, ConfigurationError, ImportError, ImportedWork, TeiImporter};
use folio_backend::types::StateSetSelector;

mod helpers;
use helpers as h;

fn config_with_state_set(selector: StateSetSelector) -> ImportConfig {
    ImportConfig {
        state_set: selector,
        ..Default::default()
    }
}

fn descriptors(w: &ImportedWork) -> Vec<&str> {
    w.divisions.iter().map(|d| d.descriptor.as_str()).collect()
}

fn indicators(w: &ImportedWork, division: usize) -> Vec<&str> {
    w.verses_of(division).map(|v| v.indicator.as_str()).collect()
}

/// Checks that hold for every imported Work.
fn assert_well_formed(w: &ImportedWork) {
    for (i, d) in w.divisions.iter().enumerate() {
        assert_eq!(d.sequence_number, i as i32 + 1, "sequence numbers are contiguous");

        let has_verses = w.verses_of(i).next().is_some();
        assert_eq!(d.readable_unit, has_verses, "division {} readable flag", d.sequence_number);

        if let Some(p) = d.parent {
            assert!(w.divisions[p].sequence_number < d.sequence_number);
        }
    }

    for (i, _) in w.divisions.iter().enumerate() {
        let seqs: Vec<i32> = w.verses_of(i).map(|v| v.sequence_number).collect();
        let expected: Vec<i32> = (1..=seqs.len() as i32).collect();
        assert_eq!(seqs, expected);
    }
}

/// Division contents, concatenated in order, hold the same text as the body.
fn assert_round_trip(source: &str, w: &ImportedWork) {
    let doc = parse_document(source).unwrap();
    let body = doc.find_first("body").unwrap();
    let expected = h::normalize_space(&h::visible_text(body));

    let parts: Vec<String> = w.divisions.iter()
        .map(|d| {
            let chapter = parse_document(&d.original_content).unwrap();
            h::visible_text(&chapter)
        })
        .collect();
    let actual = h::normalize_space(&parts.join(" "));

    assert_eq!(actual, expected);
}

#[test]
fn test_state_set_zero_uses_book_and_section() {
    h::test_setup();
    let w = h::import_fixture("two_state_sets.xml", config_with_state_set(StateSetSelector::Index(0)));

    assert_eq!(w.work.title, "Hellenica");
    assert_eq!(w.work.authors, vec!["Xenophon".to_string()]);
    assert_eq!(w.work.editors, vec!["E. C. Marchant".to_string()]);
    assert_eq!(w.work.language.as_deref(), Some("Greek"));

    assert_eq!(descriptors(&w), vec!["1", "2"]);
    assert!(w.divisions.iter().all(|d| d.division_type.as_deref() == Some("book")));

    assert_eq!(indicators(&w, 0), vec!["1", "2"]);
    assert_eq!(indicators(&w, 1), vec!["1", "2"]);

    let v = w.verses_of(0).nth(1).unwrap();
    assert_eq!(v.content.trim(), "Beta text.");
    assert!(v.original_content.starts_with("<verse>"));
    assert!(v.original_content.contains(r#"<hi rend="italics">text</hi>"#));

    assert_well_formed(&w);
    assert_round_trip(&h::read_fixture("two_state_sets.xml"), &w);
}

#[test]
fn test_state_set_one_uses_cards_without_verse_markers() {
    h::test_setup();
    let w = h::import_fixture("two_state_sets.xml", config_with_state_set(StateSetSelector::Index(1)));

    assert_eq!(descriptors(&w), vec!["1", "5"]);
    assert!(w.divisions.iter().all(|d| d.division_type.as_deref() == Some("card")));

    // No verse markers in this set: one verse per run of text, without a label.
    assert_eq!(w.verses.len(), 2);
    assert!(w.verses.iter().all(|v| v.indicator.is_empty()));
    assert!(w.verses[0].content.contains("Alpha text."));
    assert!(w.verses[0].content.contains("Gamma text."));

    assert_well_formed(&w);
    assert_round_trip(&h::read_fixture("two_state_sets.xml"), &w);
}

#[test]
fn test_state_set_out_of_range_is_fatal() {
    h::test_setup();
    let importer = TeiImporter::new(config_with_state_set(StateSetSelector::Index(4)));
    let err = importer.import_str(&h::read_fixture("two_state_sets.xml"), None).unwrap_err();

    match err {
        ImportError::Configuration { work_title, source } => {
            assert_eq!(work_title, "Hellenica");
            assert_eq!(source, ConfigurationError::StateSetOutOfRange { index: 4, available: 2 });
        }
        e => panic!("unexpected error: {:?}", e),
    }
}

#[test]
fn test_level_repair_and_synthetic_division() {
    h::test_setup();
    let w = h::import_fixture("level_jumps.xml", ImportConfig::default());

    let levels: Vec<i32> = w.divisions.iter().map(|d| d.level).collect();
    assert_eq!(levels, vec![1, 1, 2, 3, 2, 1, 2]);
    assert_eq!(descriptors(&w), vec!["1", "a", "b", "c", "d", "e", "f"]);

    let parents: Vec<Option<i32>> = w.divisions.iter()
        .map(|d| d.parent.map(|p| w.divisions[p].sequence_number))
        .collect();
    assert_eq!(parents, vec![None, None, Some(2), Some(3), Some(2), None, Some(6)]);

    // The last level-2 division hangs under "e", not under "b" or "d".
    let last = w.divisions.len() - 1;
    assert_eq!(w.ancestors(last), vec![5]);

    // Preface text before any division.
    assert!(w.divisions[0].original_content.contains("Preface before any division."));
    assert_eq!(indicators(&w, 0), vec![""]);

    assert_eq!(indicators(&w, 3), vec!["1", "2"]);
    assert_eq!(w.divisions[1].title.as_deref(), Some("Part A"));
    assert!(!w.divisions[1].original_content.contains("Part A"));
    assert!(!w.divisions[4].original_content.contains("skipped note"));

    // "e" has an unlabeled verse marker.
    assert_eq!(indicators(&w, 5), vec!["1"]);
    let kinds: Vec<AnomalyKind> = w.diagnostics.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AnomalyKind::MissingVerseIndicator]);

    assert_well_formed(&w);
    assert_round_trip(&h::read_fixture("level_jumps.xml"), &w);
}

#[test]
fn test_no_ancestor_attaches_at_root() {
    h::test_setup();
    let xml = r#"<TEI.2><teiHeader><encodingDesc><refsDecl><state unit="section"/></refsDecl></encodingDesc></teiHeader>
        <text><body>
            <div2 n="x"><p>x</p></div2>
            <div3 n="y"><p>y</p></div3>
            <div1 n="z"><p>z</p></div1>
        </body></text></TEI.2>"#;

    let w = TeiImporter::new(ImportConfig::default()).import_str(xml, Some("jumps")).unwrap();

    assert_eq!(w.work.title, "jumps");
    let parents: Vec<Option<usize>> = w.divisions.iter().map(|d| d.parent).collect();
    assert_eq!(parents, vec![None, Some(0), None]);

    let anomaly = w.diagnostics.iter()
        .find(|a| a.kind == AnomalyKind::NoAncestorAtLevel)
        .unwrap();
    assert_eq!(anomaly.division_sequence, Some(2));

    assert_well_formed(&w);
}

#[test]
fn test_line_count_titles() {
    h::test_setup();
    let w = h::import_fixture("line_numbered.xml", ImportConfig::default());

    assert_eq!(w.work.title, "Iliad");
    assert!(w.work.line_numbered);
    assert_eq!(w.work.editors, vec!["Arthur Murray".to_string(), "William Wyatt".to_string()]);

    let titles: Vec<Option<&str>> = w.divisions.iter().map(|d| d.title.as_deref()).collect();
    assert_eq!(titles, vec![Some("lines 1\u{2013}5"), Some("lines 1\u{2013}2")]);
    assert_eq!(w.divisions[0].title_slug, "lines-1-5");
    assert_eq!(w.divisions[0].original_title.as_deref(), Some("Book 1"));

    assert_well_formed(&w);
    assert_round_trip(&h::read_fixture("line_numbered.xml"), &w);
}

#[test]
fn test_line_count_can_be_turned_off() {
    h::test_setup();
    let config = ImportConfig {
        use_line_count_for_divisions: Some(false),
        ..Default::default()
    };
    let w = h::import_fixture("line_numbered.xml", config);

    let titles: Vec<Option<&str>> = w.divisions.iter().map(|d| d.title.as_deref()).collect();
    assert_eq!(titles, vec![Some("Book 1"), Some("Book 2")]);
}

#[test]
fn test_only_leaf_divisions_readable() {
    h::test_setup();
    let xml = r#"<TEI.2><teiHeader><encodingDesc><refsDecl><state unit="line"/></refsDecl></encodingDesc></teiHeader>
        <text><body>
            <div1 n="1"><p>Intro</p>
                <div2 n="1"><p>Body</p></div2>
            </div1>
        </body></text></TEI.2>"#;

    let all = TeiImporter::new(ImportConfig::default()).import_str(xml, None).unwrap();
    assert_eq!(all.readable_count(), 2);

    let config = ImportConfig {
        only_leaf_divisions_readable: true,
        ..Default::default()
    };
    let leaves = TeiImporter::new(config).import_str(xml, None).unwrap();
    assert_eq!(leaves.readable_count(), 1);
    assert!(!leaves.divisions[0].readable_unit);
    assert!(leaves.divisions[1].readable_unit);

    assert_well_formed(&leaves);
}

#[test]
fn test_explicit_division_tags() {
    h::test_setup();
    let xml = r#"<TEI.2><teiHeader><encodingDesc><refsDecl><state unit="line"/></refsDecl></encodingDesc></teiHeader>
        <text><body>
            <div1 n="1"><div2 n="1"><p>a</p></div2><div2 n="2"><p>b</p></div2></div1>
        </body></text></TEI.2>"#;

    let config = ImportConfig {
        explicit_division_tags: Some(vec!["div1".to_string()]),
        ..Default::default()
    };
    let w = TeiImporter::new(config).import_str(xml, None).unwrap();

    assert_eq!(w.divisions.len(), 1);
    assert!(w.divisions[0].original_content.contains(r#"<div2 n="2">"#));
}

#[test]
fn test_import_is_deterministic() {
    h::test_setup();
    let a = h::import_fixture("level_jumps.xml", ImportConfig::default());
    let b = h::import_fixture("level_jumps.xml", ImportConfig::default());

    assert_eq!(a.divisions, b.divisions);
    assert_eq!(a.verses, b.verses);
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn test_markup_error_names_the_work() {
    h::test_setup();
    let err = TeiImporter::new(ImportConfig::default())
        .import_str("<TEI.2><text><body><p>open", Some("broken"))
        .unwrap_err();

    assert!(matches!(err, ImportError::Markup { .. }));
    assert_eq!(err.work_title(), "broken");
}
