use std::collections::HashMap;

use anyhow::{anyhow, Result};
use diesel::prelude::*;

use crate::db::DatabaseHandle;
use crate::db::library_models::*;
use crate::db::library_schema::{authors, divisions, verses, works, works_authors, works_editors};
use crate::helpers::{slug_with_suffix, slugify};
use crate::logger::info;
use crate::tei_import::types::ImportedWork;
use crate::types::ImportSummary;

pub type LibraryDbHandle = DatabaseHandle;

/// Names which stand for a group or an absence rather than a person.
const META_AUTHOR_NAMES: &[&str] = &["Unknown", "Anonymous", "Various"];

/// Rows per multi-row verse insert, below SQLite's bound variable limit.
const VERSE_INSERT_CHUNK: usize = 1000;

/// Import-scoped author lookups.
///
/// Creation goes through `INSERT OR IGNORE` against the unique name, so two
/// imports racing on the same name both end up with the one stored row.
#[derive(Debug, Default)]
pub struct AuthorCache {
    by_name: HashMap<String, Author>,
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Forget every cached row, e.g. after the transaction that created them rolled back.
    pub fn clear(&mut self) {
        self.by_name.clear();
    }

    pub fn get_or_create(&mut self, db_conn: &mut SqliteConnection, name: &str) -> QueryResult<Author> {
        if let Some(a) = self.by_name.get(name) {
            return Ok(a.clone());
        }

        let name_slug = slugify(name);
        let new_author = NewAuthor {
            name,
            name_slug: &name_slug,
            meta_author: META_AUTHOR_NAMES.iter().any(|m| m.eq_ignore_ascii_case(name)),
        };

        diesel::insert_or_ignore_into(authors::table)
            .values(&new_author)
            .execute(db_conn)?;

        let author = authors::table
            .filter(authors::name.eq(name))
            .select(Author::as_select())
            .first(db_conn)?;

        self.by_name.insert(name.to_string(), author.clone());
        Ok(author)
    }
}

/// First free slug for a title: `iliad`, then `iliad-1`, `iliad-2`, ...
pub fn unique_work_slug(db_conn: &mut SqliteConnection, title: &str) -> QueryResult<String> {
    let base = match slugify(title) {
        s if s.is_empty() => "work".to_string(),
        s => s,
    };

    let mut n = 0;
    loop {
        let candidate = slug_with_suffix(&base, n);
        let taken: i64 = works::table
            .filter(works::title_slug.eq(&candidate))
            .count()
            .get_result(db_conn)?;
        if taken == 0 {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Delete Works with the same title and language. Divisions and verses go with them.
pub fn delete_equivalent_works(db_conn: &mut SqliteConnection, title: &str, language: Option<&str>) -> QueryResult<usize> {
    let same_title = works::table.filter(works::title.eq(title));
    match language {
        Some(lang) => diesel::delete(same_title.filter(works::language.eq(lang))).execute(db_conn),
        None => diesel::delete(same_title.filter(works::language.is_null())).execute(db_conn),
    }
}

/// Persist a segmented Work with its authors, divisions and verses.
///
/// Runs in one transaction: on any error nothing of the Work is stored.
pub fn save_imported_work(
    db_conn: &mut SqliteConnection,
    imported: &ImportedWork,
    source_path: Option<&str>,
    overwrite_existing: bool,
    author_cache: &mut AuthorCache,
) -> Result<(Work, ImportSummary)> {
    let result = db_conn.transaction::<_, anyhow::Error, _>(|db_conn| {
        let meta = &imported.work;

        if overwrite_existing {
            let n = delete_equivalent_works(db_conn, &meta.title, meta.language.as_deref())?;
            if n > 0 {
                info(&format!("Replaced {} existing work(s) titled \"{}\"", n, meta.title));
            }
        }

        let title_slug = unique_work_slug(db_conn, &meta.title)?;

        let work: Work = diesel::insert_into(works::table)
            .values(&NewWork {
                title: &meta.title,
                title_slug: &title_slug,
                language: meta.language.as_deref(),
                source_path,
            })
            .returning(Work::as_returning())
            .get_result(db_conn)?;

        for (position, name) in meta.authors.iter().enumerate() {
            let author = author_cache.get_or_create(db_conn, name)?;
            diesel::insert_or_ignore_into(works_authors::table)
                .values(&NewWorkAuthor { work_id: work.id, author_id: author.id, position: position as i32 })
                .execute(db_conn)?;
        }

        for (position, name) in meta.editors.iter().enumerate() {
            let author = author_cache.get_or_create(db_conn, name)?;
            diesel::insert_or_ignore_into(works_editors::table)
                .values(&NewWorkEditor { work_id: work.id, author_id: author.id, position: position as i32 })
                .execute(db_conn)?;
        }

        // Arena order puts every parent before its children.
        let mut division_ids: Vec<i32> = Vec::with_capacity(imported.divisions.len());
        for d in imported.divisions.iter() {
            let parent_division_id = match d.parent {
                Some(p) => Some(*division_ids.get(p).ok_or_else(|| {
                    anyhow!("Division {} refers to parent {} which is not stored yet", d.sequence_number, p)
                })?),
                None => None,
            };

            let id: i32 = diesel::insert_into(divisions::table)
                .values(&NewDivisionRow {
                    work_id: work.id,
                    parent_division_id,
                    sequence_number: d.sequence_number,
                    level: d.level,
                    descriptor: &d.descriptor,
                    title: d.title.as_deref(),
                    original_title: d.original_title.as_deref(),
                    title_slug: &d.title_slug,
                    division_type: d.division_type.as_deref(),
                    readable_unit: d.readable_unit,
                    original_content: &d.original_content,
                })
                .returning(divisions::id)
                .get_result(db_conn)?;

            division_ids.push(id);
        }

        let mut rows: Vec<NewVerseRow> = Vec::with_capacity(imported.verses.len());
        for v in imported.verses.iter() {
            let division_id = *division_ids.get(v.division)
                .ok_or_else(|| anyhow!("Verse {} refers to unknown division {}", v.sequence_number, v.division))?;
            rows.push(NewVerseRow {
                division_id,
                sequence_number: v.sequence_number,
                indicator: &v.indicator,
                content: &v.content,
                original_content: &v.original_content,
            });
        }

        for chunk in rows.chunks(VERSE_INSERT_CHUNK) {
            diesel::insert_into(verses::table)
                .values(chunk)
                .execute(db_conn)?;
        }

        let summary = ImportSummary {
            title: work.title.clone(),
            slug: Some(work.title_slug.clone()),
            divisions: imported.divisions.len(),
            readable_divisions: imported.readable_count(),
            verses: imported.verses.len(),
            anomalies: imported.diagnostics.len(),
        };

        Ok((work, summary))
    });

    if result.is_err() {
        author_cache.clear();
    }

    result
}

impl LibraryDbHandle {
    /// Save under the write lock. See [`save_imported_work`].
    pub fn save_imported_work(
        &self,
        imported: &ImportedWork,
        source_path: Option<&str>,
        overwrite_existing: bool,
        author_cache: &mut AuthorCache,
    ) -> Result<(Work, ImportSummary)> {
        let _lock = self.write_lock.lock();
        let mut db_conn = self.get_conn()?;
        let (work, summary) = save_imported_work(&mut db_conn, imported, source_path, overwrite_existing, author_cache)?;
        info(&format!(
            "Saved \"{}\" as {} ({} divisions, {} verses)",
            work.title, work.title_slug, summary.divisions, summary.verses
        ));
        Ok((work, summary))
    }

    pub fn list_works(&self) -> Result<Vec<Work>> {
        self.do_read(|db_conn| {
            works::table
                .order((works::title.asc(), works::id.asc()))
                .select(Work::as_select())
                .load(db_conn)
        })
    }

    pub fn get_work_by_slug(&self, slug: &str) -> Result<Option<Work>> {
        self.do_read(|db_conn| {
            works::table
                .filter(works::title_slug.eq(slug))
                .select(Work::as_select())
                .first(db_conn)
                .optional()
        })
    }

    pub fn get_authors_for_work(&self, work_id: i32) -> Result<Vec<Author>> {
        self.do_read(|db_conn| {
            works_authors::table
                .inner_join(authors::table)
                .filter(works_authors::work_id.eq(work_id))
                .order(works_authors::position.asc())
                .select(Author::as_select())
                .load(db_conn)
        })
    }

    pub fn get_editors_for_work(&self, work_id: i32) -> Result<Vec<Author>> {
        self.do_read(|db_conn| {
            works_editors::table
                .inner_join(authors::table)
                .filter(works_editors::work_id.eq(work_id))
                .order(works_editors::position.asc())
                .select(Author::as_select())
                .load(db_conn)
        })
    }

    /// Divisions of a Work in document order.
    pub fn get_divisions_for_work(&self, work_id: i32) -> Result<Vec<DivisionRow>> {
        self.do_read(|db_conn| {
            divisions::table
                .filter(divisions::work_id.eq(work_id))
                .order(divisions::sequence_number.asc())
                .select(DivisionRow::as_select())
                .load(db_conn)
        })
    }

    pub fn get_verses_for_division(&self, division_id: i32) -> Result<Vec<VerseRow>> {
        self.do_read(|db_conn| {
            verses::table
                .filter(verses::division_id.eq(division_id))
                .order(verses::sequence_number.asc())
                .select(VerseRow::as_select())
                .load(db_conn)
        })
    }

    pub fn count_verses_for_work(&self, work_id: i32) -> Result<i64> {
        self.do_read(|db_conn| {
            verses::table
                .inner_join(divisions::table)
                .filter(divisions::work_id.eq(work_id))
                .count()
                .get_result(db_conn)
        })
    }

    /// Returns false when no Work had this id.
    pub fn delete_work(&self, work_id: i32) -> Result<bool> {
        let n = self.do_write(|db_conn| {
            diesel::delete(works::table.filter(works::id.eq(work_id))).execute(db_conn)
        })?;
        Ok(n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::connection::SimpleConnection;
    use diesel_migrations::MigrationHarness;

    use crate::db::LIBRARY_MIGRATIONS;

    fn memory_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
        conn.run_pending_migrations(LIBRARY_MIGRATIONS).unwrap();
        conn
    }

    #[test]
    fn test_author_cache_reuses_rows() {
        let mut conn = memory_conn();
        let mut cache = AuthorCache::new();

        let a = cache.get_or_create(&mut conn, "Homer").unwrap();
        let b = cache.get_or_create(&mut conn, "Homer").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.name_slug, "homer");
        assert!(!a.meta_author);

        // A fresh cache finds the stored row instead of inserting a second one.
        let mut other = AuthorCache::new();
        let c = other.get_or_create(&mut conn, "Homer").unwrap();
        assert_eq!(a.id, c.id);

        let count: i64 = authors::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_meta_author() {
        let mut conn = memory_conn();
        let mut cache = AuthorCache::new();
        let a = cache.get_or_create(&mut conn, "Unknown").unwrap();
        assert!(a.meta_author);
    }

    #[test]
    fn test_unique_work_slug() {
        let mut conn = memory_conn();
        assert_eq!(unique_work_slug(&mut conn, "Iliad").unwrap(), "iliad");

        for slug in ["iliad", "iliad-1"] {
            diesel::insert_into(works::table)
                .values(&NewWork { title: "Iliad", title_slug: slug, language: None, source_path: None })
                .execute(&mut conn)
                .unwrap();
        }
        assert_eq!(unique_work_slug(&mut conn, "Iliad").unwrap(), "iliad-2");
        assert_eq!(unique_work_slug(&mut conn, "!!!").unwrap(), "work");
    }

    #[test]
    fn test_delete_equivalent_works_matches_language() {
        let mut conn = memory_conn();
        for (slug, lang) in [("a", Some("grc")), ("b", Some("en")), ("c", None)] {
            diesel::insert_into(works::table)
                .values(&NewWork { title: "Iliad", title_slug: slug, language: lang, source_path: None })
                .execute(&mut conn)
                .unwrap();
        }

        assert_eq!(delete_equivalent_works(&mut conn, "Iliad", Some("grc")).unwrap(), 1);
        assert_eq!(delete_equivalent_works(&mut conn, "Iliad", None).unwrap(), 1);

        let left: Vec<String> = works::table.select(works::title_slug).load(&mut conn).unwrap();
        assert_eq!(left, vec!["b".to_string()]);
    }
}
