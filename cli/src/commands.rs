use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

use folio_backend::db::library::{AuthorCache, LibraryDbHandle};
use folio_backend::import_settings::ImportConfig;
use folio_backend::logger;
use folio_backend::tei_import::{declared_state_sets, find_markup_files, ImportedWork, TeiImporter};
use folio_backend::tei_import::encoding::read_markup_file;
use folio_backend::types::ImportSummary;

fn print_summary(summary: &ImportSummary) {
    println!(
        "{} [{}]: {} divisions ({} readable), {} verses, {} anomalies",
        summary.title,
        summary.slug.as_deref().unwrap_or("-"),
        summary.divisions,
        summary.readable_divisions,
        summary.verses,
        summary.anomalies,
    );
}

fn print_diagnostics(imported: &ImportedWork) {
    for a in imported.diagnostics.iter() {
        match a.division_sequence {
            Some(seq) => println!("  {:?} at division {}: {}", a.kind, seq, a.message),
            None => println!("  {:?}: {}", a.kind, a.message),
        }
    }
}

fn save(db: &LibraryDbHandle, importer: &TeiImporter, path: &Path) -> Result<(ImportedWork, ImportSummary)> {
    let imported = importer.import_file(path)?;
    let mut authors = AuthorCache::new();
    let (_work, summary) = db.save_imported_work(
        &imported,
        path.to_str(),
        importer.config().overwrite_existing,
        &mut authors,
    )?;
    Ok((imported, summary))
}

pub fn import_file(db: &LibraryDbHandle, path: &Path, config: ImportConfig) -> Result<()> {
    if !path.is_file() {
        bail!("Not a file: {:?}", path);
    }
    let importer = TeiImporter::new(config);
    let (imported, summary) = save(db, &importer, path)?;
    print_summary(&summary);
    print_diagnostics(&imported);
    Ok(())
}

/// Import every document under `dir` on `jobs` worker threads.
///
/// Each file is its own transaction, so one failing file leaves the others in place.
pub fn import_dir(db: &LibraryDbHandle, dir: &Path, config: ImportConfig, jobs: usize) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {:?}", dir);
    }

    let files = find_markup_files(dir);
    if files.is_empty() {
        println!("No .xml files found in {:?}", dir);
        return Ok(());
    }

    let jobs = jobs.clamp(1, files.len());
    logger::info(&format!("Importing {} files from {:?} with {} jobs", files.len(), dir, jobs));

    let importer = TeiImporter::new(config);
    let next = AtomicUsize::new(0);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let results: Vec<(PathBuf, Result<ImportSummary>)> = thread::scope(|s| {
        let workers: Vec<_> = (0..jobs)
            .map(|_| {
                s.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        let Some(path) = files.get(i) else { break };
                        let res = save(db, &importer, path).map(|(_, summary)| summary);
                        if let Err(e) = &res {
                            logger::error(&format!("{:?}: {:#}", path, e));
                        }
                        pb.set_message(path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string());
                        pb.inc(1);
                        done.push((path.clone(), res));
                    }
                    done
                })
            })
            .collect();

        workers.into_iter()
            .flat_map(|w| w.join().unwrap_or_default())
            .collect()
    });

    pb.finish_with_message("done");

    let mut failed = 0;
    let mut results = results;
    results.sort_by(|a, b| a.0.cmp(&b.0));
    for (path, res) in results.iter() {
        match res {
            Ok(summary) => print_summary(summary),
            Err(e) => {
                failed += 1;
                eprintln!("Failed: {:?}: {:#}", path, e);
            }
        }
    }

    println!("Imported {} of {} files", results.len() - failed, results.len());
    if failed > 0 {
        bail!("{} files failed to import", failed);
    }
    Ok(())
}

pub fn print_states(path: &Path) -> Result<()> {
    let content = read_markup_file(path)?;
    let sets = declared_state_sets(&content)
        .with_context(|| format!("Failed to read state sets of {:?}", path))?;

    if sets.is_empty() {
        println!("No state sets declared");
    }

    for (i, set) in sets.iter().enumerate() {
        println!("{}:", i);
        for state in set.iter() {
            match &state.chunk_label {
                Some(label) => println!("  {} (level {}, chunk \"{}\")", state.unit, state.level, label),
                None => println!("  {} (level {})", state.unit, state.level),
            }
        }
    }
    Ok(())
}

pub fn dump(path: &Path, config: ImportConfig) -> Result<()> {
    let importer = TeiImporter::new(config);
    let imported = importer.import_file(path)?;
    let json = serde_json::to_string_pretty(&imported)?;
    println!("{}", json);
    Ok(())
}

pub fn list_works(db: &LibraryDbHandle) -> Result<()> {
    let works = db.list_works()?;
    if works.is_empty() {
        println!("No works in the library");
    }
    for w in works.iter() {
        let authors: Vec<String> = db.get_authors_for_work(w.id)?
            .into_iter()
            .map(|a| a.name)
            .collect();
        let divisions = db.get_divisions_for_work(w.id)?.len();
        let verses = db.count_verses_for_work(w.id)?;
        println!(
            "{}\t{}\t{}\t{}\t{} divisions, {} verses",
            w.title_slug,
            w.title,
            w.language.as_deref().unwrap_or("-"),
            authors.join("; "),
            divisions,
            verses,
        );
    }
    Ok(())
}
