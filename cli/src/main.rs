mod commands;

use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;

use folio_backend::db::DatabaseHandle;
use folio_backend::import_settings::ImportConfig;
use folio_backend::logger;
use folio_backend::types::StateSetSelector;
use folio_backend::{get_create_folio_dir, library_db_path};

#[derive(Parser, Debug)]
#[command(author, version, about = "Folio TEI library importer", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Optional path to the Folio data directory.
    /// If not provided, the FOLIO_DIR environment variable will be used.
    #[arg(long, global = true, value_name = "DIRECTORY_PATH", env = "FOLIO_DIR")]
    folio_dir: Option<PathBuf>,

    /// Library database file. Defaults to library.sqlite3 in the data directory.
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Log level for this run: silent, error, warn, info or debug.
    /// Overrides LOG_LEVEL.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import one TEI document into the library
    #[command(arg_required_else_help = true)]
    Import {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[command(flatten)]
        options: ImportArgs,
    },

    /// Import every .xml document under a directory
    #[command(arg_required_else_help = true)]
    ImportDir {
        #[arg(value_name = "DIRECTORY_PATH")]
        path: PathBuf,

        /// Number of documents segmented in parallel
        #[arg(long, short = 'j', default_value_t = 4)]
        jobs: usize,

        #[command(flatten)]
        options: ImportArgs,
    },

    /// Print the state sets a document declares
    #[command(arg_required_else_help = true)]
    States {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Segment a document and print it as JSON without saving it
    #[command(arg_required_else_help = true)]
    Dump {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        #[command(flatten)]
        options: ImportArgs,
    },

    /// List the works in the library
    ListWorks,
}

/// Segmentation options. Flags override values read from `--config`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
struct ImportArgs {
    /// JSON file with import options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// State set index, or `*` to merge all declared state sets
    #[arg(long, value_name = "N|*")]
    state_set: Option<StateSetSelector>,

    /// Treat div1, div2, ... as ordinary content
    #[arg(long)]
    ignore_division_markers: bool,

    /// Title divisions by the line numbers they span
    #[arg(long, conflicts_with = "no_line_count")]
    line_count: bool,

    /// Keep heading titles even when the header counts by line
    #[arg(long)]
    no_line_count: bool,

    /// Only divisions without child divisions get verses
    #[arg(long)]
    only_leaf_readable: bool,

    /// Only these tags open divisions, e.g. div1,div2
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    division_tags: Option<Vec<String>>,

    /// Replace works with the same title and language
    #[arg(long)]
    overwrite: bool,

    /// Drop content found before the first division instead of creating one
    #[arg(long)]
    no_auto_create: bool,
}

impl ImportArgs {
    fn to_config(&self) -> Result<ImportConfig> {
        let mut config = match &self.config {
            Some(path) => ImportConfig::from_json_file(path)?,
            None => ImportConfig::default(),
        };

        if let Some(selector) = self.state_set {
            config.state_set = selector;
        }
        if self.ignore_division_markers {
            config.ignore_division_markers = true;
        }
        if self.line_count {
            config.use_line_count_for_divisions = Some(true);
        } else if self.no_line_count {
            config.use_line_count_for_divisions = Some(false);
        }
        if self.only_leaf_readable {
            config.only_leaf_divisions_readable = true;
        }
        if let Some(tags) = &self.division_tags {
            config.explicit_division_tags = Some(tags.iter().map(|t| t.trim().to_string()).collect());
        }
        if self.overwrite {
            config.overwrite_existing = true;
        }
        if self.no_auto_create {
            config.auto_create_divisions = false;
        }

        Ok(config)
    }
}

fn open_library(folio_dir: &Path, db: Option<PathBuf>) -> Result<DatabaseHandle> {
    let db_path = db.unwrap_or_else(|| library_db_path(folio_dir));
    DatabaseHandle::open_library(&db_path)
}

fn main() {
    // Attempt to load .env file. This might define FOLIO_DIR if it's not
    // already in the environment. Clap will pick it up via `env = "FOLIO_DIR"`.
    // Stdout is kept clean for `dump`.
    dotenv().ok();

    let cli = Cli::parse();

    // Determine the data directory
    // Precedence:
    // - given with --folio-dir
    // - set with env var FOLIO_DIR
    // - get_create_folio_dir()
    let folio_dir = match cli.folio_dir {
        Some(path) => path,
        None => match get_create_folio_dir() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to get Folio directory: {}", e);
                eprintln!("Use the --folio-dir option or set the FOLIO_DIR environment variable.");
                exit(1);
            }
        },
    };

    if !folio_dir.is_dir() {
        eprintln!("Error: Directory does not exist or is not a directory: {:?}", folio_dir);
        exit(1);
    }

    logger::init_logger(&folio_dir);

    if let Some(level) = &cli.log_level {
        if !logger::set_log_level_str(level) {
            eprintln!("Error: Unknown log level: {}", level);
            exit(1);
        }
    }

    // === Execute the requested command ===

    let command_result = match cli.command {
        Commands::Import { path, options } => {
            options.to_config().and_then(|config| {
                let db = open_library(&folio_dir, cli.db)?;
                commands::import_file(&db, &path, config)
            })
        }

        Commands::ImportDir { path, jobs, options } => {
            options.to_config().and_then(|config| {
                let db = open_library(&folio_dir, cli.db)?;
                commands::import_dir(&db, &path, config, jobs)
            })
        }

        Commands::States { path } => commands::print_states(&path),

        Commands::Dump { path, options } => {
            options.to_config().and_then(|config| commands::dump(&path, config))
        }

        Commands::ListWorks => {
            open_library(&folio_dir, cli.db).and_then(|db| commands::list_works(&db))
        }
    };

    if let Err(e) = command_result {
        eprintln!("Error executing command: {:#}", e);
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_flags() {
        let cli = Cli::try_parse_from([
            "folio", "import", "iliad.xml",
            "--state-set", "1",
            "--division-tags", "div1, div2",
            "--line-count",
            "--overwrite",
        ]).unwrap();

        let Commands::Import { path, options } = cli.command else {
            panic!("expected import");
        };
        assert_eq!(path, PathBuf::from("iliad.xml"));

        let config = options.to_config().unwrap();
        assert_eq!(config.state_set, StateSetSelector::Index(1));
        assert_eq!(config.explicit_division_tags, Some(vec!["div1".to_string(), "div2".to_string()]));
        assert_eq!(config.use_line_count_for_divisions, Some(true));
        assert!(config.overwrite_existing);
        assert!(config.auto_create_divisions);
    }

    #[test]
    fn test_global_db_and_log_level() {
        let cli = Cli::try_parse_from([
            "folio", "list-works", "--log-level", "debug", "--folio-dir", "/tmp/folio",
        ]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.db, None);
        assert_eq!(
            library_db_path(cli.folio_dir.as_deref().unwrap()),
            PathBuf::from("/tmp/folio/library.sqlite3"),
        );
    }

    #[test]
    fn test_open_library_defaults_into_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        open_library(dir.path(), None).unwrap();
        assert!(dir.path().join("library.sqlite3").exists());
    }

    #[test]
    fn test_merge_all_selector() {
        let cli = Cli::try_parse_from(["folio", "dump", "a.xml", "--state-set", "*"]).unwrap();
        let Commands::Dump { options, .. } = cli.command else {
            panic!("expected dump");
        };
        assert_eq!(options.to_config().unwrap().state_set, StateSetSelector::MergeAll);
    }

    #[test]
    fn test_line_count_flags_conflict() {
        let res = Cli::try_parse_from(["folio", "import", "a.xml", "--line-count", "--no-line-count"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("import.json");
        std::fs::write(&config_path, r#"{ "state_set": 0, "only_leaf_divisions_readable": true }"#).unwrap();

        let cli = Cli::try_parse_from([
            "folio", "import-dir", "texts",
            "--config", config_path.to_str().unwrap(),
            "--state-set", "2",
            "--jobs", "2",
        ]).unwrap();

        let Commands::ImportDir { jobs, options, .. } = cli.command else {
            panic!("expected import-dir");
        };
        assert_eq!(jobs, 2);

        let config = options.to_config().unwrap();
        assert_eq!(config.state_set, StateSetSelector::Index(2));
        assert!(config.only_leaf_divisions_readable);
    }
}
