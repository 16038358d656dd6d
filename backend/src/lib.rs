pub mod types;
pub mod helpers;
pub mod logger;
pub mod import_settings;
pub mod tei_import;
pub mod db;

use std::env;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::error::Error;
use app_dirs::{get_app_root, AppDataType, AppInfo};

pub const APP_INFO: AppInfo = AppInfo{name: "folio", author: "folio-reader"};

/// Name of the library database file inside the data folder.
pub static LIBRARY_DB_FILENAME: &str = "library.sqlite3";

/// Returns the data folder, creating it if needed.
///
/// `FOLIO_DIR` takes precedence over the platform user data folder.
pub fn get_create_folio_dir() -> Result<PathBuf, Box<dyn Error>> {
    let p = match env::var("FOLIO_DIR") {
        Ok(s) if !s.is_empty() => PathBuf::from(s),
        _ => get_app_root(AppDataType::UserData, &APP_INFO)?,
    };
    if !p.exists() {
        create_dir_all(&p)?;
    }
    Ok(p)
}

/// The library database inside a data folder.
pub fn library_db_path(folio_dir: &Path) -> PathBuf {
    folio_dir.join(LIBRARY_DB_FILENAME)
}
