//! Storage Layer
//!
//! Card catalog contract and its SQLite-backed implementation, plus the
//! application directories used for the database and configuration.

pub mod catalog;
pub mod database;
pub mod import;

use anyhow::Result;
use std::path::PathBuf;

pub use catalog::{CardCatalog, CatalogError, CatalogMatch};
pub use database::SqliteCatalog;
pub use import::{load_cards, save_cards};

/// Database file name inside the data directory
pub const CATALOG_FILE_NAME: &str = "catalog.db";

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "cardlens", "CardLens")
        .ok_or_else(|| anyhow::anyhow!("Could not determine application directories"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Default location of the catalog database
pub fn default_catalog_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(CATALOG_FILE_NAME))
}
