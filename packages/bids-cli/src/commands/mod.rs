pub mod check;
pub mod scan;
pub mod select;

use crate::exit_codes;
use bids_catalog::{CatalogConfig, CatalogError};
use std::path::Path;

/// Resolve scan options from the config file and environment.
pub fn load_config(config_path: Option<&str>) -> Result<CatalogConfig, String> {
    CatalogConfig::load(config_path.map(Path::new)).map_err(|e| match config_path {
        Some(path) => format!("Failed to load config '{}': {}", path, e),
        None => e.to_string(),
    })
}

/// Exit code for a library error.
pub fn exit_code_for(err: &CatalogError) -> i32 {
    match err {
        CatalogError::InvalidSelectionKey { .. }
        | CatalogError::MalformedRange { .. }
        | CatalogError::InvalidPrefix { .. }
        | CatalogError::Pattern(_)
        | CatalogError::Config(_)
        | CatalogError::RootNotFound(_)
        | CatalogError::RootNotADirectory(_) => exit_codes::INPUT_ERROR,
        CatalogError::DirtyCatalog { .. } | CatalogError::Validation(_) => {
            exit_codes::DIRTY_DATASET
        }
        _ => exit_codes::EXECUTION_ERROR,
    }
}

/// Print a library error and return its exit code.
pub fn report(err: &CatalogError) -> i32 {
    eprintln!("Error: {}", err);
    exit_code_for(err)
}
