//! Relative layout of a package directory.
//!
//! ```text
//! <package_root>/datapackage.json
//! <package_root>/resources/<name>/data.parquet
//! <package_root>/resources/<name>/batch/<timestamp>-<uuid>.parquet
//! ```

use std::path::{Path, PathBuf};

pub const PROPERTIES_FILE: &str = "datapackage.json";
pub const RESOURCES_DIR: &str = "resources";
pub const BATCH_DIR: &str = "batch";
pub const DATA_FILE: &str = "data.parquet";

/// The relative data path a resource named `name` must declare.
pub fn resource_data_path(name: &str) -> String {
    format!("{RESOURCES_DIR}/{name}/{DATA_FILE}")
}

pub fn properties_path(package_root: &Path) -> PathBuf {
    package_root.join(PROPERTIES_FILE)
}

pub fn resource_dir(package_root: &Path, name: &str) -> PathBuf {
    package_root.join(RESOURCES_DIR).join(name)
}

pub fn resource_batch_dir(package_root: &Path, name: &str) -> PathBuf {
    resource_dir(package_root, name).join(BATCH_DIR)
}

pub fn resource_data_file(package_root: &Path, name: &str) -> PathBuf {
    resource_dir(package_root, name).join(DATA_FILE)
}
