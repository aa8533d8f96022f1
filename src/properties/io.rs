//! Reading and writing `datapackage.json` documents.

use std::fs;
use std::path::Path;

use crate::check::{CheckOptions, ensure_package_properties, ensure_properties};
use crate::error::PackageResult;

use super::PackageProperties;

/// Read package properties from a UTF-8 JSON file.
///
/// This only deserializes; run the checks in [`crate::check`] to find out whether the document
/// conforms.
pub fn read_properties(path: impl AsRef<Path>) -> PackageResult<PackageProperties> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Check package properties and write them as pretty-printed JSON.
///
/// A package without resources is checked on its own; otherwise the whole document is checked.
/// Nothing is written when a check fails.
pub fn write_properties(
    path: impl AsRef<Path>,
    properties: &PackageProperties,
    options: &CheckOptions,
) -> PackageResult<()> {
    let value = serde_json::to_value(properties)?;
    if properties.resources.is_some() {
        ensure_properties(&value, options)?;
    } else {
        ensure_package_properties(&value, options)?;
    }

    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}
