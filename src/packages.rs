//! Query the OS package database.

use tracing::debug;

use crate::error::{Result, VariantError};
use crate::model::{OsPackage, Variant};
use crate::process;

/// Parse the tab-separated `name version arch status` listing produced by
/// a variant's `package.list_all` command, keeping only installed packages.
pub fn parse_installed_packages(listing: &str) -> Result<Vec<OsPackage>> {
    let mut res = Vec::new();
    for line in listing.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        let [name, version, arch, status] = fields[..] else {
            return Err(VariantError::file(format!(
                "Unexpected package listing line: {line:?}"
            )));
        };
        if status.starts_with("ii") {
            res.push(OsPackage {
                name: name.to_string(),
                version: version.to_string(),
                arch: arch.to_string(),
                status: "installed".to_string(),
            });
        }
    }
    Ok(res)
}

/// List the installed packages, optionally only those matching `patterns`.
pub fn list_installed_packages(var: &Variant, patterns: &[&str]) -> Result<Vec<OsPackage>> {
    let argv: Vec<String> = var
        .commands
        .package
        .list_all
        .iter()
        .cloned()
        .chain(patterns.iter().map(|pat| pat.to_string()))
        .collect();
    let listing = process::output(&argv)?;
    let installed = parse_installed_packages(&listing)?;
    debug!("{} installed packages on {}", installed.len(), var.name);
    Ok(installed)
}
