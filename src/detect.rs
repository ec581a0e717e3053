//! Detect the build variant of the running host.
//!
//! Detection runs in two phases. First the `ID` and `VERSION_ID` fields of
//! the os-release file are matched against each variant's rule; if that
//! does not settle it, each variant's legacy release file is examined line
//! by line. In both phases variants are tried in detection order.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::error::{Result, VariantError};
use crate::model::Variant;
use crate::yai::{self, YaiError};

/// The structured OS identification file.
pub const OS_RELEASE: &str = "/etc/os-release";

/// The filesystem tree detection examines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProbe {
    root: PathBuf,
}

impl HostProbe {
    /// Probe the tree rooted at `root`, e.g. a chroot or a test fixture.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Probe the running host.
    pub fn host() -> Self {
        Self::new("/")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an absolute host path within the probed tree.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }

    /// The `ID` and `VERSION_ID` fields, if the os-release file has both.
    fn os_release_ids(&self) -> Result<Option<(String, String)>> {
        let path = self.resolve(Path::new(OS_RELEASE));
        let mut data = match yai::parse(&path) {
            Ok(data) => data,
            Err(YaiError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                debug!("No {} file", path.display());
                return Ok(None);
            }
            Err(source) => return Err(VariantError::OsRelease { path, source }),
        };
        Ok(data.remove("ID").zip(data.remove("VERSION_ID")))
    }

    /// Read a legacy release file; `None` if it does not exist.
    fn read_release_file(&self, var: &Variant) -> Result<Option<String>> {
        let path = self.resolve(&var.detect.filename);
        match fs::read(&path) {
            Ok(contents) => Ok(Some(String::from_utf8_lossy(&contents).into_owned())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(VariantError::ProbeRead {
                variant: var.name.clone(),
                path,
                source,
            }),
        }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::host()
    }
}

fn detect_by_os_release<'a>(
    catalog: &'a Catalog,
    probe: &HostProbe,
) -> Result<Option<&'a Variant>> {
    let Some((os_id, version_id)) = probe.os_release_ids()? else {
        debug!("No ID and VERSION_ID in the os-release file");
        return Ok(None);
    };
    debug!("Looking for a variant with ID {os_id:?} and VERSION_ID {version_id:?}");
    Ok(catalog
        .list_all_variants_in_detection_order()
        .find(|var| {
            trace!("- trying {}", var.name);
            var.detect.os_id == os_id && var.detect.os_version_regex.matches_start(&version_id)
        }))
}

fn detect_by_release_files<'a>(
    catalog: &'a Catalog,
    probe: &HostProbe,
) -> Result<Option<&'a Variant>> {
    for var in catalog.list_all_variants_in_detection_order() {
        trace!("- trying {} via {}", var.name, var.detect.filename.display());
        let Some(contents) = probe.read_release_file(var)? else {
            continue;
        };
        if contents
            .lines()
            .any(|line| var.detect.regex.matches_start(line))
        {
            return Ok(Some(var));
        }
    }
    Ok(None)
}

/// Detect the variant of the tree `probe` examines.
pub fn detect_from<'a>(catalog: &'a Catalog, probe: &HostProbe) -> Result<&'a Variant> {
    if let Some(var) = detect_by_os_release(catalog, probe)? {
        debug!("Detected {} from the os-release file", var.name);
        return Ok(var);
    }
    if let Some(var) = detect_by_release_files(catalog, probe)? {
        debug!("Detected {} from {}", var.name, var.detect.filename.display());
        return Ok(var);
    }
    Err(VariantError::UnknownVariant)
}
