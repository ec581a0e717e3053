//! Detect the Linux distribution variant for the StorPool build system.
//!
//! A *variant* is a Linux distribution and version that StorPool builds
//! packages for: the commands to manage OS packages, the repository files to
//! install, the package names that differ between distributions, and a rule
//! for recognizing the variant on a running host.
//!
//! # Architecture
//!
//! ```text
//! table    declarative list: base records and updates of earlier entries
//!     │
//!     ├── merge    parent record + sparse updates -> complete record
//!     └── catalog  resolved once per process; by name, in detection order
//!             │
//!             ├── detect    os-release ID/VERSION_ID, then legacy release files
//!             ├── packages  installed package listing via the variant's command
//!             └── repo      install the StorPool repository definitions
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! let var = sp_variant::detect()?;
//! println!("{}: {}", var.name, var.descr);
//! let install = var.command("package.install")?;
//! println!("{}", install.join(" "));
//! # Ok::<(), sp_variant::VariantError>(())
//! ```

pub mod catalog;
pub mod detect;
pub mod error;
pub mod merge;
pub mod model;
pub mod packages;
pub mod process;
pub mod repo;
pub mod table;
pub mod yai;

pub use catalog::{build_variants, format_version, program_version, show_variant, Catalog};
pub use detect::{detect_from, HostProbe};
pub use error::{Result, VariantError};
pub use model::{Family, OsPackage, Repo, Variant};
pub use packages::list_installed_packages;
pub use repo::{RepoAction, RepoType, REPO_TYPES};

/// The version of the variant data and tools.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The version of the `show` output format.
pub const FORMAT_VERSION: (u32, u32) = (1, 3);

/// Detect the variant of the running host.
pub fn detect() -> Result<&'static Variant> {
    detect_from(build_variants()?, &HostProbe::host())
}

/// Look a variant up by name.
pub fn get(name: &str) -> Result<&'static Variant> {
    build_variants()?.get(name)
}

/// Look a variant up by its builder alias.
pub fn get_by_alias(alias: &str) -> Result<&'static Variant> {
    build_variants()?.get_by_alias(alias)
}

/// All variants in declaration order.
pub fn list_all_variants() -> Result<Vec<&'static Variant>> {
    Ok(build_variants()?.list_all_variants().collect())
}

/// All variants in the order detection tries them.
pub fn list_all_variants_in_detection_order() -> Result<Vec<&'static Variant>> {
    Ok(build_variants()?
        .list_all_variants_in_detection_order()
        .collect())
}
