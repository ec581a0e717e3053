//! The shape of a variant's data.
//!
//! Every record here is plain data: built once by the catalog builder and
//! never mutated afterwards. The JSON projection (`show`) uses the field
//! names as declared, with regular expressions rendered as their pattern.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

use crate::error::{Result, VariantError};
use crate::merge::Updates;

/// A compiled extended-syntax regular expression that remembers its source.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern; whitespace in the pattern is insignificant.
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        RegexBuilder::new(pattern)
            .ignore_whitespace(true)
            .build()
            .map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Does the pattern match at the very start of `text`?
    ///
    /// The match does not have to consume the whole string unless the
    /// pattern itself is anchored at the end.
    pub fn matches_start(&self, text: &str) -> bool {
        self.0.find(text).is_some_and(|found| found.start() == 0)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How to check whether the host is running a particular variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detect {
    /// The legacy release file to examine line by line.
    pub filename: PathBuf,
    /// The pattern to look for in `filename`.
    pub regex: Pattern,
    /// The expected `ID` field of the os-release file.
    pub os_id: String,
    /// The pattern for the os-release `VERSION_ID` field.
    pub os_version_regex: Pattern,
}

impl Detect {
    /// Compile a detection rule, reporting bad patterns against `variant`.
    pub fn new(
        variant: &str,
        filename: &str,
        regex: &str,
        os_id: &str,
        os_version_regex: &str,
    ) -> Result<Self> {
        let compile = |pattern: &str| {
            Pattern::new(pattern).map_err(|err| {
                VariantError::config(variant, format!("invalid pattern {pattern:?}: {err}"))
            })
        };
        Ok(Self {
            filename: PathBuf::from(filename),
            regex: compile(regex)?,
            os_id: os_id.to_string(),
            os_version_regex: compile(os_version_regex)?,
        })
    }
}

/// Commands that deal with OS packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandsPackage {
    pub update_db: Vec<String>,
    pub install: Vec<String>,
    pub list_all: Vec<String>,
    pub purge: Vec<String>,
    pub remove: Vec<String>,
    pub remove_impl: Vec<String>,
}

impl CommandsPackage {
    pub const FIELDS: &'static [&'static str] = &[
        "install",
        "list_all",
        "purge",
        "remove",
        "remove_impl",
        "update_db",
    ];

    pub fn get(&self, name: &str) -> Option<&[String]> {
        match name {
            "update_db" => Some(&self.update_db),
            "install" => Some(&self.install),
            "list_all" => Some(&self.list_all),
            "purge" => Some(&self.purge),
            "remove" => Some(&self.remove),
            "remove_impl" => Some(&self.remove_impl),
            _ => None,
        }
    }
}

/// Commands that deal with OS package files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandsPkgFile {
    pub dep_query: Vec<String>,
    pub install: Vec<String>,
}

impl CommandsPkgFile {
    pub const FIELDS: &'static [&'static str] = &["dep_query", "install"];

    pub fn get(&self, name: &str) -> Option<&[String]> {
        match name {
            "dep_query" => Some(&self.dep_query),
            "install" => Some(&self.install),
            _ => None,
        }
    }
}

/// The distribution-specific commands, grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commands {
    pub package: CommandsPackage,
    pub pkgfile: CommandsPkgFile,
}

impl Commands {
    pub const CATEGORIES: &'static [&'static str] = &["package", "pkgfile"];

    fn category_fields(category: &str) -> Option<&'static [&'static str]> {
        match category {
            "package" => Some(CommandsPackage::FIELDS),
            "pkgfile" => Some(CommandsPkgFile::FIELDS),
            _ => None,
        }
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&[String]> {
        match category {
            "package" => self.package.get(name),
            "pkgfile" => self.pkgfile.get(name),
            _ => None,
        }
    }

    /// All commands as `(category, name, argv)`, sorted by category and name.
    pub fn entries(&self) -> Vec<(&'static str, &'static str, &[String])> {
        Self::CATEGORIES
            .iter()
            .flat_map(|&category| {
                Self::category_fields(category)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(move |&name| {
                        self.get(category, name).map(|argv| (category, name, argv))
                    })
            })
            .collect()
    }
}

/// Apt repository data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebRepo {
    pub codename: String,
    pub vendor: String,
    /// The Apt sources file to install into `/etc/apt/sources.list.d/`.
    pub sources: PathBuf,
    /// The keyring to install into `/usr/share/keyrings/`.
    pub keyring: PathBuf,
    /// Packages needed before the repository can be used.
    pub req_packages: Vec<String>,
}

/// Yum/DNF repository data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YumRepo {
    /// The `*.repo` file to install into `/etc/yum.repos.d/`.
    pub yumdef: PathBuf,
    /// The keyring to install into `/etc/pki/rpm-gpg/`.
    pub keyring: PathBuf,
}

/// Exactly one of the two repository shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Repo {
    Deb(DebRepo),
    Yum(YumRepo),
}

/// StorPool build farm data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Builder {
    pub alias: String,
    pub base_image: String,
    pub branch: String,
    pub kernel_package: String,
    pub utf8_locale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supported {
    pub repo: bool,
}

/// The packaging ecosystem a variant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Debian,
    Redhat,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debian => "debian",
            Self::Redhat => "redhat",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-resolved build variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub name: String,
    pub descr: String,
    /// The variant this one was derived from; empty for base variants.
    pub parent: String,
    pub family: Family,
    pub detect: Detect,
    pub supported: Supported,
    pub commands: Commands,
    /// The oldest system Python that may be relied upon.
    pub min_sys_python: String,
    pub repo: Repo,
    /// Logical package names mapped to this variant's package names.
    pub package: BTreeMap<String, String>,
    pub systemd_lib: String,
    pub file_ext: String,
    pub initramfs_flavor: String,
    pub builder: Builder,
}

impl Variant {
    /// Resolve a `category.name` command identifier.
    pub fn command(&self, id: &str) -> Result<&[String]> {
        let mut parts = id.split('.');
        let category = parts.next().unwrap_or_default();
        let fields = Commands::category_fields(category).ok_or_else(|| {
            VariantError::config(
                &self.name,
                format!(
                    "Invalid command component '{category}', should be one of {}",
                    Commands::CATEGORIES.join(" ")
                ),
            )
        })?;
        let Some(name) = parts.next() else {
            return Err(VariantError::config(
                &self.name,
                format!(
                    "Incomplete command specification, should continue with one of {}",
                    fields.join(" ")
                ),
            ));
        };
        if parts.next().is_some() {
            return Err(VariantError::config(
                &self.name,
                format!("Too many command components in '{id}'"),
            ));
        }
        self.commands.get(category, name).ok_or_else(|| {
            VariantError::config(
                &self.name,
                format!(
                    "Invalid command component '{name}', should be one of {}",
                    fields.join(" ")
                ),
            )
        })
    }
}

/// A variant declared as a set of changes to an already-declared parent.
#[derive(Debug, Clone)]
pub struct VariantUpdate {
    pub name: String,
    pub descr: String,
    pub parent: String,
    pub detect: Detect,
    pub updates: Updates,
}

/// One entry of the declarative variant table.
#[derive(Debug, Clone)]
pub enum VariantDef {
    Base(Variant),
    Update(VariantUpdate),
}

impl VariantDef {
    pub fn name(&self) -> &str {
        match self {
            Self::Base(var) => &var.name,
            Self::Update(upd) => &upd.name,
        }
    }
}

/// An OS package as reported by the package database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsPackage {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub status: String,
}
