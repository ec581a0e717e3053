//! Install the StorPool package repository configuration.
//!
//! The work is split in two: [`plan_repo_add`] works out the ordered list
//! of actions for a variant without touching the host, and [`execute`]
//! carries them out (or only prints them).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, VariantError};
use crate::model::{DebRepo, Repo, Variant, YumRepo};
use crate::process;

/// A StorPool package repository flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoType {
    pub name: &'static str,
    /// Inserted before the extension of the repository definition file.
    pub extension: &'static str,
}

pub const REPO_TYPES: [RepoType; 3] = [
    RepoType {
        name: "contrib",
        extension: "",
    },
    RepoType {
        name: "staging",
        extension: "-staging",
    },
    RepoType {
        name: "infra",
        extension: "-infra",
    },
];

impl Default for RepoType {
    fn default() -> Self {
        REPO_TYPES[0]
    }
}

impl FromStr for RepoType {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        REPO_TYPES
            .iter()
            .find(|rtype| rtype.name == value)
            .copied()
            .ok_or_else(|| {
                format!(
                    "unknown repository type '{value}', should be one of {}",
                    REPO_TYPES.map(|rtype| rtype.name).join(", ")
                )
            })
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One step of installing the repository configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoAction {
    /// Run a command.
    Run(Vec<String>),
    /// Install a file into a directory, owned by root, mode 0644.
    Install { src: PathBuf, dst_dir: PathBuf },
}

impl RepoAction {
    /// The command that performs this action.
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Run(argv) => argv.clone(),
            Self::Install { src, dst_dir } => {
                let dst = src
                    .file_name()
                    .map_or_else(|| dst_dir.clone(), |name| dst_dir.join(name));
                vec![
                    "install".to_string(),
                    "-o".to_string(),
                    "root".to_string(),
                    "-g".to_string(),
                    "root".to_string(),
                    "-m".to_string(),
                    "0644".to_string(),
                    "--".to_string(),
                    src.display().to_string(),
                    dst.display().to_string(),
                ]
            }
        }
    }
}

impl fmt::Display for RepoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&process::command_line(&self.argv()))
    }
}

fn run(argv: &[&str]) -> RepoAction {
    RepoAction::Run(argv.iter().map(|arg| arg.to_string()).collect())
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| VariantError::file(format!("No file name in {}", path.display())))
}

/// Insert the repository type's suffix before the file name's extension.
pub fn with_repo_extension(name: &str, rtype: RepoType) -> Result<String> {
    match name.split('.').collect::<Vec<_>>()[..] {
        [stem, ext] => Ok(format!("{stem}{}.{ext}", rtype.extension)),
        _ => Err(VariantError::file(format!(
            "Unexpected repository file name without an extension: {name}"
        ))),
    }
}

fn plan_deb(
    var: &Variant,
    repo: &DebRepo,
    vardir: &Path,
    rtype: RepoType,
) -> Result<Vec<RepoAction>> {
    let mut actions = Vec::new();
    if !repo.req_packages.is_empty() {
        actions.push(RepoAction::Run(var.commands.package.update_db.clone()));
        actions.push(RepoAction::Run(
            var.commands
                .package
                .install
                .iter()
                .chain(&repo.req_packages)
                .cloned()
                .collect(),
        ));
    }
    actions.push(RepoAction::Install {
        src: vardir.join(with_repo_extension(file_name(&repo.sources)?, rtype)?),
        dst_dir: PathBuf::from("/etc/apt/sources.list.d"),
    });
    actions.push(RepoAction::Install {
        src: vardir.join(file_name(&repo.keyring)?),
        dst_dir: PathBuf::from("/usr/share/keyrings"),
    });
    actions.push(run(&["apt-get", "update"]));
    Ok(actions)
}

fn plan_yum(
    repo: &YumRepo,
    vardir: &Path,
    rtype: RepoType,
    rpmkeys_available: bool,
) -> Result<Vec<RepoAction>> {
    let keyring = file_name(&repo.keyring)?;
    let mut actions = vec![
        run(&[
            "yum",
            "--disablerepo=storpool-*",
            "install",
            "-q",
            "-y",
            "ca-certificates",
        ]),
        RepoAction::Install {
            src: vardir.join(with_repo_extension(file_name(&repo.yumdef)?, rtype)?),
            dst_dir: PathBuf::from("/etc/yum.repos.d"),
        },
        RepoAction::Install {
            src: vardir.join(keyring),
            dst_dir: PathBuf::from("/etc/pki/rpm-gpg"),
        },
    ];
    if rpmkeys_available {
        actions.push(run(&[
            "rpmkeys",
            "--import",
            &format!("/etc/pki/rpm-gpg/{keyring}"),
        ]));
    }
    actions.push(run(&[
        "yum",
        "--disablerepo=*",
        &format!("--enablerepo=storpool-{}", rtype.name),
        "clean",
        "metadata",
    ]));
    Ok(actions)
}

/// Work out how to install the repository configuration for `var`.
///
/// The files are taken from the `<repodir>/<VARIANT>` directory.
pub fn plan_repo_add(
    var: &Variant,
    repodir: &Path,
    rtype: RepoType,
    rpmkeys_available: bool,
) -> Result<Vec<RepoAction>> {
    if !var.supported.repo {
        return Err(VariantError::config(
            &var.name,
            "the StorPool repository is not supported",
        ));
    }
    let vardir = repodir.join(&var.name);
    if !vardir.is_dir() {
        return Err(VariantError::config(
            &var.name,
            format!("No {} directory", vardir.display()),
        ));
    }

    match &var.repo {
        Repo::Deb(repo) => plan_deb(var, repo, &vardir, rtype),
        Repo::Yum(repo) => plan_yum(repo, &vardir, rtype, rpmkeys_available),
    }
}

/// Carry out the planned actions in order; with `noop`, only print them.
pub fn execute(actions: &[RepoAction], noop: bool) -> Result<()> {
    for action in actions {
        if noop {
            println!("{action}");
            continue;
        }
        debug!("{action}");
        match action {
            RepoAction::Run(argv) => process::run(argv)?,
            RepoAction::Install { src, dst_dir } => {
                process::run(&action.argv()).map_err(|err| VariantError::File {
                    message: format!(
                        "Could not copy {} over to {}: {err}",
                        src.display(),
                        dst_dir.display()
                    ),
                    source: None,
                })?
            }
        }
    }
    Ok(())
}
