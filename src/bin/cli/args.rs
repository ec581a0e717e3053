use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sp_variant::RepoType;

/// Query and use the StorPool build variant of this host.
#[derive(Debug, Parser)]
#[command(name = "storpool_variant", version)]
pub(crate) struct Cli {
    /// Show diagnostic output on the standard error stream
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// Examine the filesystem tree rooted here instead of the running host
    #[arg(
        long,
        global = true,
        hide = true,
        env = "SP_VARIANT_ROOT",
        default_value = "/"
    )]
    pub(crate) root: PathBuf,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Distribution-specific commands
    #[command(subcommand)]
    Command(CommandCmd),

    /// Detect the build variant for the current host
    Detect,

    /// Display the features supported by storpool_variant
    Features,

    /// StorPool repository-related commands
    #[command(subcommand)]
    Repo(RepoCmd),

    /// Display information about a build variant
    Show {
        /// The name of the variant, "all", or "current"
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum CommandCmd {
    /// List the distribution-specific commands
    List,

    /// Run a distribution-specific command
    Run {
        /// Only display the command, do not run it
        #[arg(short = 'N', long)]
        noop: bool,

        /// The identifier of the command to run, e.g. package.install
        command: String,

        /// Arguments to pass to the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum RepoCmd {
    /// Install the StorPool repository configuration
    Add {
        /// The path to the directory with the repository definitions
        #[arg(short = 'd', long)]
        repodir: PathBuf,

        /// The type of repository to add: contrib, staging, or infra
        #[arg(short = 't', long = "repotype", default_value = "contrib")]
        repotype: RepoType,

        /// Only display the actions, do not perform them
        #[arg(short = 'N', long)]
        noop: bool,
    },
}
