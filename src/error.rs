//! Errors raised while building, querying, and detecting variants.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::yai::YaiError;

pub type Result<T> = std::result::Result<T, VariantError>;

/// An error that occurred while handling the build variants.
#[derive(Debug, Error)]
pub enum VariantError {
    /// A declarative table entry or an override is inconsistent.
    #[error("Variant configuration error for {variant}: {message}")]
    Config { variant: String, message: String },

    /// None of the variants matched the current host.
    #[error("Could not detect the current host's build variant")]
    UnknownVariant,

    /// A legacy release file could not be read.
    #[error("Checking for {variant}: could not read {}: {source}", path.display())]
    ProbeRead {
        variant: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The os-release file exists but could not be parsed.
    #[error("Could not parse the {} file: {source}", path.display())]
    OsRelease {
        path: PathBuf,
        #[source]
        source: YaiError,
    },

    #[error("Unknown variant '{0}'")]
    NotFound(String),

    #[error("No variant with the '{0}' builder alias")]
    AliasNotFound(String),

    /// A file could not be processed, or had unexpected contents.
    #[error("{message}")]
    File {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("Could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed: {status}")]
    Command { command: String, status: ExitStatus },
}

impl VariantError {
    pub(crate) fn config(variant: &str, message: impl Into<String>) -> Self {
        Self::Config {
            variant: variant.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn file(message: impl Into<String>) -> Self {
        Self::File {
            message: message.into(),
            source: None,
        }
    }

    /// Did detection fail, either by not matching or by a probe failure?
    pub fn is_detection_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownVariant | Self::ProbeRead { .. } | Self::OsRelease { .. }
        )
    }

    /// Was a lookup by name or by builder alias unsuccessful?
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::AliasNotFound(_))
    }
}
