use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallCheckError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Unable to find installer package matching '{pattern}' in \"{}\"", .dir.display())]
    ArtifactNotFound { pattern: String, dir: PathBuf },

    #[error("Failed to read installer search directory {}: {source}", .dir.display())]
    SearchDirectory {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No installer has been selected for this run")]
    InstallerNotSelected,

    #[error("Invalid installer pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Install command returned with code {exit_code}\n{output}")]
    InstallFailure { exit_code: i32, output: String },

    #[error("Uninstall command returned with code {exit_code}\n{output}")]
    UninstallFailure { exit_code: i32, output: String },

    #[error("Failed to start command '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Script log error for {}: {source}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl InstallCheckError {
    /// Exit code and captured output of a failed install/uninstall command.
    pub fn command_failure(&self) -> Option<(i32, &str)> {
        match self {
            Self::InstallFailure { exit_code, output }
            | Self::UninstallFailure { exit_code, output } => {
                Some((*exit_code, output.as_str()))
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallCheckError>;
