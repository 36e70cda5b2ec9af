use std::fs;
use std::path::{Path, PathBuf};

use installcheck_core::{InstallCheckError, Result, WindowsInstaller, DEFAULT_EXCLUDED_ARTIFACT};
use serde::Deserialize;
use tracing::debug;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "installcheck.toml";
pub(crate) const DEFAULT_LOG_FILE: &str = "installcheck.log";

/// Values read from `installcheck.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunConfigFile {
    pub(crate) log_file: Option<PathBuf>,
    pub(crate) search_dir: Option<PathBuf>,
    pub(crate) windows_installer: Option<WindowsInstaller>,
    pub(crate) skip_uninstall: Option<bool>,
    pub(crate) exclude: Option<Vec<String>>,
    pub(crate) test_command: Option<String>,
}

impl RunConfigFile {
    pub(crate) fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| InstallCheckError::Config(err.to_string()))
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            InstallCheckError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::parse(&content).map_err(|err| match err {
            InstallCheckError::Config(reason) => {
                InstallCheckError::Config(format!("invalid {}: {reason}", path.display()))
            }
            other => other,
        })
    }
}

/// Settings given on the command line; these win over the config file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CliOverrides {
    pub(crate) config: Option<PathBuf>,
    pub(crate) log_file: Option<PathBuf>,
    pub(crate) search_dir: Option<PathBuf>,
    pub(crate) msi: bool,
    pub(crate) skip_uninstall: bool,
    pub(crate) exclude: Vec<String>,
    pub(crate) test_command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSettings {
    pub(crate) log_file: PathBuf,
    pub(crate) search_dir: PathBuf,
    pub(crate) windows_installer: WindowsInstaller,
    pub(crate) skip_uninstall: bool,
    pub(crate) exclusions: Vec<String>,
    pub(crate) test_command: Option<String>,
}

/// Reads the explicit `--config` file, or `installcheck.toml` in the search
/// directory when one exists there.
pub(crate) fn load_config_file(overrides: &CliOverrides) -> Result<RunConfigFile> {
    if let Some(path) = &overrides.config {
        return RunConfigFile::load(path);
    }

    let search_dir = overrides
        .search_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let candidate = search_dir.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        debug!("Loading configuration from {}", candidate.display());
        RunConfigFile::load(&candidate)
    } else {
        Ok(RunConfigFile::default())
    }
}

pub(crate) fn resolve_settings(file: RunConfigFile, overrides: CliOverrides) -> RunSettings {
    let windows_installer = if overrides.msi {
        WindowsInstaller::Msi
    } else {
        file.windows_installer.unwrap_or_default()
    };
    let requested = if overrides.exclude.is_empty() {
        file.exclude.unwrap_or_default()
    } else {
        overrides.exclude
    };
    let mut exclusions = vec![DEFAULT_EXCLUDED_ARTIFACT.to_string()];
    for exclusion in requested {
        if !exclusion.is_empty() && !exclusions.contains(&exclusion) {
            exclusions.push(exclusion);
        }
    }

    RunSettings {
        log_file: overrides
            .log_file
            .or(file.log_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        search_dir: overrides
            .search_dir
            .or(file.search_dir)
            .unwrap_or_else(|| PathBuf::from(".")),
        windows_installer,
        skip_uninstall: overrides.skip_uninstall || file.skip_uninstall.unwrap_or(false),
        exclusions,
        test_command: overrides.test_command.or(file.test_command),
    }
}
