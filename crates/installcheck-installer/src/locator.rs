use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use installcheck_core::{InstallCheckError, PlatformVariant, Result, DEFAULT_EXCLUDED_ARTIFACT};
use tracing::debug;

/// Finds installer artifacts in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    search_dir: PathBuf,
    exclusions: Vec<String>,
}

impl ArtifactLocator {
    pub fn new(search_dir: impl Into<PathBuf>) -> Self {
        Self {
            search_dir: search_dir.into(),
            exclusions: vec![DEFAULT_EXCLUDED_ARTIFACT.to_string()],
        }
    }

    /// Adds exclusions on top of the reserved companion-package exclusion,
    /// which always stays in force. Exclusions match file names case-sensitively.
    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for exclusion in exclusions {
            let exclusion = exclusion.into();
            if !exclusion.is_empty() && !self.exclusions.contains(&exclusion) {
                self.exclusions.push(exclusion);
            }
        }
        self
    }

    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    pub fn locate_variant(&self, variant: PlatformVariant) -> Result<PathBuf> {
        self.locate(variant.artifact_pattern(), variant.pattern_case_sensitive())
    }

    /// Returns the absolute path of the highest-sorting file in the search
    /// directory whose name matches `pattern` and contains no exclusion.
    pub fn locate(&self, pattern: &str, case_sensitive: bool) -> Result<PathBuf> {
        let compiled = Pattern::new(pattern).map_err(|err| InstallCheckError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        let options = MatchOptions {
            case_sensitive,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };

        let dir = std::path::absolute(&self.search_dir).map_err(|source| {
            InstallCheckError::SearchDirectory {
                dir: self.search_dir.clone(),
                source,
            }
        })?;
        let entries = fs::read_dir(&dir).map_err(|source| InstallCheckError::SearchDirectory {
            dir: dir.clone(),
            source,
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| InstallCheckError::SearchDirectory {
                dir: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if compiled.matches_with(name, options) {
                candidates.push(path);
            }
        }
        debug!(
            "Found {} candidate(s) for '{pattern}' in {}",
            candidates.len(),
            dir.display()
        );

        select_artifact(candidates, &self.exclusions).ok_or_else(|| {
            InstallCheckError::ArtifactNotFound {
                pattern: pattern.to_string(),
                dir,
            }
        })
    }
}

/// Drops candidates whose file name contains an exclusion, then picks the
/// lexicographically last one, which carries the highest version.
pub fn select_artifact<I>(candidates: I, exclusions: &[String]) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut eligible = candidates
        .into_iter()
        .filter(|candidate| {
            let name = candidate
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default();
            !exclusions
                .iter()
                .any(|excluded| !excluded.is_empty() && name.contains(excluded.as_str()))
        })
        .collect::<Vec<_>>();
    eligible.sort();
    eligible.pop()
}
