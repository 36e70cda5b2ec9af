use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const WINDOWS_APPLICATION_PATH: &str = "C:/MantidInstall/bin/MantidPlot.exe";
pub const NSIS_UNINSTALLER_PATH: &str = "C:/MantidInstall/Uninstall.exe";
pub const LINUX_APPLICATION_PATH: &str = "/opt/Mantid/bin/MantidPlot";
pub const LINUX_NIGHTLY_APPLICATION_PATH: &str = "/opt/mantidnightly/bin/MantidPlot";
pub const MACOS_APP_BUNDLE_PATH: &str = "/Applications/MantidPlot.app/";
pub const MACOS_APPLICATION_PATH: &str = "/Applications/MantidPlot.app/Contents/MacOS/MantidPlot";

/// Companion package that shares the installer naming scheme but must never be selected.
pub const DEFAULT_EXCLUDED_ARTIFACT: &str = "vates";

const NIGHTLY_RPM_MARKER: &str = "mantidnightly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformVariant {
    Nsis,
    Msi,
    Deb,
    Rpm,
    Dmg,
}

impl PlatformVariant {
    pub const ALL: [Self; 5] = [Self::Nsis, Self::Msi, Self::Deb, Self::Rpm, Self::Dmg];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nsis => "nsis",
            Self::Msi => "msi",
            Self::Deb => "deb",
            Self::Rpm => "rpm",
            Self::Dmg => "dmg",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "nsis" | "exe" => Some(Self::Nsis),
            "msi" => Some(Self::Msi),
            "deb" | "debian" => Some(Self::Deb),
            "rpm" => Some(Self::Rpm),
            "dmg" => Some(Self::Dmg),
            _ => None,
        }
    }

    /// Filename glob used to discover this variant's installer in the search directory.
    pub fn artifact_pattern(self) -> &'static str {
        match self {
            Self::Nsis => "Mantid-*-win*.exe",
            Self::Msi => "mantid-*.msi",
            Self::Deb => "mantid_[0-9]*.deb",
            Self::Rpm => "mantid*.rpm",
            Self::Dmg => "mantid-*.dmg",
        }
    }

    /// Windows filesystems are case-insensitive, so the Windows patterns are too.
    pub fn pattern_case_sensitive(self) -> bool {
        !matches!(self, Self::Nsis | Self::Msi)
    }

    pub fn application_path(self, artifact_file_name: &str) -> PathBuf {
        let path = match self {
            Self::Nsis | Self::Msi => WINDOWS_APPLICATION_PATH,
            Self::Deb => LINUX_APPLICATION_PATH,
            Self::Rpm if artifact_file_name.contains(NIGHTLY_RPM_MARKER) => {
                LINUX_NIGHTLY_APPLICATION_PATH
            }
            Self::Rpm => LINUX_APPLICATION_PATH,
            Self::Dmg => MACOS_APPLICATION_PATH,
        };
        PathBuf::from(path)
    }

    /// Package-manager name of the installed package, for the variants that
    /// uninstall by name rather than by artifact.
    pub fn package_name(self, artifact_file_name: &str) -> Option<String> {
        let separator = match self {
            Self::Deb => '_',
            Self::Rpm => '-',
            Self::Nsis | Self::Msi | Self::Dmg => return None,
        };
        artifact_file_name
            .split(separator)
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowsInstaller {
    #[default]
    Nsis,
    Msi,
}

impl WindowsInstaller {
    pub fn from_use_nsis(use_nsis: bool) -> Self {
        if use_nsis {
            Self::Nsis
        } else {
            Self::Msi
        }
    }

    pub fn variant(self) -> PlatformVariant {
        match self {
            Self::Nsis => PlatformVariant::Nsis,
            Self::Msi => PlatformVariant::Msi,
        }
    }
}
