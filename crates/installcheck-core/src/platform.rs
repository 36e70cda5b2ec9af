use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl OsFamily {
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` style name onto a family.
    pub fn from_os_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::MacOs,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::MacOs => "Darwin",
            Self::Other => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinuxDistribution {
    pub id: String,
    pub id_like: Vec<String>,
    pub version_id: String,
    pub name: Option<String>,
}

impl LinuxDistribution {
    pub fn major_version(&self) -> &str {
        self.version_id.split('.').next().unwrap_or("").trim()
    }

    pub fn is_ubuntu_family(&self) -> bool {
        self.id == "ubuntu" || self.id_like.iter().any(|like| like == "ubuntu")
    }

    pub fn is_redhat_family(&self) -> bool {
        matches!(self.id.as_str(), "rhel" | "redhat" | "centos")
            || self.id_like.iter().any(|like| like == "rhel")
    }
}

impl fmt::Display for LinuxDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version_id.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} {}", self.id, self.version_id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: OsFamily,
    pub distribution: Option<LinuxDistribution>,
}

impl HostPlatform {
    pub fn new(os: OsFamily, distribution: Option<LinuxDistribution>) -> Self {
        Self { os, distribution }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.distribution {
            Some(distribution) => write!(f, "{} ({distribution})", self.os.as_str()),
            None => write!(f, "{}", self.os.as_str()),
        }
    }
}

pub fn detect_host_platform() -> HostPlatform {
    let os = OsFamily::current();
    let distribution = match os {
        OsFamily::Linux => detect_linux_distribution_in(Path::new("/")),
        _ => None,
    };
    let host = HostPlatform::new(os, distribution);
    debug!("Detected host platform: {host}");
    host
}

/// Reads the distribution identity below `root`, preferring `etc/os-release`
/// and falling back to the older release files.
pub fn detect_linux_distribution_in(root: &Path) -> Option<LinuxDistribution> {
    let etc = root.join("etc");
    let probes: [(&str, fn(&str) -> Option<LinuxDistribution>); 3] = [
        ("os-release", parse_os_release),
        ("redhat-release", parse_redhat_release),
        ("lsb-release", parse_lsb_release),
    ];

    for (file_name, parse) in probes {
        let path = etc.join(file_name);
        let Ok(raw) = fs::read_to_string(&path) else {
            continue;
        };
        if let Some(distribution) = parse(&raw) {
            debug!(
                "Read Linux distribution '{distribution}' from {}",
                path.display()
            );
            return Some(distribution);
        }
    }

    None
}

pub fn parse_os_release(raw: &str) -> Option<LinuxDistribution> {
    let mut distribution = LinuxDistribution::default();
    for (key, value) in key_value_lines(raw) {
        match key {
            "ID" => distribution.id = value.to_ascii_lowercase(),
            "ID_LIKE" => {
                distribution.id_like = value
                    .split_whitespace()
                    .map(str::to_ascii_lowercase)
                    .collect();
            }
            "VERSION_ID" => distribution.version_id = value.to_string(),
            "NAME" => distribution.name = Some(value.to_string()),
            _ => {}
        }
    }

    (!distribution.id.is_empty()).then_some(distribution)
}

/// Parses `/etc/redhat-release`, e.g. `CentOS release 6.5 (Final)`.
pub fn parse_redhat_release(raw: &str) -> Option<LinuxDistribution> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
    let (product, rest) = line.split_once(" release ")?;
    let version_id = rest.split_whitespace().next()?.to_string();

    let lower = product.to_ascii_lowercase();
    let id = if lower.starts_with("red hat") {
        "rhel".to_string()
    } else {
        lower.split_whitespace().next()?.to_string()
    };

    // Only RHEL and its rebuilds ship this file.
    let id_like = if id == "rhel" {
        Vec::new()
    } else {
        vec!["rhel".to_string()]
    };

    Some(LinuxDistribution {
        id,
        id_like,
        version_id,
        name: Some(product.trim().to_string()),
    })
}

pub fn parse_lsb_release(raw: &str) -> Option<LinuxDistribution> {
    let mut distribution = LinuxDistribution::default();
    for (key, value) in key_value_lines(raw) {
        match key {
            "DISTRIB_ID" => distribution.id = value.to_ascii_lowercase(),
            "DISTRIB_RELEASE" => distribution.version_id = value.to_string(),
            "DISTRIB_DESCRIPTION" => distribution.name = Some(value.to_string()),
            _ => {}
        }
    }

    (!distribution.id.is_empty()).then_some(distribution)
}

fn key_value_lines(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), unquote(value.trim())))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
