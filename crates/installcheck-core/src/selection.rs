use tracing::debug;

use crate::error::{InstallCheckError, Result};
use crate::platform::{HostPlatform, OsFamily};
use crate::variant::{PlatformVariant, WindowsInstaller};

const SUPPORTED_REDHAT_MAJOR_VERSIONS: [&str; 2] = ["5", "6"];

/// Chooses the installer variant for `host`. Pure: no artifact discovery happens here.
pub fn select_variant(host: &HostPlatform, windows: WindowsInstaller) -> Result<PlatformVariant> {
    let variant = match host.os {
        OsFamily::Windows => windows.variant(),
        OsFamily::MacOs => PlatformVariant::Dmg,
        OsFamily::Linux => {
            let Some(distribution) = host.distribution.as_ref() else {
                return Err(InstallCheckError::UnsupportedPlatform(
                    "Unknown Linux flavour: distribution could not be detected".to_string(),
                ));
            };
            if distribution.is_ubuntu_family() {
                PlatformVariant::Deb
            } else if distribution.is_redhat_family()
                && SUPPORTED_REDHAT_MAJOR_VERSIONS.contains(&distribution.major_version())
            {
                PlatformVariant::Rpm
            } else {
                return Err(InstallCheckError::UnsupportedPlatform(format!(
                    "Unknown Linux flavour: {distribution}"
                )));
            }
        }
        OsFamily::Other => {
            return Err(InstallCheckError::UnsupportedPlatform(format!(
                "no installer variant for operating system '{}'",
                std::env::consts::OS
            )));
        }
    };

    debug!("Selected {} installer variant for {host}", variant.as_str());
    Ok(variant)
}
