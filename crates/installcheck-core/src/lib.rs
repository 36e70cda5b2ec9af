mod error;
mod platform;
mod selection;
mod variant;

pub use error::{InstallCheckError, Result};
pub use platform::{
    detect_host_platform, detect_linux_distribution_in, parse_lsb_release, parse_os_release,
    parse_redhat_release, HostPlatform, LinuxDistribution, OsFamily,
};
pub use selection::select_variant;
pub use variant::{
    PlatformVariant, WindowsInstaller, DEFAULT_EXCLUDED_ARTIFACT, LINUX_APPLICATION_PATH,
    LINUX_NIGHTLY_APPLICATION_PATH, MACOS_APPLICATION_PATH, MACOS_APP_BUNDLE_PATH,
    NSIS_UNINSTALLER_PATH, WINDOWS_APPLICATION_PATH,
};
