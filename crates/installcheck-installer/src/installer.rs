use std::path::{Path, PathBuf};

use installcheck_core::{
    select_variant, HostPlatform, PlatformVariant, Result, WindowsInstaller,
    MACOS_APP_BUNDLE_PATH, NSIS_UNINSTALLER_PATH,
};
use tracing::{debug, info, warn};

use crate::command::{run_command, CommandFailure, CommandRunner};
use crate::locator::ArtifactLocator;
use crate::log::ProcessLog;

const RPM_ALREADY_INSTALLED: &str = "is already installed";
const RPM_UP_TO_DATE_NOTE: &str = "Current version is up-to-date, continuing.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// The package manager reported the same version as already present.
    AlreadyInstalled,
}

/// The installer artifact bound for this run, with the variant that drives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installer {
    variant: PlatformVariant,
    artifact_path: PathBuf,
    application_path: PathBuf,
    skip_uninstall: bool,
}

/// Picks the variant for `host` and binds the matching installer artifact.
pub fn select_installer_for(
    host: &HostPlatform,
    windows: WindowsInstaller,
    locator: &ArtifactLocator,
) -> Result<Installer> {
    let variant = select_variant(host, windows)?;
    Installer::locate(variant, locator)
}

impl Installer {
    /// Binds `variant` to the artifact the locator selects for it.
    pub fn locate(variant: PlatformVariant, locator: &ArtifactLocator) -> Result<Self> {
        let artifact_path = locator.locate_variant(variant)?;
        info!("Using installer {}", artifact_path.display());
        Ok(Self::from_artifact(variant, artifact_path))
    }

    pub fn from_artifact(variant: PlatformVariant, artifact_path: impl Into<PathBuf>) -> Self {
        let artifact_path = artifact_path.into();
        let application_path = variant.application_path(&file_name_of(&artifact_path));
        Self {
            variant,
            artifact_path,
            application_path,
            skip_uninstall: false,
        }
    }

    pub fn with_skip_uninstall(mut self, skip_uninstall: bool) -> Self {
        self.skip_uninstall = skip_uninstall;
        self
    }

    pub fn variant(&self) -> PlatformVariant {
        self.variant
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn application_path(&self) -> &Path {
        &self.application_path
    }

    pub fn skip_uninstall(&self) -> bool {
        self.skip_uninstall
    }

    pub fn artifact_file_name(&self) -> String {
        file_name_of(&self.artifact_path)
    }

    /// Command lines `install` runs, in order.
    pub fn install_commands(&self) -> Vec<String> {
        let artifact = quote_path(&self.artifact_path);
        match self.variant {
            PlatformVariant::Nsis => vec![format!("start \"Installer\" /wait {artifact} /S")],
            PlatformVariant::Msi => vec![format!("msiexec /quiet /i {artifact}")],
            PlatformVariant::Deb => vec![format!("sudo gdebi -n {artifact}")],
            PlatformVariant::Rpm => vec![rpm_install_command(&self.artifact_path)],
            PlatformVariant::Dmg => {
                let volume = self.dmg_volume();
                vec![
                    format!("hdiutil attach {artifact}"),
                    self.dmg_package_install_command(&volume),
                    dmg_detach_command(&volume),
                ]
            }
        }
    }

    /// Command line `uninstall` runs, or `None` when uninstall is skipped.
    pub fn uninstall_command(&self) -> Option<String> {
        if self.skip_uninstall {
            return None;
        }

        let command = match self.variant {
            PlatformVariant::Nsis => format!(
                "start \"Uninstaller\" /wait {} /S",
                quote_path(Path::new(NSIS_UNINSTALLER_PATH))
            ),
            PlatformVariant::Msi => format!(
                "msiexec /quiet /uninstall /i {}",
                quote_path(&self.artifact_path)
            ),
            PlatformVariant::Deb => format!("sudo dpkg --purge {}", self.package_name()),
            PlatformVariant::Rpm => format!("sudo rpm --erase {}", self.package_name()),
            PlatformVariant::Dmg => {
                format!("sudo rm -fr {}", quote_path(Path::new(MACOS_APP_BUNDLE_PATH)))
            }
        };
        Some(command)
    }

    pub fn install<R>(&self, runner: &mut R, log: &mut ProcessLog) -> Result<InstallOutcome>
    where
        R: CommandRunner + ?Sized,
    {
        debug!(
            "Installing {} via {} installer",
            self.artifact_path.display(),
            self.variant.as_str()
        );
        match self.variant {
            PlatformVariant::Dmg => self.install_dmg(runner, log),
            PlatformVariant::Rpm => self.install_rpm(runner, log),
            PlatformVariant::Nsis | PlatformVariant::Msi | PlatformVariant::Deb => {
                for command_line in self.install_commands() {
                    run_command(runner, log, &command_line)
                        .map_err(CommandFailure::into_install_error)?;
                }
                Ok(InstallOutcome::Installed)
            }
        }
    }

    /// Removes the installed application. A no-op when uninstall is skipped.
    pub fn uninstall<R>(&self, runner: &mut R, log: &mut ProcessLog) -> Result<()>
    where
        R: CommandRunner + ?Sized,
    {
        let Some(command_line) = self.uninstall_command() else {
            debug!(
                "Skipping uninstall of {} as requested",
                self.artifact_path.display()
            );
            return Ok(());
        };

        run_command(runner, log, &command_line).map_err(CommandFailure::into_uninstall_error)?;
        Ok(())
    }

    fn install_rpm<R>(&self, runner: &mut R, log: &mut ProcessLog) -> Result<InstallOutcome>
    where
        R: CommandRunner + ?Sized,
    {
        let command_line = rpm_install_command(&self.artifact_path);
        match run_command(runner, log, &command_line) {
            Ok(_) => Ok(InstallOutcome::Installed),
            Err(CommandFailure::ExitStatus(result))
                if result.combined_output.contains(RPM_ALREADY_INSTALLED) =>
            {
                log.write(RPM_UP_TO_DATE_NOTE)?;
                Ok(InstallOutcome::AlreadyInstalled)
            }
            Err(err) => Err(err.into_install_error()),
        }
    }

    /// Attaches the image, runs the bundled package, then detaches. The detach
    /// also runs when the package install fails so the volume is not left mounted.
    fn install_dmg<R>(&self, runner: &mut R, log: &mut ProcessLog) -> Result<InstallOutcome>
    where
        R: CommandRunner + ?Sized,
    {
        let volume = self.dmg_volume();
        let attach = format!("hdiutil attach {}", quote_path(&self.artifact_path));
        run_command(runner, log, &attach).map_err(CommandFailure::into_install_error)?;

        let install_result = run_command(runner, log, &self.dmg_package_install_command(&volume))
            .map_err(CommandFailure::into_install_error);
        let detach_result = run_command(runner, log, &dmg_detach_command(&volume))
            .map_err(CommandFailure::into_install_error);

        match (install_result, detach_result) {
            (Ok(_), Ok(_)) => Ok(InstallOutcome::Installed),
            (Err(install_err), Ok(_)) => Err(install_err),
            (Ok(_), Err(detach_err)) => Err(detach_err),
            (Err(install_err), Err(detach_err)) => {
                warn!("Failed to detach {}: {detach_err}", volume.display());
                log.write(&format!(
                    "Could not detach {} after failed install: {detach_err}",
                    volume.display()
                ))?;
                Err(install_err)
            }
        }
    }

    fn dmg_volume(&self) -> PathBuf {
        let file_name = self.artifact_file_name();
        let stem = file_name.strip_suffix(".dmg").unwrap_or(&file_name);
        Path::new("/Volumes").join(stem)
    }

    fn dmg_package_install_command(&self, volume: &Path) -> String {
        let stem = volume
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "sudo installer -pkg {} -target \"/\"",
            quote_path(&volume.join(format!("{stem}.pkg")))
        )
    }

    fn package_name(&self) -> String {
        let file_name = self.artifact_file_name();
        self.variant.package_name(&file_name).unwrap_or(file_name)
    }
}

fn rpm_install_command(artifact_path: &Path) -> String {
    format!("sudo rpm --upgrade {}", quote_path(artifact_path))
}

fn dmg_detach_command(volume: &Path) -> String {
    format!("hdiutil detach \"{}/\"", volume.display())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn quote_path(path: &Path) -> String {
    format!("\"{}\"", path.display())
}
