mod command;
mod installer;
mod lifecycle;
mod locator;
mod log;

pub use command::{run_command, CommandFailure, CommandResult, CommandRunner, ShellRunner};
pub use installer::{select_installer_for, InstallOutcome, Installer};
pub use lifecycle::{terminate, LifecycleController, LifecycleState, RunOutcome};
pub use locator::{select_artifact, ArtifactLocator};
pub use log::ProcessLog;
