use installcheck_core::{InstallCheckError, Result};
use tracing::{debug, error, warn};

use crate::command::{run_command, CommandFailure, CommandResult, CommandRunner};
use crate::installer::{InstallOutcome, Installer};
use crate::log::ProcessLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Installed,
    Completed,
    FailedInstall,
    FailedTest,
    FailedScript,
}

/// How a run ended. Produced by the terminal actions of [`LifecycleController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    FailedInstall,
    FailedTest,
    FailedScript,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::FailedInstall | Self::FailedTest | Self::FailedScript => 1,
        }
    }

    pub fn state(self) -> LifecycleState {
        match self {
            Self::Completed => LifecycleState::Completed,
            Self::FailedInstall => LifecycleState::FailedInstall,
            Self::FailedTest => LifecycleState::FailedTest,
            Self::FailedScript => LifecycleState::FailedScript,
        }
    }
}

/// Ends the process with the outcome's exit code.
pub fn terminate(outcome: RunOutcome) -> ! {
    std::process::exit(outcome.exit_code())
}

/// Drives one run: install, let the caller test, then end through exactly one
/// terminal action. Every terminal action closes the log, and all but a kept
/// successful install attempt the uninstall.
#[derive(Debug)]
pub struct LifecycleController<R: CommandRunner> {
    log: ProcessLog,
    runner: R,
    installer: Option<Installer>,
    state: LifecycleState,
    keep_installed: bool,
}

impl<R: CommandRunner> LifecycleController<R> {
    /// `installer` is `None` when selecting it failed; only `scriptfailure` is
    /// meaningful then.
    pub fn new(log: ProcessLog, runner: R, installer: Option<Installer>) -> Self {
        let mut controller = Self {
            log,
            runner,
            installer,
            state: LifecycleState::Idle,
            keep_installed: false,
        };
        if let Some(installer) = &controller.installer {
            let line = format!("Using installer {}", installer.artifact_path().display());
            note(&mut controller.log, &line);
        }
        controller
    }

    /// Leaves the package installed when the run ends through `stop`. A failed
    /// install is still rolled back.
    pub fn with_keep_installed(mut self, keep_installed: bool) -> Self {
        self.keep_installed = keep_installed;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn installer(&self) -> Option<&Installer> {
        self.installer.as_ref()
    }

    pub fn log_line(&mut self, text: &str) {
        note(&mut self.log, text);
    }

    /// Installs the bound package. On failure the uninstall is attempted right
    /// away and the run is left in `FailedInstall`.
    pub fn run_install(&mut self) -> Result<InstallOutcome> {
        let Some(installer) = &self.installer else {
            return Err(InstallCheckError::InstallerNotSelected);
        };

        match installer.install(&mut self.runner, &mut self.log) {
            Ok(outcome) => {
                self.state = LifecycleState::Installed;
                debug!("Install finished: {outcome:?}");
                Ok(outcome)
            }
            Err(err) => {
                error!("Install failed: {err}");
                note(&mut self.log, &format!("Failed to install package: {err}"));
                self.uninstall_best_effort();
                self.state = LifecycleState::FailedInstall;
                Err(err)
            }
        }
    }

    /// Runs an auxiliary command, such as the acceptance tests, under this run's log.
    pub fn run_command(
        &mut self,
        command_line: &str,
    ) -> std::result::Result<CommandResult, CommandFailure> {
        run_command(&mut self.runner, &mut self.log, command_line)
    }

    /// Success path: uninstall unless keeping the package, close the log, exit code 0.
    pub fn stop(mut self) -> RunOutcome {
        if self.state == LifecycleState::FailedInstall {
            return self.finish(RunOutcome::FailedInstall);
        }
        if self.keep_installed {
            debug!("Keeping the installed package");
        } else {
            self.uninstall_best_effort();
        }
        self.finish(RunOutcome::Completed)
    }

    /// The acceptance tests failed: uninstall, log it, exit code 1.
    pub fn failure(mut self) -> RunOutcome {
        if self.state != LifecycleState::FailedInstall {
            self.uninstall_best_effort();
        }
        note(&mut self.log, "Tests failed");
        self.finish(RunOutcome::FailedTest)
    }

    /// The driving script itself failed. The installer may not exist yet.
    pub fn scriptfailure(mut self, message: Option<&str>) -> RunOutcome {
        if let Some(message) = message.filter(|message| !message.is_empty()) {
            note(&mut self.log, message);
        }
        if self.state == LifecycleState::FailedInstall {
            return self.finish(RunOutcome::FailedInstall);
        }
        self.uninstall_best_effort();
        self.finish(RunOutcome::FailedScript)
    }

    fn uninstall_best_effort(&mut self) {
        let Some(installer) = &self.installer else {
            return;
        };
        if let Err(err) = installer.uninstall(&mut self.runner, &mut self.log) {
            warn!("Uninstall failed: {err}");
            let line = format!(
                "Could not uninstall package {}: {err}",
                installer.artifact_path().display()
            );
            note(&mut self.log, &line);
        }
    }

    fn finish(self, outcome: RunOutcome) -> RunOutcome {
        let log_path = self.log.path().to_path_buf();
        if let Err(err) = self.log.close() {
            warn!("Failed to close script log {}: {err}", log_path.display());
        }
        debug!("Run finished as {:?}", outcome.state());
        outcome
    }
}

/// Writes to the log without letting a log failure abort the run.
fn note(log: &mut ProcessLog, text: &str) {
    if let Err(err) = log.write(text) {
        warn!("{err}");
    }
}
