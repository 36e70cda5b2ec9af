use std::path::Path;

use anyhow::{Context, Result};
use installcheck_core::{detect_host_platform, select_variant, HostPlatform, InstallCheckError};
use installcheck_installer::{
    select_installer_for, ArtifactLocator, CommandFailure, CommandRunner, InstallOutcome,
    Installer, LifecycleController, ProcessLog, RunOutcome, ShellRunner,
};
use tracing::{debug, error};

use crate::config::RunSettings;
use crate::render::TerminalRenderer;

pub(crate) const APPLICATION_PLACEHOLDER: &str = "{application}";

fn locator_for(settings: &RunSettings) -> ArtifactLocator {
    ArtifactLocator::new(&settings.search_dir).with_exclusions(settings.exclusions.iter().cloned())
}

fn open_log(settings: &RunSettings) -> Result<ProcessLog> {
    ProcessLog::open(&settings.log_file)
        .with_context(|| format!("failed to open log {}", settings.log_file.display()))
}

/// Opens the run log and binds the installer. A selection failure is handed
/// back beside the controller so the caller can end the run through it.
fn prepare_run<R: CommandRunner>(
    settings: &RunSettings,
    host: &HostPlatform,
    runner: R,
) -> Result<(LifecycleController<R>, Option<InstallCheckError>)> {
    let log = open_log(settings)?;
    let (installer, selection_error) =
        match select_installer_for(host, settings.windows_installer, &locator_for(settings)) {
            Ok(installer) => (
                Some(installer.with_skip_uninstall(settings.skip_uninstall)),
                None,
            ),
            Err(err) => {
                error!("Could not select an installer: {err}");
                (None, Some(err))
            }
        };
    Ok((LifecycleController::new(log, runner, installer), selection_error))
}

pub(crate) fn expand_test_command(template: &str, application_path: &Path) -> String {
    template.replace(
        APPLICATION_PLACEHOLDER,
        &application_path.display().to_string(),
    )
}

pub(crate) fn run_detect_command(
    settings: &RunSettings,
    renderer: TerminalRenderer,
) -> Result<RunOutcome> {
    run_detect_with_hooks(settings, renderer, &detect_host_platform())
}

pub(crate) fn run_detect_with_hooks(
    settings: &RunSettings,
    renderer: TerminalRenderer,
    host: &HostPlatform,
) -> Result<RunOutcome> {
    renderer.print_status("step", &format!("platform: {host}"));

    let variant = select_variant(host, settings.windows_installer)?;
    renderer.print_status("ok", &format!("variant: {}", variant.as_str()));

    let locator = locator_for(settings);
    renderer.print_status(
        "step",
        &format!(
            "pattern: {} in {} (excluding {})",
            variant.artifact_pattern(),
            locator.search_dir().display(),
            locator.exclusions().join(", ")
        ),
    );

    let installer = match Installer::locate(variant, &locator) {
        Ok(installer) => installer.with_skip_uninstall(settings.skip_uninstall),
        Err(err @ InstallCheckError::ArtifactNotFound { .. }) => {
            renderer.print_status("warn", &err.to_string());
            return Ok(RunOutcome::Completed);
        }
        Err(err) => return Err(err.into()),
    };

    renderer.print_status(
        "ok",
        &format!("artifact: {}", installer.artifact_path().display()),
    );
    renderer.print_status(
        "step",
        &format!("application: {}", installer.application_path().display()),
    );
    for command_line in installer.install_commands() {
        renderer.print_status("step", &format!("install: {command_line}"));
    }
    match installer.uninstall_command() {
        Some(command_line) => renderer.print_status("step", &format!("uninstall: {command_line}")),
        None => renderer.print_status("step", "uninstall: skipped"),
    }
    Ok(RunOutcome::Completed)
}

pub(crate) fn run_install_command(
    settings: &RunSettings,
    renderer: TerminalRenderer,
) -> Result<RunOutcome> {
    run_install_with_hooks(settings, renderer, &detect_host_platform(), ShellRunner)
}

/// Installs and leaves the package in place. A failed install is rolled back.
pub(crate) fn run_install_with_hooks<R: CommandRunner>(
    settings: &RunSettings,
    renderer: TerminalRenderer,
    host: &HostPlatform,
    runner: R,
) -> Result<RunOutcome> {
    let (controller, selection_error) = prepare_run(settings, host, runner)?;
    let mut controller = controller.with_keep_installed(true);
    if let Some(err) = selection_error {
        let message = err.to_string();
        renderer.eprint_status("err", &message);
        return Ok(controller.scriptfailure(Some(&message)));
    }

    match controller.run_install() {
        Ok(outcome) => {
            renderer.print_status("ok", &install_message(outcome, controller.installer()));
            Ok(controller.stop())
        }
        Err(err) => {
            renderer.eprint_status("err", &format!("install failed: {err}"));
            Ok(controller.scriptfailure(None))
        }
    }
}

pub(crate) fn run_uninstall_command(
    settings: &RunSettings,
    renderer: TerminalRenderer,
) -> Result<RunOutcome> {
    run_uninstall_with_hooks(settings, renderer, &detect_host_platform(), ShellRunner)
}

pub(crate) fn run_uninstall_with_hooks<R: CommandRunner>(
    settings: &RunSettings,
    renderer: TerminalRenderer,
    host: &HostPlatform,
    mut runner: R,
) -> Result<RunOutcome> {
    let mut log = open_log(settings)?;
    let result = select_installer_for(host, settings.windows_installer, &locator_for(settings))
        .and_then(|installer| installer.uninstall(&mut runner, &mut log).map(|()| installer));

    let outcome = match result {
        Ok(installer) => {
            renderer.print_status(
                "ok",
                &format!("uninstalled {}", installer.artifact_file_name()),
            );
            RunOutcome::Completed
        }
        Err(err) => {
            let message = err.to_string();
            if let Err(log_err) = log.write(&message) {
                debug!("{log_err}");
            }
            renderer.eprint_status("err", &message);
            RunOutcome::FailedScript
        }
    };

    log.close()
        .with_context(|| format!("failed to close log {}", settings.log_file.display()))?;
    Ok(outcome)
}

pub(crate) fn run_lifecycle_command(
    settings: &RunSettings,
    renderer: TerminalRenderer,
) -> Result<RunOutcome> {
    run_lifecycle_with_hooks(settings, renderer, &detect_host_platform(), ShellRunner)
}

/// Full lifecycle: install, run the acceptance command, uninstall.
pub(crate) fn run_lifecycle_with_hooks<R: CommandRunner>(
    settings: &RunSettings,
    renderer: TerminalRenderer,
    host: &HostPlatform,
    runner: R,
) -> Result<RunOutcome> {
    let (mut controller, selection_error) = prepare_run(settings, host, runner)?;
    if let Some(err) = selection_error {
        let message = err.to_string();
        renderer.eprint_status("err", &message);
        return Ok(controller.scriptfailure(Some(&message)));
    }

    match controller.run_install() {
        Ok(outcome) => {
            renderer.print_status("ok", &install_message(outcome, controller.installer()));
        }
        Err(err) => {
            renderer.eprint_status("err", &format!("install failed: {err}"));
            return Ok(controller.scriptfailure(None));
        }
    }

    let Some(template) = settings.test_command.as_deref() else {
        debug!("No acceptance command configured");
        return Ok(controller.stop());
    };
    let application_path = controller
        .installer()
        .map(|installer| installer.application_path().to_path_buf())
        .unwrap_or_default();
    let command_line = expand_test_command(template, &application_path);
    controller.log_line(&format!("Running acceptance tests: {command_line}"));

    match controller.run_command(&command_line) {
        Ok(_) => {
            renderer.print_status("ok", "acceptance tests passed");
            Ok(controller.stop())
        }
        Err(CommandFailure::ExitStatus(result)) => {
            renderer.eprint_status(
                "err",
                &format!("acceptance tests failed with code {}", result.exit_code),
            );
            Ok(controller.failure())
        }
        Err(err) => {
            let message = err.to_string();
            renderer.eprint_status("err", &message);
            Ok(controller.scriptfailure(Some(&message)))
        }
    }
}

fn install_message(outcome: InstallOutcome, installer: Option<&Installer>) -> String {
    let name = installer
        .map(Installer::artifact_file_name)
        .unwrap_or_default();
    match outcome {
        InstallOutcome::Installed => format!("installed {name}"),
        InstallOutcome::AlreadyInstalled => format!("{name} already installed"),
    }
}
