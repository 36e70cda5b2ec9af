use std::io::{self, Read};
use std::process::{Command, Stdio};

use installcheck_core::InstallCheckError;
use thiserror::Error;
use tracing::debug;

use crate::log::ProcessLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    /// Standard output and standard error interleaved in emission order.
    pub combined_output: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes command lines through the host shell.
///
/// Implementations must not return before the launched process, and anything it
/// left holding the output pipe, has exited.
pub trait CommandRunner {
    fn run_blocking(&mut self, command_line: &str) -> io::Result<CommandResult>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run_blocking(&mut self, command_line: &str) -> io::Result<CommandResult> {
        (**self).run_blocking(command_line)
    }
}

/// Runs commands with `sh -c` on Unix and `cmd /C` on Windows, with stdout and
/// stderr sharing a single pipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run_blocking(&mut self, command_line: &str) -> io::Result<CommandResult> {
        let (mut reader, writer) = io::pipe()?;
        let mut command = shell_command(command_line);
        command
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);

        let mut child = command.spawn()?;
        // The command still owns the write ends; drop it so the read sees EOF.
        drop(command);

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        let status = child.wait()?;

        Ok(CommandResult {
            exit_code: status.code().unwrap_or(-1),
            combined_output: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let mut command = Command::new("cmd");
    command.arg("/C").raw_arg(command_line);
    command
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error("Failed to start command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Returned with code {}\n{}", .0.exit_code, .0.combined_output)]
    ExitStatus(CommandResult),

    #[error(transparent)]
    Log(InstallCheckError),
}

impl CommandFailure {
    pub fn into_install_error(self) -> InstallCheckError {
        match self {
            Self::Spawn { command, source } => InstallCheckError::CommandSpawn { command, source },
            Self::ExitStatus(result) => InstallCheckError::InstallFailure {
                exit_code: result.exit_code,
                output: result.combined_output,
            },
            Self::Log(err) => err,
        }
    }

    pub fn into_uninstall_error(self) -> InstallCheckError {
        match self {
            Self::Spawn { command, source } => InstallCheckError::CommandSpawn { command, source },
            Self::ExitStatus(result) => InstallCheckError::UninstallFailure {
                exit_code: result.exit_code,
                output: result.combined_output,
            },
            Self::Log(err) => err,
        }
    }
}

/// Runs `command_line`, appending its combined output to `log` whatever the
/// exit status, and fails on a nonzero exit code.
pub fn run_command<R>(
    runner: &mut R,
    log: &mut ProcessLog,
    command_line: &str,
) -> Result<CommandResult, CommandFailure>
where
    R: CommandRunner + ?Sized,
{
    debug!("Running command: {command_line}");
    let result = match runner.run_blocking(command_line) {
        Ok(result) => result,
        Err(source) => {
            log.write(&format!(
                "Error in subprocess: failed to start '{command_line}': {source}"
            ))
            .map_err(CommandFailure::Log)?;
            return Err(CommandFailure::Spawn {
                command: command_line.to_string(),
                source,
            });
        }
    };

    log.write(&result.combined_output)
        .map_err(CommandFailure::Log)?;

    if result.success() {
        debug!("Command finished successfully.");
        return Ok(result);
    }

    debug!("Command failed with code {}", result.exit_code);
    log.write(&format!(
        "Error in subprocess: '{command_line}' returned with code {}",
        result.exit_code
    ))
    .map_err(CommandFailure::Log)?;
    Err(CommandFailure::ExitStatus(result))
}
