use std::fs::{self, File};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use installcheck_core::{InstallCheckError, Result};
use tracing::debug;

/// The run's audit log. Every line is written to the log file and echoed to
/// standard output. Opened once per run and closed by the terminal action.
#[derive(Debug)]
pub struct ProcessLog {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl ProcessLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| log_error(&path, source))?;
        }
        let file = File::create(&path).map_err(|source| log_error(&path, source))?;
        debug!("Opened script log {}", path.display());
        Ok(Self {
            path,
            writer: LineWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `text`, adding a trailing newline when it has none. Empty text is ignored.
    pub fn write(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        self.writer
            .write_all(text.as_bytes())
            .and_then(|()| {
                if text.ends_with('\n') {
                    Ok(())
                } else {
                    self.writer.write_all(b"\n")
                }
            })
            .map_err(|source| log_error(&self.path, source))?;

        echo_line(&mut io::stdout().lock(), text);
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.writer
            .flush()
            .and_then(|()| self.writer.get_ref().sync_all())
            .map_err(|source| log_error(&self.path, source))?;
        debug!("Closed script log {}", self.path.display());
        Ok(())
    }
}

/// Mirrors a log line to `out`. A closed or failing stream never aborts the run.
pub(crate) fn echo_line<W: Write>(out: &mut W, text: &str) {
    if let Err(err) = writeln!(out, "{}", text.strip_suffix('\n').unwrap_or(text)) {
        debug!("Could not echo log line: {err}");
    }
}

fn log_error(path: &Path, source: io::Error) -> InstallCheckError {
    InstallCheckError::Log {
        path: path.to_path_buf(),
        source,
    }
}
