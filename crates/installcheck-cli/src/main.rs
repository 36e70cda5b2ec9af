mod config;
mod flows;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use installcheck_installer::{terminate, RunOutcome};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{load_config_file, resolve_settings, CliOverrides};
use crate::flows::{
    run_detect_command, run_install_command, run_lifecycle_command, run_uninstall_command,
};
use crate::render::{current_output_style, TerminalRenderer};

#[derive(Parser, Debug)]
#[command(name = "installcheck")]
#[command(about = "Install, acceptance-test and remove a Mantid installer package", long_about = None)]
struct Cli {
    /// Configuration file; defaults to installcheck.toml in the search directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Directory holding the installer artifacts.
    #[arg(long, global = true)]
    search_dir: Option<PathBuf>,
    /// Use the MSI installer instead of NSIS on Windows.
    #[arg(long, global = true)]
    msi: bool,
    #[arg(long, global = true)]
    skip_uninstall: bool,
    /// Skip artifacts whose file name contains this text. Repeatable.
    #[arg(long, value_name = "SUBSTR", global = true)]
    exclude: Vec<String>,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Disable status badges and color.
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the detected platform and the installer that would be used.
    Detect,
    /// Install the package and leave it installed.
    Install,
    Uninstall,
    /// Install, run the acceptance command, then uninstall.
    Run {
        /// `{application}` is replaced with the installed application path.
        #[arg(long)]
        test_command: Option<String>,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let test_command = match &self.command {
            Commands::Run { test_command } => test_command.clone(),
            Commands::Detect | Commands::Install | Commands::Uninstall => None,
        };
        CliOverrides {
            config: self.config.clone(),
            log_file: self.log_file.clone(),
            search_dir: self.search_dir.clone(),
            msi: self.msi,
            skip_uninstall: self.skip_uninstall,
            exclude: self.exclude.clone(),
            test_command,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("INSTALLCHECK_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn run_cli(cli: Cli, renderer: TerminalRenderer) -> Result<RunOutcome> {
    let overrides = cli.overrides();
    let file = load_config_file(&overrides).context("failed to load configuration")?;
    let settings = resolve_settings(file, overrides);

    match cli.command {
        Commands::Detect => run_detect_command(&settings, renderer),
        Commands::Install => run_install_command(&settings, renderer),
        Commands::Uninstall => run_uninstall_command(&settings, renderer),
        Commands::Run { .. } => run_lifecycle_command(&settings, renderer),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let renderer = TerminalRenderer::from_style(current_output_style(cli.plain));

    let outcome = match run_cli(cli, renderer) {
        Ok(outcome) => outcome,
        Err(err) => {
            renderer.eprint_status("err", &format!("{err:#}"));
            RunOutcome::FailedScript
        }
    };
    terminate(outcome)
}

#[cfg(test)]
mod tests;
