use super::*;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use installcheck_core::{
    HostPlatform, InstallCheckError, LinuxDistribution, OsFamily, WindowsInstaller,
};
use installcheck_installer::{CommandResult, CommandRunner};

use crate::config::{RunConfigFile, RunSettings, DEFAULT_LOG_FILE};
use crate::flows::{
    expand_test_command, run_detect_with_hooks, run_install_with_hooks, run_lifecycle_with_hooks,
    run_uninstall_with_hooks,
};
use crate::render::{output_style_for, render_status_line, OutputStyle};

#[derive(Default)]
struct ScriptedRunner {
    invocations: Vec<String>,
    failures: Vec<(String, i32)>,
}

impl ScriptedRunner {
    fn fail(mut self, prefix: &str, exit_code: i32) -> Self {
        self.failures.push((prefix.to_string(), exit_code));
        self
    }
}

impl CommandRunner for ScriptedRunner {
    fn run_blocking(&mut self, command_line: &str) -> io::Result<CommandResult> {
        self.invocations.push(command_line.to_string());
        let exit_code = self
            .failures
            .iter()
            .find(|(prefix, _)| command_line.starts_with(prefix.as_str()))
            .map_or(0, |(_, exit_code)| *exit_code);
        Ok(CommandResult {
            exit_code,
            combined_output: format!("ran {command_line}\n"),
        })
    }
}

fn ubuntu_host() -> HostPlatform {
    HostPlatform::new(
        OsFamily::Linux,
        Some(LinuxDistribution {
            id: "ubuntu".to_string(),
            id_like: vec!["debian".to_string()],
            version_id: "14.04".to_string(),
            name: None,
        }),
    )
}

fn plain_renderer() -> TerminalRenderer {
    TerminalRenderer::from_style(OutputStyle::Plain)
}

/// A search dir holding one deb artifact plus the vates companion.
fn flow_settings(dir: &Path, test_command: Option<&str>) -> RunSettings {
    fs::write(dir.join("mantid_3.1.0_amd64.deb"), b"artifact").expect("must write artifact");
    fs::write(dir.join("mantid_3.2.0-vates_amd64.deb"), b"artifact")
        .expect("must write companion");
    resolve_settings(
        RunConfigFile::default(),
        CliOverrides {
            log_file: Some(dir.join("logs").join("run.log")),
            search_dir: Some(dir.to_path_buf()),
            test_command: test_command.map(str::to_string),
            ..CliOverrides::default()
        },
    )
}

fn purges(runner: &ScriptedRunner) -> usize {
    runner
        .invocations
        .iter()
        .filter(|command| command.starts_with("sudo dpkg --purge mantid"))
        .count()
}

fn test_dir() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    path.push(format!(
        "installcheck-cli-tests-{}-{}",
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&path).expect("must create test dir");
    path
}

#[test]
fn config_file_parses_every_key() {
    let file = RunConfigFile::parse(
        r#"
log_file = "logs/run.log"
search_dir = "/builds"
windows_installer = "msi"
skip_uninstall = true
exclude = ["vates", "debug"]
test_command = "python runSystemTests.py --exe {application}"
"#,
    )
    .expect("config must parse");

    assert_eq!(file.log_file.as_deref(), Some(Path::new("logs/run.log")));
    assert_eq!(file.search_dir.as_deref(), Some(Path::new("/builds")));
    assert_eq!(file.windows_installer, Some(WindowsInstaller::Msi));
    assert_eq!(file.skip_uninstall, Some(true));
    assert_eq!(
        file.exclude,
        Some(vec!["vates".to_string(), "debug".to_string()])
    );
    assert_eq!(
        file.test_command.as_deref(),
        Some("python runSystemTests.py --exe {application}")
    );
}

#[test]
fn config_file_rejects_unknown_keys_and_values() {
    for content in ["installer = \"nsis\"", "windows_installer = \"exe\""] {
        let err = RunConfigFile::parse(content).expect_err("invalid config must fail");
        assert!(
            matches!(err, InstallCheckError::Config(_)),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn settings_fall_back_to_defaults() {
    let settings = resolve_settings(RunConfigFile::default(), CliOverrides::default());

    assert_eq!(settings.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    assert_eq!(settings.search_dir, PathBuf::from("."));
    assert_eq!(settings.windows_installer, WindowsInstaller::Nsis);
    assert!(!settings.skip_uninstall);
    assert_eq!(settings.exclusions, vec!["vates".to_string()]);
    assert_eq!(settings.test_command, None);
}

#[test]
fn cli_flags_override_config_file_values() {
    let file = RunConfigFile {
        log_file: Some(PathBuf::from("file.log")),
        search_dir: Some(PathBuf::from("/from-file")),
        windows_installer: Some(WindowsInstaller::Nsis),
        skip_uninstall: Some(false),
        exclude: Some(vec!["debug".to_string()]),
        test_command: Some("from-file".to_string()),
    };
    let overrides = CliOverrides {
        config: None,
        log_file: Some(PathBuf::from("cli.log")),
        search_dir: Some(PathBuf::from("/from-cli")),
        msi: true,
        skip_uninstall: true,
        exclude: vec!["vates".to_string(), "symbols".to_string()],
        test_command: Some("from-cli".to_string()),
    };

    let settings = resolve_settings(file, overrides);
    assert_eq!(settings.log_file, PathBuf::from("cli.log"));
    assert_eq!(settings.search_dir, PathBuf::from("/from-cli"));
    assert_eq!(settings.windows_installer, WindowsInstaller::Msi);
    assert!(settings.skip_uninstall);
    assert_eq!(
        settings.exclusions,
        vec!["vates".to_string(), "symbols".to_string()]
    );
    assert_eq!(settings.test_command.as_deref(), Some("from-cli"));
}

#[test]
fn config_file_values_apply_when_flags_are_absent() {
    let file = RunConfigFile {
        windows_installer: Some(WindowsInstaller::Msi),
        skip_uninstall: Some(true),
        exclude: Some(Vec::new()),
        test_command: Some("ctest".to_string()),
        ..RunConfigFile::default()
    };

    let settings = resolve_settings(file, CliOverrides::default());
    assert_eq!(settings.windows_installer, WindowsInstaller::Msi);
    assert!(settings.skip_uninstall);
    assert_eq!(settings.exclusions, vec!["vates".to_string()]);
    assert_eq!(settings.test_command.as_deref(), Some("ctest"));
}

#[test]
fn config_is_discovered_in_search_directory() {
    let dir = test_dir();
    fs::write(
        dir.join("installcheck.toml"),
        "log_file = \"found.log\"\n",
    )
    .expect("must write config");

    let overrides = CliOverrides {
        search_dir: Some(dir.clone()),
        ..CliOverrides::default()
    };
    let file = load_config_file(&overrides).expect("config must load");
    assert_eq!(file.log_file.as_deref(), Some(Path::new("found.log")));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_search_directory_config_is_not_an_error() {
    let dir = test_dir();

    let overrides = CliOverrides {
        search_dir: Some(dir.clone()),
        ..CliOverrides::default()
    };
    let file = load_config_file(&overrides).expect("absent config is fine");
    assert_eq!(file, RunConfigFile::default());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = test_dir();

    let overrides = CliOverrides {
        config: Some(dir.join("absent.toml")),
        ..CliOverrides::default()
    };
    let err = load_config_file(&overrides).expect_err("missing explicit config must fail");
    assert!(err.to_string().starts_with("Configuration Error: failed to read"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cli_parses_run_with_global_flags() {
    let cli = Cli::try_parse_from([
        "installcheck",
        "--search-dir",
        "/builds",
        "--exclude",
        "vates",
        "--exclude",
        "debug",
        "-vv",
        "run",
        "--test-command",
        "python runSystemTests.py",
        "--msi",
    ])
    .expect("command must parse");

    assert_eq!(cli.verbose, 2);
    assert!(cli.msi);
    let overrides = cli.overrides();
    assert_eq!(overrides.search_dir, Some(PathBuf::from("/builds")));
    assert_eq!(overrides.exclude, vec!["vates".to_string(), "debug".to_string()]);
    assert_eq!(
        overrides.test_command.as_deref(),
        Some("python runSystemTests.py")
    );
    match cli.command {
        Commands::Run { .. } => {}
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_parses_lifecycle_subcommands() {
    for (name, expected) in [("detect", "Detect"), ("install", "Install"), ("uninstall", "Uninstall")] {
        let cli = Cli::try_parse_from(["installcheck", name]).expect("command must parse");
        assert_eq!(format!("{:?}", cli.command), expected);
        assert_eq!(cli.overrides().test_command, None);
    }
}

#[test]
fn cli_requires_a_subcommand() {
    let err = Cli::try_parse_from(["installcheck"]).expect_err("missing subcommand must fail");
    assert!(matches!(
        err.kind(),
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn cli_rejects_test_command_outside_run() {
    let err = Cli::try_parse_from(["installcheck", "install", "--test-command", "ctest"])
        .expect_err("test command only belongs to run");
    assert_eq!(err.kind(), ErrorKind::UnknownArgument);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed mantid_3.1.0_amd64.deb"),
        "installed mantid_3.1.0_amd64.deb"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "installed mantid_3.1.0_amd64.deb"),
        "[OK] installed mantid_3.1.0_amd64.deb"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "err", "acceptance tests failed with code 1"),
        "[ERR] acceptance tests failed with code 1"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "platform: Linux"),
        "[..] platform: Linux"
    );
}

#[test]
fn output_style_is_rich_only_on_an_undecorated_terminal() {
    assert_eq!(output_style_for(false, true, false), OutputStyle::Rich);
    assert_eq!(output_style_for(true, true, false), OutputStyle::Plain);
    assert_eq!(output_style_for(false, false, false), OutputStyle::Plain);
    assert_eq!(output_style_for(false, true, true), OutputStyle::Plain);
}

#[test]
fn test_command_expands_application_placeholder() {
    assert_eq!(
        expand_test_command(
            "python runSystemTests.py --executable={application} -j4",
            Path::new("/opt/Mantid/bin/MantidPlot"),
        ),
        "python runSystemTests.py --executable=/opt/Mantid/bin/MantidPlot -j4"
    );
    assert_eq!(
        expand_test_command("ctest", Path::new("/opt/Mantid/bin/MantidPlot")),
        "ctest"
    );
}

#[test]
fn extra_exclusions_never_drop_the_companion_exclusion() {
    let from_flags = resolve_settings(
        RunConfigFile::default(),
        CliOverrides {
            exclude: vec!["debug".to_string()],
            ..CliOverrides::default()
        },
    );
    assert_eq!(
        from_flags.exclusions,
        vec!["vates".to_string(), "debug".to_string()]
    );

    let from_file = resolve_settings(
        RunConfigFile::parse("exclude = []").expect("config must parse"),
        CliOverrides::default(),
    );
    assert_eq!(from_file.exclusions, vec!["vates".to_string()]);
}

#[test]
fn excluded_flag_run_still_skips_the_companion_package() {
    let dir = test_dir();
    fs::write(dir.join("mantid-3.1.0.rpm"), b"artifact").expect("must write artifact");
    fs::write(dir.join("mantid-vates-3.2.0.rpm"), b"artifact").expect("must write companion");
    let settings = resolve_settings(
        RunConfigFile::default(),
        CliOverrides {
            log_file: Some(dir.join("run.log")),
            search_dir: Some(dir.clone()),
            exclude: vec!["debug".to_string()],
            ..CliOverrides::default()
        },
    );
    let host = HostPlatform::new(
        OsFamily::Linux,
        Some(LinuxDistribution {
            id: "centos".to_string(),
            id_like: vec!["rhel".to_string()],
            version_id: "6".to_string(),
            name: None,
        }),
    );
    let mut runner = ScriptedRunner::default();

    let outcome = run_install_with_hooks(&settings, plain_renderer(), &host, &mut runner)
        .expect("flow must finish");
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(runner.invocations.len(), 1);
    assert!(runner.invocations[0].ends_with("mantid-3.1.0.rpm\""));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_flow_passes_acceptance_tests_and_uninstalls() {
    let dir = test_dir();
    let settings = flow_settings(&dir, Some("acceptance --exe {application}"));
    let mut runner = ScriptedRunner::default();

    let outcome = run_lifecycle_with_hooks(&settings, plain_renderer(), &ubuntu_host(), &mut runner)
        .expect("flow must finish");

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(runner.invocations.len(), 3);
    assert!(runner.invocations[0].contains("mantid_3.1.0_amd64.deb"));
    assert_eq!(
        runner.invocations[1],
        "acceptance --exe /opt/Mantid/bin/MantidPlot"
    );
    assert_eq!(purges(&runner), 1);
    let log = fs::read_to_string(&settings.log_file).expect("must read log");
    assert!(log.contains("Running acceptance tests: acceptance --exe /opt/Mantid/bin/MantidPlot"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_flow_maps_failing_acceptance_tests_to_exit_one() {
    let dir = test_dir();
    let settings = flow_settings(&dir, Some("acceptance"));
    let mut runner = ScriptedRunner::default().fail("acceptance", 2);

    let outcome = run_lifecycle_with_hooks(&settings, plain_renderer(), &ubuntu_host(), &mut runner)
        .expect("flow must finish");

    assert_eq!(outcome, RunOutcome::FailedTest);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(purges(&runner), 1);
    let log = fs::read_to_string(&settings.log_file).expect("must read log");
    assert!(log.trim_end().ends_with("Tests failed"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_flow_without_artifact_ends_as_script_failure() {
    let dir = test_dir();
    let settings = resolve_settings(
        RunConfigFile::default(),
        CliOverrides {
            log_file: Some(dir.join("run.log")),
            search_dir: Some(dir.clone()),
            ..CliOverrides::default()
        },
    );
    let mut runner = ScriptedRunner::default();

    let outcome = run_lifecycle_with_hooks(&settings, plain_renderer(), &ubuntu_host(), &mut runner)
        .expect("flow must finish");

    assert_eq!(outcome, RunOutcome::FailedScript);
    assert!(runner.invocations.is_empty());
    let log = fs::read_to_string(&settings.log_file).expect("must read log");
    assert!(log.starts_with("Unable to find installer package matching 'mantid_[0-9]*.deb'"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn install_flow_keeps_package_on_success() {
    let dir = test_dir();
    let settings = flow_settings(&dir, None);
    let mut runner = ScriptedRunner::default();

    let outcome = run_install_with_hooks(&settings, plain_renderer(), &ubuntu_host(), &mut runner)
        .expect("flow must finish");

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(runner.invocations.len(), 1);
    assert_eq!(purges(&runner), 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn install_flow_rolls_back_a_failed_install() {
    let dir = test_dir();
    let settings = flow_settings(&dir, None);
    let mut runner = ScriptedRunner::default().fail("sudo gdebi", 3);

    let outcome = run_install_with_hooks(&settings, plain_renderer(), &ubuntu_host(), &mut runner)
        .expect("flow must finish");

    assert_eq!(outcome, RunOutcome::FailedInstall);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(purges(&runner), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn uninstall_flow_maps_command_failure_to_exit_one() {
    let dir = test_dir();
    let settings = flow_settings(&dir, None);

    let mut runner = ScriptedRunner::default();
    let outcome = run_uninstall_with_hooks(&settings, plain_renderer(), &ubuntu_host(), &mut runner)
        .expect("flow must finish");
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(purges(&runner), 1);

    let mut runner = ScriptedRunner::default().fail("sudo dpkg", 1);
    let outcome = run_uninstall_with_hooks(&settings, plain_renderer(), &ubuntu_host(), &mut runner)
        .expect("flow must finish");
    assert_eq!(outcome.exit_code(), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn detect_flow_reports_unsupported_host() {
    let settings = resolve_settings(RunConfigFile::default(), CliOverrides::default());
    let host = HostPlatform::new(OsFamily::Other, None);

    let err = run_detect_with_hooks(&settings, plain_renderer(), &host)
        .expect_err("unsupported host must fail");
    assert!(err.to_string().starts_with("Unsupported platform"));

    let detected = run_detect_with_hooks(
        &settings,
        plain_renderer(),
        &HostPlatform::new(OsFamily::MacOs, None),
    )
    .expect("detect must finish");
    assert_eq!(detected.exit_code(), 0);
}
