//! Dynamic Suite - programmatic keyword-driven test suites
//!
//! Builds test suites in code, runs them, and renders HTML reports and logs.
//!
//! ## Usage
//!
//! ```bash
//! # List the tutorials
//! dynamic-suite list --detailed
//!
//! # Run one tutorial, or all of them
//! dynamic-suite tutorial 4
//! dynamic-suite tutorial --all --base-dir runs --parallel
//!
//! # Ping every address in an inventory through a suite keyword
//! dynamic-suite connectivity --servers servers.yaml --style keyword
//!
//! # Re-render reports from a stored artifact
//! dynamic-suite report output/04-dynamic-tests-output.json --format markdown
//! ```
//!
//! The process exits with the number of failed tests, capped at 250.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};

use dynamic_suite::cli::{self, Args};
use dynamic_suite::config::{print_env_help, AppConfig, ConfigFile, EnvConfig};
use dynamic_suite::generate::{default_servers, CheckStyle, ConnectivitySuite, Inventory};
use dynamic_suite::keywords::LibraryRegistry;
use dynamic_suite::models::SuiteResult;
use dynamic_suite::output::{OutputFormat, ResultFormatter};
use dynamic_suite::pipeline::{exit_code, run_pipeline, ArtifactPaths};
use dynamic_suite::results::{
    read_artifact, ReportFormat, ReportGenerator, ReportOptions, ReportWriter, WrittenReports,
    DEFAULT_LOG_PATH, DEFAULT_REPORT_PATH,
};
use dynamic_suite::tutorials::{self, Tutorial};
use dynamic_suite::utils::{init_logger, LogLevel};

/// Report or log path that disables writing that file
const NONE_PATH: &str = "NONE";

/// Placeholder artifact path; pipelines replace it with their own
const DEFAULT_OUTPUT: &str = "output.json";

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let env = EnvConfig::load();
    let config = match ConfigFile::resolve(args.config.as_deref(), &env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };

    let level = match console_level(args.log_level.as_deref(), args.verbose, &config.app) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };
    init_logger(level);
    if env.has_any() {
        debug!("Environment overrides: {:?}", env);
    }

    match run(args, config, env).await {
        Ok(failed) => process::exit(exit_code(failed)),
        Err(e) => {
            error!("{e:#}");
            process::exit(1);
        }
    }
}

/// `--log-level` wins over `--verbose`, which wins over the configured level
fn console_level(flag: Option<&str>, verbose: bool, app: &AppConfig) -> Result<LogLevel> {
    match flag {
        Some(level) => LogLevel::from_str(level).ok_or_else(|| {
            anyhow::anyhow!("Unknown log level: {level} (trace, debug, info, warn, error)")
        }),
        None if verbose => Ok(LogLevel::Debug),
        None => Ok(app.log_level()),
    }
}

/// Dispatch a command, returning the number of failed tests
async fn run(args: Args, config: ConfigFile, env: EnvConfig) -> Result<usize> {
    match args.command {
        cli::Command::List(list_args) => {
            list_tutorials(list_args)?;
            Ok(0)
        }
        cli::Command::Tutorial(tutorial_args) => {
            run_tutorials(tutorial_args, config.app, &env).await
        }
        cli::Command::Connectivity(connectivity_args) => {
            run_connectivity(connectivity_args, config, &env).await
        }
        cli::Command::Report(report_args) => {
            write_reports(report_args)?;
            Ok(0)
        }
        cli::Command::Show(show_args) => show_results(show_args, &config.app, &env),
        cli::Command::Config(config_args) => {
            manage_config(config_args, &config)?;
            Ok(0)
        }
    }
}

fn list_tutorials(args: cli::ListArgs) -> Result<()> {
    println!("\nTutorials ({} total)\n", tutorials::all().len());
    println!("{:━<72}", "");

    for tutorial in tutorials::all() {
        println!("  {:22} {}", tutorial.id, tutorial.title);

        if args.detailed {
            let suite = tutorial
                .build()
                .with_context(|| format!("Failed to build tutorial {}", tutorial.id))?;
            let paths = tutorial.paths();
            println!("      {}", tutorial.summary);
            println!(
                "      Suite '{}': {} tests, {} keywords, {} imports",
                suite.name(),
                suite.test_count(),
                suite.keywords().len(),
                suite.imports().len()
            );
            println!("      Output: {}", paths.output.display());
            if let Some(report) = &paths.reports.report {
                println!("      Report: {}", report.display());
            }
            if let Some(log) = &paths.reports.log {
                println!("      Log:    {}", log.display());
            }
            println!();
        }
    }

    println!("{:━<72}\n", "");
    Ok(())
}

/// Fold execution flags from the command line into the configuration
fn apply_run_args(app: &mut AppConfig, run: &cli::RunArgs) {
    if run.parallel {
        app.parallel = true;
    }
    if let Some(concurrent) = run.concurrent {
        app.parallel = true;
        app.max_concurrent = concurrent.max(1);
    }
    if let Some(timeout) = run.timeout {
        app.keyword_timeout_secs = Some(timeout);
    }
}

fn formatter(format: Option<&str>, app: &AppConfig, env: &EnvConfig) -> Result<ResultFormatter> {
    let name = format
        .map(str::to_string)
        .unwrap_or_else(|| env.format_or("table"));
    let format = OutputFormat::from_str(&name).ok_or_else(|| {
        anyhow::anyhow!("Unknown output format: {name} (table, json, json-pretty, csv, summary)")
    })?;

    let formatter = ResultFormatter::new(format);
    Ok(if app.colorize {
        formatter
    } else {
        formatter.no_color()
    })
}

async fn run_tutorials(
    args: cli::TutorialArgs,
    mut app: AppConfig,
    env: &EnvConfig,
) -> Result<usize> {
    let selected: Vec<&Tutorial> = if args.all {
        tutorials::all().iter().collect()
    } else {
        args.ids
            .iter()
            .map(|id| {
                tutorials::find(id).ok_or_else(|| {
                    anyhow::anyhow!("Unknown tutorial: {id} (see `dynamic-suite list`)")
                })
            })
            .collect::<Result<_>>()?
    };

    apply_run_args(&mut app, &args.run);
    let formatter = formatter(args.run.format.as_deref(), &app, env)?;
    let base_dir = args.base_dir.unwrap_or_else(|| app.output_dir.clone());
    let options = app.run_options(DEFAULT_OUTPUT);

    let mut failed = 0;
    for tutorial in selected {
        let outcome =
            tutorials::run_tutorial(tutorial, &base_dir, LibraryRegistry::standard(), &options)
                .await?;
        print_outcome(&formatter, &outcome.result, &outcome.output, &outcome.reports)?;
        failed += outcome.result.statistics.failed;
    }

    Ok(failed)
}

async fn run_connectivity(
    args: cli::ConnectivityArgs,
    config: ConfigFile,
    env: &EnvConfig,
) -> Result<usize> {
    let style = CheckStyle::from_str(&args.style).ok_or_else(|| {
        anyhow::anyhow!("Unknown check style: {} (log, inline, keyword)", args.style)
    })?;

    let groups = match &args.servers {
        Some(path) => Inventory::load(path)?.servers,
        None if !config.servers.is_empty() => config.servers.clone(),
        None => {
            debug!("No inventory given; using the default DNS and NTP servers");
            default_servers()
        }
    };

    let suite = args
        .name
        .clone()
        .map(ConnectivitySuite::new)
        .unwrap_or_default()
        .style(style)
        .ping_count(args.ping_count)
        .ping_timeout(args.ping_timeout)
        .build(&groups)
        .context("Failed to build connectivity suite")?;

    let mut app = config.app;
    apply_run_args(&mut app, &args.run);
    let formatter = formatter(args.run.format.as_deref(), &app, env)?;

    let paths = ArtifactPaths::prefixed(&args.prefix).in_dir(&app.output_dir);
    let outcome = run_pipeline(
        &suite,
        &paths,
        LibraryRegistry::standard(),
        &app.run_options(&paths.output),
    )
    .await?;

    print_outcome(&formatter, &outcome.result, &outcome.output, &outcome.reports)?;
    Ok(outcome.result.statistics.failed)
}

fn print_outcome(
    formatter: &ResultFormatter,
    result: &SuiteResult,
    output: &Path,
    reports: &WrittenReports,
) -> Result<()> {
    println!("{}", formatter.format_suite(result)?);
    println!("Output:  {}", output.display());
    if let Some(log) = &reports.log {
        println!("Log:     {}", log.display());
    }
    if let Some(report) = &reports.report {
        println!("Report:  {}", report.display());
    }
    Ok(())
}

/// `NONE` disables the file; otherwise the given path or `default` next to the artifact
fn report_path(arg: Option<&str>, default: &str, base: &Path) -> Option<PathBuf> {
    match arg {
        Some(path) if path.eq_ignore_ascii_case(NONE_PATH) => None,
        Some(path) => Some(PathBuf::from(path)),
        None => Some(base.join(default)),
    }
}

fn write_reports(args: cli::ReportArgs) -> Result<()> {
    let format = ReportFormat::from_str(&args.format).ok_or_else(|| {
        anyhow::anyhow!("Unknown report format: {} (html, markdown, text)", args.format)
    })?;
    let base = args
        .artifact
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    if format == ReportFormat::Html {
        let options = ReportOptions::new(
            report_path(args.report.as_deref(), DEFAULT_REPORT_PATH, &base),
            report_path(args.log.as_deref(), DEFAULT_LOG_PATH, &base),
        );
        let written = ReportWriter::new(&args.artifact).write_results(&options)?;
        if let Some(log) = written.log {
            println!("Log:     {}", log.display());
        }
        if let Some(report) = written.report {
            println!("Report:  {}", report.display());
        }
        return Ok(());
    }

    let artifact = read_artifact(&args.artifact)?;
    let content = ReportGenerator::new(&artifact).report(format, None)?;
    match args.report.as_deref() {
        Some(path) if !path.eq_ignore_ascii_case(NONE_PATH) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {path}"))?;
            info!("Report: {}", path);
        }
        _ => println!("{content}"),
    }
    Ok(())
}

fn show_results(args: cli::ShowArgs, app: &AppConfig, env: &EnvConfig) -> Result<usize> {
    let artifact = read_artifact(&args.artifact)?;
    let formatter = formatter(args.format.as_deref(), app, env)?;
    println!("{}", formatter.format_suite(&artifact.suite)?);
    Ok(artifact.suite.statistics.failed)
}

fn manage_config(args: cli::ConfigArgs, config: &ConfigFile) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }

            ConfigFile::example().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format } => {
            let output = if format == "json" {
                serde_json::to_string_pretty(config)?
            } else {
                serde_yaml::to_string(config)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Env => {
            print_env_help();
            println!();
            EnvConfig::load().print_summary();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_level() {
        let app = AppConfig {
            log_level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(console_level(Some("TRACE"), true, &app).unwrap(), LogLevel::Trace);
        assert_eq!(console_level(None, true, &app).unwrap(), LogLevel::Debug);
        assert_eq!(console_level(None, false, &app).unwrap(), LogLevel::Warn);

        let err = console_level(Some("loud"), false, &app).unwrap_err();
        assert!(err.to_string().contains("Unknown log level: loud"));
    }

    #[test]
    fn test_report_path() {
        let base = Path::new("runs");
        assert_eq!(report_path(Some("NONE"), DEFAULT_REPORT_PATH, base), None);
        assert_eq!(report_path(Some("none"), DEFAULT_LOG_PATH, base), None);
        assert_eq!(
            report_path(Some("out/r.html"), DEFAULT_REPORT_PATH, base),
            Some(PathBuf::from("out/r.html"))
        );
        assert_eq!(
            report_path(None, DEFAULT_LOG_PATH, base),
            Some(PathBuf::from("runs/log.html"))
        );
    }
}
