//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Build keyword-driven test suites, run them, and render reports
#[derive(Parser, Debug)]
#[command(name = "dynamic-suite")]
#[command(version)]
#[command(about = "Build keyword-driven test suites programmatically, run them, and render reports")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available tutorials
    List(ListArgs),

    /// Run one or more tutorials
    Tutorial(TutorialArgs),

    /// Generate a connectivity suite from a server inventory and run it
    Connectivity(ConnectivityArgs),

    /// Render report and log files from a result artifact
    Report(ReportArgs),

    /// Print the results stored in a result artifact
    Show(ShowArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show each tutorial's suite shape and output paths
    #[arg(short, long)]
    pub detailed: bool,
}

/// Execution flags shared by commands that run suites
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Run tests in parallel
    #[arg(short, long)]
    pub parallel: bool,

    /// Number of concurrent tests (implies --parallel)
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Library keyword timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Console output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,
}

/// Arguments for tutorial command
#[derive(Parser, Debug)]
pub struct TutorialArgs {
    /// Tutorial ids or numbers (e.g. 04-dynamic-tests or 4)
    #[arg(required_unless_present = "all")]
    pub ids: Vec<String>,

    /// Run every tutorial
    #[arg(short, long, conflicts_with = "ids")]
    pub all: bool,

    /// Directory that output paths are resolved against
    #[arg(short, long)]
    pub base_dir: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for connectivity command
#[derive(Parser, Debug)]
pub struct ConnectivityArgs {
    /// Inventory file (YAML or JSON); defaults to the configured servers
    #[arg(short, long)]
    pub servers: Option<PathBuf>,

    /// How each address is checked (log, inline, keyword)
    #[arg(long, default_value = "keyword")]
    pub style: String,

    /// Suite name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output prefix for the artifact, report and log
    #[arg(long, default_value = "connectivity")]
    pub prefix: String,

    /// Echo requests sent per address
    #[arg(long, default_value = "1")]
    pub ping_count: u32,

    /// Seconds to wait for each reply
    #[arg(long, default_value = "5")]
    pub ping_timeout: u32,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Result artifact written by a run
    pub artifact: PathBuf,

    /// Report path; `NONE` skips the report
    #[arg(short, long)]
    pub report: Option<String>,

    /// Log path; `NONE` skips the log
    #[arg(short, long)]
    pub log: Option<String>,

    /// Report format (html, markdown, text)
    #[arg(short, long, default_value = "html")]
    pub format: String,
}

/// Arguments for show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Result artifact written by a run
    pub artifact: PathBuf,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(default_value = "dynamic-suite.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show environment variables
    Env,
}
