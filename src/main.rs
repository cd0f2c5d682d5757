/*!
 * Vidvault CLI - run one incremental backup
 */

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use vidvault::{
    config::{BackupConfig, LogLevel},
    error::{BackupError, Result, EXIT_SUCCESS},
    logging, BatchController, RunReport,
};

#[derive(Parser)]
#[command(name = "vidvault")]
#[command(version, about = "Incremental backup of experiment video trees", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root containing experiment_* folders
    #[arg(short = 's', long = "source", value_name = "PATH")]
    source: Option<PathBuf>,

    /// Backup root receiving batches and the manifest
    #[arg(short = 'd', long = "dest", value_name = "PATH")]
    destination: Option<PathBuf>,

    /// Video extension to include (repeatable, replaces the configured list)
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Simulate: count and plan, copy nothing, leave the manifest untouched
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Log level
    #[arg(long = "log-level", value_enum)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stdout
    #[arg(long = "log", value_name = "FILE")]
    log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(report) => {
            print_summary(&report);
            report.exit_code()
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.category(), e);
            e.exit_code()
        }
    };
    if code != EXIT_SUCCESS {
        std::process::exit(code);
    }
}

fn run() -> Result<RunReport> {
    let cli = Cli::parse();
    let config = build_config(cli)?;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    BatchController::new(config).run()
}

/// Config file first, then CLI flags on top
fn build_config(cli: Cli) -> Result<BackupConfig> {
    let mut config = match cli.config {
        Some(ref path) => BackupConfig::from_file(path)?,
        None => BackupConfig::default(),
    };

    if let Some(source) = cli.source {
        config.source_root = source;
    }
    if let Some(dest) = cli.destination {
        config.dest_root = dest;
    }
    if !cli.extensions.is_empty() {
        config.video_extensions = cli.extensions;
    }
    if cli.dry_run {
        config.dry_run = true;
    }
    if cli.verbose {
        config.verbose = true;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log;
    }

    if config.source_root.as_os_str().is_empty() {
        return Err(BackupError::Config("Source path required".to_string()));
    }
    if config.dest_root.as_os_str().is_empty() {
        return Err(BackupError::Config("Destination path required".to_string()));
    }

    Ok(config)
}

fn print_summary(report: &RunReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!("Incremental backup done{}", mode);
    println!("  Experiments scanned: {}", report.experiments);
    println!("  Files discovered:    {}", report.discovered);
    println!("  Files to copy:       {}", report.planned);
    println!("  {}", report.counters);
    println!("  Batch folder:        {}", report.batch_dir.display());
    if !report.warnings.is_empty() {
        println!("  Warnings:            {}", report.warnings.len());
    }
    for failure in &report.failures {
        println!(
            "  FAILED {} -> {} ({})",
            failure.src.display(),
            failure.dst.display(),
            failure.reason
        );
    }
}
