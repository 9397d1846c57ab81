// ticketboard CLI - traffic-enforcement comparison reports from uploaded spreadsheets

mod exit_codes;
mod mail;
mod render;
mod report;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use report::{LedgerCommands, ModeArg, RunOptions};

#[derive(Parser)]
#[command(name = "tboard")]
#[command(about = "Weekly / year-to-date / prior-year enforcement comparison from raw report files")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Show per-file diagnostics and debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the comparison report from a batch of files
    #[command(after_help = "\
Date-span mode (default) needs one weekly and two cumulative reports; the
cumulative report with the later year is the current one.

Examples:
  tboard run week.xlsx ytd_113.xlsx ytd_112.xlsx
  tboard run *.csv --xlsx report.xlsx
  tboard run a.xls 'a(1).xls' 'a(2).xls' footman.xls --mode filename-marker
  tboard run *.xlsx --json --output report.json
  tboard run *.xlsx --email --secrets ~/.config/ticketboard/secrets.toml")]
    Run {
        /// Input files (xlsx, xls, ods, csv)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report config (default: built-in preset)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Override the config's period detection mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Write the styled report spreadsheet
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Output JSON to stdout instead of the text table
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Email the report (once per set of input files)
        #[arg(long)]
        email: bool,

        /// Mail secrets file (default: <config dir>/ticketboard/secrets.toml)
        #[arg(long, env = "TBOARD_SECRETS")]
        secrets: Option<PathBuf>,

        /// Sent ledger file (default: <config dir>/ticketboard/sent.json)
        #[arg(long, env = "TBOARD_LEDGER")]
        ledger: Option<PathBuf>,
    },

    /// Show how each file would be classified, without building a report
    #[command(after_help = "\
Exit code 11 means the batch would be rejected by `tboard run`.

Examples:
  tboard classify *.xlsx
  tboard classify *.xls --mode filename-marker --json")]
    Classify {
        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Report config (default: built-in preset)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Override the config's period detection mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Output the diagnostic log as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a report config without running
    #[command(after_help = "\
Examples:
  tboard validate station.toml")]
    Validate {
        /// Path to the report config (TOML)
        config: PathBuf,
    },

    /// Print the built-in report config, as a starting point for your own
    #[command(after_help = "\
Examples:
  tboard preset > station.toml")]
    Preset,

    /// Manage the record of already-emailed batches
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

/// Logs go to stderr; stdout carries only the report (or JSON).
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: tboard <command> [options]");
            eprintln!("       tboard --help for more information");
            Ok(())
        }
        Some(Commands::Run { files, config, mode, xlsx, json, output, email, secrets, ledger }) => {
            report::cmd_run(RunOptions {
                files,
                config,
                mode,
                xlsx,
                json,
                output,
                email,
                secrets,
                ledger,
                verbose: cli.verbose,
            })
        }
        Some(Commands::Classify { files, config, mode, json }) => {
            report::cmd_classify(files, config, mode, json)
        }
        Some(Commands::Validate { config }) => report::cmd_validate(config),
        Some(Commands::Preset) => report::cmd_preset(),
        Some(Commands::Ledger { command }) => report::cmd_ledger(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
