//! `tboard run|classify|validate|preset|ledger`: report commands.

use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use tracing::debug;

use ticketboard_config::{batch_key, load_mail_settings, FileLedger, SentLedger};
use ticketboard_recon::config::BUILTIN_PRESET;
use ticketboard_recon::{
    build_report_sheet, classify, run, DiagnosticLog, Level, PeriodMode, PeriodSlot, ReconError,
    ReportConfig, ReportOutcome, SourceFile,
};

use crate::exit_codes::{
    EXIT_ALREADY_SENT, EXIT_CLASSIFICATION, EXIT_EXPORT, EXIT_INVALID_CONFIG, EXIT_MAIL_FAILED,
};
use crate::mail::{deliver, DeliveryError, OutgoingMail, SmtpOutbox};
use crate::render::render_sheet;
use crate::CliError;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    /// Date range text in each sheet decides the period
    DateSpan,
    /// (1) / (2) markers in the file name decide the period
    FilenameMarker,
}

impl From<ModeArg> for PeriodMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::DateSpan => PeriodMode::DateSpan,
            ModeArg::FilenameMarker => PeriodMode::FilenameMarker,
        }
    }
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Forget every sent batch so reports can be emailed again
    Clear {
        /// Ledger file (default: <config dir>/ticketboard/sent.json)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
}

/// Options shared by `run`.
pub struct RunOptions {
    pub files: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub mode: Option<ModeArg>,
    pub xlsx: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub email: bool,
    pub secrets: Option<PathBuf>,
    pub ledger: Option<PathBuf>,
    pub verbose: bool,
}

fn report_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn recon_to_cli(err: ReconError) -> CliError {
    match &err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
            report_err(EXIT_INVALID_CONFIG, err.to_string())
        }
        ReconError::Classification(log) => {
            eprint!("{log}");
            report_err(EXIT_CLASSIFICATION, err.to_string())
                .with_hint("run `tboard classify <files>` to see how each file was read")
        }
    }
}

pub(crate) fn load_config(path: Option<&Path>, mode: Option<ModeArg>) -> Result<ReportConfig, CliError> {
    let mut config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| CliError::io(format!("cannot read config {}: {e}", p.display())))?;
            ReportConfig::from_toml(&text).map_err(recon_to_cli)?
        }
        None => ReportConfig::builtin().map_err(recon_to_cli)?,
    };
    if let Some(mode) = mode {
        config.mode = mode.into();
    }
    debug!(config = %config.name, mode = %config.mode, "config loaded");
    Ok(config)
}

/// Missing paths are a usage error; unreadable contents are left to the
/// pipeline, which records them per file.
pub(crate) fn load_files(paths: &[PathBuf]) -> Result<Vec<SourceFile>, CliError> {
    if paths.is_empty() {
        return Err(CliError::args("no input files given"));
    }
    paths
        .iter()
        .map(|p| {
            if !p.is_file() {
                return Err(CliError::args(format!("file not found: {}", p.display())));
            }
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string());
            Ok(SourceFile::new(name, ticketboard_io::load_path(p)))
        })
        .collect()
}

fn print_log(log: &DiagnosticLog, verbose: bool) {
    for entry in &log.entries {
        if verbose || entry.level != Level::Accepted {
            eprintln!("{entry}");
        }
    }
}

pub fn cmd_run(opts: RunOptions) -> Result<(), CliError> {
    let config = load_config(opts.config.as_deref(), opts.mode)?;
    let files = load_files(&opts.files)?;

    let outcome = run(&config, &files).map_err(recon_to_cli)?;
    print_log(&outcome.diagnostics, opts.verbose);

    let sheet = build_report_sheet(&outcome.comparison, &outcome.slots, &config);

    let json_str = if opts.json || opts.output.is_some() {
        Some(
            serde_json::to_string_pretty(&outcome)
                .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?,
        )
    } else {
        None
    };

    if let (Some(path), Some(json)) = (&opts.output, &json_str) {
        std::fs::write(path, json)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if opts.json {
        if let Some(json) = &json_str {
            println!("{json}");
        }
    } else {
        print!("{}", render_sheet(&sheet));
    }

    if let Some(path) = &opts.xlsx {
        let result = ticketboard_io::xlsx::export_report(&sheet, path)
            .map_err(|e| report_err(EXIT_EXPORT, e))?;
        eprintln!(
            "wrote {} ({} rows, {} columns, {} merged ranges)",
            path.display(),
            result.rows_exported,
            result.columns_exported,
            result.merges_exported
        );
    }

    eprintln!(
        "{}: {} unit(s), {} dropped, {} warning(s)",
        config.name,
        outcome.comparison.rows.len().saturating_sub(1),
        outcome.dropped_units.len(),
        outcome.diagnostics.count(Level::Warning),
    );

    if opts.email {
        let bytes = ticketboard_io::xlsx::export_report_to_buffer(&sheet)
            .map_err(|e| report_err(EXIT_EXPORT, e))?;
        send_report(&outcome, &config, render_sheet(&sheet), bytes, &opts)?;
    }

    Ok(())
}

fn subject(outcome: &ReportOutcome) -> String {
    let range = outcome
        .slot(PeriodSlot::Weekly)
        .map(|s| s.range.as_str())
        .unwrap_or("");
    format!("{} {}", outcome.meta.title, range).trim_end().to_string()
}

fn send_report(
    outcome: &ReportOutcome,
    config: &ReportConfig,
    body: String,
    attachment: Vec<u8>,
    opts: &RunOptions,
) -> Result<(), CliError> {
    let resolved = load_mail_settings(opts.secrets.as_deref())
        .map_err(|e| report_err(EXIT_MAIL_FAILED, e))?;
    debug!(source = resolved.password_source.as_str(), "smtp password resolved");
    let settings = resolved.settings;

    let ledger_path = opts
        .ledger
        .clone()
        .unwrap_or_else(ticketboard_config::ledger::default_ledger_path);
    let mut ledger = FileLedger::open(&ledger_path).map_err(CliError::io)?;
    let key = batch_key(outcome.batch_key().as_slice());

    let mail = OutgoingMail {
        from: settings.from.clone(),
        to: settings.to.clone(),
        subject: subject(outcome),
        body,
        attachment_name: format!("{}.xlsx", config.name),
        attachment,
    };

    let outbox = SmtpOutbox::new(&settings).map_err(delivery_to_cli)?;
    deliver(&outbox, &mut ledger, &key, &mail).map_err(delivery_to_cli)?;
    eprintln!("sent to {}", settings.to.join(", "));
    Ok(())
}

fn delivery_to_cli(err: DeliveryError) -> CliError {
    let message = err.to_string();
    match err {
        DeliveryError::AlreadySent(_) => report_err(EXIT_ALREADY_SENT, message)
            .with_hint("run `tboard ledger clear` to allow sending it again"),
        DeliveryError::Build(_) => report_err(EXIT_MAIL_FAILED, message),
        DeliveryError::Transport { hint, .. } => CliError { code: EXIT_MAIL_FAILED, message, hint },
        DeliveryError::Ledger(_) => CliError::io(message),
    }
}

pub fn cmd_classify(
    files: Vec<PathBuf>,
    config: Option<PathBuf>,
    mode: Option<ModeArg>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref(), mode)?;
    let files = load_files(&files)?;
    let log = classify(&config, &files);

    if json {
        let json_str = serde_json::to_string_pretty(&log)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        print!("{log}");
    }

    if log.count(Level::Blocking) > 0 {
        return Err(report_err(EXIT_CLASSIFICATION, "batch cannot be reported as-is"));
    }
    Ok(())
}

pub fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(path.as_path()), None)?;
    eprintln!(
        "valid: report '{}' ({} mode) with {} categor{}, {} unit(s)",
        config.name,
        config.mode,
        config.categories.len(),
        if config.categories.len() == 1 { "y" } else { "ies" },
        config.units.len(),
    );
    Ok(())
}

pub fn cmd_preset() -> Result<(), CliError> {
    print!("{BUILTIN_PRESET}");
    Ok(())
}

pub fn cmd_ledger(cmd: LedgerCommands) -> Result<(), CliError> {
    match cmd {
        LedgerCommands::Clear { ledger } => {
            let path = ledger.unwrap_or_else(ticketboard_config::ledger::default_ledger_path);
            let mut ledger = FileLedger::open(&path).map_err(CliError::io)?;
            let count = ledger.len();
            ledger.clear().map_err(CliError::io)?;
            eprintln!("cleared {} batch(es) from {}", count, ledger.path().display());
            Ok(())
        }
    }
}
