//! Batch orchestration: classify every file, build tidy tables, reconcile.

use ticketboard_core::RawGrid;
use tracing::{debug, info};

use crate::config::{CategoryConfig, CategorySource, PeriodMode, ReportConfig};
use crate::diagnostics::DiagnosticLog;
use crate::error::ReconError;
use crate::header::locate_header;
use crate::model::{PeriodLabel, PeriodSlot, PeriodTables, ReportMeta, ReportOutcome, SlotSource, TidyTable};
use crate::normalize::build_tidy_table;
use crate::period::{assign_slots, classify_span, is_pedestrian_report, marker_slot, mmdd_range};
use crate::reconcile::reconcile;

/// One uploaded file after loading.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub grid: RawGrid,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, grid: RawGrid) -> Self {
        Self { name: name.into(), grid }
    }
}

/// Files chosen for one period slot.
#[derive(Debug, Clone)]
struct SlotPlan {
    slot: PeriodSlot,
    range: String,
    files: Vec<usize>,
}

/// Classify a batch without aggregating it.
///
/// The log holds one line per file plus any batch-level blocking entry.
pub fn classify(config: &ReportConfig, files: &[SourceFile]) -> DiagnosticLog {
    let mut log = DiagnosticLog::new();
    let _ = plan(config, files, &mut log);
    log
}

/// Run the whole pipeline over one batch.
///
/// Classification problems halt before any aggregation and come back as
/// `ReconError::Classification` with the full log.
pub fn run(config: &ReportConfig, files: &[SourceFile]) -> Result<ReportOutcome, ReconError> {
    let mut log = DiagnosticLog::new();
    let Some(plans) = plan(config, files, &mut log) else {
        return Err(ReconError::Classification(log));
    };

    let mut tables = PeriodTables::default();
    let mut slots = Vec::with_capacity(plans.len());
    for p in &plans {
        let mut merged: Option<TidyTable> = None;
        for &idx in &p.files {
            let file = &files[idx];
            if file.grid.is_unreadable() {
                continue;
            }
            let table = tidy_table(config, file, &mut log);
            merged = Some(match merged {
                Some(acc) => acc.merge(&table),
                None => table,
            });
        }
        tables.set(p.slot, merged.unwrap_or_else(|| TidyTable::new(config.category_names())));
        slots.push(SlotSource {
            slot: p.slot,
            range: p.range.clone(),
            files: p.files.iter().map(|&i| files[i].name.clone()).collect(),
        });
    }

    let reconciled = reconcile(&tables, config);
    for unit in &reconciled.dropped_units {
        log.warn(None, format!("unit '{unit}' has no canonical mapping; dropped"));
    }

    info!(
        files = files.len(),
        units = reconciled.table.rows.len().saturating_sub(1),
        dropped = reconciled.dropped_units.len(),
        "report built"
    );

    Ok(ReportOutcome {
        meta: ReportMeta {
            config_name: config.name.clone(),
            title: config.title.clone(),
            mode: config.mode.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        slots,
        comparison: reconciled.table,
        dropped_units: reconciled.dropped_units,
        diagnostics: log,
    })
}

/// Decide which files feed which slot. None when the batch cannot proceed.
fn plan(config: &ReportConfig, files: &[SourceFile], log: &mut DiagnosticLog) -> Option<Vec<SlotPlan>> {
    if files.is_empty() {
        log.block("no input files");
        return None;
    }
    match config.mode {
        PeriodMode::DateSpan => plan_date_span(config, files, log),
        PeriodMode::FilenameMarker => plan_filename_marker(config, files, log),
    }
}

fn plan_date_span(config: &ReportConfig, files: &[SourceFile], log: &mut DiagnosticLog) -> Option<Vec<SlotPlan>> {
    let mut classified: Vec<(usize, PeriodLabel)> = Vec::new();
    for (idx, file) in files.iter().enumerate() {
        if let Some(reason) = file.grid.failure() {
            log.reject(&file.name, format!("unreadable: {reason}"));
            continue;
        }
        match classify_span(&file.grid, &config.period) {
            Ok(label) => {
                debug!(file = %file.name, kind = %label.kind, text = %label.raw_text, "period detected");
                log.accept(&file.name, format!("{} {}", label.kind, label.range_text()));
                classified.push((idx, label));
            }
            Err(reason) => log.reject(&file.name, reason),
        }
    }

    // rejected files are left out; the slot counts decide whether the rest suffices
    let labels: Vec<PeriodLabel> = classified.iter().map(|(_, l)| l.clone()).collect();
    let assignment = match assign_slots(&labels) {
        Ok(a) => a,
        Err(reason) => {
            log.block(reason);
            return None;
        }
    };

    Some(
        PeriodSlot::ALL
            .into_iter()
            .map(|slot| {
                let (idx, label) = &classified[assignment.index(slot)];
                SlotPlan { slot, range: label.range_text(), files: vec![*idx] }
            })
            .collect(),
    )
}

fn plan_filename_marker(
    config: &ReportConfig,
    files: &[SourceFile],
    log: &mut DiagnosticLog,
) -> Option<Vec<SlotPlan>> {
    let mut plans: Vec<SlotPlan> = PeriodSlot::ALL
        .into_iter()
        .map(|slot| SlotPlan { slot, range: String::new(), files: Vec::new() })
        .collect();

    for (idx, file) in files.iter().enumerate() {
        let slot = marker_slot(&file.name);
        let Some(plan) = plans.iter_mut().find(|p| p.slot == slot) else { continue };
        plan.files.push(idx);

        if let Some(reason) = file.grid.failure() {
            log.reject(&file.name, format!("unreadable, counted as empty: {reason}"));
            continue;
        }

        let family = if is_pedestrian_report(&file.name) { " pedestrian" } else { "" };
        match mmdd_range(&file.grid, &config.period) {
            Some(range) => {
                log.accept(&file.name, format!("{}{family} {range}", slot.to_string().to_uppercase()));
                if plan.range.is_empty() {
                    plan.range = range;
                }
            }
            None => {
                log.accept(&file.name, format!("{}{family}", slot.to_string().to_uppercase()));
                log.warn(Some(&file.name), "no MMDD date range found; period label left empty");
            }
        }
    }

    let missing: Vec<PeriodSlot> = plans.iter().filter(|p| p.files.is_empty()).map(|p| p.slot).collect();
    if !missing.is_empty() {
        for slot in missing {
            log.block(format!("no {slot} report among the input files"));
        }
        return None;
    }
    Some(plans)
}

/// Categories a file contributes to. Source families only apply in marker mode.
fn categories_for<'a>(config: &'a ReportConfig, file_name: &str) -> Vec<&'a CategoryConfig> {
    match config.mode {
        PeriodMode::DateSpan => config.categories.iter().collect(),
        PeriodMode::FilenameMarker => {
            let source = if is_pedestrian_report(file_name) {
                CategorySource::Pedestrian
            } else {
                CategorySource::General
            };
            config.categories_from(source)
        }
    }
}

fn tidy_table(config: &ReportConfig, file: &SourceFile, log: &mut DiagnosticLog) -> TidyTable {
    let header = locate_header(&file.grid, &config.header);
    if header.is_fallback() {
        debug!(file = %file.name, row = header.index(), "header anchor not found");
        log.warn(
            Some(&file.name),
            format!(
                "no '{}' header row found; using row {}",
                config.header.anchor,
                header.index()
            ),
        );
    }
    let categories = categories_for(config, &file.name);
    build_tidy_table(&file.grid, header.index(), &categories, &config.header, &config.normalize)
}
