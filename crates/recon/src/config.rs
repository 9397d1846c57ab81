use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// Built-in preset, compiled in so the tool works without a config file.
pub const BUILTIN_PRESET: &str = include_str!("../presets/longtan.toml");

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub mode: PeriodMode,
    #[serde(default)]
    pub period: PeriodConfig,
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    pub categories: Vec<CategoryConfig>,
    pub units: Vec<UnitConfig>,
}

/// How each file's reporting period is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMode {
    /// Date range text in the sheet decides weekly vs cumulative, year decides current vs prior.
    #[default]
    DateSpan,
    /// File name markers decide the slot; the sheet only supplies an MMDD range label.
    FilenameMarker,
}

impl std::fmt::Display for PeriodMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DateSpan => write!(f, "date_span"),
            Self::FilenameMarker => write!(f, "filename_marker"),
        }
    }
}

// ---------------------------------------------------------------------------
// Period detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PeriodConfig {
    /// Spans shorter than this (same month) are weekly reports.
    pub weekly_max_days: u32,
    /// Rows scanned from the top of the sheet.
    pub scan_rows: usize,
    /// Leading columns scanned in each row.
    pub scan_cols: usize,
    /// When set, scan only this column (first `scan_rows` rows) instead of the leading columns.
    pub scan_column: Option<usize>,
    /// Row holding the numeric date pair in filename-marker mode.
    pub marker_row: usize,
    pub marker_fallback_row: usize,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            weekly_max_days: 20,
            scan_rows: 5,
            scan_cols: 3,
            scan_column: None,
            marker_row: 2,
            marker_fallback_row: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Header + normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Substring identifying the header row (and the unit column within it).
    pub anchor: String,
    /// Header row used when no row carries the anchor.
    pub fallback_row: usize,
    /// Rows searched for the anchor.
    pub search_rows: usize,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            anchor: "單位".into(),
            fallback_row: 3,
            search_rows: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Unit-cell values marking pre-aggregated rows in the source.
    pub aggregate_markers: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            aggregate_markers: ["合計", "總計", "小計", "nan"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelConfig {
    pub weekly: String,
    pub current: String,
    pub prior: String,
    pub delta: String,
    pub total: String,
    pub unit_header: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            weekly: "本期".into(),
            current: "本年累計".into(),
            prior: "去年同期累計".into(),
            delta: "增減比較".into(),
            total: "合計".into(),
            unit_header: "單位".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Categories + units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryConfig {
    pub name: String,
    /// Which report family supplies this category in filename-marker mode.
    #[serde(default)]
    pub source: CategorySource,
    /// Column label starts with one of these.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Column label contains one of these.
    #[serde(default)]
    pub contains: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    #[default]
    General,
    Pedestrian,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitConfig {
    /// Canonical short code; also the display label.
    pub code: String,
    /// Raw unit names containing any of these map to `code`.
    #[serde(default)]
    pub patterns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReportConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The compiled-in preset.
    pub fn builtin() -> Result<Self, ReconError> {
        Self::from_toml(BUILTIN_PRESET)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.categories.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one category is required".into(),
            ));
        }

        let mut names = HashSet::new();
        for cat in &self.categories {
            if cat.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation("category name is empty".into()));
            }
            if !names.insert(cat.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate category '{}'",
                    cat.name
                )));
            }
            let keywords = cat.prefixes.iter().chain(cat.contains.iter());
            if keywords.clone().next().is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "category '{}' has no keywords",
                    cat.name
                )));
            }
            if keywords.clone().any(|k| k.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "category '{}' has an empty keyword",
                    cat.name
                )));
            }
        }

        if self.units.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one unit is required".into(),
            ));
        }

        let mut codes = HashSet::new();
        for unit in &self.units {
            if unit.code.trim().is_empty() {
                return Err(ReconError::ConfigValidation("unit code is empty".into()));
            }
            if !codes.insert(unit.code.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate unit code '{}'",
                    unit.code
                )));
            }
            if unit.patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "unit '{}' has an empty pattern",
                    unit.code
                )));
            }
        }

        if codes.contains(self.labels.total.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "total label '{}' collides with a unit code",
                self.labels.total
            )));
        }

        if self.period.weekly_max_days == 0 {
            return Err(ReconError::ConfigValidation(
                "period.weekly_max_days must be greater than 0".into(),
            ));
        }
        if self.period.scan_rows == 0 {
            return Err(ReconError::ConfigValidation(
                "period.scan_rows must be greater than 0".into(),
            ));
        }
        if self.period.scan_column.is_none() && self.period.scan_cols == 0 {
            return Err(ReconError::ConfigValidation(
                "period.scan_cols must be greater than 0".into(),
            ));
        }
        if self.header.anchor.trim().is_empty() {
            return Err(ReconError::ConfigValidation("header.anchor is empty".into()));
        }

        Ok(())
    }

    /// Category names in configured order.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Categories fed by one report family.
    pub fn categories_from(&self, source: CategorySource) -> Vec<&CategoryConfig> {
        self.categories.iter().filter(|c| c.source == source).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
