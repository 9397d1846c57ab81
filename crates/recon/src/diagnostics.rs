use std::fmt;

use serde::Serialize;

/// Severity of one diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// File accepted; message carries the detected period.
    Accepted,
    /// Accepted with a caveat (dropped units, fallback header row, missing range label).
    Warning,
    /// File excluded from the run.
    Rejected,
    /// Batch-level failure that stops the run before aggregation.
    Blocking,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Warning => write!(f, "warning"),
            Self::Rejected => write!(f, "rejected"),
            Self::Blocking => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Source file name, or None for batch-level entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let who = self.file.as_deref().unwrap_or("batch");
        match self.level {
            Level::Accepted => write!(f, "{who}: accepted as {}", self.message),
            _ => write!(f, "{who}: {}: {}", self.level, self.message),
        }
    }
}

/// Ordered, human-readable record of how each file was treated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticLog {
    pub entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: Option<&str>, level: Level, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            file: file.map(str::to_string),
            level,
            message: message.into(),
        });
    }

    pub fn accept(&mut self, file: &str, message: impl Into<String>) {
        self.push(Some(file), Level::Accepted, message);
    }

    pub fn warn(&mut self, file: Option<&str>, message: impl Into<String>) {
        self.push(file, Level::Warning, message);
    }

    pub fn reject(&mut self, file: &str, message: impl Into<String>) {
        self.push(Some(file), Level::Rejected, message);
    }

    pub fn block(&mut self, message: impl Into<String>) {
        self.push(None, Level::Blocking, message);
    }

    /// First entry that stops the run: a batch-level error, else a rejected file.
    pub fn blocking(&self) -> Option<&Diagnostic> {
        self.entries
            .iter()
            .find(|d| d.level == Level::Blocking)
            .or_else(|| self.entries.iter().find(|d| d.level == Level::Rejected))
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries.iter().filter(|d| d.level == level).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
