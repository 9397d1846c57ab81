use std::fmt;

use crate::diagnostics::DiagnosticLog;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate category, missing units, etc.).
    ConfigValidation(String),
    /// Files could not be assigned to report periods. Carries the full per-file log.
    Classification(DiagnosticLog),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Classification(log) => {
                let reason = log
                    .blocking()
                    .map(|d| d.message.as_str())
                    .unwrap_or("no usable files");
                write!(f, "classification failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
