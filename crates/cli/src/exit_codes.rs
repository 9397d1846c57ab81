//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                               |
//! |---------|------------------|-------------------------------------------|
//! | 0       | Universal        | Success                                   |
//! | 1       | Universal        | General error (unspecified)               |
//! | 2       | Universal        | CLI usage error (bad args, missing file)  |
//! | 3       | Universal        | I/O error (cannot read/write a file)      |
//! | 10-19   | report           | Config, classification and export codes   |
//! | 20-29   | mail             | Delivery and idempotency codes            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input files.
pub const EXIT_USAGE: u8 = 2;

/// I/O error - a file could not be read or written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Report (10-19)
// =============================================================================

/// Report config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 10;

/// Input files could not be assigned to report periods.
/// The per-file diagnostic log is printed to stderr.
pub const EXIT_CLASSIFICATION: u8 = 11;

/// Spreadsheet export failed.
pub const EXIT_EXPORT: u8 = 12;

// =============================================================================
// Mail (20-29)
// =============================================================================

/// Mail settings incomplete, message could not be built, or the SMTP
/// server rejected the send. Never retried.
pub const EXIT_MAIL_FAILED: u8 = 20;

/// This exact set of input files was already emailed.
/// Not a failure; clear the ledger to send again.
pub const EXIT_ALREADY_SENT: u8 = 21;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_INVALID_CONFIG,
            EXIT_CLASSIFICATION,
            EXIT_EXPORT,
            EXIT_MAIL_FAILED,
            EXIT_ALREADY_SENT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
