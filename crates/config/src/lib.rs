// Configuration loading

use std::path::PathBuf;

pub mod ledger;
pub mod secrets;

pub use ledger::{batch_key, FileLedger, MemoryLedger, SentLedger};
pub use secrets::{load_mail_settings, MailSettings, ResolvedMail};

/// Per-user directory for ticketboard files: <config dir>/ticketboard
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ticketboard")
}
