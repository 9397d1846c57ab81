// Mail delivery settings and secrets
//
// Settings come from a TOML file ([mail] table). Every field can be
// overridden by a TBOARD_SMTP_* environment variable. The password is
// resolved in order:
// 1. Environment variable (TBOARD_SMTP_PASSWORD)
// 2. The secrets file
// 3. System keychain

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Service name for keychain storage
#[cfg(feature = "keychain")]
const KEYCHAIN_SERVICE: &str = "ticketboard";

pub const ENV_PREFIX: &str = "TBOARD_SMTP_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecretsFile {
    #[serde(default)]
    pub mail: MailSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: None,
            from: String::new(),
            to: Vec::new(),
        }
    }
}

/// Where the password ended up coming from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    Environment,
    File,
    Keychain,
    None,
}

impl PasswordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordSource::Environment => "environment",
            PasswordSource::File => "secrets file",
            PasswordSource::Keychain => "keychain",
            PasswordSource::None => "none",
        }
    }
}

/// Fully resolved settings ready for a transport
#[derive(Debug, Clone)]
pub struct ResolvedMail {
    pub settings: MailSettings,
    pub password_source: PasswordSource,
}

/// Default secrets file: <config dir>/ticketboard/secrets.toml
pub fn default_secrets_path() -> PathBuf {
    crate::app_dir().join("secrets.toml")
}

impl MailSettings {
    pub fn from_toml(input: &str) -> Result<Self, String> {
        let file: SecretsFile =
            toml::from_str(input).map_err(|e| format!("invalid secrets file: {}", e))?;
        Ok(file.mail)
    }

    /// Read the secrets file if it exists. A missing file yields defaults so
    /// that environment-only setups work.
    pub fn load_file(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Self::from_toml(&contents)
    }

    /// Apply TBOARD_SMTP_* overrides. `lookup` is `std::env::var` in practice.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty())
        };
        if let Some(v) = var("HOST") {
            self.host = v;
        }
        if let Some(v) = var("PORT") {
            self.port = v
                .trim()
                .parse()
                .map_err(|_| format!("{ENV_PREFIX}PORT is not a port number: {v}"))?;
        }
        if let Some(v) = var("USERNAME") {
            self.username = v;
        }
        if let Some(v) = var("PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = var("FROM") {
            self.from = v;
        }
        if let Some(v) = var("TO") {
            self.to = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        if self.from.trim().is_empty() {
            missing.push("from");
        }
        if self.to.is_empty() {
            missing.push("to");
        }
        if !missing.is_empty() {
            return Err(format!("mail settings incomplete: missing {}", missing.join(", ")));
        }
        if self.port == 0 {
            return Err("mail port must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Load, override from the environment, resolve the password, validate.
pub fn load_mail_settings(path: Option<&Path>) -> Result<ResolvedMail, String> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_secrets_path);
    let mut settings = MailSettings::load_file(&path)?;
    let file_password = settings.password.clone();
    settings.apply_env(|name| env::var(name).ok())?;

    let mut password_source = if settings.password.is_none() {
        PasswordSource::None
    } else if settings.password == file_password {
        PasswordSource::File
    } else {
        PasswordSource::Environment
    };

    if settings.password.is_none() && !settings.username.is_empty() {
        if let Some(password) = keychain_password(&settings.username) {
            settings.password = Some(password);
            password_source = PasswordSource::Keychain;
        }
    }

    settings.validate()?;
    Ok(ResolvedMail { settings, password_source })
}

/// SMTP password stored in the system keychain under the account's username
#[cfg(feature = "keychain")]
fn keychain_password(username: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, &format!("smtp/{}", username)).ok()?;
    entry.get_password().ok().filter(|p| !p.is_empty())
}

#[cfg(not(feature = "keychain"))]
fn keychain_password(_username: &str) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[mail]
host = "smtp.example.org"
username = "reports@example.org"
password = "hunter2"
from = "reports@example.org"
to = ["chief@example.org", "traffic@example.org"]
"#;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_sample() {
        let s = MailSettings::from_toml(SAMPLE).unwrap();
        assert_eq!(s.host, "smtp.example.org");
        assert_eq!(s.port, 587);
        assert_eq!(s.to.len(), 2);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut s = MailSettings::from_toml(SAMPLE).unwrap();
        s.apply_env(env_of(&[
            ("TBOARD_SMTP_HOST", "mail.internal"),
            ("TBOARD_SMTP_PORT", "465"),
            ("TBOARD_SMTP_TO", "a@x.org, b@x.org,"),
            ("TBOARD_SMTP_FROM", "  "),
        ]))
        .unwrap();
        assert_eq!(s.host, "mail.internal");
        assert_eq!(s.port, 465);
        assert_eq!(s.to, vec!["a@x.org", "b@x.org"]);
        // blank values do not override
        assert_eq!(s.from, "reports@example.org");
    }

    #[test]
    fn test_bad_port_env() {
        let mut s = MailSettings::default();
        let err = s.apply_env(env_of(&[("TBOARD_SMTP_PORT", "smtp")])).unwrap_err();
        assert!(err.contains("TBOARD_SMTP_PORT"));
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let err = MailSettings::default().validate().unwrap_err();
        assert_eq!(err, "mail settings incomplete: missing host, from, to");
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = MailSettings::load_file(&dir.path().join("none.toml")).unwrap();
        assert_eq!(s, MailSettings::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, SAMPLE).unwrap();
        let s = MailSettings::load_file(&path).unwrap();
        assert_eq!(s.password.as_deref(), Some("hunter2"));

        fs::write(&path, "[mail\nhost=").unwrap();
        assert!(MailSettings::load_file(&path).unwrap_err().contains("invalid secrets file"));
    }
}
