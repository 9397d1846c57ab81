//! Email delivery of a finished report, at most once per input batch.

use std::fmt;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use ticketboard_config::{MailSettings, SentLedger};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Known provider error substrings and what the operator should check.
/// Matched case-insensitively, first hit wins.
const TRANSPORT_HINTS: &[(&str, &str)] = &[
    ("535", "authentication rejected; check the SMTP username and (app) password"),
    ("authentication", "authentication rejected; check the SMTP username and (app) password"),
    ("connection refused", "the SMTP server refused the connection; check host and port"),
    ("timed out", "the SMTP server did not answer; check network access and the port"),
    ("timeout", "the SMTP server did not answer; check network access and the port"),
    ("certificate", "TLS handshake failed; the server certificate was not accepted"),
    ("tls handshake", "TLS handshake failed; check the port (587 STARTTLS, 465 TLS)"),
    ("starttls", "TLS negotiation failed; check the port (587 STARTTLS, 465 TLS)"),
    ("550", "recipient mailbox unavailable; check the `to` addresses"),
    ("553", "sender address rejected; `from` must be allowed for this account"),
    ("554", "message rejected by the server; the attachment may be blocked"),
];

pub fn transport_hint(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    TRANSPORT_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, hint)| *hint)
}

#[derive(Debug)]
pub enum DeliveryError {
    /// The ledger already holds this batch key.
    AlreadySent(String),
    /// Addresses or attachment could not be turned into a message.
    Build(String),
    /// The server or network rejected the send.
    Transport { message: String, hint: Option<String> },
    /// Sent, but the ledger could not be updated.
    Ledger(String),
}

impl DeliveryError {
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        let hint = transport_hint(&message).map(str::to_string);
        Self::Transport { message, hint }
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySent(key) => write!(f, "report for this batch was already sent ({key})"),
            Self::Build(msg) => write!(f, "cannot build message: {msg}"),
            Self::Transport { message, .. } => write!(f, "send failed: {message}"),
            Self::Ledger(msg) => write!(f, "message sent but ledger not updated: {msg}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// A report ready to send.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

pub trait Outbox {
    fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;
}

/// Blocking SMTP transport. One attempt, no retry.
pub struct SmtpOutbox {
    transport: SmtpTransport,
}

impl SmtpOutbox {
    pub fn new(settings: &MailSettings) -> Result<Self, DeliveryError> {
        let mut builder = SmtpTransport::relay(&settings.host)
            .map_err(|e| DeliveryError::transport(format!("cannot create SMTP transport: {e}")))?
            .port(settings.port);
        if !settings.username.is_empty() {
            let password = settings.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(settings.username.clone(), password));
        }
        Ok(Self { transport: builder.build() })
    }
}

impl Outbox for SmtpOutbox {
    fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let message = build_message(mail)?;
        self.transport
            .send(&message)
            .map_err(|e| DeliveryError::transport(e.to_string()))?;
        Ok(())
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, DeliveryError> {
    addr.parse()
        .map_err(|e| DeliveryError::Build(format!("invalid address '{addr}': {e}")))
}

pub fn build_message(mail: &OutgoingMail) -> Result<Message, DeliveryError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .subject(&mail.subject);
    for to in &mail.to {
        builder = builder.to(parse_mailbox(to)?);
    }

    let content_type = ContentType::parse(XLSX_MIME)
        .map_err(|e| DeliveryError::Build(format!("attachment type: {e}")))?;

    builder
        .multipart(
            MultiPart::mixed()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(mail.body.clone()),
                )
                .singlepart(
                    Attachment::new(mail.attachment_name.clone())
                        .body(mail.attachment.clone(), content_type),
                ),
        )
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

/// Send once per batch key. The key is recorded only after the send succeeds.
pub fn deliver(
    outbox: &dyn Outbox,
    ledger: &mut dyn SentLedger,
    key: &str,
    mail: &OutgoingMail,
) -> Result<(), DeliveryError> {
    if ledger.contains(key) {
        debug!(key, "batch already in ledger");
        return Err(DeliveryError::AlreadySent(key.to_string()));
    }
    outbox.send(mail)?;
    info!(recipients = mail.to.len(), subject = %mail.subject, "report sent");
    ledger.record(key).map_err(DeliveryError::Ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use ticketboard_config::MemoryLedger;

    #[derive(Default)]
    struct FakeOutbox {
        sent: RefCell<Vec<String>>,
        fail_with: Option<String>,
    }

    impl Outbox for FakeOutbox {
        fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
            if let Some(msg) = &self.fail_with {
                return Err(DeliveryError::transport(msg.clone()));
            }
            self.sent.borrow_mut().push(mail.subject.clone());
            Ok(())
        }
    }

    fn mail() -> OutgoingMail {
        OutgoingMail {
            from: "reports@example.org".into(),
            to: vec!["chief@example.org".into()],
            subject: "龍潭分局交通執法成效比較表 (113/09/01~113/09/07)".into(),
            body: "合計 12".into(),
            attachment_name: "report.xlsx".into(),
            attachment: vec![0x50, 0x4b, 0x03, 0x04],
        }
    }

    #[test]
    fn second_delivery_of_same_batch_is_refused() {
        let outbox = FakeOutbox::default();
        let mut ledger = MemoryLedger::new();

        deliver(&outbox, &mut ledger, "a|b|c", &mail()).unwrap();
        let err = deliver(&outbox, &mut ledger, "a|b|c", &mail()).unwrap_err();
        assert!(matches!(err, DeliveryError::AlreadySent(_)));
        assert_eq!(outbox.sent.borrow().len(), 1);

        deliver(&outbox, &mut ledger, "a|b|d", &mail()).unwrap();
        assert_eq!(outbox.sent.borrow().len(), 2);
    }

    #[test]
    fn failed_send_is_not_recorded() {
        let outbox = FakeOutbox {
            fail_with: Some("Connection refused (os error 111)".into()),
            ..FakeOutbox::default()
        };
        let mut ledger = MemoryLedger::new();

        let err = deliver(&outbox, &mut ledger, "k", &mail()).unwrap_err();
        match err {
            DeliveryError::Transport { message, hint } => {
                assert!(message.contains("os error 111"));
                assert!(hint.unwrap().contains("refused the connection"));
            }
            other => panic!("unexpected {other}"),
        }
        assert!(!ledger.contains("k"));
    }

    #[test]
    fn hints_for_known_provider_errors() {
        assert!(transport_hint("permanent error (535): 5.7.8 Username and Password not accepted")
            .unwrap()
            .contains("authentication"));
        assert!(transport_hint("Connection timed out").unwrap().contains("did not answer"));
        assert!(transport_hint("550 5.1.1 mailbox unavailable").unwrap().contains("recipient"));
        assert!(transport_hint("something else entirely").is_none());
        assert!(transport_hint("STARTTLS extension not supported by server")
            .unwrap()
            .contains("TLS negotiation"));
    }

    #[test]
    fn tls_hint_needs_a_tls_phrase() {
        assert!(transport_hint("551 user not local: jtls@corp.example").is_none());
    }

    #[test]
    fn message_carries_attachment() {
        let message = build_message(&mail()).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("report.xlsx"));
        assert!(raw.contains(XLSX_MIME));
        assert!(raw.contains("chief@example.org"));
    }

    #[test]
    fn bad_address_is_a_build_error() {
        let mut m = mail();
        m.to = vec!["not an address".into()];
        assert!(matches!(build_message(&m), Err(DeliveryError::Build(_))));
    }
}
