//! Outbound notifications to the photographer.
//!
//! Two transports sit behind the [`Mailer`] trait: an outbox directory of
//! `.eml` files for a local MTA to pick up, and an HTTP mail relay.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::{MailConfig, MailTransport};

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl MailMessage {
    /// Render as an RFC 5322 message.
    pub fn to_rfc5322(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{}\r\n",
            header_value(&self.from),
            header_value(&self.to),
            header_value(&self.subject),
            Utc::now().to_rfc2822(),
            self.text.replace("\r\n", "\n").replace('\n', "\r\n"),
        )
    }
}

/// Header values stay on one line: control characters become spaces.
fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

pub trait Mailer: Send + Sync {
    fn send(&self, message: &MailMessage) -> Result<()>;

    /// Transport name for logs.
    fn transport_name(&self) -> &'static str;
}

/// Writes each message to `<dir>/<timestamp>-<pid>-<seq>.eml`.
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn next_path(&self) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("{}-{}-{}.eml", timestamp, std::process::id(), seq))
    }
}

impl Mailer for OutboxMailer {
    fn send(&self, message: &MailMessage) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create outbox {}", self.dir.display()))?;

        let path = self.next_path();
        // Pickup agents only look at *.eml, so a half-written .tmp is never sent.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, message.to_rfc5322())
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move message into {}", path.display()))?;

        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "outbox"
    }
}

/// POSTs `{from, to, subject, text}` as JSON to a mail relay.
pub struct HttpMailer {
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.map(String::from),
        }
    }
}

impl Mailer for HttpMailer {
    fn send(&self, message: &MailMessage) -> Result<()> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();

        let mut req = agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.set("Authorization", &format!("Bearer {}", api_key));
        }

        req.send_json(message)
            .map_err(|e| anyhow!("Mail relay request failed: {}", e))?;

        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}

pub fn create_mailer(config: &MailConfig) -> Box<dyn Mailer> {
    match config.transport {
        MailTransport::Outbox => Box::new(OutboxMailer::new(config.outbox_dir.clone())),
        MailTransport::Http => Box::new(HttpMailer::new(
            &config.endpoint,
            config.api_key.as_deref(),
        )),
    }
}

/// Test double that keeps every message in memory.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<MailMessage>>,
    pub fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.fail.store(true, Ordering::SeqCst);
        mailer
    }

    pub fn messages(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Mailer for RecordingMailer {
    fn send(&self, message: &MailMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("mail transport unavailable"));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn message() -> MailMessage {
        MailMessage {
            from: "proofer@localhost".to_string(),
            to: "studio@example.com".to_string(),
            subject: "Photoshoot \"shoot\" created".to_string(),
            text: "line one\nline two".to_string(),
        }
    }

    #[test]
    fn test_rfc5322_rendering() {
        let raw = message().to_rfc5322();
        assert!(raw.starts_with("From: proofer@localhost\r\nTo: studio@example.com\r\n"));
        assert!(raw.contains("Subject: Photoshoot \"shoot\" created\r\n"));
        assert!(raw.contains("\r\n\r\nline one\r\nline two\r\n"));
    }

    #[test]
    fn test_header_values_cannot_add_headers() {
        let mut msg = message();
        msg.subject = "Photoshoot \"x\r\nBcc: leak@example.com\" created".to_string();

        let raw = msg.to_rfc5322();
        let (headers, _) = raw.split_once("\r\n\r\n").unwrap();

        assert!(!headers.lines().any(|line| line.starts_with("Bcc:")));
        assert!(headers.contains("Subject: Photoshoot \"x  Bcc: leak@example.com\" created\r\n"));
    }

    #[test]
    fn test_outbox_writes_eml_files() {
        let dir = tempdir().unwrap();
        let outbox = dir.path().join("outbox");
        let mailer = OutboxMailer::new(outbox.clone());

        mailer.send(&message()).unwrap();
        mailer.send(&message()).unwrap();

        let mut files: Vec<PathBuf> = fs::read_dir(&outbox)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();

        assert_eq!(files.len(), 2);
        assert!(files
            .iter()
            .all(|p| p.extension().and_then(|e| e.to_str()) == Some("eml")));
        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("To: studio@example.com"));
    }

    #[test]
    fn test_create_mailer_picks_transport() {
        let mut config = MailConfig::default();
        assert_eq!(create_mailer(&config).transport_name(), "outbox");

        config.transport = MailTransport::Http;
        assert_eq!(create_mailer(&config).transport_name(), "http");
    }

    #[test]
    fn test_http_mailer_reports_unreachable_relay() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let mailer = HttpMailer::new("http://127.0.0.1:9/send", None);
        assert!(mailer.send(&message()).is_err());
    }
}
