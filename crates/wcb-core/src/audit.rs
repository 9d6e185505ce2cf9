use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::domain::{SenderId, VendorCode};
use crate::Result;

const AUDIT_MAX_TEXT: usize = 500;

/// One append-only audit line. Fields are optional so each event type
/// only carries what it needs.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newly_seen: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, sender: Option<&SenderId>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: event.to_string(),
            sender: sender.map(|s| s.as_str().to_string()),
            authorized: None,
            message_type: None,
            content: None,
            vendor: None,
            newly_seen: None,
            images: None,
            videos: None,
            submitted: None,
            error: None,
        }
    }

    pub fn auth(sender: &SenderId, authorized: bool) -> Self {
        Self {
            authorized: Some(authorized),
            ..Self::base("auth", Some(sender))
        }
    }

    pub fn message(sender: &SenderId, message_type: &str, content: &str) -> Self {
        Self {
            message_type: Some(message_type.to_string()),
            content: Some(content.to_string()),
            ..Self::base("message", Some(sender))
        }
    }

    pub fn vendor_switch(sender: &SenderId, code: &VendorCode, newly_seen: bool) -> Self {
        Self {
            vendor: Some(code.as_str().to_string()),
            newly_seen: Some(newly_seen),
            ..Self::base("vendor_switch", Some(sender))
        }
    }

    pub fn flush(
        sender: &SenderId,
        vendor: &VendorCode,
        images: usize,
        videos: usize,
        submitted: bool,
        error: Option<&str>,
    ) -> Self {
        Self {
            vendor: Some(vendor.as_str().to_string()),
            images: Some(images),
            videos: Some(videos),
            submitted: Some(submitted),
            error: error.map(|s| s.to_string()),
            ..Self::base("flush", Some(sender))
        }
    }

    pub fn error(sender: Option<&SenderId>, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::base("error", sender)
        }
    }
}

/// Append-only audit log, JSON-lines or plain text.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        // Message bodies can be long; cap what lands in the audit trail.
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        let value = serde_json::to_value(&event)?;
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));
        if let Some(obj) = value.as_object() {
            for (k, v) in obj {
                out.push('\n');
                out.push_str(k);
                out.push_str(": ");
                match v {
                    serde_json::Value::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
            }
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

/// Cap a string at `max_chars` characters. Guard and cut use the same
/// unit so multibyte text under the limit passes through untouched.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((byte_idx, _)) => {
            let mut out = s[..byte_idx].to_string();
            out.push_str("...");
            out
        }
    }
}
