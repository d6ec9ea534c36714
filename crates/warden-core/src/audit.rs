//! Append-only audit log for moderation decisions.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::{
    command::CommandKind,
    domain::{ChatId, UserId},
    event::MembershipKind,
    Result,
};

const AUDIT_MAX_TEXT: usize = 200;

/// RFC3339 timestamp in UTC.
fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// One audit line. Optional fields are omitted from JSON output.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn base(event: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            chat_id: None,
            user_id: None,
            target_id: None,
            policy: None,
            count: None,
            excerpt: None,
            command: None,
            allowed: None,
            reason: None,
            action: None,
            error: None,
        }
    }

    pub fn violation(
        chat_id: ChatId,
        user_id: UserId,
        policy: &str,
        count: u32,
        excerpt: &str,
    ) -> Self {
        Self {
            chat_id: Some(chat_id.0),
            user_id: Some(user_id.0),
            policy: Some(policy.to_string()),
            count: Some(count),
            excerpt: Some(excerpt.to_string()),
            ..Self::base("violation")
        }
    }

    pub fn command(
        chat_id: ChatId,
        sender: UserId,
        command: CommandKind,
        target: Option<UserId>,
        allowed: bool,
        reason: Option<&str>,
    ) -> Self {
        Self {
            chat_id: Some(chat_id.0),
            user_id: Some(sender.0),
            target_id: target.map(|t| t.0),
            command: Some(command.as_str().to_string()),
            allowed: Some(allowed),
            reason: reason.map(|r| r.to_string()),
            ..Self::base("command")
        }
    }

    pub fn action_failed(chat_id: ChatId, action: &str, error: &str) -> Self {
        Self {
            chat_id: Some(chat_id.0),
            action: Some(action.to_string()),
            error: Some(error.to_string()),
            ..Self::base("action_failed")
        }
    }

    pub fn membership(chat_id: ChatId, user_id: UserId, kind: MembershipKind) -> Self {
        let event = match kind {
            MembershipKind::Joined => "member_joined",
            MembershipKind::Left => "member_left",
        };
        Self {
            chat_id: Some(chat_id.0),
            user_id: Some(user_id.0),
            ..Self::base(event)
        }
    }
}

/// File-backed audit sink, JSON-lines or plain-text mode.
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

    /// Write one line; an audit failure must never fail moderation.
    pub fn log(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            warn!(path = %self.path.display(), error = %e, "audit write failed");
        }
    }

    fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.excerpt {
            event.excerpt = Some(truncate_text(s, AUDIT_MAX_TEXT));
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

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
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

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert!(t.len() >= AUDIT_MAX_TEXT);
    }

    #[test]
    fn violation_excerpt_is_truncated_on_write() {
        let log = AuditLogger::new(tmp_file("warden-audit-test"), true);
        let excerpt = "x".repeat(AUDIT_MAX_TEXT + 50);
        let ev = AuditEvent::violation(ChatId(-100), UserId(5), "link", 2, &excerpt);

        log.log(ev);

        let written = std::fs::read_to_string(log.path()).expect("audit file");
        assert!(written.contains("..."));
        assert!(written.contains("\"event\":\"violation\""));
        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn plain_text_mode_writes_key_value_lines() {
        let log = AuditLogger::new(tmp_file("warden-audit-text"), false);
        let ev = AuditEvent::command(
            ChatId(-100),
            UserId(1),
            CommandKind::Kick,
            Some(UserId(5)),
            false,
            Some("protected_owner"),
        );

        log.log(ev);

        let written = std::fs::read_to_string(log.path()).expect("audit file");
        assert!(written.contains("event: command"));
        assert!(written.contains("reason: protected_owner"));
        let _ = std::fs::remove_file(log.path());
    }
}
