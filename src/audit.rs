//! Append-only audit log: one JSON object per line, covering
//! authentication, admin, security, and data-access events. Writes
//! directly with `std::fs` rather than pulling in a dedicated logging
//! backend — this is a narrow, append-only writer, not a query engine.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Authentication,
    AdminAction,
    SecurityEvent,
    DataAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub actor: String,
    pub action: String,
    pub status: AuditStatus,
    pub ip_address: String,
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        actor: impl Into<String>,
        action: impl Into<String>,
        status: AuditStatus,
        ip_address: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            actor: actor.into(),
            action: action.into(),
            status,
            ip_address: ip_address.into(),
            details,
        }
    }
}

/// Append-only writer. Rotation is the operator's concern; this type only
/// ever appends.
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        })
    }

    pub async fn record(&self, event: AuditEvent) -> CoreResult<()> {
        let line = serde_json::to_string(&event)
            .map_err(|e| crate::error::CoreError::internal(format!("audit serialize: {e}")))?;
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        tracing::debug!(event_type = ?event_type_label(&event), "audit event recorded");
        Ok(())
    }
}

fn event_type_label(event: &AuditEvent) -> &'static str {
    match event.event_type {
        AuditEventType::Authentication => "authentication",
        AuditEventType::AdminAction => "admin_action",
        AuditEventType::SecurityEvent => "security_event",
        AuditEventType::DataAccess => "data_access",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(&path);

        log.record(AuditEvent::new(
            AuditEventType::DataAccess,
            "user-1",
            "update_result",
            AuditStatus::Success,
            "127.0.0.1",
            json!({"result_id": "r1"}),
        ))
        .await
        .unwrap();
        log.record(AuditEvent::new(
            AuditEventType::Authentication,
            "user-2",
            "ws_handshake",
            AuditStatus::Failure,
            "127.0.0.1",
            json!({}),
        ))
        .await
        .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("timestamp").is_some());
        }
    }
}
