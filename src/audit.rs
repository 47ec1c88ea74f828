//! Audit trail for service mutations
//!
//! Every mutation the service performs, successful or not, produces one
//! [`AuditEntry`]. Sinks are best-effort: [`emit`] logs a failing sink and
//! carries on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{PersonId, UnitRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failure,
}

/// One audited operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    /// Operation name, e.g. `publish_schedule`
    pub action: String,
    pub actor: PersonId,
    pub unit: UnitRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
    pub status: AuditStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn success(action: &str, actor: &PersonId, unit: &UnitRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            action: action.to_string(),
            actor: actor.clone(),
            unit: unit.clone(),
            before: None,
            after: None,
            status: AuditStatus::Success,
            error: None,
        }
    }

    pub fn failure(action: &str, actor: &PersonId, unit: &UnitRef, error: &Error) -> Self {
        Self {
            status: AuditStatus::Failure,
            error: Some(error.to_string()),
            ..Self::success(action, actor, unit)
        }
    }

    pub fn with_changes(
        mut self,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        self.before = before;
        self.after = after;
        self
    }
}

/// Destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &str;

    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

/// Hand an entry to a sink, logging and discarding any failure
pub async fn emit(sink: &dyn AuditSink, entry: AuditEntry) {
    if let Err(e) = sink.record(&entry).await {
        tracing::warn!(
            sink = sink.name(),
            action = %entry.action,
            error = %e,
            "Audit sink failed; entry dropped"
        );
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Writes entries to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        tracing::info!(
            target: "rota::audit",
            action = %entry.action,
            actor = %entry.actor,
            unit = %entry.unit,
            status = ?entry.status,
            error = entry.error.as_deref().unwrap_or(""),
            "audit"
        );
        Ok(())
    }
}

/// Appends one JSON document per line to a file
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }
}
