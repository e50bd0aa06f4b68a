//! Audit sink implementations.

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::{AuditEntry, AuditSink};
use crate::error::{ErrorCode, Result, StriveError};

// ═══════════════════════════════════════════════════════════════════════════════
// Channel sink
// ═══════════════════════════════════════════════════════════════════════════════

/// Hands entries to a background task that writes them to the `audit` log
/// target.
///
/// Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditEntry>,
}

impl ChannelAuditSink {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditEntry>(buffer_size);

        tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                info!(
                    target: "audit",
                    entry_id = %entry.id,
                    action = entry.action.as_str(),
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    user_id = %entry.user_id,
                    organization_id = %entry.organization_id,
                    timestamp = %entry.timestamp,
                    "Audit event"
                );
            }
        });

        Self { sender }
    }
}

#[async_trait]
impl AuditSink for ChannelAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.sender.send(entry.clone()).await.map_err(|e| {
            error!(error = %e, "Failed to queue audit entry");
            StriveError::with_internal(
                ErrorCode::AuditWriteFailed,
                "Failed to record activity",
                e.to_string(),
            )
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Memory sink
// ═══════════════════════════════════════════════════════════════════════════════

/// Keeps entries in memory. A failing sink rejects every write.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
    fail: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StriveError::new(
                ErrorCode::AuditWriteFailed,
                "Failed to record activity",
            ));
        }
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PostgreSQL sink
// ═══════════════════════════════════════════════════════════════════════════════

/// Writes entries to the `audit_logs` table.
#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, action, entity_type, entity_id, old_values, new_values,
                 user_id, organization_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.action.as_str())
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(entry.user_id.as_str())
        .bind(entry.organization_id.as_str())
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StriveError::with_internal(
                ErrorCode::AuditWriteFailed,
                "Failed to record activity",
                e.to_string(),
            )
            .with_source(e)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;
    use crate::rbac::models::{OrganizationId, UserId};
    use chrono::Utc;
    use uuid::Uuid;

    fn entry() -> AuditEntry {
        AuditEntry {
            id: Uuid::new_v4(),
            action: AuditAction::Deleted,
            entity_type: "loop".into(),
            entity_id: "loop-9".into(),
            old_values: Some(serde_json::json!({ "status": "ACTIVE" })),
            new_values: None,
            user_id: UserId::new("u1"),
            organization_id: OrganizationId::new("org-1"),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_channel_sink_accepts_entries() {
        let sink = ChannelAuditSink::new(8);
        tokio_test::assert_ok!(sink.record(&entry()).await);
    }

    #[tokio::test]
    async fn test_memory_sink_toggle() {
        let sink = MemoryAuditSink::new();
        sink.record(&entry()).await.unwrap();

        sink.set_failing(true);
        let err = sink.record(&entry()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuditWriteFailed);
        assert_eq!(sink.entries().len(), 1);
    }
}
