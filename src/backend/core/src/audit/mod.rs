//! Audit trail for tenant mutations.
//!
//! Every successful create, update and delete writes one [`AuditEntry`] after
//! the primary write. The two writes are not atomic. What a failed audit write
//! means is decided by [`AuditPolicy`]:
//!
//! - `BestEffort`: the failure is logged and counted, the caller sees success
//! - `Required`: the failure is returned to the caller
//!
//! Under both policies the primary write stays in place.

pub mod sinks;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AuditPolicy;
use crate::error::Result;
use crate::rbac::models::{OrganizationId, UserId};
use crate::telemetry::AuditMetrics;
use crate::tenant::TenantContext;

pub use sinks::{ChannelAuditSink, MemoryAuditSink, PgAuditSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// One activity-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_values: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_values: Option<serde_json::Value>,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        ctx: &TenantContext,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            old_values: None,
            new_values: None,
            user_id: ctx.user_id().clone(),
            organization_id: ctx.organization_id().clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_old_values(mut self, values: serde_json::Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new_values(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }
}

/// Destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

/// An audit sink paired with the policy for its failures.
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    policy: AuditPolicy,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>, policy: AuditPolicy) -> Self {
        Self { sink, policy }
    }

    pub fn policy(&self) -> AuditPolicy {
        self.policy
    }

    /// Write `entry` after a successful primary mutation.
    pub async fn record(&self, entry: AuditEntry) -> Result<()> {
        let action = entry.action.as_str();
        match self.sink.record(&entry).await {
            Ok(()) => {
                debug!(
                    entry_id = %entry.id,
                    action = action,
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    "Audit entry recorded"
                );
                AuditMetrics::recorded(action);
                Ok(())
            }
            Err(error) => {
                AuditMetrics::failed(action);
                warn!(
                    action = action,
                    entity_type = %entry.entity_type,
                    entity_id = %entry.entity_id,
                    policy = ?self.policy,
                    error = %error,
                    "Audit write failed; primary write kept"
                );
                match self.policy {
                    AuditPolicy::BestEffort => Ok(()),
                    AuditPolicy::Required => Err(error),
                }
            }
        }
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
