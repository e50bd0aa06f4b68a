//! Guarded transaction-loop operations.
//!
//! Each operation resolves its tenant context first, then runs its gates and
//! input checks, and only then reaches the store. Lookups are scoped to the
//! caller's organization, so a foreign id reads as "Loop not found".

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{
    CreateLoopInput, LoopChanges, LoopList, LoopQuery, LoopStats, LoopStatus, TransactionLoop,
};
use super::store::{LoopFilter, LoopStore};
use crate::audit::{AuditAction, AuditEntry, AuditTrail};
use crate::error::{Result, StriveError};
use crate::rbac::models::{OrganizationRole, SubscriptionTier};
use crate::rbac::tables::RoleAction;
use crate::tenant::{with_tenant_context, AuthProvider, QueryGuard, TenantContext};

const ENTITY: &str = "Loop";
const AUDIT_ENTITY: &str = "loop";
const MODULE_NAME: &str = "Transaction Management";

const CANNOT_MODIFY: &str = "Unauthorized: Cannot modify this loop";
const CANNOT_CREATE: &str = "Unauthorized: No permission to create loops";
const CANNOT_VIEW: &str = "Unauthorized: No permission to view loops";

/// Transaction loop operations for one deployment.
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn LoopStore>,
    guard: QueryGuard,
    audit: AuditTrail,
    min_tier: SubscriptionTier,
}

impl TransactionService {
    pub fn new(store: Arc<dyn LoopStore>, guard: QueryGuard, audit: AuditTrail) -> Self {
        Self {
            store,
            guard,
            audit,
            min_tier: SubscriptionTier::Growth,
        }
    }

    /// Tier both the user and the organization need for mutations.
    pub fn with_min_tier(mut self, tier: SubscriptionTier) -> Self {
        self.min_tier = tier;
        self
    }

    pub fn guard(&self) -> &QueryGuard {
        &self.guard
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_loop(
        &self,
        auth: &dyn AuthProvider,
        input: CreateLoopInput,
    ) -> Result<TransactionLoop> {
        with_tenant_context(auth, "create_loop", |ctx| async move {
            self.guard.require_organization_role_or_platform_admin(
                &ctx,
                OrganizationRole::Member,
                CANNOT_CREATE,
            )?;
            self.guard.require_tier(&ctx, self.min_tier, MODULE_NAME)?;
            input.validate()?;

            let created = self.store.create(TransactionLoop::draft(input, &ctx)).await?;
            info!(loop_id = %created.id, "Transaction loop created");

            let entry = AuditEntry::new(&ctx, AuditAction::Created, AUDIT_ENTITY, created.id.to_string())
                .with_new_values(serde_json::to_value(&created)?);
            self.audit.record(entry).await?;

            Ok(created)
        })
        .await
    }

    pub async fn update_loop(
        &self,
        auth: &dyn AuthProvider,
        loop_id: Uuid,
        changes: LoopChanges,
    ) -> Result<TransactionLoop> {
        with_tenant_context(auth, "update_loop", |ctx| async move {
            self.guard.require_tier(&ctx, self.min_tier, MODULE_NAME)?;
            changes.validate()?;
            if let Some(progress) = changes.progress {
                self.guard.validate_range("Progress", progress, 0, 100)?;
            }

            let existing = self.modifiable(&ctx, loop_id).await?;
            let updated = self.store.update(&ctx.owned_scope(), loop_id, &changes).await?;
            info!(loop_id = %loop_id, "Transaction loop updated");

            let entry = AuditEntry::new(&ctx, AuditAction::Updated, AUDIT_ENTITY, loop_id.to_string())
                .with_old_values(serde_json::to_value(&existing)?)
                .with_new_values(serde_json::to_value(&updated)?);
            self.audit.record(entry).await?;

            Ok(updated)
        })
        .await
    }

    pub async fn delete_loop(&self, auth: &dyn AuthProvider, loop_id: Uuid) -> Result<()> {
        with_tenant_context(auth, "delete_loop", |ctx| async move {
            self.guard.require_tier(&ctx, self.min_tier, MODULE_NAME)?;

            let existing = self.modifiable(&ctx, loop_id).await?;
            self.store.delete(&ctx.owned_scope(), loop_id).await?;
            info!(loop_id = %loop_id, "Transaction loop deleted");

            let entry = AuditEntry::new(&ctx, AuditAction::Deleted, AUDIT_ENTITY, loop_id.to_string())
                .with_old_values(serde_json::to_value(&existing)?);
            self.audit.record(entry).await?;

            Ok(())
        })
        .await
    }

    /// Set progress to a percentage. The range is checked before any
    /// storage call. Returns the stored progress.
    pub async fn update_loop_progress(
        &self,
        auth: &dyn AuthProvider,
        loop_id: Uuid,
        progress: i32,
    ) -> Result<i32> {
        with_tenant_context(auth, "update_loop_progress", |ctx| async move {
            self.guard.validate_range("Progress", progress, 0, 100)?;
            self.guard.require_tier(&ctx, self.min_tier, MODULE_NAME)?;

            let existing = self.modifiable(&ctx, loop_id).await?;
            let updated = self
                .store
                .update(&ctx.owned_scope(), loop_id, &LoopChanges::progress(progress))
                .await?;
            debug!(loop_id = %loop_id, from = existing.progress, to = updated.progress, "Loop progress updated");

            let entry = AuditEntry::new(&ctx, AuditAction::Updated, AUDIT_ENTITY, loop_id.to_string())
                .with_old_values(serde_json::json!({ "progress": existing.progress }))
                .with_new_values(serde_json::json!({ "progress": updated.progress }));
            self.audit.record(entry).await?;

            Ok(updated.progress)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn get_loops(&self, auth: &dyn AuthProvider, query: LoopQuery) -> Result<LoopList> {
        with_tenant_context(auth, "get_loops", |ctx| async move {
            self.guard.require_action(&ctx, RoleAction::ViewLoops, CANNOT_VIEW)?;
            let page = query.page_request()?;

            let mut filter = LoopFilter::new(ctx.owned_scope());
            if let Some(status) = query.status {
                filter = filter.with_status(status);
            }
            if let Some(kind) = query.transaction_type {
                filter = filter.with_transaction_type(kind);
            }
            if let Some(term) = query.search_term() {
                filter = filter.with_address_containing(term);
            }

            let (loops, total) = tokio::try_join!(
                self.store.find_many(&filter, query.sort(), page.limit, page.offset()),
                self.store.count(&filter),
            )?;

            Ok(LoopList {
                loops,
                pagination: page.page_info(total),
            })
        })
        .await
    }

    pub async fn get_loop_by_id(
        &self,
        auth: &dyn AuthProvider,
        loop_id: Uuid,
    ) -> Result<TransactionLoop> {
        with_tenant_context(auth, "get_loop_by_id", |ctx| async move {
            self.scoped_lookup(&ctx, loop_id).await
        })
        .await
    }

    pub async fn get_loop_stats(&self, auth: &dyn AuthProvider) -> Result<LoopStats> {
        with_tenant_context(auth, "get_loop_stats", |ctx| async move {
            let (month_start, next_month) = month_bounds(Utc::now())?;

            let all = LoopFilter::new(ctx.owned_scope());
            let active = all.clone().with_status(LoopStatus::Active);
            let closing = all.clone().closing_between(month_start, next_month);

            let (total_loops, active_loops, closing_this_month, total_value) = tokio::try_join!(
                self.store.count(&all),
                self.store.count(&active),
                self.store.count(&closing),
                self.store.sum_listing_price(&all),
            )?;

            Ok(LoopStats {
                total_loops,
                active_loops,
                closing_this_month,
                total_value: total_value.unwrap_or(0.0),
            })
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn scoped_lookup(&self, ctx: &TenantContext, loop_id: Uuid) -> Result<TransactionLoop> {
        let scope = ctx.owned_scope();
        let record = self
            .store
            .find_first(&LoopFilter::new(scope.clone()).with_id(loop_id))
            .await?;
        self.guard.found(&scope, record, ENTITY)
    }

    async fn modifiable(&self, ctx: &TenantContext, loop_id: Uuid) -> Result<TransactionLoop> {
        let record = self.scoped_lookup(ctx, loop_id).await?;
        self.guard.ensure_creator_or_admin(ctx, &record, CANNOT_MODIFY)?;
        Ok(record)
    }
}

/// First instant of the month containing `now` and of the month after it.
fn month_bounds(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .ok_or_else(|| StriveError::internal("Invalid month start"))?;
    let next = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| StriveError::internal("Month overflow"))?;
    Ok((start, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 12, 17, 15, 30, 0).unwrap();
        let (start, next) = month_bounds(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }
}
