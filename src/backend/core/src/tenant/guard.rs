//! Query guard.
//!
//! The checks every guarded module operation runs, in order, before it calls
//! storage: role and organization-role gates, tier gates, input range checks,
//! and after a scoped lookup the ownership rule for mutations.

use std::fmt::Display;
use tracing::warn;

use super::context::TenantContext;
use super::filter::{Authored, TenantScope, TenantScoped};
use crate::error::{Result, StriveError};
use crate::rbac::models::{OrganizationRole, SubscriptionTier};
use crate::rbac::policy::AccessPolicy;
use crate::rbac::tables::RoleAction;
use crate::telemetry::{AccessMetrics, DenialReason};

/// Organization role that may modify records created by someone else.
const MODIFY_ANY_ROLE: OrganizationRole = OrganizationRole::Admin;

#[derive(Debug, Clone)]
pub struct QueryGuard {
    policy: AccessPolicy,
}

impl QueryGuard {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role gates
    // ─────────────────────────────────────────────────────────────────────────

    /// Global-role gate. `message` is surfaced verbatim on denial.
    pub fn require_action(
        &self,
        ctx: &TenantContext,
        action: RoleAction,
        message: &'static str,
    ) -> Result<()> {
        if self.policy.can(ctx.global_role(), action) {
            return Ok(());
        }
        warn!(
            user_id = %ctx.user_id(),
            role = %ctx.global_role(),
            action = ?action,
            "Role gate denied"
        );
        AccessMetrics::denied(DenialReason::RoleInsufficient);
        Err(StriveError::unauthorized(message))
    }

    /// Organization-role gate. `message` is surfaced verbatim on denial.
    pub fn require_organization_role(
        &self,
        ctx: &TenantContext,
        min: OrganizationRole,
        message: &'static str,
    ) -> Result<()> {
        if self
            .policy
            .organization_role_at_least(Some(ctx.organization_role()), min)
        {
            return Ok(());
        }
        warn!(
            user_id = %ctx.user_id(),
            organization_role = %ctx.organization_role(),
            required = %min,
            "Organization role gate denied"
        );
        AccessMetrics::denied(DenialReason::RoleInsufficient);
        Err(StriveError::unauthorized(message))
    }

    /// Organization-role gate that a platform ADMIN passes regardless of
    /// membership role.
    pub fn require_organization_role_or_platform_admin(
        &self,
        ctx: &TenantContext,
        min: OrganizationRole,
        message: &'static str,
    ) -> Result<()> {
        if ctx.global_role().is_admin() {
            return Ok(());
        }
        self.require_organization_role(ctx, min, message)
    }

    /// Both the user's and the organization's tier must reach `min`.
    pub fn require_tier(
        &self,
        ctx: &TenantContext,
        min: SubscriptionTier,
        module: &str,
    ) -> Result<()> {
        if ctx.user_tier() >= min && ctx.organization_tier() >= min {
            return Ok(());
        }
        warn!(
            user_id = %ctx.user_id(),
            user_tier = %ctx.user_tier(),
            organization_tier = %ctx.organization_tier(),
            required = %min,
            module = module,
            "Tier gate denied"
        );
        AccessMetrics::denied(DenialReason::TierInsufficient);
        Err(StriveError::tier_insufficient(module, min))
    }

    /// Tier-feature gate on the user's own plan.
    pub fn require_feature(&self, ctx: &TenantContext, feature: &str) -> Result<()> {
        self.policy.require_feature_access(ctx.user_tier(), feature)
    }

    /// REID gate: the role and organization-role parts surface as
    /// "Unauthorized", the tier part as a tier error.
    pub fn require_reid(&self, ctx: &TenantContext) -> Result<()> {
        if self.policy.can_access_reid(&ctx.subject()) {
            return Ok(());
        }
        let reid = self.policy.tables().reid();
        if ctx.global_role() >= reid.min_role && ctx.organization_role() >= reid.min_organization_role {
            return self.require_tier(ctx, reid.min_tier, "REID");
        }
        AccessMetrics::denied(DenialReason::RoleInsufficient);
        Err(StriveError::unauthorized("Unauthorized: REID access requires a member role"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Input validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Inclusive range check, run before any storage call.
    pub fn validate_range<T>(&self, label: &str, value: T, min: T, max: T) -> Result<()>
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min || value > max {
            return Err(StriveError::validation(format!(
                "{} must be between {} and {}",
                label, min, max
            ))
            .with_context("value", value.to_string()));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scoped lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Turn a scoped lookup into a record or "<entity> not found".
    ///
    /// Re-checks the scope so a store that ignores the filter still cannot
    /// leak another organization's record. Absent and foreign records produce
    /// the same error.
    pub fn found<R: TenantScoped>(
        &self,
        scope: &TenantScope,
        record: Option<R>,
        entity: &str,
    ) -> Result<R> {
        match record {
            Some(record) if scope.admits(&record) => Ok(record),
            _ => Err(StriveError::not_found(entity)),
        }
    }

    /// Creator, an organization ADMIN or OWNER, or a platform ADMIN may
    /// modify the record.
    pub fn ensure_creator_or_admin<R: Authored + ?Sized>(
        &self,
        ctx: &TenantContext,
        record: &R,
        message: &'static str,
    ) -> Result<()> {
        if record.created_by() == ctx.user_id()
            || ctx.organization_role() >= MODIFY_ANY_ROLE
            || ctx.global_role().is_admin()
        {
            return Ok(());
        }
        warn!(
            user_id = %ctx.user_id(),
            created_by = %record.created_by(),
            organization_role = %ctx.organization_role(),
            "Modification denied"
        );
        AccessMetrics::denied(DenialReason::RoleInsufficient);
        Err(StriveError::unauthorized(message))
    }
}
