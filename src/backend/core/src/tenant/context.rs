//! Tenant context for one logical operation.
//!
//! [`with_tenant_context`] resolves the acting user through an
//! [`AuthProvider`], derives a [`TenantContext`] from the user's current
//! membership, and runs the operation body with that context as its argument
//! inside a tracing span. The context is never stored; the next operation
//! resolves its own.

use async_trait::async_trait;
use std::future::Future;
use tracing::{debug, info_span, warn, Instrument};

use super::filter::TenantScope;
use crate::error::{Result, StriveError};
use crate::rbac::models::{
    AccessSubject, CurrentUser, GlobalRole, OrganizationId, OrganizationRole, SubscriptionTier,
    UserId,
};
use crate::telemetry::{AccessMetrics, DenialReason, SensitiveFieldRedactor};

// ═══════════════════════════════════════════════════════════════════════════════
// Auth collaborator
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of the acting user: a session store, a request extension, a test fixture.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` means nobody is signed in.
    async fn current_user(&self) -> Result<Option<CurrentUser>>;
}

/// An [`AuthProvider`] that always answers with the same user (or nobody).
#[derive(Debug, Clone, Default)]
pub struct StaticAuthProvider {
    user: Option<CurrentUser>,
}

impl StaticAuthProvider {
    pub fn new(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_user(&self) -> Result<Option<CurrentUser>> {
        Ok(self.user.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tenant Context
// ═══════════════════════════════════════════════════════════════════════════════

/// The acting user and organization for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    user_id: UserId,
    organization_id: OrganizationId,
    global_role: GlobalRole,
    organization_role: OrganizationRole,
    user_tier: SubscriptionTier,
    organization_tier: SubscriptionTier,
}

impl TenantContext {
    /// Derive the context from the user's current (first) membership.
    pub fn establish(user: &CurrentUser) -> Result<Self> {
        let membership = match user.current_membership() {
            Some(membership) => membership,
            None => {
                warn!(user_id = %user.id, "User has no organization membership");
                AccessMetrics::denied(DenialReason::OrganizationRequired);
                return Err(StriveError::organization_required());
            }
        };

        Ok(Self {
            user_id: user.id.clone(),
            organization_id: membership.organization_id.clone(),
            global_role: user.role,
            organization_role: membership.role,
            user_tier: user.subscription_tier,
            organization_tier: membership.organization_tier,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    pub fn global_role(&self) -> GlobalRole {
        self.global_role
    }

    pub fn organization_role(&self) -> OrganizationRole {
        self.organization_role
    }

    pub fn user_tier(&self) -> SubscriptionTier {
        self.user_tier
    }

    pub fn organization_tier(&self) -> SubscriptionTier {
        self.organization_tier
    }

    pub fn subject(&self) -> AccessSubject {
        AccessSubject {
            global_role: Some(self.global_role),
            organization_role: Some(self.organization_role),
            subscription_tier: Some(self.user_tier),
        }
    }

    /// Filter for records this organization owns.
    pub fn owned_scope(&self) -> TenantScope {
        TenantScope::owned(self.organization_id.clone())
    }

    /// Filter for records this organization owns or anyone published.
    pub fn public_or_owned_scope(&self) -> TenantScope {
        TenantScope::public_or_owned(self.organization_id.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scoped execution
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve the acting user or fail with "Not authenticated".
pub async fn resolve_user(auth: &dyn AuthProvider) -> Result<CurrentUser> {
    match auth.current_user().await? {
        Some(user) => {
            debug!(
                user_id = %user.id,
                email = SensitiveFieldRedactor::global().redact("email", &user.email),
                role = %user.role,
                "Resolved current user"
            );
            Ok(user)
        }
        None => {
            debug!("No current user");
            AccessMetrics::denied(DenialReason::Unauthenticated);
            Err(StriveError::not_authenticated())
        }
    }
}

/// Run `operation` with the acting user's tenant context.
///
/// Fails with "Not authenticated" when no user resolves and with
/// "Organization required" when the user has no membership. The body only
/// runs after both succeed.
pub async fn with_tenant_context<F, Fut, T>(
    auth: &dyn AuthProvider,
    operation: &'static str,
    body: F,
) -> Result<T>
where
    F: FnOnce(TenantContext) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let user = resolve_user(auth).await?;
    let context = TenantContext::establish(&user)?;

    let span = info_span!(
        "tenant_operation",
        operation = operation,
        user_id = %context.user_id,
        organization_id = %context.organization_id,
    );

    body(context).instrument(span).await
}

/// Run `operation` with the acting user when no organization is needed.
pub async fn with_current_user<F, Fut, T>(
    auth: &dyn AuthProvider,
    operation: &'static str,
    body: F,
) -> Result<T>
where
    F: FnOnce(CurrentUser) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let user = resolve_user(auth).await?;
    let span = info_span!("user_operation", operation = operation, user_id = %user.id);
    body(user).instrument(span).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn member() -> CurrentUser {
        CurrentUser::new("u1", "u1@example.com", GlobalRole::User, SubscriptionTier::Growth)
            .with_membership("org-1", OrganizationRole::Member, SubscriptionTier::Elite)
    }

    #[test]
    fn test_establish_from_first_membership() {
        let ctx = TenantContext::establish(&member()).unwrap();
        assert_eq!(ctx.user_id().as_str(), "u1");
        assert_eq!(ctx.organization_id().as_str(), "org-1");
        assert_eq!(ctx.organization_role(), OrganizationRole::Member);
        assert_eq!(ctx.user_tier(), SubscriptionTier::Growth);
        assert_eq!(ctx.organization_tier(), SubscriptionTier::Elite);
    }

    #[test]
    fn test_establish_requires_membership() {
        let loner = CurrentUser::new("u2", "u2@example.com", GlobalRole::User, SubscriptionTier::Free);
        let err = TenantContext::establish(&loner).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OrganizationRequired);
        assert_eq!(err.user_message(), "Organization required");
    }

    #[tokio::test]
    async fn test_with_tenant_context_passes_context() {
        let auth = StaticAuthProvider::new(member());
        let org = with_tenant_context(&auth, "test", |ctx| async move {
            Ok(ctx.organization_id().clone())
        })
        .await
        .unwrap();
        assert_eq!(org.as_str(), "org-1");
    }

    #[tokio::test]
    async fn test_body_not_run_without_user() {
        let auth = StaticAuthProvider::anonymous();
        let mut ran = false;
        let result: Result<()> = with_tenant_context(&auth, "test", |_ctx| {
            ran = true;
            async { Ok(()) }
        })
        .await;

        assert!(!ran);
        assert_eq!(result.unwrap_err().user_message(), "Not authenticated");
    }

    #[tokio::test]
    async fn test_with_current_user() {
        let loner = CurrentUser::new("u3", "u3@example.com", GlobalRole::Client, SubscriptionTier::Free);
        let auth = StaticAuthProvider::new(loner);
        let role = with_current_user(&auth, "test", |user| async move { Ok(user.role) })
            .await
            .unwrap();
        assert_eq!(role, GlobalRole::Client);
    }
}
