//! Access-control predicates.
//!
//! [`AccessPolicy`] answers "may this role, organization role and tier do X?"
//! against an injected [`PermissionTables`]. Every predicate is a pure function
//! of its inputs and the tables: unknown or missing inputs yield `false` (or a
//! zero limit) and nothing here panics.
//!
//! The two operations that need the acting user, [`AccessPolicy::require_permission`]
//! and [`AccessPolicy::can_access_route_for`], resolve it through an
//! [`AuthProvider`] and then behave as pure gates.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::{
    AccessSubject, CurrentUser, GlobalRole, Limit, NavigationItem, OrganizationRole,
    SubscriptionTier, ToolTier, UsageLimits,
};
use super::roles::Capability;
use super::tables::{PermissionTables, RoleAction};
use crate::config::UnknownRoutePolicy;
use crate::error::{Result, StriveError};
use crate::telemetry::{AccessMetrics, DenialReason};
use crate::tenant::context::AuthProvider;

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The action is allowed.
    Allow,
    /// The action is denied, with a reason.
    Deny(String),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access Policy
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluates access predicates against shared, immutable permission tables.
///
/// Cheap to clone; the tables sit behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    tables: Arc<PermissionTables>,
    unknown_routes: UnknownRoutePolicy,
}

impl AccessPolicy {
    pub fn new(tables: Arc<PermissionTables>) -> Self {
        Self {
            tables,
            unknown_routes: UnknownRoutePolicy::default(),
        }
    }

    /// Policy over [`PermissionTables::standard`] with default flags.
    pub fn standard() -> Self {
        Self::new(Arc::new(PermissionTables::standard()))
    }

    pub fn with_unknown_route_policy(mut self, policy: UnknownRoutePolicy) -> Self {
        self.unknown_routes = policy;
        self
    }

    pub fn tables(&self) -> &PermissionTables {
        &self.tables
    }

    pub fn unknown_route_policy(&self) -> UnknownRoutePolicy {
        self.unknown_routes
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capabilities
    // ─────────────────────────────────────────────────────────────────────────

    pub fn has_permission(&self, role: GlobalRole, capability: Capability) -> bool {
        self.tables.role_has(role, capability)
    }

    /// String form for callers holding unvalidated input. Unknown role or
    /// capability names are denied.
    pub fn has_permission_str(&self, role: &str, capability: &str) -> bool {
        match (role.parse::<GlobalRole>(), Capability::from_name(capability)) {
            (Ok(role), Some(capability)) => self.has_permission(role, capability),
            _ => false,
        }
    }

    /// Check a capability for a resolved user.
    pub fn check(&self, user: &CurrentUser, capability: Capability) -> PolicyDecision {
        if self.has_permission(user.role, capability) {
            debug!(
                user_id = %user.id,
                role = %user.role,
                capability = %capability,
                "Permission granted"
            );
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny(format!("Forbidden: Missing permission {}", capability))
        }
    }

    /// `Ok(())` if the user holds the capability, a forbidden error otherwise.
    pub fn enforce(&self, user: &CurrentUser, capability: Capability) -> Result<()> {
        match self.check(user, capability) {
            PolicyDecision::Allow => Ok(()),
            PolicyDecision::Deny(_) => {
                warn!(
                    user_id = %user.id,
                    role = %user.role,
                    capability = %capability,
                    "Permission denied"
                );
                AccessMetrics::denied(DenialReason::MissingCapability);
                Err(StriveError::missing_permission(capability))
            }
        }
    }

    /// Resolve the acting user and require a capability.
    pub async fn require_permission(
        &self,
        auth: &dyn AuthProvider,
        capability: Capability,
    ) -> Result<()> {
        let user = match auth.current_user().await? {
            Some(user) => user,
            None => {
                AccessMetrics::denied(DenialReason::Unauthenticated);
                return Err(StriveError::not_authenticated());
            }
        };
        self.enforce(&user, capability)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Routes and navigation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn route_decision(&self, user: Option<&CurrentUser>, path: &str) -> PolicyDecision {
        let Some(user) = user else {
            return PolicyDecision::Deny("Not authenticated".to_string());
        };

        if user.role.is_admin() {
            return PolicyDecision::Allow;
        }

        match self.tables.route_for(path) {
            Some(rule) if user.role >= rule.min_role => PolicyDecision::Allow,
            Some(rule) => PolicyDecision::Deny(format!(
                "{} requires role {} or higher",
                rule.prefix, rule.min_role
            )),
            None => match self.unknown_routes {
                UnknownRoutePolicy::Allow => PolicyDecision::Allow,
                UnknownRoutePolicy::Deny => {
                    PolicyDecision::Deny(format!("{} is not a known route", path))
                }
            },
        }
    }

    pub fn can_access_route(&self, user: Option<&CurrentUser>, path: &str) -> bool {
        let decision = self.route_decision(user, path);
        if let PolicyDecision::Deny(reason) = &decision {
            debug!(path = path, reason = %reason, "Route denied");
        }
        decision.is_allowed()
    }

    /// Resolve the acting user and check a route. A failing auth provider
    /// counts as unauthenticated.
    pub async fn can_access_route_for(&self, auth: &dyn AuthProvider, path: &str) -> bool {
        let user = match auth.current_user().await {
            Ok(user) => user,
            Err(error) => {
                warn!(path = path, error = %error, "Auth provider failed during route check");
                None
            }
        };
        let allowed = self.can_access_route(user.as_ref(), path);
        if !allowed {
            AccessMetrics::denied(DenialReason::Route);
        }
        allowed
    }

    /// Navigation entries visible to `role`, in declaration order.
    pub fn navigation_items(&self, role: GlobalRole) -> Vec<NavigationItem> {
        self.tables
            .navigation()
            .iter()
            .filter(|item| role >= item.min_role)
            .cloned()
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Organization-role and tier features
    // ─────────────────────────────────────────────────────────────────────────

    /// Staff global role, MEMBER-or-higher organization role, and GROWTH-or-higher tier.
    pub fn can_access_reid(&self, subject: &AccessSubject) -> bool {
        let reid = self.tables.reid();
        let role_ok = subject.global_role.map_or(false, |r| r >= reid.min_role);
        let org_ok = subject
            .organization_role
            .map_or(false, |r| r >= reid.min_organization_role);
        let tier_ok = subject.subscription_tier.map_or(false, |t| t >= reid.min_tier);
        role_ok && org_ok && tier_ok
    }

    pub fn can_access_ai_features(&self, subject: &AccessSubject) -> bool {
        subject
            .organization_role
            .map_or(false, |r| r >= self.tables.ai_min_organization_role())
    }

    pub fn can_access_feature(&self, subject: &AccessSubject, feature: &str) -> bool {
        subject
            .subscription_tier
            .map_or(false, |tier| self.tier_includes(tier, feature))
    }

    /// ENTERPRISE includes every key; other tiers include the known keys at or below them.
    pub fn tier_includes(&self, tier: SubscriptionTier, feature: &str) -> bool {
        if tier == SubscriptionTier::Enterprise {
            return true;
        }
        self.tables
            .feature_min_tier(feature)
            .map_or(false, |min| tier >= min)
    }

    /// The organization role meets `min`. Missing roles fail.
    pub fn organization_role_at_least(
        &self,
        role: Option<OrganizationRole>,
        min: OrganizationRole,
    ) -> bool {
        role.map_or(false, |r| r >= min)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role-gated actions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn can(&self, role: GlobalRole, action: RoleAction) -> bool {
        self.tables
            .action_min_role(action)
            .map_or(false, |min| role >= min)
    }

    pub fn can_manage_organization(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ManageOrganization)
    }

    pub fn can_invite_members(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::InviteMembers)
    }

    pub fn can_delete_members(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::DeleteMembers)
    }

    pub fn can_edit_project(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::EditProject)
    }

    pub fn can_view_project(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ViewProject)
    }

    pub fn can_manage_customer(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ManageCustomer)
    }

    pub fn can_view_customer(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ViewCustomer)
    }

    pub fn can_access_crm(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::AccessCrm)
    }

    pub fn can_manage_leads(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ManageLeads)
    }

    pub fn can_delete_leads(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::DeleteLeads)
    }

    pub fn can_manage_contacts(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ManageContacts)
    }

    pub fn can_delete_contacts(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::DeleteContacts)
    }

    pub fn can_manage_deals(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ManageDeals)
    }

    pub fn can_delete_deals(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::DeleteDeals)
    }

    pub fn can_manage_listings(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::ManageListings)
    }

    pub fn can_delete_listings(&self, role: GlobalRole) -> bool {
        self.can(role, RoleAction::DeleteListings)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tools
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tool_limit(&self, tier: ToolTier) -> Limit {
        self.tables.tool_limit(tier)
    }

    /// Unknown tool tiers get no tools.
    pub fn tool_limit_str(&self, tier: &str) -> Limit {
        tier.parse::<ToolTier>()
            .map(|t| self.tool_limit(t))
            .unwrap_or(Limit::Limited(0))
    }

    pub fn can_use_premium_tools(&self, tier: ToolTier) -> bool {
        tier != ToolTier::Free
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscription helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Lowest tier including `feature`; ENTERPRISE for unknown keys.
    pub fn minimum_tier_for_feature(&self, feature: &str) -> SubscriptionTier {
        self.tables
            .feature_min_tier(feature)
            .unwrap_or(SubscriptionTier::Enterprise)
    }

    pub fn features_for_tier(&self, tier: SubscriptionTier) -> Vec<String> {
        self.tables
            .features_at(tier)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn needs_upgrade(&self, tier: SubscriptionTier, feature: &str) -> bool {
        !self.tier_includes(tier, feature)
    }

    /// `None` when the tier already includes the feature.
    pub fn suggested_upgrade(
        &self,
        tier: SubscriptionTier,
        feature: &str,
    ) -> Option<SubscriptionTier> {
        if self.tier_includes(tier, feature) {
            None
        } else {
            Some(self.minimum_tier_for_feature(feature))
        }
    }

    pub fn require_feature_access(&self, tier: SubscriptionTier, feature: &str) -> Result<()> {
        if self.tier_includes(tier, feature) {
            return Ok(());
        }
        let minimum = self.minimum_tier_for_feature(feature);
        warn!(tier = %tier, feature = feature, required = %minimum, "Feature requires upgrade");
        AccessMetrics::denied(DenialReason::TierInsufficient);
        Err(StriveError::upgrade_required(feature, minimum))
    }

    pub fn tier_limits(&self, tier: SubscriptionTier) -> UsageLimits {
        self.tables.usage_limits(tier)
    }

    pub fn can_add_team_member(&self, tier: SubscriptionTier, current_members: u64) -> bool {
        self.tier_limits(tier).team_members.allows(current_members)
    }

    pub fn can_make_api_calls(&self, tier: SubscriptionTier, current_calls: u64) -> bool {
        self.tier_limits(tier).api_calls.allows(current_calls)
    }

    pub fn can_use_storage(&self, tier: SubscriptionTier, current_storage_mb: u64) -> bool {
        self.tier_limits(tier).storage_mb.allows(current_storage_mb)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Summary
    // ─────────────────────────────────────────────────────────────────────────

    /// Everything the policy grants one user, for the session endpoint.
    pub fn summarize(&self, user: &CurrentUser) -> AccessSummary {
        let subject = AccessSubject::from(user);
        AccessSummary {
            user_id: user.id.to_string(),
            role: user.role,
            organization_role: user.organization_role(),
            subscription_tier: user.subscription_tier,
            capabilities: self.tables.capabilities_of(user.role),
            navigation: self.navigation_items(user.role),
            features: self.features_for_tier(user.subscription_tier),
            can_access_reid: self.can_access_reid(&subject),
            can_access_ai_features: self.can_access_ai_features(&subject),
            limits: self.tier_limits(user.subscription_tier),
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// What one user may see and do.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessSummary {
    pub user_id: String,
    pub role: GlobalRole,
    pub organization_role: Option<OrganizationRole>,
    pub subscription_tier: SubscriptionTier,
    pub capabilities: Vec<Capability>,
    pub navigation: Vec<NavigationItem>,
    pub features: Vec<String>,
    pub can_access_reid: bool,
    pub can_access_ai_features: bool,
    pub limits: UsageLimits,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
