//! Permission tables.
//!
//! One immutable value holding every static mapping the access predicates
//! consult: role capabilities, role-gated actions, route rules, navigation,
//! tier features, tool limits and usage quotas.
//!
//! `PermissionTables::standard()` builds the production tables. The `with_*`
//! methods replace individual entries so tests and alternate deployments can
//! inject their own tables into [`AccessPolicy`](super::policy::AccessPolicy).

use std::collections::{HashMap, HashSet};

use super::models::{
    GlobalRole, Limit, NavigationItem, OrganizationRole, SubscriptionTier, ToolTier, UsageLimits,
};
use super::roles::{Capability, RoleTemplate};

// ═══════════════════════════════════════════════════════════════════════════════
// Role-gated actions
// ═══════════════════════════════════════════════════════════════════════════════

/// Convenience actions gated on a minimum global role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleAction {
    ManageOrganization,
    InviteMembers,
    DeleteMembers,
    EditProject,
    ViewProject,
    ManageCustomer,
    ViewCustomer,
    AccessCrm,
    ManageLeads,
    DeleteLeads,
    ManageContacts,
    DeleteContacts,
    ManageDeals,
    DeleteDeals,
    ManageListings,
    DeleteListings,
    ViewLoops,
}

impl RoleAction {
    pub const fn all() -> [RoleAction; 17] {
        [
            Self::ManageOrganization,
            Self::InviteMembers,
            Self::DeleteMembers,
            Self::EditProject,
            Self::ViewProject,
            Self::ManageCustomer,
            Self::ViewCustomer,
            Self::AccessCrm,
            Self::ManageLeads,
            Self::DeleteLeads,
            Self::ManageContacts,
            Self::DeleteContacts,
            Self::ManageDeals,
            Self::DeleteDeals,
            Self::ManageListings,
            Self::DeleteListings,
            Self::ViewLoops,
        ]
    }

    /// Minimum global role in the standard tables.
    const fn standard_min_role(&self) -> GlobalRole {
        match self {
            Self::DeleteMembers => GlobalRole::Admin,
            Self::ManageOrganization
            | Self::InviteMembers
            | Self::DeleteLeads
            | Self::DeleteContacts
            | Self::DeleteDeals
            | Self::DeleteListings => GlobalRole::Moderator,
            Self::EditProject
            | Self::ManageCustomer
            | Self::ViewCustomer
            | Self::AccessCrm
            | Self::ManageLeads
            | Self::ManageContacts
            | Self::ManageDeals
            | Self::ManageListings
            | Self::ViewLoops => GlobalRole::User,
            Self::ViewProject => GlobalRole::Client,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Routes and features
// ═══════════════════════════════════════════════════════════════════════════════

/// A route prefix and the lowest role allowed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: String,
    pub min_role: GlobalRole,
}

impl RouteRule {
    pub fn new(prefix: impl Into<String>, min_role: GlobalRole) -> Self {
        Self {
            prefix: prefix.into(),
            min_role,
        }
    }

    /// Plain prefix match: `/admin` also covers `/administrator`.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.prefix.as_str())
    }
}

/// Requirements for the REID analytics module. All three must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReidRequirements {
    pub min_role: GlobalRole,
    pub min_organization_role: OrganizationRole,
    pub min_tier: SubscriptionTier,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct PermissionTables {
    capabilities: HashMap<GlobalRole, HashSet<Capability>>,
    actions: HashMap<RoleAction, GlobalRole>,
    routes: Vec<RouteRule>,
    navigation: Vec<NavigationItem>,
    /// Feature key to the lowest tier that includes it. Higher tiers inherit.
    features: Vec<(String, SubscriptionTier)>,
    tool_limits: HashMap<ToolTier, Limit>,
    usage_limits: HashMap<SubscriptionTier, UsageLimits>,
    reid: ReidRequirements,
    ai_min_organization_role: OrganizationRole,
}

impl PermissionTables {
    /// The production tables.
    pub fn standard() -> Self {
        let capabilities = RoleTemplate::all()
            .into_iter()
            .map(|t| (t.role, t.capabilities))
            .collect();

        let actions = RoleAction::all()
            .into_iter()
            .map(|a| (a, a.standard_min_role()))
            .collect();

        // First match wins, so more specific prefixes go first.
        let routes = vec![
            RouteRule::new("/dashboard", GlobalRole::Client),
            RouteRule::new("/crm", GlobalRole::User),
            RouteRule::new("/projects", GlobalRole::User),
            RouteRule::new("/ai", GlobalRole::User),
            RouteRule::new("/tools", GlobalRole::User),
            RouteRule::new("/settings", GlobalRole::Moderator),
            RouteRule::new("/admin", GlobalRole::Admin),
        ];

        let navigation = vec![
            nav("Dashboard", "/dashboard", "LayoutDashboard", GlobalRole::Client),
            nav("CRM", "/crm", "Users", GlobalRole::User),
            nav("Projects", "/projects", "FolderKanban", GlobalRole::User),
            nav("AI Assistant", "/ai", "Bot", GlobalRole::User),
            nav("Tools", "/tools", "Wrench", GlobalRole::User),
            nav("Settings", "/settings", "Settings", GlobalRole::Moderator),
            nav("Admin", "/admin", "Shield", GlobalRole::Admin),
        ];

        use SubscriptionTier::*;
        let features = [
            ("dashboard", Free),
            ("profile", Free),
            ("crm", Starter),
            ("projects", Starter),
            ("cms", Starter),
            ("real-estate-workspace", Starter),
            ("reid-basic", Growth),
            ("transactions", Growth),
            ("ai", Growth),
            ("ai-hub", Growth),
            ("tools", Growth),
            ("analytics", Growth),
            ("rei-analytics", Growth),
            ("expense-tax", Growth),
            ("cms-marketing", Growth),
            ("marketplace", Growth),
            ("reid", Elite),
            ("reid-full", Elite),
            ("reid-ai", Elite),
        ]
        .into_iter()
        .map(|(key, tier)| (key.to_string(), tier))
        .collect();

        let tool_limits = HashMap::from([
            (ToolTier::Free, Limit::Limited(0)),
            (ToolTier::Tier1, Limit::Limited(3)),
            (ToolTier::Tier2, Limit::Limited(10)),
            (ToolTier::Tier3, Limit::Unlimited),
        ]);

        let usage_limits = HashMap::from([
            (Free, UsageLimits::limited(0, 0, 0)),
            (Starter, UsageLimits::limited(10_240, 10_000, 5)),
            (Growth, UsageLimits::limited(102_400, 100_000, 25)),
            (Elite, UsageLimits::limited(1_048_576, 1_000_000, 100)),
            (Enterprise, UsageLimits::unlimited()),
        ]);

        Self {
            capabilities,
            actions,
            routes,
            navigation,
            features,
            tool_limits,
            usage_limits,
            reid: ReidRequirements {
                min_role: GlobalRole::User,
                min_organization_role: OrganizationRole::Member,
                min_tier: Growth,
            },
            ai_min_organization_role: OrganizationRole::Admin,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    pub fn role_has(&self, role: GlobalRole, capability: Capability) -> bool {
        self.capabilities
            .get(&role)
            .map_or(false, |caps| caps.contains(&capability))
    }

    pub fn capabilities_of(&self, role: GlobalRole) -> Vec<Capability> {
        Capability::all()
            .into_iter()
            .filter(|c| self.role_has(role, *c))
            .collect()
    }

    /// Minimum role for an action. Actions missing from the table are denied.
    pub fn action_min_role(&self, action: RoleAction) -> Option<GlobalRole> {
        self.actions.get(&action).copied()
    }

    /// The first route rule covering `path`, in declaration order.
    pub fn route_for(&self, path: &str) -> Option<&RouteRule> {
        self.routes.iter().find(|rule| rule.matches(path))
    }

    pub fn navigation(&self) -> &[NavigationItem] {
        &self.navigation
    }

    /// The lowest tier listing `feature`, if the key is known.
    pub fn feature_min_tier(&self, feature: &str) -> Option<SubscriptionTier> {
        self.features
            .iter()
            .find(|(key, _)| key == feature)
            .map(|(_, tier)| *tier)
    }

    /// Known feature keys included at `tier`, in declaration order.
    pub fn features_at(&self, tier: SubscriptionTier) -> Vec<&str> {
        self.features
            .iter()
            .filter(|(_, min)| *min <= tier)
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn tool_limit(&self, tier: ToolTier) -> Limit {
        self.tool_limits
            .get(&tier)
            .copied()
            .unwrap_or(Limit::Limited(0))
    }

    pub fn usage_limits(&self, tier: SubscriptionTier) -> UsageLimits {
        self.usage_limits
            .get(&tier)
            .copied()
            .unwrap_or(UsageLimits::limited(0, 0, 0))
    }

    pub fn reid(&self) -> ReidRequirements {
        self.reid
    }

    pub fn ai_min_organization_role(&self) -> OrganizationRole {
        self.ai_min_organization_role
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Overrides
    // ─────────────────────────────────────────────────────────────────────────

    pub fn with_capabilities(
        mut self,
        role: GlobalRole,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        self.capabilities
            .insert(role, capabilities.into_iter().collect());
        self
    }

    pub fn with_action(mut self, action: RoleAction, min_role: GlobalRole) -> Self {
        self.actions.insert(action, min_role);
        self
    }

    pub fn with_routes(mut self, routes: Vec<RouteRule>) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_feature(mut self, key: impl Into<String>, min_tier: SubscriptionTier) -> Self {
        let key = key.into();
        self.features.retain(|(k, _)| *k != key);
        self.features.push((key, min_tier));
        self
    }

    pub fn with_tool_limit(mut self, tier: ToolTier, limit: Limit) -> Self {
        self.tool_limits.insert(tier, limit);
        self
    }

    pub fn with_reid(mut self, reid: ReidRequirements) -> Self {
        self.reid = reid;
        self
    }
}

impl Default for PermissionTables {
    fn default() -> Self {
        Self::standard()
    }
}

fn nav(
    title: &'static str,
    href: &'static str,
    icon: &'static str,
    min_role: GlobalRole,
) -> NavigationItem {
    NavigationItem {
        title,
        href,
        icon,
        min_role,
    }
}
