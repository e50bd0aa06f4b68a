//! Integration tests for the access-control predicates.
//!
//! These exercise the public `rbac` surface the way callers at the UI and API
//! boundaries use it: raw strings in, booleans and limits out.

use strive_core::rbac::{
    AccessPolicy, AccessSubject, Capability, CurrentUser, GlobalRole, Limit, OrganizationRole,
    SubscriptionTier, ToolTier,
};

// ============================================================================
// Test Utilities
// ============================================================================

fn policy() -> AccessPolicy {
    AccessPolicy::standard()
}

const ROLE_NAMES: [&str; 5] = ["CLIENT", "USER", "MODERATOR", "ADMIN", "SUPER_ADMIN"];
const ORG_ROLE_NAMES: [&str; 4] = ["VIEWER", "MEMBER", "ADMIN", "OWNER"];
const TIER_NAMES: [&str; 5] = ["FREE", "STARTER", "GROWTH", "ELITE", "ENTERPRISE"];

// ============================================================================
// Capabilities
// ============================================================================

#[test]
fn test_has_permission_is_total_and_deterministic() {
    let policy = policy();
    for role in ROLE_NAMES {
        for capability in Capability::all() {
            let first = policy.has_permission_str(role, capability.as_str());
            let second = policy.has_permission_str(role, capability.as_str());
            assert_eq!(first, second, "{} / {}", role, capability.as_str());
        }
    }
}

#[test]
fn test_unknown_role_has_no_capability() {
    let policy = policy();
    for capability in Capability::all() {
        assert!(!policy.has_permission_str("EMPLOYEE", capability.as_str()));
        assert!(!policy.has_permission_str("", capability.as_str()));
        assert!(!policy.has_permission_str("admin", capability.as_str()));
    }
    assert!(!policy.has_permission_str("ADMIN", "canFlyPlanes"));
}

#[test]
fn test_capability_examples() {
    let policy = policy();
    assert!(policy.has_permission(GlobalRole::Admin, Capability::ManageBilling));
    assert!(policy.has_permission(GlobalRole::Moderator, Capability::ManageUsers));
    assert!(!policy.has_permission(GlobalRole::User, Capability::ManageUsers));
    assert!(!policy.has_permission(GlobalRole::Client, Capability::ViewAnalytics));
}

// ============================================================================
// REID
// ============================================================================

#[test]
fn test_reid_pairwise_table() {
    let policy = policy();

    for role in ROLE_NAMES {
        for org_role in ORG_ROLE_NAMES {
            for tier in TIER_NAMES {
                let subject = AccessSubject::from_raw(Some(role), Some(org_role), Some(tier));
                let expected = role != "CLIENT"
                    && org_role != "VIEWER"
                    && matches!(tier, "GROWTH" | "ELITE" | "ENTERPRISE");
                assert_eq!(
                    policy.can_access_reid(&subject),
                    expected,
                    "{} / {} / {}",
                    role,
                    org_role,
                    tier
                );
            }
        }
    }
}

#[test]
fn test_reid_single_condition_flip() {
    let policy = policy();
    let passing = AccessSubject::from_raw(Some("USER"), Some("MEMBER"), Some("GROWTH"));
    assert!(policy.can_access_reid(&passing));

    let flips = [
        AccessSubject::from_raw(Some("CLIENT"), Some("MEMBER"), Some("GROWTH")),
        AccessSubject::from_raw(Some("USER"), Some("VIEWER"), Some("GROWTH")),
        AccessSubject::from_raw(Some("USER"), Some("MEMBER"), Some("STARTER")),
        AccessSubject::from_raw(Some("USER"), None, Some("GROWTH")),
        AccessSubject::from_raw(Some("USER"), Some("MEMBER"), Some("PLATINUM")),
    ];
    for subject in flips {
        assert!(!policy.can_access_reid(&subject), "{:?}", subject);
    }
}

// ============================================================================
// Features and tiers
// ============================================================================

#[test]
fn test_enterprise_includes_everything() {
    let policy = policy();
    let enterprise = AccessSubject::new().with_tier(SubscriptionTier::Enterprise);
    for feature in ["reid-ai", "crm", "x", "not-a-real-module", "🙂"] {
        assert!(policy.can_access_feature(&enterprise, feature));
    }
}

#[test]
fn test_growth_tier_boundary() {
    let policy = policy();
    let growth = AccessSubject::new().with_tier(SubscriptionTier::Growth);
    assert!(policy.can_access_feature(&growth, "reid-basic"));
    assert!(!policy.can_access_feature(&growth, "reid"));
    assert!(!policy.can_access_feature(&AccessSubject::new(), "dashboard"));
}

#[test]
fn test_upgrade_message() {
    let err = policy()
        .require_feature_access(SubscriptionTier::Starter, "ai")
        .unwrap_err();
    assert_eq!(err.user_message(), "Upgrade to GROWTH tier to access ai features");
}

#[test]
fn test_tool_limits() {
    let policy = policy();
    assert_eq!(policy.tool_limit_str("FREE"), Limit::Limited(0));
    assert_eq!(policy.tool_limit_str("TIER_1"), Limit::Limited(3));
    assert_eq!(policy.tool_limit_str("TIER_2"), Limit::Limited(10));
    assert_eq!(policy.tool_limit_str("TIER_3"), Limit::Unlimited);
    assert_eq!(policy.tool_limit_str("INVALID"), Limit::Limited(0));

    assert!(!policy.can_use_premium_tools(ToolTier::Free));
    assert!(policy.can_use_premium_tools(ToolTier::Tier1));
}

// ============================================================================
// Navigation and routes
// ============================================================================

#[test]
fn test_navigation_items() {
    let policy = policy();

    let admin: Vec<&str> = policy
        .navigation_items(GlobalRole::Admin)
        .iter()
        .map(|item| item.href)
        .collect();
    assert_eq!(
        admin,
        vec!["/dashboard", "/crm", "/projects", "/ai", "/tools", "/settings", "/admin"]
    );

    let user: Vec<&str> = policy
        .navigation_items(GlobalRole::User)
        .iter()
        .map(|item| item.href)
        .collect();
    assert_eq!(user.len(), 5);
    assert!(!user.contains(&"/admin"));
    assert!(!user.contains(&"/settings"));

    assert_eq!(policy.navigation_items(GlobalRole::Client).len(), 1);
}

#[test]
fn test_route_access() {
    let policy = policy();
    let client = CurrentUser::new("c1", "c1@example.com", GlobalRole::Client, SubscriptionTier::Free);
    let moderator =
        CurrentUser::new("m1", "m1@example.com", GlobalRole::Moderator, SubscriptionTier::Free);

    assert!(!policy.can_access_route(None, "/dashboard"));
    assert!(policy.can_access_route(Some(&client), "/dashboard"));
    assert!(!policy.can_access_route(Some(&client), "/crm/leads"));
    assert!(policy.can_access_route(Some(&moderator), "/settings/team"));
    assert!(!policy.can_access_route(Some(&moderator), "/admin"));
}

#[test]
fn test_lookalike_routes_are_denied() {
    let policy = policy();
    let user = CurrentUser::new("u1", "u1@example.com", GlobalRole::User, SubscriptionTier::Free);
    let client = CurrentUser::new("c1", "c1@example.com", GlobalRole::Client, SubscriptionTier::Free);

    assert!(!policy.can_access_route(Some(&user), "/administrator"));
    assert!(!policy.can_access_route(Some(&user), "/settings-legacy"));
    assert!(!policy.can_access_route(Some(&client), "/crm-reports"));
    assert!(policy.can_access_route(Some(&user), "/crm-reports"));
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_predicates_are_idempotent() {
    let policy = policy();
    let user = CurrentUser::new("u1", "u1@example.com", GlobalRole::User, SubscriptionTier::Growth)
        .with_membership("org-1", OrganizationRole::Member, SubscriptionTier::Growth);
    let subject = AccessSubject::from(&user);

    for _ in 0..2 {
        assert!(policy.can_access_reid(&subject));
        assert!(!policy.can_access_ai_features(&subject));
        assert!(policy.can_access_feature(&subject, "transactions"));
        assert_eq!(policy.navigation_items(user.role).len(), 5);
        assert_eq!(policy.tool_limit(ToolTier::Tier2), Limit::Limited(10));
    }
}
