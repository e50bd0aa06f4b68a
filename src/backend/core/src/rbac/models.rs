//! RBAC data models: roles, tiers, identities and organization memberships.
//!
//! Role and tier values arrive from the session layer as strings. They are
//! converted into the closed enums here, once, through [`FromStr`]; everything
//! past this boundary works with the enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{ErrorCode, StriveError};

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed organization identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrganizationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Validation boundary
// ═══════════════════════════════════════════════════════════════════════════════

/// A role or tier string that names no known value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseEnumError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unknown organization role: {0}")]
    UnknownOrganizationRole(String),

    #[error("Unknown subscription tier: {0}")]
    UnknownTier(String),

    #[error("Unknown tool tier: {0}")]
    UnknownToolTier(String),
}

impl From<ParseEnumError> for StriveError {
    fn from(error: ParseEnumError) -> Self {
        let code = match error {
            ParseEnumError::UnknownRole(_) | ParseEnumError::UnknownOrganizationRole(_) => {
                ErrorCode::UnknownRole
            }
            ParseEnumError::UnknownTier(_) | ParseEnumError::UnknownToolTier(_) => {
                ErrorCode::UnknownTier
            }
        };
        StriveError::new(code, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Global Role
// ═══════════════════════════════════════════════════════════════════════════════

/// Platform-wide permission level.
///
/// Declared lowest to highest so the derived ordering is the privilege order.
/// `SuperAdmin` ranks at or above `Admin` everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalRole {
    Client,
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl GlobalRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::User => "USER",
            Self::Moderator => "MODERATOR",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    pub const fn all() -> [GlobalRole; 5] {
        [
            Self::Client,
            Self::User,
            Self::Moderator,
            Self::Admin,
            Self::SuperAdmin,
        ]
    }

    /// ADMIN and SUPER_ADMIN bypass route and navigation filtering.
    pub fn is_admin(&self) -> bool {
        *self >= Self::Admin
    }

    /// Every role except CLIENT works inside the product.
    pub fn is_staff(&self) -> bool {
        *self != Self::Client
    }
}

impl fmt::Display for GlobalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlobalRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseEnumError::UnknownRole(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organization Role
// ═══════════════════════════════════════════════════════════════════════════════

/// Permission level inside one organization. VIEWER < MEMBER < ADMIN < OWNER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationRole {
    Viewer,
    Member,
    Admin,
    Owner,
}

impl OrganizationRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "VIEWER",
            Self::Member => "MEMBER",
            Self::Admin => "ADMIN",
            Self::Owner => "OWNER",
        }
    }

    pub const fn all() -> [OrganizationRole; 4] {
        [Self::Viewer, Self::Member, Self::Admin, Self::Owner]
    }
}

impl fmt::Display for OrganizationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizationRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseEnumError::UnknownOrganizationRole(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Subscription Tier
// ═══════════════════════════════════════════════════════════════════════════════

/// Paid plan level. FREE < STARTER < GROWTH < ELITE < ENTERPRISE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionTier {
    Free,
    Starter,
    Growth,
    Elite,
    Enterprise,
}

impl SubscriptionTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Starter => "STARTER",
            Self::Growth => "GROWTH",
            Self::Elite => "ELITE",
            Self::Enterprise => "ENTERPRISE",
        }
    }

    /// All tiers, lowest first.
    pub const fn all() -> [SubscriptionTier; 5] {
        [
            Self::Free,
            Self::Starter,
            Self::Growth,
            Self::Elite,
            Self::Enterprise,
        ]
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError::UnknownTier(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tool Tier
// ═══════════════════════════════════════════════════════════════════════════════

/// Tier of the tools marketplace add-on, separate from the subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolTier {
    #[serde(rename = "FREE")]
    Free,
    #[serde(rename = "TIER_1")]
    Tier1,
    #[serde(rename = "TIER_2")]
    Tier2,
    #[serde(rename = "TIER_3")]
    Tier3,
}

impl ToolTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Tier1 => "TIER_1",
            Self::Tier2 => "TIER_2",
            Self::Tier3 => "TIER_3",
        }
    }

    pub const fn all() -> [ToolTier; 4] {
        [Self::Free, Self::Tier1, Self::Tier2, Self::Tier3]
    }
}

impl fmt::Display for ToolTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolTier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError::UnknownToolTier(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Limits
// ═══════════════════════════════════════════════════════════════════════════════

/// A numeric quota that may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Limited(u64),
    Unlimited,
}

impl Limit {
    /// Whether `current` usage still leaves room under the quota.
    pub fn allows(&self, current: u64) -> bool {
        match self {
            Self::Limited(max) => current < *max,
            Self::Unlimited => true,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{}", n),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Per-tier usage quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimits {
    pub storage_mb: Limit,
    pub api_calls: Limit,
    pub team_members: Limit,
}

impl UsageLimits {
    pub const fn limited(storage_mb: u64, api_calls: u64, team_members: u64) -> Self {
        Self {
            storage_mb: Limit::Limited(storage_mb),
            api_calls: Limit::Limited(api_calls),
            team_members: Limit::Limited(team_members),
        }
    }

    pub const fn unlimited() -> Self {
        Self {
            storage_mb: Limit::Unlimited,
            api_calls: Limit::Unlimited,
            team_members: Limit::Unlimited,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Users and memberships
// ═══════════════════════════════════════════════════════════════════════════════

/// Links a user to an organization with an organization-scoped role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: OrganizationRole,
    /// The organization's own subscription tier.
    pub organization_tier: SubscriptionTier,
    pub joined_at: DateTime<Utc>,
}

impl OrganizationMembership {
    pub fn new(
        user_id: UserId,
        organization_id: OrganizationId,
        role: OrganizationRole,
        organization_tier: SubscriptionTier,
    ) -> Self {
        Self {
            user_id,
            organization_id,
            role,
            organization_tier,
            joined_at: Utc::now(),
        }
    }
}

/// The acting user as resolved by the session layer.
///
/// The first membership is the current organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub role: GlobalRole,
    pub subscription_tier: SubscriptionTier,
    #[serde(default)]
    pub organization_members: Vec<OrganizationMembership>,
}

impl CurrentUser {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        role: GlobalRole,
        subscription_tier: SubscriptionTier,
    ) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
            role,
            subscription_tier,
            organization_members: Vec::new(),
        }
    }

    /// Add a membership. The first one added becomes the current organization.
    pub fn with_membership(
        mut self,
        organization_id: impl Into<String>,
        role: OrganizationRole,
        organization_tier: SubscriptionTier,
    ) -> Self {
        let membership = OrganizationMembership::new(
            self.id.clone(),
            OrganizationId::new(organization_id),
            role,
            organization_tier,
        );
        self.organization_members.push(membership);
        self
    }

    pub fn current_membership(&self) -> Option<&OrganizationMembership> {
        self.organization_members.first()
    }

    pub fn organization_id(&self) -> Option<&OrganizationId> {
        self.current_membership().map(|m| &m.organization_id)
    }

    pub fn organization_role(&self) -> Option<OrganizationRole> {
        self.current_membership().map(|m| m.role)
    }
}

/// Inputs to the feature predicates.
///
/// Every field is optional: a missing or unparseable value fails whichever
/// check needs it, and never raises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessSubject {
    pub global_role: Option<GlobalRole>,
    pub organization_role: Option<OrganizationRole>,
    pub subscription_tier: Option<SubscriptionTier>,
}

impl AccessSubject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: GlobalRole) -> Self {
        self.global_role = Some(role);
        self
    }

    pub fn with_organization_role(mut self, role: OrganizationRole) -> Self {
        self.organization_role = Some(role);
        self
    }

    pub fn with_tier(mut self, tier: SubscriptionTier) -> Self {
        self.subscription_tier = Some(tier);
        self
    }

    /// Build from raw strings. Unknown values become `None`.
    pub fn from_raw(
        global_role: Option<&str>,
        organization_role: Option<&str>,
        subscription_tier: Option<&str>,
    ) -> Self {
        Self {
            global_role: global_role.and_then(|s| s.parse().ok()),
            organization_role: organization_role.and_then(|s| s.parse().ok()),
            subscription_tier: subscription_tier.and_then(|s| s.parse().ok()),
        }
    }
}

impl From<&CurrentUser> for AccessSubject {
    fn from(user: &CurrentUser) -> Self {
        Self {
            global_role: Some(user.role),
            organization_role: user.organization_role(),
            subscription_tier: Some(user.subscription_tier),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Navigation
// ═══════════════════════════════════════════════════════════════════════════════

/// A sidebar entry shown to roles at or above `min_role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationItem {
    pub title: &'static str,
    pub href: &'static str,
    pub icon: &'static str,
    pub min_role: GlobalRole,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_role_parse() {
        assert_eq!("SUPER_ADMIN".parse::<GlobalRole>().unwrap(), GlobalRole::SuperAdmin);
        assert_eq!("CLIENT".parse::<GlobalRole>().unwrap(), GlobalRole::Client);
        assert_eq!(
            "INVALID_ROLE".parse::<GlobalRole>(),
            Err(ParseEnumError::UnknownRole("INVALID_ROLE".to_string()))
        );
        assert!("admin".parse::<GlobalRole>().is_err());
    }

    #[test]
    fn test_role_ordering() {
        assert!(GlobalRole::SuperAdmin > GlobalRole::Admin);
        assert!(GlobalRole::Moderator > GlobalRole::User);
        assert!(GlobalRole::User > GlobalRole::Client);
        assert!(GlobalRole::SuperAdmin.is_admin());
        assert!(!GlobalRole::Moderator.is_admin());
        assert!(!GlobalRole::Client.is_staff());

        assert!(OrganizationRole::Owner > OrganizationRole::Admin);
        assert!(OrganizationRole::Member > OrganizationRole::Viewer);
    }

    #[test]
    fn test_tier_ordering_and_parse() {
        assert!(SubscriptionTier::Enterprise > SubscriptionTier::Elite);
        assert!(SubscriptionTier::Growth > SubscriptionTier::Starter);
        assert_eq!("GROWTH".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Growth);
        assert!("CUSTOM".parse::<SubscriptionTier>().is_err());
        assert_eq!("TIER_2".parse::<ToolTier>().unwrap(), ToolTier::Tier2);
        assert!("TIER_4".parse::<ToolTier>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&GlobalRole::SuperAdmin).unwrap(), "\"SUPER_ADMIN\"");
        assert_eq!(serde_json::to_string(&ToolTier::Tier1).unwrap(), "\"TIER_1\"");
        let tier: SubscriptionTier = serde_json::from_str("\"ELITE\"").unwrap();
        assert_eq!(tier, SubscriptionTier::Elite);
    }

    #[test]
    fn test_parse_error_maps_to_error_code() {
        let err: StriveError = "NOPE".parse::<GlobalRole>().unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::UnknownRole);
        assert_eq!(err.user_message(), "Unknown role: NOPE");

        let err: StriveError = "GOLD".parse::<SubscriptionTier>().unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::UnknownTier);
    }

    #[test]
    fn test_limit_allows() {
        assert!(Limit::Limited(5).allows(4));
        assert!(!Limit::Limited(5).allows(5));
        assert!(!Limit::Limited(0).allows(0));
        assert!(Limit::Unlimited.allows(u64::MAX));
    }

    #[test]
    fn test_current_membership_is_first() {
        let user = CurrentUser::new("u1", "u1@example.com", GlobalRole::User, SubscriptionTier::Growth)
            .with_membership("org-a", OrganizationRole::Member, SubscriptionTier::Growth)
            .with_membership("org-b", OrganizationRole::Owner, SubscriptionTier::Elite);

        assert_eq!(user.organization_id().unwrap().as_str(), "org-a");
        assert_eq!(user.organization_role(), Some(OrganizationRole::Member));
    }

    #[test]
    fn test_access_subject_from_raw_fails_closed() {
        let subject = AccessSubject::from_raw(Some("USER"), Some("BOSS"), None);
        assert_eq!(subject.global_role, Some(GlobalRole::User));
        assert_eq!(subject.organization_role, None);
        assert_eq!(subject.subscription_tier, None);

        let empty = AccessSubject::from_raw(None, None, None);
        assert_eq!(empty, AccessSubject::default());
    }
}
