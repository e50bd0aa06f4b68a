//! Role- and tier-based access control.
//!
//! This module provides:
//! - **Models**: closed enums for global role, organization role, subscription
//!   tier and tool tier, plus the resolved `CurrentUser`
//! - **Roles**: per-global-role capability templates
//! - **Tables**: the immutable `PermissionTables` every predicate consults
//! - **Policy**: `AccessPolicy`, the access-control predicates
//! - **Authorization Middleware**: a tower layer enforcing one capability per route
//!
//! # Usage
//!
//! ```rust,ignore
//! use strive_core::rbac::{AccessPolicy, AccessSubject, Capability, GlobalRole, PermissionTables};
//!
//! let policy = AccessPolicy::new(Arc::new(PermissionTables::standard()));
//!
//! assert!(policy.has_permission(GlobalRole::Moderator, Capability::ManageUsers));
//! assert!(policy.can_access_route(Some(&user), "/crm/leads"));
//!
//! let subject = AccessSubject::from(&user);
//! if policy.can_access_reid(&subject) { /* ... */ }
//!
//! // Use as Axum middleware
//! let app = Router::new()
//!     .route("/api/v1/loops/stats", get(loop_stats))
//!     .layer(RequireCapabilityLayer::new(policy, Capability::ViewAnalytics));
//! ```

pub mod middleware;
pub mod models;
pub mod policy;
pub mod roles;
pub mod tables;

pub use middleware::{RequireCapabilityLayer, RequireCapabilityService};
pub use models::{
    AccessSubject, CurrentUser, GlobalRole, Limit, NavigationItem, OrganizationId,
    OrganizationMembership, OrganizationRole, ParseEnumError, SubscriptionTier, ToolTier,
    UsageLimits, UserId,
};
pub use policy::{AccessPolicy, AccessSummary, PolicyDecision};
pub use roles::{Capability, RoleTemplate};
pub use tables::{PermissionTables, ReidRequirements, RoleAction, RouteRule};
