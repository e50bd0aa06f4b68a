#![allow(clippy::result_large_err)]
//! # Strive Core
//!
//! Tenant isolation and role/tier access control for the Strive real-estate
//! platform.
//!
//! ## Architecture
//!
//! - **RBAC**: permission tables, access-control predicates and an axum layer
//!   that enforces one capability per route
//! - **Tenant**: per-operation tenant context, organization-scoped filters and
//!   the query guard every data operation runs through
//! - **Audit**: activity log written after each mutation, with a configurable
//!   failure policy
//! - **Transactions**: transaction loops, the module that exercises the guard
//!   end to end, over in-memory or PostgreSQL storage
//! - **API**: axum router exposing loops over HTTP
//! - **Telemetry**: structured logging and access-control counters

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod pagination;
pub mod rbac;
pub mod telemetry;
pub mod tenant;
pub mod transactions;

pub use error::{ErrorCode, ErrorDetails, ErrorSeverity, Result, StriveError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::audit::{AuditAction, AuditEntry, AuditSink, AuditTrail};
    pub use crate::config::{AuditPolicy, Config, UnknownRoutePolicy};
    pub use crate::error::{ErrorCode, ErrorDetails, ErrorSeverity, Result, StriveError};
    pub use crate::pagination::{PageInfo, PageRequest};
    pub use crate::rbac::{
        AccessPolicy, AccessSubject, Capability, CurrentUser, GlobalRole, Limit, OrganizationId,
        OrganizationRole, PermissionTables, PolicyDecision, RequireCapabilityLayer, RoleAction,
        SubscriptionTier, ToolTier, UserId,
    };
    pub use crate::tenant::{
        with_current_user, with_tenant_context, AuthProvider, QueryGuard, StaticAuthProvider,
        TenantContext, TenantScope,
    };
    pub use crate::transactions::{
        InMemoryLoopStore, LoopStore, TransactionLoop, TransactionService,
    };
}
