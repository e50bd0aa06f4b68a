//! Tenant isolation.
//!
//! - **Context**: resolves the acting user once per operation and hands the
//!   resulting [`TenantContext`] to the operation body as an argument
//! - **Filter**: organization-scoped filters and the visibility rule every
//!   read uses
//! - **Guard**: the checks a module runs before touching storage
//!
//! There is no ambient "current tenant". Code that needs the context receives
//! it from [`with_tenant_context`]; code outside that scope has no way to ask
//! for one.

pub mod context;
pub mod filter;
pub mod guard;

pub use context::{
    resolve_user, with_current_user, with_tenant_context, AuthProvider, StaticAuthProvider,
    TenantContext,
};
pub use filter::{Authored, TenantScope, TenantScoped};
pub use guard::QueryGuard;
