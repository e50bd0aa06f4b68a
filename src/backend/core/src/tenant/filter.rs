//! Organization-scoped filters.
//!
//! A read admits a record when the record is public (and the scope allows
//! public records) or when the record's organization matches the scope.
//! Writes only ever admit the scope's own organization.

use crate::rbac::models::{OrganizationId, UserId};

/// A record that belongs to one organization.
pub trait TenantScoped {
    fn organization_id(&self) -> &OrganizationId;

    /// Published records are visible to every organization.
    fn is_public(&self) -> bool {
        false
    }
}

/// A record with a creating user.
pub trait Authored {
    fn created_by(&self) -> &UserId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    /// Only records of the scope's organization.
    Owned,
    /// Public records plus records of the scope's organization.
    PublicOrOwned,
}

/// The organization filter merged into every tenant query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    organization_id: OrganizationId,
    visibility: Visibility,
}

impl TenantScope {
    pub fn owned(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            visibility: Visibility::Owned,
        }
    }

    pub fn public_or_owned(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            visibility: Visibility::PublicOrOwned,
        }
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    /// Whether a read under this scope may return `record`.
    pub fn admits<R: TenantScoped + ?Sized>(&self, record: &R) -> bool {
        let owned = record.organization_id() == &self.organization_id;
        match self.visibility {
            Visibility::Owned => owned,
            Visibility::PublicOrOwned => owned || record.is_public(),
        }
    }

    /// Whether a mutation under this scope may touch `record`.
    pub fn admits_write<R: TenantScoped + ?Sized>(&self, record: &R) -> bool {
        record.organization_id() == &self.organization_id
    }
}
