//! Global-role capability templates.
//!
//! | Role        | Capabilities                                                     |
//! |-------------|------------------------------------------------------------------|
//! | SUPER_ADMIN | Everything                                                       |
//! | ADMIN       | Everything                                                       |
//! | MODERATOR   | Users, projects, customers, settings, analytics, AI, tools       |
//! | USER        | Projects, customers, analytics, AI, tools                        |
//! | CLIENT      | Nothing; dashboard access is route-based                         |

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::models::GlobalRole;

/// A named boolean permission checked against the global role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "canViewAllOrganizations")]
    ViewAllOrganizations,
    #[serde(rename = "canManageUsers")]
    ManageUsers,
    #[serde(rename = "canManageBilling")]
    ManageBilling,
    #[serde(rename = "canManageProjects")]
    ManageProjects,
    #[serde(rename = "canManageCustomers")]
    ManageCustomers,
    #[serde(rename = "canManageSettings")]
    ManageSettings,
    #[serde(rename = "canViewAnalytics")]
    ViewAnalytics,
    #[serde(rename = "canAccessAI")]
    AccessAi,
    #[serde(rename = "canUseTools")]
    UseTools,
}

impl Capability {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ViewAllOrganizations => "canViewAllOrganizations",
            Self::ManageUsers => "canManageUsers",
            Self::ManageBilling => "canManageBilling",
            Self::ManageProjects => "canManageProjects",
            Self::ManageCustomers => "canManageCustomers",
            Self::ManageSettings => "canManageSettings",
            Self::ViewAnalytics => "canViewAnalytics",
            Self::AccessAi => "canAccessAI",
            Self::UseTools => "canUseTools",
        }
    }

    pub const fn all() -> [Capability; 9] {
        [
            Self::ViewAllOrganizations,
            Self::ManageUsers,
            Self::ManageBilling,
            Self::ManageProjects,
            Self::ManageCustomers,
            Self::ManageSettings,
            Self::ViewAnalytics,
            Self::AccessAi,
            Self::UseTools,
        ]
    }

    /// Look up a capability by its wire name, e.g. `"canManageUsers"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EVERYTHING: &[Capability] = &Capability::all();

/// The default capability set for one global role.
#[derive(Debug, Clone)]
pub struct RoleTemplate {
    pub role: GlobalRole,
    pub description: &'static str,
    pub capabilities: HashSet<Capability>,
}

impl RoleTemplate {
    pub fn for_role(role: GlobalRole) -> Self {
        use Capability::*;

        let (description, capabilities): (&'static str, &[Capability]) = match role {
            GlobalRole::SuperAdmin => ("Platform owner; every capability", EVERYTHING),
            GlobalRole::Admin => ("Full access to every organization", EVERYTHING),
            GlobalRole::Moderator => (
                "Manages users and settings inside the product",
                &[
                    ManageUsers,
                    ManageProjects,
                    ManageCustomers,
                    ManageSettings,
                    ViewAnalytics,
                    AccessAi,
                    UseTools,
                ],
            ),
            GlobalRole::User => (
                "Works projects and customers",
                &[
                    ManageProjects,
                    ManageCustomers,
                    ViewAnalytics,
                    AccessAi,
                    UseTools,
                ],
            ),
            GlobalRole::Client => ("External client with dashboard access", &[]),
        };

        Self {
            role,
            description,
            capabilities: capabilities.iter().copied().collect(),
        }
    }

    /// Templates for every global role, lowest first.
    pub fn all() -> Vec<RoleTemplate> {
        GlobalRole::all().into_iter().map(Self::for_role).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        for role in [GlobalRole::Admin, GlobalRole::SuperAdmin] {
            let template = RoleTemplate::for_role(role);
            assert_eq!(template.capabilities.len(), Capability::all().len());
        }
    }

    #[test]
    fn test_moderator_lacks_billing_and_org_view() {
        let template = RoleTemplate::for_role(GlobalRole::Moderator);
        assert!(template.capabilities.contains(&Capability::ManageUsers));
        assert!(template.capabilities.contains(&Capability::ManageSettings));
        assert!(!template.capabilities.contains(&Capability::ManageBilling));
        assert!(!template.capabilities.contains(&Capability::ViewAllOrganizations));
    }

    #[test]
    fn test_user_and_client() {
        let user = RoleTemplate::for_role(GlobalRole::User);
        assert!(user.capabilities.contains(&Capability::ManageProjects));
        assert!(!user.capabilities.contains(&Capability::ManageUsers));
        assert!(!user.capabilities.contains(&Capability::ManageSettings));

        assert!(RoleTemplate::for_role(GlobalRole::Client).capabilities.is_empty());
    }

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::from_name("canAccessAI"), Some(Capability::AccessAi));
        assert_eq!(Capability::from_name("canFly"), None);
        assert_eq!(
            serde_json::to_string(&Capability::ManageUsers).unwrap(),
            "\"canManageUsers\""
        );
    }

    #[test]
    fn test_all_templates() {
        let all = RoleTemplate::all();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].role, GlobalRole::Client);
    }
}
