//! Roles and the static Role→Permission grant table
//!
//! Both sides of the table are closed enums, so an unrecognized role cannot
//! exist at runtime and the compiler forces every role to enumerate its
//! grants explicitly. Absence of a permission in a role's set is denial;
//! there is no default-allow path and no runtime way to widen a grant.

use serde::{Deserialize, Serialize};

use crate::error::{CustodyError, CustodyResult};

/// Operator roles, fixed at deployment time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Radiologist,
    Technician,
}

impl Role {
    /// All roles, for admin screens
    pub fn all() -> &'static [Role] {
        &[Role::Admin, Role::Radiologist, Role::Technician]
    }

    /// Human-readable role name
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "System Administrator",
            Role::Radiologist => "Radiologist",
            Role::Technician => "X-ray Technician",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Radiologist => write!(f, "radiologist"),
            Role::Technician => write!(f, "technician"),
        }
    }
}

/// Named permissions, versioned with the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewPatients,
    AddPatients,
    EditPatients,
    DeletePatients,
    ViewXrays,
    AddXrays,
    EditXrays,
    DeleteXrays,
    AddAnnotations,
    ViewUsers,
    AddUsers,
    EditUsers,
    DeleteUsers,
    ViewAuditLogs,
    SystemAdmin,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Permission::ViewPatients => "view_patients",
            Permission::AddPatients => "add_patients",
            Permission::EditPatients => "edit_patients",
            Permission::DeletePatients => "delete_patients",
            Permission::ViewXrays => "view_xrays",
            Permission::AddXrays => "add_xrays",
            Permission::EditXrays => "edit_xrays",
            Permission::DeleteXrays => "delete_xrays",
            Permission::AddAnnotations => "add_annotations",
            Permission::ViewUsers => "view_users",
            Permission::AddUsers => "add_users",
            Permission::EditUsers => "edit_users",
            Permission::DeleteUsers => "delete_users",
            Permission::ViewAuditLogs => "view_audit_logs",
            Permission::SystemAdmin => "system_admin",
        };
        write!(f, "{}", s)
    }
}

/// The static grant table: every role maps to an explicitly enumerated,
/// non-empty permission set
pub fn permissions_for(role: Role) -> &'static [Permission] {
    use Permission::*;
    match role {
        Role::Admin => &[
            ViewPatients,
            AddPatients,
            EditPatients,
            DeletePatients,
            ViewXrays,
            AddXrays,
            EditXrays,
            DeleteXrays,
            AddAnnotations,
            ViewUsers,
            AddUsers,
            EditUsers,
            DeleteUsers,
            ViewAuditLogs,
            SystemAdmin,
        ],
        Role::Radiologist => &[
            ViewPatients,
            ViewXrays,
            EditXrays,
            AddAnnotations,
        ],
        Role::Technician => &[
            ViewPatients,
            AddPatients,
            ViewXrays,
            AddXrays,
        ],
    }
}

/// Pure grant lookup: no I/O, no side effects, no locks
pub fn check(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// Same lookup, but fails with `PermissionDenied` for call sites that want
/// to short-circuit
pub fn require(role: Role, permission: Permission) -> CustodyResult<()> {
    if check(role, permission) {
        Ok(())
    } else {
        Err(CustodyError::PermissionDenied { role, permission })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_a_non_empty_grant_set() {
        for &role in Role::all() {
            assert!(!permissions_for(role).is_empty(), "{} has no grants", role);
        }
    }

    #[test]
    fn test_check_is_deterministic_and_pure() {
        for &role in Role::all() {
            let first = check(role, Permission::AddPatients);
            for _ in 0..10 {
                assert_eq!(check(role, Permission::AddPatients), first);
            }
        }
    }

    #[test]
    fn test_admin_holds_system_admin() {
        assert!(check(Role::Admin, Permission::SystemAdmin));
        assert!(!check(Role::Radiologist, Permission::SystemAdmin));
        assert!(!check(Role::Technician, Permission::SystemAdmin));
    }

    #[test]
    fn test_technician_grants() {
        assert!(check(Role::Technician, Permission::AddPatients));
        assert!(check(Role::Technician, Permission::ViewPatients));
        assert!(!check(Role::Technician, Permission::DeletePatients));
        assert!(!check(Role::Technician, Permission::ViewAuditLogs));
    }

    #[test]
    fn test_radiologist_cannot_write_patients() {
        assert!(check(Role::Radiologist, Permission::ViewPatients));
        assert!(!check(Role::Radiologist, Permission::AddPatients));
        assert!(!check(Role::Radiologist, Permission::EditPatients));
    }

    #[test]
    fn test_require_denies_with_context() {
        let err = require(Role::Technician, Permission::DeleteUsers).unwrap_err();
        match err {
            CustodyError::PermissionDenied { role, permission } => {
                assert_eq!(role, Role::Technician);
                assert_eq!(permission, Permission::DeleteUsers);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_require_allows_granted() {
        assert!(require(Role::Admin, Permission::DeleteUsers).is_ok());
    }

    #[test]
    fn test_permission_names_are_stable() {
        // These strings are the versioned external surface shared with the
        // admin UI; renaming one is a breaking change.
        assert_eq!(Permission::ViewPatients.to_string(), "view_patients");
        assert_eq!(Permission::AddPatients.to_string(), "add_patients");
        assert_eq!(Permission::SystemAdmin.to_string(), "system_admin");
    }
}
