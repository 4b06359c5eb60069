//! User roles and the permission matrix.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Security,
    Checker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Security => "SECURITY",
            Self::Checker => "CHECKER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Self::Admin),
            "SECURITY" => Some(Self::Security),
            "CHECKER" => Some(Self::Checker),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Admin, Self::Security, Self::Checker]
    }

    pub fn allows(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Self::Admin => true,
            Self::Security => matches!(permission, CreateSecurityCheck | ViewChecks),
            Self::Checker => matches!(permission, CreateCheckerData | ViewChecks),
        }
    }

    /// SECURITY officers only ever see the checks they recorded.
    pub fn sees_all_checks(&self) -> bool {
        !matches!(self, Self::Security)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ManageUsers,
    ManageInspectorNames,
    CreateSecurityCheck,
    CreateCheckerData,
    ViewChecks,
    DeleteChecks,
    ViewReports,
    ExportData,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageUsers => "manage users",
            Self::ManageInspectorNames => "manage inspector names",
            Self::CreateSecurityCheck => "create security checks",
            Self::CreateCheckerData => "record checker data",
            Self::ViewChecks => "view checks",
            Self::DeleteChecks => "delete checks",
            Self::ViewReports => "view reports",
            Self::ExportData => "export data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_every_permission() {
        for p in [
            Permission::ManageUsers,
            Permission::ManageInspectorNames,
            Permission::CreateSecurityCheck,
            Permission::CreateCheckerData,
            Permission::ViewChecks,
            Permission::DeleteChecks,
            Permission::ViewReports,
            Permission::ExportData,
        ] {
            assert!(Role::Admin.allows(p), "{:?}", p);
        }
    }

    #[test]
    fn security_cannot_record_checker_data() {
        assert!(Role::Security.allows(Permission::CreateSecurityCheck));
        assert!(!Role::Security.allows(Permission::CreateCheckerData));
        assert!(!Role::Security.allows(Permission::ViewReports));
    }

    #[test]
    fn checker_cannot_create_security_checks() {
        assert!(Role::Checker.allows(Permission::CreateCheckerData));
        assert!(!Role::Checker.allows(Permission::CreateSecurityCheck));
        assert!(!Role::Checker.allows(Permission::DeleteChecks));
    }

    #[test]
    fn role_string_round_trip() {
        for r in Role::all() {
            assert_eq!(Role::from_str(r.as_str()), Some(*r));
        }
        assert_eq!(Role::from_str("admin"), None);
    }
}
