//! Roles and the permissions they grant.

use crate::{ColdChainError, ColdChainResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Appointments,
    DonorPortal,
    Inventory,
    Testing,
    Traceability,
    Transfers,
    Settings,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::Appointments,
        Permission::DonorPortal,
        Permission::Inventory,
        Permission::Testing,
        Permission::Traceability,
        Permission::Transfers,
        Permission::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Appointments => "appointments",
            Permission::DonorPortal => "donor_portal",
            Permission::Inventory => "inventory",
            Permission::Testing => "testing",
            Permission::Traceability => "traceability",
            Permission::Transfers => "transfers",
            Permission::Settings => "settings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Receptionist,
    LabTech,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Receptionist => "receptionist",
            Role::LabTech => "lab_tech",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }

    /// Permissions granted to this role.
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Receptionist => &[Appointments, DonorPortal],
            Role::LabTech => &[Appointments, Inventory, Testing],
            Role::Doctor => &[Appointments, Inventory, Testing, Traceability, Transfers],
            Role::Admin => &Permission::ALL,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ColdChainError;

    fn from_str(s: &str) -> ColdChainResult<Self> {
        match s.trim() {
            "receptionist" => Ok(Role::Receptionist),
            "lab_tech" => Ok(Role::LabTech),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(ColdChainError::InvalidInput(format!(
                "unknown role: '{}'",
                other
            ))),
        }
    }
}

/// Anything that can be asked whether it holds a permission.
pub trait Capabilities {
    fn can(&self, permission: Permission) -> bool;

    /// # Errors
    ///
    /// Returns `ColdChainError::Forbidden` naming the missing permission.
    fn require(&self, permission: Permission) -> ColdChainResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(ColdChainError::Forbidden(permission))
        }
    }
}

impl Capabilities for Role {
    fn can(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receptionist_cannot_see_inventory() {
        assert!(Role::Receptionist.can(Permission::DonorPortal));
        assert!(!Role::Receptionist.can(Permission::Inventory));
    }

    #[test]
    fn test_lab_tech_cannot_request_transfers() {
        let err = Role::LabTech
            .require(Permission::Transfers)
            .expect_err("lab tech lacks transfers");
        assert!(matches!(err, ColdChainError::Forbidden(Permission::Transfers)));
    }

    #[test]
    fn test_doctor_can_transfer_but_not_change_settings() {
        assert!(Role::Doctor.can(Permission::Transfers));
        assert!(!Role::Doctor.can(Permission::Settings));
    }

    #[test]
    fn test_admin_holds_every_permission() {
        for permission in Permission::ALL {
            assert!(Role::Admin.can(permission), "admin lacks {permission}");
        }
    }

    #[test]
    fn test_role_round_trips_through_wire_name() {
        for role in [Role::Receptionist, Role::LabTech, Role::Doctor, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }
}
