//! # Access Control
//!
//! Roles and the areas of the back-office they may reach.
//!
//! ```text
//! ┌──────────────────────┬────────┬─────────┬─────────┐
//! │ Area                 │ admin  │ manager │ cashier │
//! ├──────────────────────┼────────┼─────────┼─────────┤
//! │ Catalog              │   ✓    │    ✓    │ ✓ read  │
//! │ Clients              │   ✓    │    ✓    │    ✓    │
//! │ PointOfSale          │   ✓    │    ✓    │    ✓    │
//! │ Parcels              │   ✓    │    ✓    │    ✓    │
//! │ Suppliers            │   ✓    │    ✓    │         │
//! │ Supplies             │   ✓    │    ✓    │         │
//! │ Withdrawals          │   ✓    │    ✓    │         │
//! │ Reports              │   ✓    │    ✓    │         │
//! │ Users                │   ✓    │         │         │
//! │ AuditLog             │   ✓    │         │         │
//! │ ParcelCredentials    │   ✓    │         │         │
//! └──────────────────────┴────────┴─────────┴─────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// A user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

/// A section of the back-office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Catalog,
    Clients,
    PointOfSale,
    Suppliers,
    Supplies,
    Parcels,
    Withdrawals,
    Reports,
    Users,
    AuditLog,
    ParcelCredentials,
}

impl Role {
    /// Whether this role may open `area` at all.
    pub fn can(&self, area: Area) -> bool {
        match self {
            Role::Admin => true,
            Role::Manager => !matches!(
                area,
                Area::Users | Area::AuditLog | Area::ParcelCredentials
            ),
            Role::Cashier => matches!(
                area,
                Area::Catalog | Area::Clients | Area::PointOfSale | Area::Parcels
            ),
        }
    }

    /// Creating, editing or deleting products and categories.
    pub fn can_write_catalog(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec![
                    "admin".to_string(),
                    "manager".to_string(),
                    "cashier".to_string(),
                ],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Area; 11] = [
        Area::Catalog,
        Area::Clients,
        Area::PointOfSale,
        Area::Suppliers,
        Area::Supplies,
        Area::Parcels,
        Area::Withdrawals,
        Area::Reports,
        Area::Users,
        Area::AuditLog,
        Area::ParcelCredentials,
    ];

    #[test]
    fn test_admin_reaches_everything() {
        assert!(ALL.iter().all(|a| Role::Admin.can(*a)));
    }

    #[test]
    fn test_manager_excludes_administration() {
        assert!(Role::Manager.can(Area::Supplies));
        assert!(Role::Manager.can(Area::Reports));
        assert!(!Role::Manager.can(Area::Users));
        assert!(!Role::Manager.can(Area::AuditLog));
        assert!(!Role::Manager.can(Area::ParcelCredentials));
    }

    #[test]
    fn test_cashier_areas() {
        let allowed: Vec<Area> = ALL.into_iter().filter(|a| Role::Cashier.can(*a)).collect();
        assert_eq!(
            allowed,
            vec![Area::Catalog, Area::Clients, Area::PointOfSale, Area::Parcels]
        );
        assert!(!Role::Cashier.can_write_catalog());
        assert!(Role::Manager.can_write_catalog());
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Admin, Role::Manager, Role::Cashier] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("owner".parse::<Role>().is_err());
    }
}
