//! # Roles and Capabilities
//!
//! Each role maps to an explicit permission set. Checks are by permission,
//! never by comparing role names at the call site.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ Role             │ Permissions                                          │
//! ├──────────────────┼──────────────────────────────────────────────────────┤
//! │ administrator    │ all                                                  │
//! │ supervisor       │ sales.*  inventory.*  reports.view  sync.run         │
//! │ cashier          │ sales.register  inventory.view                       │
//! │ warehouse        │ inventory.view  inventory.edit                       │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Permission
// =============================================================================

/// A single capability token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Permission {
    #[serde(rename = "sales.register")]
    SalesRegister,
    #[serde(rename = "sales.discount")]
    SalesDiscount,
    #[serde(rename = "sales.void")]
    SalesVoid,
    #[serde(rename = "inventory.view")]
    InventoryView,
    #[serde(rename = "inventory.edit")]
    InventoryEdit,
    #[serde(rename = "reports.view")]
    ReportsView,
    #[serde(rename = "settings.edit")]
    SettingsEdit,
    #[serde(rename = "sync.run")]
    SyncRun,
    #[serde(rename = "users.manage")]
    UsersManage,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::SalesRegister,
        Permission::SalesDiscount,
        Permission::SalesVoid,
        Permission::InventoryView,
        Permission::InventoryEdit,
        Permission::ReportsView,
        Permission::SettingsEdit,
        Permission::SyncRun,
        Permission::UsersManage,
    ];

    pub const fn token(&self) -> &'static str {
        match self {
            Permission::SalesRegister => "sales.register",
            Permission::SalesDiscount => "sales.discount",
            Permission::SalesVoid => "sales.void",
            Permission::InventoryView => "inventory.view",
            Permission::InventoryEdit => "inventory.edit",
            Permission::ReportsView => "reports.view",
            Permission::SettingsEdit => "settings.edit",
            Permission::SyncRun => "sync.run",
            Permission::UsersManage => "users.manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// =============================================================================
// Role
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Supervisor,
    Cashier,
    Warehouse,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Supervisor => "supervisor",
            Role::Cashier => "cashier",
            Role::Warehouse => "warehouse",
        }
    }

    /// The explicit permission set granted to this role.
    pub fn capabilities(&self) -> CapabilitySet {
        use Permission::*;

        let granted: &[Permission] = match self {
            Role::Administrator => &Permission::ALL,
            Role::Supervisor => &[
                SalesRegister,
                SalesDiscount,
                SalesVoid,
                InventoryView,
                InventoryEdit,
                ReportsView,
                SyncRun,
            ],
            Role::Cashier => &[SalesRegister, InventoryView],
            Role::Warehouse => &[InventoryView, InventoryEdit],
        };

        CapabilitySet::from_iter(granted.iter().copied())
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
        match s.trim().to_lowercase().as_str() {
            "administrator" | "admin" => Ok(Role::Administrator),
            "supervisor" => Ok(Role::Supervisor),
            "cashier" => Ok(Role::Cashier),
            "warehouse" => Ok(Role::Warehouse),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec![
                    "administrator".into(),
                    "supervisor".into(),
                    "cashier".into(),
                    "warehouse".into(),
                ],
            }),
        }
    }
}

// =============================================================================
// Capability Set
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Permission>);

impl CapabilitySet {
    pub fn has(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Permission tokens, sorted.
    pub fn tokens(&self) -> Vec<&'static str> {
        self.iter().map(|p| p.token()).collect()
    }
}

impl FromIterator<Permission> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        CapabilitySet(iter.into_iter().collect())
    }
}

// =============================================================================
// Session
// =============================================================================

/// The logged-in operator at a terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Session {
            user_id: user_id.into(),
            username: username.into(),
            role,
            started_at: Utc::now(),
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.capabilities().has(permission)
    }

    /// Fails with `PermissionDenied` unless the role grants `permission`.
    pub fn require(&self, permission: Permission) -> CoreResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                role: self.role.to_string(),
                permission: permission.to_string(),
            })
        }
    }
}
