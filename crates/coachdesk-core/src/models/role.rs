use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::{
    ROLES_COLLECTION, ROSTER_MEMBERS_FIELD, ROSTER_UPDATED_AT_FIELD, ROSTER_UPDATED_BY_FIELD,
};
use crate::error::AppError;
use crate::tenant_path::{platform_document, validate_segment, TenantId, TenantScope};

/// Well-known roster names.
pub mod roles {
    pub const SUPERADMINS: &str = "superadmins";
    pub const ADMINS: &str = "admins";
    pub const COACHES: &str = "coaches";
}

/// Where a roster lives: under a tenant, or at the platform root for
/// cross-tenant roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleScope {
    Platform,
    Tenant(TenantId),
}

impl RoleScope {
    /// `None` selects platform scope. `Some` must carry a usable tenant id;
    /// a blank one is a configuration error, never a silent switch to
    /// platform scope.
    pub fn from_tenant(tenant_id: Option<&str>) -> Result<Self, AppError> {
        match tenant_id {
            None => Ok(RoleScope::Platform),
            Some(raw) => Ok(RoleScope::Tenant(TenantId::parse(raw)?)),
        }
    }

    /// `tenants/{tenant}/roles/{role}` or `roles/{role}`.
    pub fn roster_path(&self, role: &str) -> Result<String, AppError> {
        validate_segment("role name", role)?;
        match self {
            RoleScope::Platform => platform_document(ROLES_COLLECTION, role),
            RoleScope::Tenant(tenant_id) => {
                TenantScope::new(tenant_id.clone()).document(ROLES_COLLECTION, role)
            }
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            RoleScope::Platform => None,
            RoleScope::Tenant(tenant_id) => Some(tenant_id),
        }
    }
}

impl fmt::Display for RoleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleScope::Platform => f.write_str("platform"),
            RoleScope::Tenant(tenant_id) => write!(f, "tenant:{}", tenant_id),
        }
    }
}

/// Set of user ids holding one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRoster {
    pub role: String,
    pub uids: BTreeSet<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl RoleRoster {
    /// Read a roster out of raw document fields.
    ///
    /// A missing or non-array `uids` field reads as an empty roster, and
    /// non-string entries are skipped.
    pub fn from_fields(role: &str, fields: &Map<String, Value>) -> Self {
        let uids = fields
            .get(ROSTER_MEMBERS_FIELD)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let updated_at = fields
            .get(ROSTER_UPDATED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc));

        let updated_by = fields
            .get(ROSTER_UPDATED_BY_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            role: role.to_string(),
            uids,
            updated_at,
            updated_by,
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.uids.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }
}

/// Highest-privilege role a user holds inside a tenant.
///
/// Ordered superadmin > admin > coach > client > collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRole {
    Superadmin,
    Admin,
    Coach,
    Client,
    /// Collaborator profile; carries the lower-cased kind from the profile.
    Collaborator(String),
    /// No user id supplied.
    Guest,
    /// Known user with no role in this tenant.
    Unknown,
}

impl UserRole {
    pub fn name(&self) -> &str {
        match self {
            UserRole::Superadmin => "superadmin",
            UserRole::Admin => "admin",
            UserRole::Coach => "coach",
            UserRole::Client => "client",
            UserRole::Collaborator(kind) => kind,
            UserRole::Guest => "guest",
            UserRole::Unknown => "unknown",
        }
    }

    pub fn is_superadmin(&self) -> bool {
        matches!(self, UserRole::Superadmin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Superadmin | UserRole::Admin)
    }

    pub fn is_coach(&self) -> bool {
        matches!(self, UserRole::Superadmin | UserRole::Admin | UserRole::Coach)
    }

    pub fn summary(&self) -> UserRoleSummary {
        UserRoleSummary {
            role: self.name().to_string(),
            is_super_admin: self.is_superadmin(),
            is_admin: self.is_admin(),
            is_coach: self.is_coach(),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serializable view of a resolved role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleSummary {
    pub role: String,
    pub is_super_admin: bool,
    pub is_admin: bool,
    pub is_coach: bool,
}
