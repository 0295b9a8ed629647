//! Collection names and field names shared by every crate.

/// Root collection holding one document per tenant.
pub const TENANTS_COLLECTION: &str = "tenants";

/// Collection (tenant-scoped or platform-root) holding role rosters.
pub const ROLES_COLLECTION: &str = "roles";

/// Roster field listing member user ids.
pub const ROSTER_MEMBERS_FIELD: &str = "uids";

pub const ROSTER_UPDATED_AT_FIELD: &str = "updatedAt";
pub const ROSTER_UPDATED_BY_FIELD: &str = "updatedBy";

/// Tenant-scoped collection of client profiles, keyed by user id.
pub const CLIENTS_COLLECTION: &str = "clients";

/// Tenant-scoped collection of collaborator profiles, keyed by user id.
pub const COLLABORATORS_COLLECTION: &str = "collaboratori";

/// Platform-root collection of user profiles, keyed by user id.
pub const USERS_COLLECTION: &str = "users";

/// Collaborator kind used when a profile carries no `role` field.
pub const DEFAULT_COLLABORATOR_KIND: &str = "collaboratore";

pub const DEFAULT_ROLE_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_ROLE_CACHE_CAPACITY: usize = 1024;
