//! Role resolution and privileged role changes.
//!
//! Every check reads rosters through [`RoleRepository`]; store failures are
//! returned as errors and are never folded into a negative answer.

use coachdesk_core::constants::{
    CLIENTS_COLLECTION, COLLABORATORS_COLLECTION, DEFAULT_COLLABORATOR_KIND,
};
use coachdesk_core::models::{roles, RoleScope, UserRole};
use coachdesk_core::{platform_document, AppError, TenantScope};
use coachdesk_store::{Document, DocumentStore};
use std::sync::Arc;

use crate::cache::RoleCache;
use crate::error::from_store_error;
use crate::roles::RoleRepository;

/// Access-control service over role rosters and user profiles.
#[derive(Clone)]
pub struct AccessControl {
    store: Arc<dyn DocumentStore>,
    roles: RoleRepository,
    cache: Option<Arc<RoleCache>>,
}

impl AccessControl {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            roles: RoleRepository::new(store.clone()),
            store,
            cache: None,
        }
    }

    /// Memoize resolved roles in `cache`.
    pub fn with_cache(mut self, cache: RoleCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn roles(&self) -> &RoleRepository {
        &self.roles
    }

    /// Member of the platform `superadmins` roster.
    pub async fn is_superadmin(&self, user_id: &str) -> Result<bool, AppError> {
        self.roles
            .scope_has_role(&RoleScope::Platform, roles::SUPERADMINS, user_id)
            .await
    }

    /// Superadmin, or member of the `admins` roster in the given scope.
    pub async fn is_admin(&self, tenant_id: Option<&str>, user_id: &str) -> Result<bool, AppError> {
        let scope = RoleScope::from_tenant(tenant_id)?;
        if self.is_superadmin(user_id).await? {
            return Ok(true);
        }
        self.roles.scope_has_role(&scope, roles::ADMINS, user_id).await
    }

    /// Highest role a user holds in the given scope.
    ///
    /// Checked in order: platform superadmins, admins roster, coaches roster,
    /// client profile, collaborator profile.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_user_role(
        &self,
        tenant_id: Option<&str>,
        user_id: &str,
    ) -> Result<UserRole, AppError> {
        let scope = RoleScope::from_tenant(tenant_id)?;
        self.resolve_scoped(&scope, user_id).await
    }

    async fn resolve_scoped(&self, scope: &RoleScope, user_id: &str) -> Result<UserRole, AppError> {
        if user_id.is_empty() {
            return Ok(UserRole::Guest);
        }

        if self.is_superadmin(user_id).await? {
            return Ok(UserRole::Superadmin);
        }
        if self.roles.scope_has_role(scope, roles::ADMINS, user_id).await? {
            return Ok(UserRole::Admin);
        }
        if self.roles.scope_has_role(scope, roles::COACHES, user_id).await? {
            return Ok(UserRole::Coach);
        }
        if self
            .profile(scope, CLIENTS_COLLECTION, user_id)
            .await?
            .is_some()
        {
            return Ok(UserRole::Client);
        }
        if let Some(profile) = self.profile(scope, COLLABORATORS_COLLECTION, user_id).await? {
            let kind = profile
                .get_str("role")
                .filter(|kind| !kind.is_empty())
                .unwrap_or(DEFAULT_COLLABORATOR_KIND)
                .to_lowercase();
            return Ok(UserRole::Collaborator(kind));
        }

        Ok(UserRole::Unknown)
    }

    /// Same as [`resolve_user_role`](Self::resolve_user_role), served from the
    /// role cache when one is configured. Errors are never cached.
    pub async fn resolve_user_role_cached(
        &self,
        tenant_id: Option<&str>,
        user_id: &str,
    ) -> Result<UserRole, AppError> {
        let scope = RoleScope::from_tenant(tenant_id)?;
        let Some(cache) = &self.cache else {
            return self.resolve_scoped(&scope, user_id).await;
        };

        if let Some(role) = cache.get(scope.tenant_id(), user_id) {
            tracing::debug!(user_id = %user_id, scope = %scope, "Role cache hit");
            return Ok(role);
        }

        // A grant or revoke landing while the rosters are read bumps the
        // generation, and the answer is then returned without being stored.
        let generation = cache.generation();
        let role = self.resolve_scoped(&scope, user_id).await?;
        if !cache.insert_if_current(scope.tenant_id(), user_id, role.clone(), generation) {
            tracing::debug!(user_id = %user_id, scope = %scope, "Role changed during resolution, not cached");
        }
        Ok(role)
    }

    /// Drop cached roles for one user.
    pub fn invalidate(&self, user_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_user(user_id);
        }
    }

    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Succeed when the user holds `role`, otherwise `AccessDenied`.
    pub async fn require_role(
        &self,
        tenant_id: Option<&str>,
        role: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        if self.roles.has_role(tenant_id, role, user_id).await? {
            return Ok(());
        }
        tracing::warn!(user_id = %user_id, role = %role, tenant_id = ?tenant_id, "Role check denied");
        Err(AppError::AccessDenied(format!(
            "User {} does not hold role {}",
            user_id, role
        )))
    }

    /// Add `target_id` to a roster on behalf of `actor_id`.
    ///
    /// Platform rosters may only be changed by a superadmin; tenant rosters
    /// by an admin of that tenant (or a superadmin).
    pub async fn grant_role(
        &self,
        actor_id: &str,
        tenant_id: Option<&str>,
        role: &str,
        target_id: &str,
    ) -> Result<(), AppError> {
        let scope = RoleScope::from_tenant(tenant_id)?;
        self.authorize_change(&scope, actor_id, role).await?;
        // The roster may have changed even when the store reports an error.
        let result = self.roles.add_member(&scope, role, target_id, actor_id).await;
        self.invalidate(target_id);
        result
    }

    /// Remove `target_id` from a roster on behalf of `actor_id`.
    ///
    /// Same authorization as [`grant_role`](Self::grant_role); an actor may
    /// not remove themself.
    pub async fn revoke_role(
        &self,
        actor_id: &str,
        tenant_id: Option<&str>,
        role: &str,
        target_id: &str,
    ) -> Result<(), AppError> {
        let scope = RoleScope::from_tenant(tenant_id)?;
        self.authorize_change(&scope, actor_id, role).await?;
        if actor_id == target_id {
            return Err(AppError::InvalidInput(format!(
                "User {} cannot remove themself from {}",
                actor_id, role
            )));
        }
        let result = self
            .roles
            .remove_member(&scope, role, target_id, actor_id)
            .await;
        self.invalidate(target_id);
        result
    }

    pub async fn grant_superadmin(&self, actor_id: &str, target_id: &str) -> Result<(), AppError> {
        self.grant_role(actor_id, None, roles::SUPERADMINS, target_id)
            .await
    }

    pub async fn revoke_superadmin(&self, actor_id: &str, target_id: &str) -> Result<(), AppError> {
        self.revoke_role(actor_id, None, roles::SUPERADMINS, target_id)
            .await
    }

    async fn authorize_change(
        &self,
        scope: &RoleScope,
        actor_id: &str,
        role: &str,
    ) -> Result<(), AppError> {
        let allowed = match scope {
            RoleScope::Platform => self.is_superadmin(actor_id).await?,
            RoleScope::Tenant(tenant_id) => self.is_admin(Some(tenant_id.as_str()), actor_id).await?,
        };
        if allowed {
            return Ok(());
        }
        tracing::warn!(actor_id = %actor_id, role = %role, scope = %scope, "Role change denied");
        Err(AppError::AccessDenied(format!(
            "User {} may not change role {} in {}",
            actor_id, role, scope
        )))
    }

    async fn profile(
        &self,
        scope: &RoleScope,
        collection: &str,
        user_id: &str,
    ) -> Result<Option<Document>, AppError> {
        let path = match scope {
            RoleScope::Platform => platform_document(collection, user_id)?,
            RoleScope::Tenant(tenant_id) => {
                TenantScope::new(tenant_id.clone()).document(collection, user_id)?
            }
        };
        self.store
            .get_document(&path)
            .await
            .map_err(|e| from_store_error(&format!("Failed to read profile {}", path), e))
    }
}
