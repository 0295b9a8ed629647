use coachdesk_core::constants::{
    CLIENTS_COLLECTION, COLLABORATORS_COLLECTION, TENANTS_COLLECTION, USERS_COLLECTION,
};
use coachdesk_core::models::{roles, RoleScope};
use coachdesk_core::{platform_document, AppError, TenantId, TenantScope};
use coachdesk_store::DocumentStore;
use std::sync::Arc;

use crate::error::from_store_error;
use crate::roles::RoleRepository;

/// Field on `users/{uid}` naming the user's home tenant.
const USER_TENANT_FIELD: &str = "tenantId";

/// Rosters that make a user a member of a tenant, in lookup order.
const MEMBER_ROSTERS: [&str; 3] = [roles::ADMINS, roles::COACHES, roles::SUPERADMINS];

/// Works out which tenant a signed-in user belongs to.
///
/// There is no fallback tenant: a user that belongs nowhere gets `None`.
#[derive(Clone)]
pub struct TenantLocator {
    store: Arc<dyn DocumentStore>,
    roles: RoleRepository,
}

impl TenantLocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            roles: RoleRepository::new(store.clone()),
            store,
        }
    }

    /// Whether the user has a client or collaborator profile, or sits on one
    /// of the tenant's rosters.
    #[tracing::instrument(skip(self))]
    pub async fn is_member(&self, tenant_id: &str, user_id: &str) -> Result<bool, AppError> {
        let tenant = TenantId::parse(tenant_id)?;
        if user_id.is_empty() {
            return Ok(false);
        }
        let scope = TenantScope::new(tenant.clone());

        for collection in [CLIENTS_COLLECTION, COLLABORATORS_COLLECTION] {
            let path = scope.document(collection, user_id)?;
            if self.exists(&path).await? {
                return Ok(true);
            }
        }

        let role_scope = RoleScope::Tenant(tenant);
        for role in MEMBER_ROSTERS {
            if self.roles.scope_has_role(&role_scope, role, user_id).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The tenant recorded on the user's global profile, otherwise the first
    /// tenant (by id) the user is a member of.
    #[tracing::instrument(skip(self))]
    pub async fn find_user_tenant(&self, user_id: &str) -> Result<Option<TenantId>, AppError> {
        if user_id.is_empty() {
            return Ok(None);
        }

        let profile_path = platform_document(USERS_COLLECTION, user_id)?;
        let profile = self
            .store
            .get_document(&profile_path)
            .await
            .map_err(|e| from_store_error(&format!("Failed to read user {}", profile_path), e))?;

        if let Some(raw) = profile.as_ref().and_then(|p| p.get_str(USER_TENANT_FIELD)) {
            match TenantId::parse(raw) {
                Ok(tenant) => return Ok(Some(tenant)),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Ignoring unusable tenantId on user profile");
                }
            }
        }

        let tenants = self
            .store
            .list_collection(TENANTS_COLLECTION)
            .await
            .map_err(|e| from_store_error("Failed to list tenants", e))?;

        for tenant in tenants {
            if self.is_member(&tenant.id, user_id).await? {
                tracing::debug!(user_id = %user_id, tenant_id = %tenant.id, "Found tenant by membership");
                return TenantId::parse(&tenant.id).map(Some);
            }
        }

        Ok(None)
    }

    /// Keep the previously saved tenant while the user still belongs to it,
    /// otherwise look the tenant up again.
    #[tracing::instrument(skip(self))]
    pub async fn detect_tenant(
        &self,
        user_id: &str,
        saved_tenant: Option<&str>,
    ) -> Result<Option<TenantId>, AppError> {
        if user_id.is_empty() {
            return Ok(None);
        }

        if let Some(saved) = saved_tenant.filter(|s| !s.trim().is_empty()) {
            if self.is_member(saved, user_id).await? {
                return TenantId::parse(saved).map(Some);
            }
            tracing::info!(user_id = %user_id, tenant_id = %saved, "Saved tenant no longer valid for user");
        }

        self.find_user_tenant(user_id).await
    }

    async fn exists(&self, path: &str) -> Result<bool, AppError> {
        self.store
            .get_document(path)
            .await
            .map(|document| document.is_some())
            .map_err(|e| from_store_error(&format!("Failed to read {}", path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coachdesk_store::MemoryStore;
    use serde_json::{json, Value};

    async fn seed(store: &MemoryStore, path: &str, fields: Value) {
        store
            .set_document(path, fields.as_object().cloned().unwrap_or_default(), false)
            .await
            .unwrap();
    }

    async fn locator() -> TenantLocator {
        let store = MemoryStore::new();
        seed(&store, "tenants/acme", json!({"name": "Acme"})).await;
        seed(&store, "tenants/beta", json!({"name": "Beta"})).await;
        seed(&store, "tenants/beta/clients/cleo", json!({})).await;
        seed(&store, "tenants/acme/collaboratori/dan", json!({"role": "dipendente"})).await;
        seed(&store, "tenants/beta/roles/coaches", json!({"uids": ["carl"]})).await;
        seed(&store, "users/pinned", json!({"tenantId": "beta"})).await;
        seed(&store, "tenants/acme/clients/pinned", json!({})).await;
        TenantLocator::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_is_member() {
        let locator = locator().await;
        assert!(locator.is_member("beta", "cleo").await.unwrap());
        assert!(locator.is_member("acme", "dan").await.unwrap());
        assert!(locator.is_member("beta", "carl").await.unwrap());
        assert!(!locator.is_member("acme", "cleo").await.unwrap());
        assert!(!locator.is_member("acme", "").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_user_tenant() {
        let locator = locator().await;
        let found = |t: Option<TenantId>| t.map(|t| t.to_string());

        assert_eq!(found(locator.find_user_tenant("cleo").await.unwrap()).as_deref(), Some("beta"));
        assert_eq!(found(locator.find_user_tenant("dan").await.unwrap()).as_deref(), Some("acme"));
        // The profile wins over membership scanning.
        assert_eq!(found(locator.find_user_tenant("pinned").await.unwrap()).as_deref(), Some("beta"));
        assert!(locator.find_user_tenant("stranger").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_detect_tenant_has_no_default() {
        let locator = locator().await;

        let kept = locator.detect_tenant("cleo", Some("beta")).await.unwrap();
        assert_eq!(kept.map(|t| t.to_string()).as_deref(), Some("beta"));

        let moved = locator.detect_tenant("cleo", Some("acme")).await.unwrap();
        assert_eq!(moved.map(|t| t.to_string()).as_deref(), Some("beta"));

        assert!(locator.detect_tenant("stranger", Some("acme")).await.unwrap().is_none());
        assert!(locator.detect_tenant("stranger", None).await.unwrap().is_none());
        assert!(locator.detect_tenant("", Some("acme")).await.unwrap().is_none());
    }
}
