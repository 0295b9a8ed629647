use chrono::Utc;
use coachdesk_core::constants::{
    ROSTER_MEMBERS_FIELD, ROSTER_UPDATED_AT_FIELD, ROSTER_UPDATED_BY_FIELD,
};
use coachdesk_core::models::{RoleRoster, RoleScope};
use coachdesk_core::AppError;
use coachdesk_store::{DocumentStore, Fields};
use serde_json::Value;
use std::sync::Arc;

use crate::error::from_store_error;

/// Repository for role rosters
///
/// A roster is one document holding the ids of every user with a role, at
/// `tenants/{tenant}/roles/{role}` or, for platform roles, `roles/{role}`.
#[derive(Clone)]
pub struct RoleRepository {
    store: Arc<dyn DocumentStore>,
}

impl RoleRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Check whether a user holds a role.
    ///
    /// `None` checks the platform roster. A blank tenant id is a
    /// configuration error. A missing roster or an empty user id answers
    /// `false`; a failed read is an error, never `false`.
    pub async fn has_role(
        &self,
        tenant_id: Option<&str>,
        role: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let scope = RoleScope::from_tenant(tenant_id)?;
        self.scope_has_role(&scope, role, user_id).await
    }

    #[tracing::instrument(skip(self, scope), fields(store.operation = "get", scope = %scope))]
    pub async fn scope_has_role(
        &self,
        scope: &RoleScope,
        role: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        require_role_name(role)?;
        if user_id.is_empty() {
            return Ok(false);
        }

        match self.get_roster(scope, role).await? {
            Some(roster) => Ok(roster.contains(user_id)),
            None => Ok(false),
        }
    }

    /// Read a roster; `None` when the roster document does not exist.
    #[tracing::instrument(skip(self, scope), fields(store.operation = "get", scope = %scope))]
    pub async fn get_roster(
        &self,
        scope: &RoleScope,
        role: &str,
    ) -> Result<Option<RoleRoster>, AppError> {
        require_role_name(role)?;
        let path = scope.roster_path(role)?;

        let document = self
            .store
            .get_document(&path)
            .await
            .map_err(|e| from_store_error(&format!("Failed to read roster {}", path), e))?;

        match document {
            Some(document) => Ok(Some(RoleRoster::from_fields(role, &document.fields))),
            None => {
                tracing::debug!(store.path = %path, "Role roster does not exist");
                Ok(None)
            }
        }
    }

    /// Member ids of a roster, sorted. Empty when the roster does not exist.
    pub async fn list_members(
        &self,
        scope: &RoleScope,
        role: &str,
    ) -> Result<Vec<String>, AppError> {
        Ok(self
            .get_roster(scope, role)
            .await?
            .map(|roster| roster.uids.into_iter().collect())
            .unwrap_or_default())
    }

    /// Add a user to a roster, creating the roster when needed.
    ///
    /// The id is added with an atomic array union so concurrent grants never
    /// overwrite each other; the audit fields are merged in afterwards. Once
    /// the union has committed, a failed audit stamp is logged, not returned.
    #[tracing::instrument(skip(self, scope), fields(store.operation = "array_union", scope = %scope))]
    pub async fn add_member(
        &self,
        scope: &RoleScope,
        role: &str,
        user_id: &str,
        actor_id: &str,
    ) -> Result<(), AppError> {
        require_role_name(role)?;
        require_user_id(user_id)?;
        let path = scope.roster_path(role)?;

        self.store
            .array_union(
                &path,
                ROSTER_MEMBERS_FIELD,
                vec![Value::String(user_id.to_string())],
            )
            .await
            .map_err(|e| from_store_error(&format!("Failed to update roster {}", path), e))?;
        self.stamp(&path, actor_id).await;

        tracing::info!(store.path = %path, user_id = %user_id, actor_id = %actor_id, "Role granted");
        Ok(())
    }

    /// Remove a user from a roster. Removing from a missing roster is a no-op.
    #[tracing::instrument(skip(self, scope), fields(store.operation = "array_remove", scope = %scope))]
    pub async fn remove_member(
        &self,
        scope: &RoleScope,
        role: &str,
        user_id: &str,
        actor_id: &str,
    ) -> Result<(), AppError> {
        require_role_name(role)?;
        require_user_id(user_id)?;
        let path = scope.roster_path(role)?;

        if self.get_roster(scope, role).await?.is_none() {
            return Ok(());
        }

        self.store
            .array_remove(
                &path,
                ROSTER_MEMBERS_FIELD,
                vec![Value::String(user_id.to_string())],
            )
            .await
            .map_err(|e| from_store_error(&format!("Failed to update roster {}", path), e))?;
        self.stamp(&path, actor_id).await;

        tracing::info!(store.path = %path, user_id = %user_id, actor_id = %actor_id, "Role revoked");
        Ok(())
    }

    /// Merge `updatedAt`/`updatedBy` into the roster. The membership change
    /// has already landed, so failures only lose the audit fields.
    async fn stamp(&self, path: &str, actor_id: &str) {
        let mut fields = Fields::new();
        fields.insert(
            ROSTER_UPDATED_AT_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        fields.insert(
            ROSTER_UPDATED_BY_FIELD.to_string(),
            Value::String(actor_id.to_string()),
        );
        if let Err(e) = self.store.set_document(path, fields, true).await {
            tracing::warn!(store.path = %path, actor_id = %actor_id, error = %e, "Failed to stamp roster audit fields");
        }
    }
}

fn require_role_name(role: &str) -> Result<(), AppError> {
    if role.trim().is_empty() {
        return Err(AppError::InvalidInput("Role name is required".to_string()));
    }
    Ok(())
}

fn require_user_id(user_id: &str) -> Result<(), AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("User id is required".to_string()));
    }
    Ok(())
}
