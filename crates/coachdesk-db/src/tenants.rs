use chrono::Utc;
use coachdesk_core::constants::TENANTS_COLLECTION;
use coachdesk_core::models::{NewTenant, Tenant, TenantStatus};
use coachdesk_core::{platform_document, AppError, TenantId};
use coachdesk_store::{DocumentStore, Fields};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use crate::error::from_store_error;

/// Repository for tenant documents at `tenants/{id}`
#[derive(Clone)]
pub struct TenantRepository {
    store: Arc<dyn DocumentStore>,
}

impl TenantRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a new active tenant
    #[tracing::instrument(skip(self), fields(store.collection = "tenants", store.operation = "insert"))]
    pub async fn create(&self, input: NewTenant) -> Result<Tenant, AppError> {
        input.validate()?;
        let id = TenantId::parse(&input.id)?;
        let path = platform_document(TENANTS_COLLECTION, id.as_str())?;

        let now = Utc::now();
        let tenant = Tenant {
            id,
            name: input.name,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .store
            .create_document(&path, encode(&tenant)?)
            .await
            .map_err(|e| from_store_error(&format!("Failed to create tenant {}", path), e))?;
        if !created {
            return Err(AppError::Conflict(format!("Tenant {} already exists", tenant.id)));
        }

        tracing::info!(tenant_id = %tenant.id, "Tenant created");
        Ok(tenant)
    }

    #[tracing::instrument(skip(self), fields(store.collection = "tenants", store.operation = "select"))]
    pub async fn get(&self, tenant_id: &str) -> Result<Option<Tenant>, AppError> {
        let id = TenantId::parse(tenant_id)?;
        let path = platform_document(TENANTS_COLLECTION, id.as_str())?;
        self.read(&path).await
    }

    /// All tenants ordered by id. Documents that do not parse as tenants are
    /// skipped with a warning.
    #[tracing::instrument(skip(self), fields(store.collection = "tenants", store.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Tenant>, AppError> {
        let documents = self
            .store
            .list_collection(TENANTS_COLLECTION)
            .await
            .map_err(|e| from_store_error("Failed to list tenants", e))?;

        let mut tenants = Vec::with_capacity(documents.len());
        for document in documents {
            match serde_json::from_value::<Tenant>(Value::Object(document.fields)) {
                Ok(tenant) => tenants.push(tenant),
                Err(e) => {
                    tracing::warn!(store.path = %document.path, error = %e, "Skipping malformed tenant document");
                }
            }
        }
        Ok(tenants)
    }

    /// Mark a tenant archived. Tenants are never hard-deleted.
    #[tracing::instrument(skip(self), fields(store.collection = "tenants", store.operation = "update"))]
    pub async fn archive(&self, tenant_id: &str) -> Result<Tenant, AppError> {
        let id = TenantId::parse(tenant_id)?;
        let path = platform_document(TENANTS_COLLECTION, id.as_str())?;

        let mut tenant = self
            .read(&path)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", id)))?;

        tenant.status = TenantStatus::Archived;
        tenant.updated_at = Utc::now();
        self.write(&path, &tenant).await?;

        tracing::info!(tenant_id = %tenant.id, "Tenant archived");
        Ok(tenant)
    }

    async fn read(&self, path: &str) -> Result<Option<Tenant>, AppError> {
        let document = self
            .store
            .get_document(path)
            .await
            .map_err(|e| from_store_error(&format!("Failed to read tenant {}", path), e))?;

        match document {
            Some(document) => serde_json::from_value(Value::Object(document.fields))
                .map(Some)
                .map_err(|e| AppError::Internal(format!("Malformed tenant document {}: {}", path, e))),
            None => Ok(None),
        }
    }

    async fn write(&self, path: &str, tenant: &Tenant) -> Result<(), AppError> {
        self.store
            .set_document(path, encode(tenant)?, true)
            .await
            .map_err(|e| from_store_error(&format!("Failed to write tenant {}", path), e))
    }
}

fn encode(tenant: &Tenant) -> Result<Fields, AppError> {
    match serde_json::to_value(tenant) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Ok(Fields::new()),
        Err(e) => Err(AppError::Internal(format!("Failed to encode tenant: {}", e))),
    }
}
