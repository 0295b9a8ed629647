//! Session tenant holder
//!
//! The tenant a caller selected at login. Core operations never read it
//! implicitly; callers fetch it with [`SessionTenant::require`] and pass the
//! id explicitly. There is no default tenant: an unset session fails fast.

use std::sync::RwLock;

use crate::error::AppError;
use crate::tenant_path::TenantId;

/// Tenant and user pair identifying who is acting and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContextInfo {
    pub tenant_id: TenantId,
    pub user_id: String,
}

#[derive(Debug, Default)]
pub struct SessionTenant {
    current: RwLock<Option<TenantId>>,
}

impl SessionTenant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session already bound to `tenant_id`; blank ids leave it unset.
    pub fn with_tenant(tenant_id: Option<&str>) -> Result<Self, AppError> {
        let session = Self::new();
        if let Some(raw) = tenant_id.filter(|s| !s.trim().is_empty()) {
            session.set(TenantId::parse(raw)?)?;
        }
        Ok(session)
    }

    pub fn set(&self, tenant_id: TenantId) -> Result<(), AppError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("session tenant lock poisoned".to_string()))?;
        tracing::debug!(tenant_id = %tenant_id, "Session tenant set");
        *current = Some(tenant_id);
        Ok(())
    }

    /// Forget the session tenant (logout).
    pub fn clear(&self) -> Result<(), AppError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("session tenant lock poisoned".to_string()))?;
        *current = None;
        tracing::debug!("Session tenant cleared");
        Ok(())
    }

    pub fn current(&self) -> Result<Option<TenantId>, AppError> {
        let current = self
            .current
            .read()
            .map_err(|_| AppError::Internal("session tenant lock poisoned".to_string()))?;
        Ok(current.clone())
    }

    /// Current tenant, or `MissingTenantContext` when none is selected.
    pub fn require(&self) -> Result<TenantId, AppError> {
        self.current()?.ok_or_else(|| {
            AppError::MissingTenantContext("no tenant selected for this session".to_string())
        })
    }

    /// Bind the current tenant to an acting user.
    pub fn context_for(&self, user_id: &str) -> Result<TenantContextInfo, AppError> {
        Ok(TenantContextInfo {
            tenant_id: self.require()?,
            user_id: user_id.to_string(),
        })
    }
}
