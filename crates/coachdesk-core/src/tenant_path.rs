//! Tenant-scoped path resolution
//!
//! All business data lives under the owning tenant's document:
//!
//! - collection: `tenants/{tenant_id}/{collection}`
//! - document: `tenants/{tenant_id}/{collection}/{document_id}`
//! - subcollection: `tenants/{tenant_id}/{collection}/{document_id}/{subcollection}`
//!
//! Resolution is pure string building. A missing or blank tenant id is a
//! configuration error: there is no default tenant and no fallback to an
//! unscoped root path. Every name is a single path segment, so an already
//! resolved path can never be fed back in and prefixed twice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::TENANTS_COLLECTION;
use crate::error::AppError;

/// Validated tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant id, failing with `MissingTenantContext` when blank.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.trim().is_empty() {
            return Err(AppError::MissingTenantContext(
                "tenant id is empty".to_string(),
            ));
        }
        validate_segment("tenant id", raw)?;
        Ok(TenantId(raw.to_string()))
    }

    /// Parse an optional tenant id as supplied by session state.
    pub fn require(raw: Option<&str>) -> Result<Self, AppError> {
        match raw {
            Some(raw) => Self::parse(raw),
            None => Err(AppError::MissingTenantContext(
                "no tenant selected for this operation".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TenantId::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// Check that `value` is usable as exactly one path segment.
pub fn validate_segment(kind: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::InvalidPath(format!("{} must not be empty", kind)));
    }
    if value.contains('/') {
        return Err(AppError::InvalidPath(format!(
            "{} must not contain '/': {}",
            kind, value
        )));
    }
    if value == "." || value == ".." {
        return Err(AppError::InvalidPath(format!(
            "{} must not be '.' or '..'",
            kind
        )));
    }
    if value.trim() != value {
        return Err(AppError::InvalidPath(format!(
            "{} must not start or end with whitespace: {:?}",
            kind, value
        )));
    }
    Ok(())
}

/// A logical location inside one tenant's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScopedPath {
    tenant_id: TenantId,
    collection: String,
    document_id: Option<String>,
    subcollection: Option<String>,
    subdocument_id: Option<String>,
}

impl TenantScopedPath {
    pub fn collection(tenant_id: TenantId, collection: &str) -> Result<Self, AppError> {
        validate_segment("collection name", collection)?;
        Ok(Self {
            tenant_id,
            collection: collection.to_string(),
            document_id: None,
            subcollection: None,
            subdocument_id: None,
        })
    }

    pub fn document(
        tenant_id: TenantId,
        collection: &str,
        document_id: &str,
    ) -> Result<Self, AppError> {
        validate_segment("document id", document_id)?;
        let mut path = Self::collection(tenant_id, collection)?;
        path.document_id = Some(document_id.to_string());
        Ok(path)
    }

    pub fn subcollection(
        tenant_id: TenantId,
        collection: &str,
        document_id: &str,
        subcollection: &str,
    ) -> Result<Self, AppError> {
        validate_segment("subcollection name", subcollection)?;
        let mut path = Self::document(tenant_id, collection, document_id)?;
        path.subcollection = Some(subcollection.to_string());
        Ok(path)
    }

    pub fn subcollection_document(
        tenant_id: TenantId,
        collection: &str,
        document_id: &str,
        subcollection: &str,
        subdocument_id: &str,
    ) -> Result<Self, AppError> {
        validate_segment("subcollection document id", subdocument_id)?;
        let mut path = Self::subcollection(tenant_id, collection, document_id, subcollection)?;
        path.subdocument_id = Some(subdocument_id.to_string());
        Ok(path)
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn subcollection_name(&self) -> Option<&str> {
        self.subcollection.as_deref()
    }

    /// True when the resolved path names a document rather than a collection.
    pub fn is_document(&self) -> bool {
        match self.subcollection {
            Some(_) => self.subdocument_id.is_some(),
            None => self.document_id.is_some(),
        }
    }

    /// Concrete storage path.
    pub fn resolve(&self) -> String {
        let mut segments: Vec<&str> = vec![
            TENANTS_COLLECTION,
            self.tenant_id.as_str(),
            self.collection.as_str(),
        ];
        segments.extend(self.document_id.as_deref());
        segments.extend(self.subcollection.as_deref());
        segments.extend(self.subdocument_id.as_deref());
        segments.join("/")
    }
}

impl fmt::Display for TenantScopedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolve())
    }
}

/// `tenants/{tenant_id}/{collection_name}`
pub fn resolve_collection(
    tenant_id: Option<&str>,
    collection_name: &str,
) -> Result<String, AppError> {
    let tenant_id = TenantId::require(tenant_id)?;
    Ok(TenantScopedPath::collection(tenant_id, collection_name)?.resolve())
}

/// `tenants/{tenant_id}/{collection_name}/{document_id}`
pub fn resolve_document(
    tenant_id: Option<&str>,
    collection_name: &str,
    document_id: &str,
) -> Result<String, AppError> {
    let tenant_id = TenantId::require(tenant_id)?;
    Ok(TenantScopedPath::document(tenant_id, collection_name, document_id)?.resolve())
}

/// `tenants/{tenant_id}/{collection_name}/{document_id}/{subcollection_name}`
pub fn resolve_subcollection(
    tenant_id: Option<&str>,
    collection_name: &str,
    document_id: &str,
    subcollection_name: &str,
) -> Result<String, AppError> {
    let tenant_id = TenantId::require(tenant_id)?;
    Ok(
        TenantScopedPath::subcollection(tenant_id, collection_name, document_id, subcollection_name)?
            .resolve(),
    )
}

/// Path of a collection at the platform root, outside every tenant.
pub fn platform_collection(collection_name: &str) -> Result<String, AppError> {
    validate_segment("collection name", collection_name)?;
    Ok(collection_name.to_string())
}

/// Path of a document at the platform root, e.g. `roles/superadmins`.
pub fn platform_document(collection_name: &str, document_id: &str) -> Result<String, AppError> {
    validate_segment("collection name", collection_name)?;
    validate_segment("document id", document_id)?;
    Ok(format!("{}/{}", collection_name, document_id))
}

/// Path builders bound to one explicit tenant.
///
/// Used by operator code that works across tenants and must name the tenant
/// on every call instead of relying on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: TenantId,
}

impl TenantScope {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn parse(tenant_id: &str) -> Result<Self, AppError> {
        Ok(Self::new(TenantId::parse(tenant_id)?))
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Path of the tenant document itself: `tenants/{tenant_id}`.
    pub fn root(&self) -> String {
        format!("{}/{}", TENANTS_COLLECTION, self.tenant_id)
    }

    pub fn collection(&self, collection_name: &str) -> Result<String, AppError> {
        Ok(TenantScopedPath::collection(self.tenant_id.clone(), collection_name)?.resolve())
    }

    pub fn document(&self, collection_name: &str, document_id: &str) -> Result<String, AppError> {
        Ok(
            TenantScopedPath::document(self.tenant_id.clone(), collection_name, document_id)?
                .resolve(),
        )
    }

    pub fn subcollection(
        &self,
        collection_name: &str,
        document_id: &str,
        subcollection_name: &str,
    ) -> Result<String, AppError> {
        Ok(TenantScopedPath::subcollection(
            self.tenant_id.clone(),
            collection_name,
            document_id,
            subcollection_name,
        )?
        .resolve())
    }

    pub fn subcollection_document(
        &self,
        collection_name: &str,
        document_id: &str,
        subcollection_name: &str,
        subdocument_id: &str,
    ) -> Result<String, AppError> {
        Ok(TenantScopedPath::subcollection_document(
            self.tenant_id.clone(),
            collection_name,
            document_id,
            subcollection_name,
            subdocument_id,
        )?
        .resolve())
    }
}
