//! Role registry.

pub mod role;

pub use role::{Role, RoleRequest, normalize_name};

use crate::error::BrokerResult;
use crate::storage::{self, ROLES_PREFIX, Storage};
use std::sync::Arc;
use tracing::{info, instrument};

/// Named role definitions kept under `roles/`.
pub struct RoleRegistry {
    storage: Arc<dyn Storage>,
}

impl RoleRegistry {
    /// Create a registry over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create or update a role and return the stored definition.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name or lease bounds; the
    /// stored role is left unchanged in that case.
    #[instrument(skip(self, request))]
    pub async fn write(&self, name: &str, request: RoleRequest) -> BrokerResult<Role> {
        let name = normalize_name(name)?;
        let key = storage::role_key(&name);

        let existing: Option<Role> = storage::read_json(self.storage.as_ref(), &key).await?;
        let created = existing.is_none();
        let mut role = existing.unwrap_or_default();
        role.apply(request)?;

        storage::write_json(self.storage.as_ref(), &key, &role).await?;
        info!(role = %name, created, "Stored role");
        Ok(role)
    }

    /// Read a role.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad name or a storage failure.
    pub async fn read(&self, name: &str) -> BrokerResult<Option<Role>> {
        let name = normalize_name(name)?;
        storage::read_json(self.storage.as_ref(), &storage::role_key(&name)).await
    }

    /// Delete a role. Deleting an unknown role succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad name or a storage failure.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> BrokerResult<()> {
        let name = normalize_name(name)?;
        self.storage.delete(&storage::role_key(&name)).await?;
        info!(role = %name, "Deleted role");
        Ok(())
    }

    /// List role names.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list(&self) -> BrokerResult<Vec<String>> {
        Ok(self.storage.list(ROLES_PREFIX).await?)
    }

    /// Check whether a role exists.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad name or a storage failure.
    pub async fn exists(&self, name: &str) -> BrokerResult<bool> {
        let name = normalize_name(name)?;
        Ok(self.storage.get(&storage::role_key(&name)).await?.is_some())
    }
}
