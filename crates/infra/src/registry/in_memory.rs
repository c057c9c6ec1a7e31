use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use carehub_auth::{DirectoryError, OrganizationDirectory};
use carehub_core::{Organization, OrganizationId};

use super::OrganizationRegistry;
use crate::DataAccessError;

/// In-memory registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrganizationRegistry {
    inner: RwLock<HashMap<OrganizationId, Organization>>,
}

impl InMemoryOrganizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `organizations` (test fixtures, seeding).
    pub fn with_organizations(organizations: impl IntoIterator<Item = Organization>) -> Self {
        let inner = organizations.into_iter().map(|o| (o.id, o)).collect();
        Self {
            inner: RwLock::new(inner),
        }
    }
}

fn poisoned() -> DataAccessError {
    DataAccessError::Storage("organization registry lock poisoned".to_string())
}

#[async_trait]
impl OrganizationDirectory for InMemoryOrganizationRegistry {
    async fn find(&self, id: OrganizationId) -> Result<Option<Organization>, DirectoryError> {
        let map = self.inner.read().map_err(|_| DirectoryError::from(poisoned()))?;
        Ok(map.get(&id).cloned())
    }
}

#[async_trait]
impl OrganizationRegistry for InMemoryOrganizationRegistry {
    async fn insert(&self, organization: Organization) -> Result<(), DataAccessError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;

        if map.contains_key(&organization.id) {
            return Err(DataAccessError::Conflict(format!(
                "organization {} already exists",
                organization.id
            )));
        }
        if map.values().any(|o| o.partition == organization.partition) {
            return Err(DataAccessError::Conflict(format!(
                "partition {} already mapped",
                organization.partition
            )));
        }

        map.insert(organization.id, organization);
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Organization>, DataAccessError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut active: Vec<Organization> = map.values().filter(|o| o.is_active()).cloned().collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn soft_delete(
        &self,
        id: OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<Organization, DataAccessError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(&id) {
            Some(org) if org.is_active() => {
                org.deleted_at = Some(at);
                Ok(org.clone())
            }
            _ => Err(DataAccessError::NotFound),
        }
    }
}
