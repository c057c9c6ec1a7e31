//! Shared organization registry (the organization-to-partition mapping).
//!
//! The registry lives outside every tenant partition. It is the only source
//! of partition names the scope resolver trusts.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use carehub_auth::OrganizationDirectory;
use carehub_core::{Organization, OrganizationId};

use crate::DataAccessError;

pub use in_memory::InMemoryOrganizationRegistry;
pub use postgres::PgOrganizationRegistry;

/// Write side of the registry, on top of the resolver's read-only view.
#[async_trait]
pub trait OrganizationRegistry: OrganizationDirectory {
    /// Record a newly provisioned organization. Fails with `Conflict` if the
    /// id or partition is already mapped.
    async fn insert(&self, organization: Organization) -> Result<(), DataAccessError>;

    /// Organizations that have not been soft-deleted, oldest first.
    async fn list_active(&self) -> Result<Vec<Organization>, DataAccessError>;

    /// Mark an active organization deleted. The mapping row is kept.
    async fn soft_delete(
        &self,
        id: OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<Organization, DataAccessError>;
}

#[async_trait]
impl<R> OrganizationRegistry for Arc<R>
where
    R: OrganizationRegistry + ?Sized,
{
    async fn insert(&self, organization: Organization) -> Result<(), DataAccessError> {
        (**self).insert(organization).await
    }

    async fn list_active(&self) -> Result<Vec<Organization>, DataAccessError> {
        (**self).list_active().await
    }

    async fn soft_delete(
        &self,
        id: OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<Organization, DataAccessError> {
        (**self).soft_delete(id, at).await
    }
}
