//! Organization registry entry (the organization-to-partition mapping).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrganizationId, PartitionId};

/// One row of the shared organization registry.
///
/// The partition is fixed when the organization is provisioned and never
/// changes afterwards. Soft deletion sets `deleted_at`; the row (and its
/// mapping) stays, but the organization is no longer available to new
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub partition: PartitionId,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
    /// Build the registry entry for a freshly provisioned organization.
    pub fn provision(id: OrganizationId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            partition: PartitionId::for_organization(id),
            created_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted()
    }
}
