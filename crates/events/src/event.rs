use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carehub_core::{EntityId, OrganizationId};

/// Stable lifecycle event names.
pub mod event_type {
    pub const ORGANIZATION_CREATED: &str = "organization.created";
    pub const ORGANIZATION_DELETED: &str = "organization.deleted";
    pub const USER_CREATED: &str = "user.created";
    pub const USER_DELETED: &str = "user.deleted";
    pub const PATIENT_CREATED: &str = "patient.created";
}

/// Notification that a mutation was committed.
///
/// Events are facts: they are only built after the storage write they
/// describe has succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    event_id: Uuid,
    event_type: String,
    organization_id: OrganizationId,

    /// The user or patient affected; `None` for organization events.
    entity_id: Option<EntityId>,

    occurred_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(
        event_type: impl Into<String>,
        organization_id: OrganizationId,
        entity_id: Option<EntityId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.into(),
            organization_id,
            entity_id,
            occurred_at,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
