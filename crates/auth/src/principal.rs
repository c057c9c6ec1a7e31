use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carehub_core::{OrganizationId, PartitionId};

use crate::Role;

/// Identity of an authenticated principal (staff user, patient user, operator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The authenticated caller, as extracted from a verified credential.
///
/// Built fresh for every request and never persisted. `home_organization` is
/// only `None` for the super role; the verifier rejects any other role
/// without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub home_organization: Option<OrganizationId>,

    /// Partition named by the credential. Informational only: scope
    /// resolution always takes the partition from the registry and denies
    /// the request if the two disagree.
    pub claimed_partition: Option<PartitionId>,

    /// Organization the credential asks to act within when the request
    /// itself names none.
    pub scope_override: Option<OrganizationId>,
}

impl Principal {
    pub fn is_super(&self) -> bool {
        self.role.is_super()
    }
}
