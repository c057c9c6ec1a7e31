//! Tenant scope resolution.
//!
//! Decides which organization (and therefore which storage partition) a
//! request may operate on. The partition in a resolved scope always comes
//! from the [`OrganizationDirectory`]; callers can name an organization, never
//! a partition.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use carehub_core::{Organization, OrganizationId, PartitionId};

use crate::Principal;

/// The organization context a request is authorized to act within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResourceScope {
    /// Every organization. Only ever resolved for the super role, and only
    /// grants access to the shared organization registry.
    AllOrganizations,
    Organization {
        id: OrganizationId,
        partition: PartitionId,
    },
}

impl ResourceScope {
    pub fn organization_id(&self) -> Option<OrganizationId> {
        match self {
            ResourceScope::AllOrganizations => None,
            ResourceScope::Organization { id, .. } => Some(*id),
        }
    }

    pub fn partition(&self) -> Option<&PartitionId> {
        match self {
            ResourceScope::AllOrganizations => None,
            ResourceScope::Organization { partition, .. } => Some(partition),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("organization directory unavailable: {0}")]
pub struct DirectoryError(pub String);

/// Read side of the organization-to-partition mapping.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Look up an organization, including soft-deleted ones.
    async fn find(&self, id: OrganizationId) -> Result<Option<Organization>, DirectoryError>;
}

#[async_trait]
impl<D> OrganizationDirectory for Arc<D>
where
    D: OrganizationDirectory + ?Sized,
{
    async fn find(&self, id: OrganizationId) -> Result<Option<Organization>, DirectoryError> {
        (**self).find(id).await
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// Super role named an organization that does not exist or was deleted.
    #[error("organization not found")]
    OrganizationNotFound,

    /// Non-super role named an organization other than its own. Raised
    /// without consulting the directory, so it says nothing about whether
    /// the target exists.
    #[error("cross-tenant access denied")]
    CrossTenantAccessDenied,

    /// The caller's own organization is gone or soft-deleted.
    #[error("home organization unavailable")]
    HomeOrganizationUnavailable,

    /// The credential's partition claim disagrees with the registry.
    #[error("credential partition does not match registry")]
    PartitionMismatch,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Organization id as supplied by a request (path, header or body).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requested {
    Nothing,
    Organization(OrganizationId),
    Unparseable,
}

impl Requested {
    fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Requested::Nothing,
            Some(s) => s
                .parse::<OrganizationId>()
                .map(Requested::Organization)
                .unwrap_or(Requested::Unparseable),
        }
    }
}

/// Resolve the effective scope of a request.
///
/// `requested_org` is the organization id the request names, if any. When
/// it names none, the credential's `org_scope` override is used instead.
pub async fn resolve_scope<D>(
    directory: &D,
    principal: &Principal,
    requested_org: Option<&str>,
) -> Result<ResourceScope, ScopeError>
where
    D: OrganizationDirectory + ?Sized,
{
    let requested = match Requested::from_raw(requested_org) {
        Requested::Nothing => principal
            .scope_override
            .map(Requested::Organization)
            .unwrap_or(Requested::Nothing),
        other => other,
    };

    if principal.is_super() {
        return match requested {
            Requested::Nothing => Ok(ResourceScope::AllOrganizations),
            Requested::Unparseable => Err(ScopeError::OrganizationNotFound),
            Requested::Organization(id) => match directory.find(id).await? {
                Some(org) if org.is_active() => Ok(ResourceScope::Organization {
                    id: org.id,
                    partition: org.partition,
                }),
                _ => Err(ScopeError::OrganizationNotFound),
            },
        };
    }

    let home = principal
        .home_organization
        .ok_or(ScopeError::HomeOrganizationUnavailable)?;

    match requested {
        Requested::Nothing => {}
        Requested::Organization(id) if id == home => {}
        Requested::Organization(_) | Requested::Unparseable => {
            return Err(ScopeError::CrossTenantAccessDenied);
        }
    }

    let org = directory
        .find(home)
        .await?
        .filter(Organization::is_active)
        .ok_or(ScopeError::HomeOrganizationUnavailable)?;

    if let Some(claimed) = &principal.claimed_partition {
        if *claimed != org.partition {
            return Err(ScopeError::PartitionMismatch);
        }
    }

    Ok(ResourceScope::Organization {
        id: org.id,
        partition: org.partition,
    })
}
