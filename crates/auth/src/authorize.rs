//! Authorization gate: credential → policy → tenant scope.
//!
//! The order is fixed. Action-level permission is decided before any tenant
//! lookup, so a caller lacking the capability learns nothing about which
//! organizations exist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::scope::{OrganizationDirectory, ResourceScope, ScopeError, resolve_scope};
use crate::verifier::{CredentialVerifier, VerificationError};
use crate::{Action, PermissionPolicy, Principal, ResourceType};

/// Why a request was refused with [`AuthzError::Forbidden`].
///
/// Internal only: every reason renders identically to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    ActionNotPermitted,
    CrossTenant,
    HomeOrganizationUnavailable,
    PartitionMismatch,
    AmbiguousOrganization,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(#[from] VerificationError),

    #[error("forbidden")]
    Forbidden(DenialReason),

    #[error("organization not found")]
    OrganizationNotFound,

    #[error("authorization unavailable: {0}")]
    Unavailable(String),
}

impl From<ScopeError> for AuthzError {
    fn from(value: ScopeError) -> Self {
        match value {
            ScopeError::OrganizationNotFound => AuthzError::OrganizationNotFound,
            ScopeError::CrossTenantAccessDenied => AuthzError::Forbidden(DenialReason::CrossTenant),
            ScopeError::HomeOrganizationUnavailable => {
                AuthzError::Forbidden(DenialReason::HomeOrganizationUnavailable)
            }
            ScopeError::PartitionMismatch => AuthzError::Forbidden(DenialReason::PartitionMismatch),
            ScopeError::Directory(e) => AuthzError::Unavailable(e.0),
        }
    }
}

/// Proof that the gate authorized one request.
///
/// Only the gate can build one. Data access takes its partition from here,
/// which ties every storage operation to a successful decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedContext {
    principal: Principal,
    scope: ResourceScope,
    action: Action,
    resource: ResourceType,
}

impl AuthorizedContext {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn scope(&self) -> &ResourceScope {
        &self.scope
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }
}

/// Per-request authorization over already-loaded, read-only state.
#[derive(Clone)]
pub struct AuthorizationGate {
    verifier: Arc<dyn CredentialVerifier>,
    policy: Arc<PermissionPolicy>,
    directory: Arc<dyn OrganizationDirectory>,
}

impl AuthorizationGate {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        policy: Arc<PermissionPolicy>,
        directory: Arc<dyn OrganizationDirectory>,
    ) -> Self {
        Self {
            verifier,
            policy,
            directory,
        }
    }

    /// Verify the credential only.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Principal, AuthzError> {
        self.authenticate_at(token, Utc::now())
    }

    pub fn authenticate_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Principal, AuthzError> {
        self.verifier.verify(token, now).map_err(|e| {
            tracing::info!(error = %e, "credential rejected");
            AuthzError::Unauthenticated(e)
        })
    }

    pub async fn authorize(
        &self,
        token: Option<&str>,
        action: &Action,
        resource: &ResourceType,
        requested_org: Option<&str>,
    ) -> Result<AuthorizedContext, AuthzError> {
        self.authorize_at(token, action, resource, requested_org, Utc::now())
            .await
    }

    pub async fn authorize_at(
        &self,
        token: Option<&str>,
        action: &Action,
        resource: &ResourceType,
        requested_org: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizedContext, AuthzError> {
        let principal = self.authenticate_at(token, now)?;
        self.authorize_principal(principal, action, resource, requested_org)
            .await
    }

    /// Policy and scope checks for an already verified principal.
    pub async fn authorize_principal(
        &self,
        principal: Principal,
        action: &Action,
        resource: &ResourceType,
        requested_org: Option<&str>,
    ) -> Result<AuthorizedContext, AuthzError> {
        let decision = self.policy.explain(principal.role, action, resource);
        if !decision.allowed {
            tracing::info!(
                principal_id = %principal.principal_id,
                role = %principal.role,
                action = %action,
                resource = %resource,
                matched = ?decision.matched,
                "denied by policy"
            );
            return Err(AuthzError::Forbidden(DenialReason::ActionNotPermitted));
        }

        let scope = match resolve_scope(&*self.directory, &principal, requested_org).await {
            Ok(scope) => scope,
            Err(e) => {
                if let ScopeError::Directory(inner) = &e {
                    tracing::warn!(error = %inner, "scope resolution failed");
                } else {
                    tracing::info!(
                        principal_id = %principal.principal_id,
                        role = %principal.role,
                        home_organization = ?principal.home_organization,
                        requested_org = ?requested_org,
                        reason = %e,
                        "denied by tenant scope"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::debug!(
            principal_id = %principal.principal_id,
            role = %principal.role,
            action = %action,
            resource = %resource,
            organization_id = ?scope.organization_id(),
            "authorized"
        );

        Ok(AuthorizedContext {
            principal,
            scope,
            action: action.clone(),
            resource: resource.clone(),
        })
    }
}
