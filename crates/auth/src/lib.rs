//! `carehub-auth`: tenant-scoped authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the only
//! storage-facing seam is the [`OrganizationDirectory`] trait.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod scope;
pub mod verifier;

pub use authorize::{AuthorizationGate, AuthorizedContext, AuthzError, DenialReason};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use permissions::{Action, ResourceType};
pub use policy::{
    Effect, PermissionPolicy, PermissionRule, PolicyDecision, PolicyDocument,
    default_policy_document,
};
pub use principal::{Principal, PrincipalId};
pub use roles::{Role, UnknownRole};
pub use scope::{DirectoryError, OrganizationDirectory, ResourceScope, ScopeError, resolve_scope};
pub use verifier::{CredentialVerifier, Hs256JwtVerifier, KeySet, VerificationError};
