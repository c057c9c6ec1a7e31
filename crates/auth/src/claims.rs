use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use carehub_core::{OrganizationId, PartitionId};

use crate::{Principal, PrincipalId, Role};

/// JWT claims model (transport-agnostic).
///
/// This is the wire shape of a credential issued by the identity provider.
/// Identifier claims are kept as strings here and checked in
/// [`JwtClaims::into_principal`], so a wrong shape is reported as malformed
/// claims rather than a decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier (UUID).
    pub sub: String,

    /// Role name, one of [`Role`].
    pub role: String,

    /// Home organization id. Optional for the super role only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    /// Home organization's partition (schema) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_schema: Option<String>,

    /// Organization to act within when the request names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_scope: Option<String>,

    /// Expiration (seconds since epoch).
    pub exp: i64,

    /// Not-before (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("malformed claims: {0}")]
    Malformed(String),
}

/// Deterministically validate the time window of JWT claims.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// the verifier before this is called.
pub fn validate_claims(
    claims: &JwtClaims,
    now: DateTime<Utc>,
    leeway: Duration,
) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    let leeway = leeway.num_seconds().max(0);

    if now - leeway >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    if let Some(nbf) = claims.nbf {
        if now + leeway < nbf {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    Ok(())
}

impl JwtClaims {
    /// Check claim shapes and build the request principal.
    pub fn into_principal(self) -> Result<Principal, TokenValidationError> {
        if self.sub.trim().is_empty() {
            return Err(TokenValidationError::Malformed("missing sub".into()));
        }
        let principal_id: PrincipalId = self
            .sub
            .parse()
            .map_err(|e| TokenValidationError::Malformed(format!("sub: {e}")))?;

        let role: Role = self
            .role
            .parse()
            .map_err(|e| TokenValidationError::Malformed(format!("role: {e}")))?;

        let home_organization = parse_optional(self.org_id.as_deref(), "org_id", |s| {
            s.parse::<OrganizationId>().map_err(|e| e.to_string())
        })?;
        let claimed_partition = parse_optional(self.org_schema.as_deref(), "org_schema", |s| {
            PartitionId::parse(s).map_err(|e| e.to_string())
        })?;
        let scope_override = parse_optional(self.org_scope.as_deref(), "org_scope", |s| {
            s.parse::<OrganizationId>().map_err(|e| e.to_string())
        })?;

        if !role.is_super() && (home_organization.is_none() || claimed_partition.is_none()) {
            return Err(TokenValidationError::Malformed(format!(
                "role '{role}' requires org_id and org_schema"
            )));
        }

        Ok(Principal {
            principal_id,
            role,
            home_organization,
            claimed_partition,
            scope_override,
        })
    }
}

fn parse_optional<T>(
    raw: Option<&str>,
    claim: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, TokenValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse(s)
            .map(Some)
            .map_err(|e| TokenValidationError::Malformed(format!("{claim}: {e}"))),
    }
}
