//! Credential verification: signed bearer token → [`Principal`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};
use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("malformed claims: {0}")]
    MalformedClaims(String),
}

impl From<TokenValidationError> for VerificationError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => VerificationError::Expired,
            TokenValidationError::NotYetValid => VerificationError::NotYetValid,
            TokenValidationError::Malformed(msg) => VerificationError::MalformedClaims(msg),
        }
    }
}

/// Turns a presented credential into a principal.
///
/// Implementations must be pure: the result depends only on the token, the
/// trusted key material and `now`.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Principal, VerificationError>;
}

/// Trusted HMAC signing keys.
///
/// Tokens without a `kid` header are checked against the default key; tokens
/// with a `kid` must name a key in the set.
#[derive(Clone, Default)]
pub struct KeySet {
    default: Option<DecodingKey>,
    by_kid: HashMap<String, DecodingKey>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_secret(mut self, secret: &[u8]) -> Self {
        self.default = Some(DecodingKey::from_secret(secret));
        self
    }

    pub fn with_secret(mut self, kid: impl Into<String>, secret: &[u8]) -> Self {
        self.by_kid.insert(kid.into(), DecodingKey::from_secret(secret));
        self
    }

    fn select(&self, kid: Option<&str>) -> Option<&DecodingKey> {
        match kid {
            Some(kid) => self.by_kid.get(kid),
            None => self.default.as_ref(),
        }
    }
}

/// HS256 JWT verifier.
pub struct Hs256JwtVerifier {
    keys: KeySet,
    leeway: Duration,
}

impl Hs256JwtVerifier {
    pub fn new(keys: KeySet) -> Self {
        Self {
            keys,
            leeway: Duration::zero(),
        }
    }

    /// Single-secret verifier (no `kid` support).
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(KeySet::new().with_default_secret(secret))
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    fn decode(&self, token: &str) -> Result<JwtClaims, VerificationError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|_| VerificationError::InvalidSignature)?;
        if header.alg != Algorithm::HS256 {
            return Err(VerificationError::InvalidSignature);
        }
        let key = self
            .keys
            .select(header.kid.as_deref())
            .ok_or(VerificationError::InvalidSignature)?;

        // Signature only; the time window is checked by `validate_claims`
        // against the caller-supplied clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<JwtClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::MissingRequiredClaim(_) => {
                    VerificationError::MalformedClaims(e.to_string())
                }
                ErrorKind::ExpiredSignature => VerificationError::Expired,
                ErrorKind::ImmatureSignature => VerificationError::NotYetValid,
                _ => VerificationError::InvalidSignature,
            })
    }
}

impl CredentialVerifier for Hs256JwtVerifier {
    fn verify(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Principal, VerificationError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(VerificationError::MissingToken)?;

        let claims = self.decode(token)?;
        validate_claims(&claims, now, self.leeway)?;
        Ok(claims.into_principal()?)
    }
}
